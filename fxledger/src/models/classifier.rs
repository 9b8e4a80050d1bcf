use crate::ledger::SignalRecord;
use crate::models::{derive_signal, MentionedSide, SentimentProvider, TradingSignal};
use crate::news::NewsItem;
use crate::pairs::{CurrencyPair, PairTable};

// A pair is mentioned when either currency code appears anywhere in the text.
// If both appear the text is taken to be about the base currency.
pub fn mentioned_side(pair: &CurrencyPair, text: &str) -> Option<MentionedSide> {
    let text = text.to_lowercase();
    if text.contains(&pair.base.to_lowercase()) {
        Some(MentionedSide::Base)
    } else if text.contains(&pair.quote.to_lowercase()) {
        Some(MentionedSide::Quote)
    } else {
        None
    }
}

/// Maps news text to one trading signal per implicated pair. Pure: the same item
/// always yields the same signals, in pair-table order.
pub struct SignalClassifier<'a, P: SentimentProvider> {
    pairs: &'a PairTable,
    provider: P,
}

impl<'a, P: SentimentProvider> SignalClassifier<'a, P> {
    pub fn new(pairs: &'a PairTable, provider: P) -> Self {
        SignalClassifier { pairs, provider }
    }

    pub fn classify(&self, item: &NewsItem) -> Vec<TradingSignal> {
        let text = item.text();
        let mentioned: Vec<(&CurrencyPair, MentionedSide)> = self
            .pairs
            .pairs()
            .filter_map(|pair| mentioned_side(pair, &text).map(|side| (pair, side)))
            .collect();

        if mentioned.is_empty() {
            return Vec::new();
        }

        // The whole text is scored once, every mentioned pair shares the result
        let sentiment = self.provider.assess(item);
        mentioned
            .into_iter()
            .map(|(pair, side)| TradingSignal {
                pair: pair.clone(),
                sentiment,
                side,
                signal: derive_signal(sentiment.label, side),
            })
            .collect()
    }

    // Unpriced ledger rows for an item, stamped with its publication time
    pub fn records(&self, item: &NewsItem) -> Vec<SignalRecord> {
        self.classify(item)
            .into_iter()
            .map(|signal| {
                SignalRecord::new(
                    item.published_at,
                    signal.pair,
                    &item.title,
                    &item.description,
                    signal.sentiment,
                    signal.signal,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{KeywordPolarity, Label, Sentiment, Signal};
    use chrono::{TimeZone, Utc};

    fn item(title: &str, description: &str) -> NewsItem {
        NewsItem::new(title, description, Utc.with_ymd_and_hms(2024, 3, 4, 9, 30, 0).unwrap())
    }

    #[test]
    fn one_signal_per_mentioned_pair() {
        let pairs = PairTable::default();
        let classifier = SignalClassifier::new(&pairs, KeywordPolarity::default());

        let signals = classifier.classify(&item("JPY rally", "Japanese currency strong on BoJ remarks"));
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].pair, CurrencyPair::new("USD", "JPY"));
        assert_eq!(signals[0].side, MentionedSide::Quote);
        // Bullish yen means USD/JPY falls
        assert_eq!(signals[0].signal, Signal::Short);
    }

    #[test]
    fn usd_mention_implicates_every_usd_pair() {
        let pairs = PairTable::default();
        let classifier = SignalClassifier::new(&pairs, KeywordPolarity::default());

        let signals = classifier.classify(&item("USD slides", "Dollar weak after payrolls"));
        assert_eq!(signals.len(), 7);
        let eur_usd = &signals[0];
        assert_eq!(eur_usd.pair, CurrencyPair::new("EUR", "USD"));
        assert_eq!(eur_usd.signal, Signal::Long);
        let usd_jpy = &signals[1];
        assert_eq!(usd_jpy.pair, CurrencyPair::new("USD", "JPY"));
        assert_eq!(usd_jpy.signal, Signal::Short);
        assert!(signals.iter().all(|s| s.sentiment == Sentiment::new(Label::Bearish, 0.85)));
    }

    #[test]
    fn both_codes_mentioned_reads_as_base() {
        let pair = CurrencyPair::new("EUR", "USD");
        assert_eq!(mentioned_side(&pair, "EUR/USD climbs"), Some(MentionedSide::Base));
        assert_eq!(mentioned_side(&pair, "usd climbs"), Some(MentionedSide::Quote));
        assert_eq!(mentioned_side(&pair, "gold climbs"), None);
    }

    #[test]
    fn neutral_text_gives_neutral_signals_and_is_deterministic() {
        let pairs = PairTable::default();
        let classifier = SignalClassifier::new(&pairs, KeywordPolarity::default());
        let news = item("GBP outlook", "Markets await the BoE");

        let first = classifier.records(&news);
        let second = classifier.records(&news);
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].signal, Signal::Neutral);
        assert_eq!(first[0].label, Label::Neutral);
        assert_eq!(first[0].timestamp, news.published_at);
        assert!(first[0].entry_price.is_none());
    }

    #[test]
    fn unrelated_text_yields_nothing() {
        let pairs = PairTable::default();
        let classifier = SignalClassifier::new(&pairs, KeywordPolarity::default());
        assert!(classifier.classify(&item("Gold rally", "Bullion strong")).is_empty());
    }
}
