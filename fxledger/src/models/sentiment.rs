use std::collections::HashMap;

use crate::models::{Label, Sentiment};
use crate::news::NewsItem;
use crate::settings::{ProviderKind, Settings};

/// Anything that can turn a news item into a (label, confidence) pair.
pub trait SentimentProvider {
    fn assess(&self, item: &NewsItem) -> Sentiment;
}

pub enum SentimentProviders {
    Keyword(KeywordPolarity),
    Lexicon(LexiconScorer),
    External(ExternalLabels),
}

impl SentimentProvider for SentimentProviders {
    fn assess(&self, item: &NewsItem) -> Sentiment {
        match self {
            SentimentProviders::Keyword(provider) => provider.assess(item),
            SentimentProviders::Lexicon(provider) => provider.assess(item),
            SentimentProviders::External(provider) => provider.assess(item),
        }
    }
}

impl SentimentProviders {
    pub fn from_settings(settings: &Settings) -> Self {
        log::debug!("Using {:?} sentiment provider", settings.sentiment_provider);
        match settings.sentiment_provider {
            ProviderKind::Keyword => SentimentProviders::Keyword(KeywordPolarity::default()),
            ProviderKind::Lexicon => SentimentProviders::Lexicon(LexiconScorer::default()),
            ProviderKind::External => SentimentProviders::External(ExternalLabels),
        }
    }
}

// Keyword polarity heuristic. Bullish cues are checked first.

const BULLISH_CUES: &[&str] = &["rally", "bullish", "optimism", "gain", "surge", "strong", "hawkish"];
const BEARISH_CUES: &[&str] = &["fall", "bearish", "drop", "decline", "recession", "weak", "dovish"];

pub struct KeywordPolarity {
    pub confidence: f64,
}

impl Default for KeywordPolarity {
    fn default() -> Self {
        KeywordPolarity { confidence: 0.85 }
    }
}

impl SentimentProvider for KeywordPolarity {
    fn assess(&self, item: &NewsItem) -> Sentiment {
        let text = item.text();
        if BULLISH_CUES.iter().any(|cue| text.contains(cue)) {
            Sentiment::new(Label::Bullish, self.confidence)
        } else if BEARISH_CUES.iter().any(|cue| text.contains(cue)) {
            Sentiment::new(Label::Bearish, self.confidence)
        } else {
            Sentiment::neutral()
        }
    }
}

/// Weighted financial lexicon with negation and intensifier handling.
/// Scores are summed and squashed into a compound score in (-1, 1).
pub struct LexiconScorer {
    words: HashMap<&'static str, f64>,
    negations: Vec<&'static str>,
    intensifiers: HashMap<&'static str, f64>,
    pub threshold: f64,
}

const NEGATION_WINDOW: usize = 3;
const NORMALIZATION_ALPHA: f64 = 15.0;

impl Default for LexiconScorer {
    fn default() -> Self {
        let words = [
            ("bullish", 0.8), ("surge", 0.7), ("rally", 0.7), ("soar", 0.8), ("gain", 0.5),
            ("growth", 0.6), ("rise", 0.5), ("strong", 0.5), ("strengthen", 0.6), ("optimism", 0.6),
            ("optimistic", 0.6), ("hawkish", 0.6), ("hike", 0.4), ("beat", 0.6), ("upgrade", 0.6),
            ("recovery", 0.5), ("rebound", 0.5), ("record", 0.4), ("robust", 0.5),
            ("bearish", -0.8), ("crash", -0.9), ("plunge", -0.8), ("drop", -0.6), ("fall", -0.5),
            ("decline", -0.6), ("slide", -0.5), ("weak", -0.5), ("weaken", -0.6), ("dovish", -0.6),
            ("cut", -0.4), ("recession", -0.8), ("slowdown", -0.6), ("uncertainty", -0.5),
            ("concern", -0.5), ("fear", -0.6), ("crisis", -0.8), ("downgrade", -0.6), ("miss", -0.6),
        ]
        .into_iter()
        .collect();

        let negations = vec![
            "not", "no", "never", "neither", "nor", "cannot", "cant", "dont", "doesnt", "didnt",
            "wont", "isnt", "arent", "wasnt", "hardly", "barely",
        ];

        let intensifiers = [
            ("very", 1.5), ("extremely", 2.0), ("highly", 1.5), ("sharply", 1.7),
            ("significantly", 1.5), ("slightly", 0.5), ("somewhat", 0.7), ("marginally", 0.5),
        ]
        .into_iter()
        .collect();

        LexiconScorer {
            words,
            negations,
            intensifiers,
            threshold: 0.05,
        }
    }
}

impl LexiconScorer {
    fn word_score(&self, word: &str) -> Option<f64> {
        if let Some(score) = self.words.get(word) {
            return Some(*score);
        }
        ["s", "es", "ed", "ing"]
            .iter()
            .filter_map(|suffix| word.strip_suffix(suffix))
            .find_map(|stem| self.words.get(stem).copied())
    }

    pub fn compound(&self, text: &str) -> f64 {
        let tokens: Vec<String> = text
            .to_lowercase()
            .replace('\'', "")
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();

        let mut sum = 0.0;
        for (i, token) in tokens.iter().enumerate() {
            let Some(mut score) = self.word_score(token) else {
                continue;
            };

            if i > 0 {
                if let Some(boost) = self.intensifiers.get(tokens[i - 1].as_str()) {
                    score *= boost;
                }
            }

            let window = &tokens[i.saturating_sub(NEGATION_WINDOW)..i];
            if window
                .iter()
                .any(|t| self.negations.iter().any(|n| *n == t.as_str()))
            {
                score = -score;
            }
            sum += score;
        }

        sum / (sum * sum + NORMALIZATION_ALPHA).sqrt()
    }
}

impl SentimentProvider for LexiconScorer {
    fn assess(&self, item: &NewsItem) -> Sentiment {
        let compound = self.compound(&item.text());
        let label = if compound >= self.threshold {
            Label::Bullish
        } else if compound <= -self.threshold {
            Label::Bearish
        } else {
            Label::Neutral
        };
        Sentiment::new(label, compound.abs())
    }
}

/// Labels produced upstream by a trained or pretrained model and carried on the item.
pub struct ExternalLabels;

impl SentimentProvider for ExternalLabels {
    fn assess(&self, item: &NewsItem) -> Sentiment {
        match item.label.as_deref().map(str::parse::<Label>) {
            Some(Ok(label)) => Sentiment::new(label, item.confidence.unwrap_or(0.0)),
            Some(Err(err)) => {
                log::debug!("Ignoring external label: {}", err);
                Sentiment::neutral()
            }
            None => Sentiment::neutral(),
        }
    }
}
