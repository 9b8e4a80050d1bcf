use chrono::{DateTime, SecondsFormat, Timelike, Utc};

use crate::errors::LedgerError;
use crate::models::{Label, Sentiment, Signal};
use crate::pairs::CurrencyPair;
use crate::util::{format_fixed, format_optional, parse_optional, round_to};

pub const COLUMNS: [&str; 11] = [
    "timestamp",
    "pair",
    "title",
    "description",
    "label",
    "confidence",
    "signal",
    "entry_price",
    "exit_price",
    "return_pct",
    "cumulative_return",
];

pub const PRICE_PLACES: usize = 6;
pub const RETURN_PLACES: usize = 4;
pub const CONFIDENCE_PLACES: usize = 4;

/// One ledger row.
///
/// Prices and returns are `None` until the returns engine resolves them. Every
/// numeric field already holds the value it will be persisted as, so a record
/// read back from disk compares equal to the one that was written.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalRecord {
    pub timestamp: DateTime<Utc>,
    pub pair: CurrencyPair,
    pub title: String,
    pub description: String,
    pub label: Label,
    pub confidence: f64,
    pub signal: Signal,
    pub entry_price: Option<f64>,
    pub exit_price: Option<f64>,
    pub return_pct: Option<f64>,
    pub cumulative_return: Option<f64>,
}

impl SignalRecord {
    pub fn new(
        timestamp: DateTime<Utc>,
        pair: CurrencyPair,
        title: &str,
        description: &str,
        sentiment: Sentiment,
        signal: Signal,
    ) -> Self {
        SignalRecord {
            timestamp: timestamp.with_nanosecond(0).unwrap_or(timestamp),
            pair,
            title: title.to_string(),
            description: description.to_string(),
            label: sentiment.label,
            confidence: round_to(sentiment.confidence, CONFIDENCE_PLACES as i32),
            signal,
            entry_price: None,
            exit_price: None,
            return_pct: None,
            cumulative_return: None,
        }
    }

    // Only qualifying rows ever contribute to the cumulative return
    pub fn qualifies(&self, conf_threshold: f64) -> bool {
        self.confidence >= conf_threshold && self.label.is_directional()
    }

    pub fn is_priced(&self) -> bool {
        self.entry_price.is_some() && self.exit_price.is_some()
    }

    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.pair.to_string(),
            self.title.clone(),
            self.description.clone(),
            self.label.to_string(),
            format_fixed(self.confidence, CONFIDENCE_PLACES),
            self.signal.to_string(),
            format_optional(self.entry_price, PRICE_PLACES),
            format_optional(self.exit_price, PRICE_PLACES),
            format_optional(self.return_pct, RETURN_PLACES),
            format_optional(self.cumulative_return, RETURN_PLACES),
        ]
    }

    pub fn from_row(fields: &csv::StringRecord, line: u64) -> Result<Self, LedgerError> {
        let malformed = |reason: String| LedgerError::MalformedLedgerRow { line, reason };

        if fields.len() != COLUMNS.len() {
            return Err(malformed(format!(
                "expected {} fields, found {}",
                COLUMNS.len(),
                fields.len()
            )));
        }

        let timestamp = DateTime::parse_from_rfc3339(fields[0].trim())
            .map_err(|e| malformed(format!("bad timestamp '{}': {}", &fields[0], e)))?
            .with_timezone(&Utc);
        let pair = fields[1]
            .parse::<CurrencyPair>()
            .map_err(|e| malformed(e.to_string()))?;
        let label = fields[4].parse::<Label>().map_err(malformed)?;
        let confidence = fields[5]
            .trim()
            .parse::<f64>()
            .map_err(|e| malformed(format!("bad confidence '{}': {}", &fields[5], e)))?;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(malformed(format!("confidence {} outside [0, 1]", confidence)));
        }
        let signal = fields[6].parse::<Signal>().map_err(malformed)?;

        let optional = |index: usize| {
            parse_optional(&fields[index])
                .map_err(|e| malformed(format!("bad {} '{}': {}", COLUMNS[index], &fields[index], e)))
        };

        Ok(SignalRecord {
            timestamp,
            pair,
            title: fields[2].to_string(),
            description: fields[3].to_string(),
            label,
            confidence,
            signal,
            entry_price: optional(7)?,
            exit_price: optional(8)?,
            return_pct: optional(9)?,
            cumulative_return: optional(10)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record() -> SignalRecord {
        SignalRecord::new(
            Utc.with_ymd_and_hms(2024, 3, 4, 9, 30, 0).unwrap(),
            CurrencyPair::new("EUR", "USD"),
            "EUR rallies, ECB hawkish",
            "Rates \"higher for longer\"",
            Sentiment::new(Label::Bullish, 0.912345),
            Signal::Long,
        )
    }

    #[test]
    fn unpriced_row_uses_empty_strings() {
        let row = record().to_row();
        assert_eq!(row[0], "2024-03-04T09:30:00Z");
        assert_eq!(row[1], "EUR/USD");
        assert_eq!(row[4], "bullish");
        assert_eq!(row[5], "0.9123");
        assert_eq!(row[6], "LONG");
        assert!(row[7..].iter().all(String::is_empty));
    }

    #[test]
    fn parsed_row_matches_written_record() {
        let mut written = record();
        written.entry_price = Some(1.1);
        written.exit_price = Some(1.105);
        written.return_pct = Some(0.4545);
        written.cumulative_return = Some(2.4545);

        let fields = csv::StringRecord::from(written.to_row());
        let parsed = SignalRecord::from_row(&fields, 2).unwrap();
        assert_eq!(parsed, written);
    }

    #[test]
    fn legacy_vocabulary_is_accepted() {
        let fields = csv::StringRecord::from(vec![
            "2024-03-04T09:30:00+00:00", "USD/JPY", "t", "d", "negative", "0.85", "SHORT", "", "", "", "",
        ]);
        let parsed = SignalRecord::from_row(&fields, 3).unwrap();
        assert_eq!(parsed.label, Label::Bearish);
        assert!(parsed.qualifies(0.75));
    }

    #[test]
    fn rejects_wrong_field_count_and_bad_values() {
        let short = csv::StringRecord::from(vec!["2024-03-04T09:30:00Z", "EUR/USD", "t"]);
        assert!(matches!(
            SignalRecord::from_row(&short, 5),
            Err(LedgerError::MalformedLedgerRow { line: 5, .. })
        ));

        let mut row = record().to_row();
        row[5] = "high".to_string();
        assert!(SignalRecord::from_row(&csv::StringRecord::from(row), 6).is_err());
    }

    #[test]
    fn qualification_needs_confidence_and_direction() {
        let mut r = record();
        assert!(r.qualifies(0.75));
        r.confidence = 0.5;
        assert!(!r.qualifies(0.75));
        r.confidence = 0.75;
        assert!(r.qualifies(0.75));
        r.label = Label::Neutral;
        assert!(!r.qualifies(0.75));
    }
}
