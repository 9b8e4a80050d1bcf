use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::errors::LedgerError;

/// A currency pair such as EUR/USD. Codes are stored upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CurrencyPair {
    pub base: String,
    pub quote: String,
}

impl CurrencyPair {
    pub fn new(base: &str, quote: &str) -> Self {
        CurrencyPair {
            base: base.to_uppercase(),
            quote: quote.to_uppercase(),
        }
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic())
}

impl FromStr for CurrencyPair {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, quote) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| LedgerError::Config(format!("'{}' is not a BASE/QUOTE pair", s)))?;

        if !is_currency_code(base) || !is_currency_code(quote) {
            return Err(LedgerError::Config(format!("'{}' is not a BASE/QUOTE pair", s)));
        }
        Ok(CurrencyPair::new(base, quote))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PairEntry {
    pub pair: String,
    pub instrument: String,
}

/// The single pair → price-source instrument table. Order is preserved, the
/// classifier walks pairs in table order.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "Vec<PairEntry>")]
pub struct PairTable {
    entries: Vec<(CurrencyPair, String)>,
}

impl PairTable {
    pub fn new(entries: Vec<(CurrencyPair, String)>) -> Result<Self, LedgerError> {
        for (i, (pair, instrument)) in entries.iter().enumerate() {
            if instrument.trim().is_empty() {
                return Err(LedgerError::Config(format!("{} has an empty instrument", pair)));
            }
            if entries[..i].iter().any(|(seen, _)| seen == pair) {
                return Err(LedgerError::Config(format!("{} appears twice in the pair table", pair)));
            }
        }
        Ok(PairTable { entries })
    }

    pub fn instrument(&self, pair: &CurrencyPair) -> Option<&str> {
        self.entries
            .iter()
            .find(|(p, _)| p == pair)
            .map(|(_, instrument)| instrument.as_str())
    }

    pub fn contains(&self, pair: &CurrencyPair) -> bool {
        self.instrument(pair).is_some()
    }

    pub fn pairs(&self) -> impl Iterator<Item = &CurrencyPair> {
        self.entries.iter().map(|(pair, _)| pair)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TryFrom<Vec<PairEntry>> for PairTable {
    type Error = LedgerError;

    fn try_from(raw: Vec<PairEntry>) -> Result<Self, Self::Error> {
        let entries = raw
            .into_iter()
            .map(|entry| Ok((entry.pair.parse::<CurrencyPair>()?, entry.instrument)))
            .collect::<Result<Vec<_>, LedgerError>>()?;
        PairTable::new(entries)
    }
}

// The seven majors, keyed to OANDA instrument names
impl Default for PairTable {
    fn default() -> Self {
        let entries = [
            ("EUR", "USD", "EUR_USD"),
            ("USD", "JPY", "USD_JPY"),
            ("GBP", "USD", "GBP_USD"),
            ("USD", "CHF", "USD_CHF"),
            ("AUD", "USD", "AUD_USD"),
            ("USD", "CAD", "USD_CAD"),
            ("NZD", "USD", "NZD_USD"),
        ]
        .iter()
        .map(|(base, quote, instrument)| (CurrencyPair::new(base, quote), instrument.to_string()))
        .collect();

        PairTable { entries }
    }
}
