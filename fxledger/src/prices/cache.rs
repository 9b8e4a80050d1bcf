use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;

use crate::errors::LedgerError;
use crate::ledger::PRICE_PLACES;
use crate::pairs::CurrencyPair;
use crate::util::{format_fixed, open_csv_for_append, round_to};

const HEADER: [&str; 3] = ["pair", "date", "price"];

#[derive(Debug, Deserialize)]
struct CacheRow {
    pair: String,
    date: NaiveDate,
    price: f64,
}

/// Durable, write-once `(pair, date) -> price` store backed by a CSV file.
///
/// Entries are loaded once and every new entry is appended and flushed right
/// away. Misses are only remembered for the lifetime of the value.
pub struct PriceCache {
    path: PathBuf,
    prices: HashMap<(CurrencyPair, NaiveDate), f64>,
    missing: HashSet<(CurrencyPair, NaiveDate)>,
}

impl PriceCache {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LedgerError> {
        let mut cache = PriceCache {
            path: path.as_ref().to_path_buf(),
            prices: HashMap::new(),
            missing: HashSet::new(),
        };
        if !cache.path.exists() {
            return Ok(cache);
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&cache.path)?;

        for (i, result) in reader.deserialize::<CacheRow>().enumerate() {
            let row = match result {
                Ok(row) => row,
                Err(err) if err.is_io_error() => return Err(err.into()),
                Err(err) => {
                    log::warn!("Skipping price cache line {}: {}", i + 2, err);
                    continue;
                }
            };
            let pair = match row.pair.parse::<CurrencyPair>() {
                Ok(pair) => pair,
                Err(err) => {
                    log::warn!("Skipping price cache line {}: {}", i + 2, err);
                    continue;
                }
            };
            if !row.price.is_finite() || row.price <= 0.0 {
                log::warn!("Skipping price cache line {}: bad price {}", i + 2, row.price);
                continue;
            }
            // First value wins, same as put
            cache
                .prices
                .entry((pair, row.date))
                .or_insert(round_to(row.price, PRICE_PLACES as i32));
        }

        log::debug!("Loaded {} cached prices from {}", cache.len(), cache.path.display());
        Ok(cache)
    }

    pub fn get(&self, pair: &CurrencyPair, date: NaiveDate) -> Option<f64> {
        self.prices.get(&(pair.clone(), date)).copied()
    }

    // Returns false when the key already had a price; the stored value is kept.
    pub fn put(&mut self, pair: &CurrencyPair, date: NaiveDate, price: f64) -> Result<bool, LedgerError> {
        let key = (pair.clone(), date);
        if self.prices.contains_key(&key) {
            return Ok(false);
        }

        let price = round_to(price, PRICE_PLACES as i32);
        let (mut writer, is_new) = open_csv_for_append(&self.path)?;
        if is_new {
            writer.write_record(HEADER)?;
        }
        writer.write_record([
            pair.to_string(),
            date.format("%Y-%m-%d").to_string(),
            format_fixed(price, PRICE_PLACES),
        ])?;
        writer.flush()?;

        self.missing.remove(&key);
        self.prices.insert(key, price);
        Ok(true)
    }

    pub fn mark_missing(&mut self, pair: &CurrencyPair, date: NaiveDate) {
        self.missing.insert((pair.clone(), date));
    }

    pub fn is_known_missing(&self, pair: &CurrencyPair, date: NaiveDate) -> bool {
        self.missing.contains(&(pair.clone(), date))
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}
