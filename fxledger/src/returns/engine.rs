use std::fmt;

use chrono::{DateTime, Utc};

use crate::errors::LedgerError;
use crate::ledger::{LedgerWriter, SignalRecord, PRICE_PLACES, RETURN_PLACES};
use crate::models::Signal;
use crate::pairs::CurrencyPair;
use crate::prices::{PriceCache, PriceResolver, PriceSource};
use crate::returns::cumulative;
use crate::settings::Settings;
use crate::util::round_to;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub appended: usize,
    pub repaired: usize,
    pub zero_priced: usize,
    pub unknown_pair: usize,
    pub quarantined: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "appended={} repaired={} zero_priced={} unknown_pair={} quarantined={}",
            self.appended, self.repaired, self.zero_priced, self.unknown_pair, self.quarantined
        )
    }
}

/// Percentage return of a position held from `entry` to `exit`. SHORT takes
/// the negated move, NEUTRAL takes nothing.
pub fn realized_return(signal: Signal, entry: f64, exit: f64) -> f64 {
    if entry == 0.0 || !entry.is_finite() || !exit.is_finite() {
        return 0.0;
    }
    round_to(
        signal.direction() * (exit - entry) / entry * 100.0,
        RETURN_PLACES as i32,
    )
}

fn record_return(record: &SignalRecord) -> f64 {
    match (record.entry_price, record.exit_price) {
        (Some(entry), Some(exit)) => realized_return(record.signal, entry, exit),
        _ => 0.0,
    }
}

pub struct ReturnsEngine<'a, S: PriceSource> {
    settings: &'a Settings,
    resolver: PriceResolver<'a, S>,
    cache: PriceCache,
    ledger: LedgerWriter,
}

impl<'a, S: PriceSource> ReturnsEngine<'a, S> {
    pub fn new(settings: &'a Settings, source: S, cache: PriceCache, ledger: LedgerWriter) -> Self {
        ReturnsEngine {
            settings,
            resolver: PriceResolver::new(source, &settings.pairs),
            cache,
            ledger,
        }
    }

    pub fn ledger(&mut self) -> &mut LedgerWriter {
        &mut self.ledger
    }

    pub fn cache(&self) -> &PriceCache {
        &self.cache
    }

    pub fn resolver(&self) -> &PriceResolver<'a, S> {
        &self.resolver
    }

    // cache -> resolver -> cache. Only closed days are written to the cache.
    async fn price_at(&mut self, pair: &CurrencyPair, at: DateTime<Utc>) -> Result<f64, LedgerError> {
        let date = at.date_naive();
        if let Some(price) = self.cache.get(pair, date) {
            log::trace!("Cache hit for {} on {}", pair, date);
            return Ok(round_to(price, PRICE_PLACES as i32));
        }
        if self.cache.is_known_missing(pair, date) {
            return Err(LedgerError::PriceUnavailable {
                pair: pair.to_string(),
                at,
            });
        }

        let closed = date < Utc::now().date_naive();
        match self.resolver.resolve(pair, at).await {
            Ok(price) => {
                if closed {
                    self.cache.put(pair, date, price)?;
                }
                Ok(round_to(price, PRICE_PLACES as i32))
            }
            Err(err @ LedgerError::PriceUnavailable { .. }) => {
                if closed {
                    self.cache.mark_missing(pair, date);
                }
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    // Fills whichever of entry/exit is missing. A recoverable miss is handed back
    // in Ok so the caller can still keep the price that was found.
    async fn fill_prices(&mut self, record: &mut SignalRecord) -> Result<Option<LedgerError>, LedgerError> {
        let mut miss = None;

        if record.entry_price.is_none() {
            match self.price_at(&record.pair, record.timestamp).await {
                Ok(price) => record.entry_price = Some(price),
                Err(err) if err.is_recoverable() => miss = Some(err),
                Err(err) => return Err(err),
            }
        }

        if let Some(LedgerError::UnknownPair(_)) = miss {
            return Ok(miss);
        }

        if record.exit_price.is_none() {
            let exit_at = record.timestamp + self.settings.hold_period();
            match self.price_at(&record.pair, exit_at).await {
                Ok(price) => record.exit_price = Some(price),
                Err(err) if err.is_recoverable() => {
                    if miss.is_none() {
                        miss = Some(err);
                    }
                }
                Err(err) => return Err(err),
            }
        }

        Ok(miss)
    }

    fn tally_miss(summary: &mut RunSummary, record: &SignalRecord, miss: &LedgerError) {
        log::warn!(
            "{} {} signal at {} left unpriced: {}",
            record.pair,
            record.signal,
            record.timestamp.to_rfc3339(),
            miss
        );
        match miss {
            LedgerError::UnknownPair(_) => summary.unknown_pair += 1,
            _ => summary.zero_priced += 1,
        }
    }

    /// Prices and appends a batch of freshly classified records.
    ///
    /// The batch is sorted by timestamp first. The starting total is folded from
    /// the persisted ledger rather than read off its last row.
    pub async fn append_batch(&mut self, mut batch: Vec<SignalRecord>) -> Result<RunSummary, LedgerError> {
        let mut summary = RunSummary::default();
        if batch.is_empty() {
            return Ok(summary);
        }
        batch.sort_by_key(|record| record.timestamp);

        let loaded = self.ledger.load_all()?;
        if !loaded.quarantined.is_empty() {
            log::warn!(
                "Ledger has {} malformed row(s); run backfill to set them aside",
                loaded.quarantined.len()
            );
        }
        let threshold = self.settings.conf_threshold;
        let mut previous = cumulative::total(&loaded.records, threshold);
        log::info!(
            "Appending {} record(s) to a ledger of {} (total return {:.4})",
            batch.len(),
            loaded.records.len(),
            previous
        );

        for mut record in batch {
            let return_pct = if record.qualifies(threshold) {
                if let Some(miss) = self.fill_prices(&mut record).await? {
                    Self::tally_miss(&mut summary, &record, &miss);
                }
                record_return(&record)
            } else {
                0.0
            };

            record.return_pct = Some(return_pct);
            previous = round_to(previous + return_pct, RETURN_PLACES as i32);
            record.cumulative_return = Some(previous);

            self.ledger.append(&record)?;
            summary.appended += 1;
        }

        log::info!("Append finished: {}", summary);
        Ok(summary)
    }

    /// Repairs the whole ledger in place.
    ///
    /// Only qualifying rows are priced. A row whose entry, exit and return are
    /// all set is left alone; the cumulative column is always re-derived.
    /// Running it again with the same price data produces the same file.
    pub async fn backfill(&mut self) -> Result<RunSummary, LedgerError> {
        let mut summary = RunSummary::default();
        let loaded = self.ledger.load_all()?;
        let mut records = loaded.records;
        let threshold = self.settings.conf_threshold;
        log::info!("Backfilling {} ledger row(s)...", records.len());

        for record in records.iter_mut() {
            if !record.qualifies(threshold) {
                if record.return_pct != Some(0.0) {
                    record.return_pct = Some(0.0);
                    summary.repaired += 1;
                }
                continue;
            }

            let complete = record.is_priced() && record.return_pct.is_some();
            if complete {
                continue;
            }

            let before = (record.entry_price, record.exit_price);
            let miss = self.fill_prices(record).await?;
            let dirty = before != (record.entry_price, record.exit_price);

            if dirty || record.return_pct.is_none() {
                record.return_pct = Some(record_return(record));
                summary.repaired += 1;
            }
            if let Some(miss) = miss {
                Self::tally_miss(&mut summary, record, &miss);
            }
        }

        cumulative::apply(&mut records, threshold);

        summary.quarantined = loaded.quarantined.len();
        self.ledger.quarantine(&loaded.quarantined)?;
        self.ledger.replace_all(&records)?;

        log::info!("Backfill finished: {}", summary);
        Ok(summary)
    }
}
