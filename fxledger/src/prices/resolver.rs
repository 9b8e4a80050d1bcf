use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, Utc, Weekday};

use crate::errors::LedgerError;
use crate::oanda::{get_candles, ApiResult, OandaSettings};
use crate::pairs::{CurrencyPair, PairTable};
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub time: DateTime<Utc>,
    pub close: Option<f64>,
}

/// A historical price feed queried by instrument symbol over a time range.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_closes(
        &self,
        instrument: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ApiResult<Vec<PricePoint>>;
}

pub struct OandaPriceSource {
    client: reqwest::Client,
    settings: OandaSettings,
    granularity: String,
}

impl OandaPriceSource {
    pub fn new(settings: OandaSettings, granularity: &str) -> Self {
        OandaPriceSource {
            client: reqwest::Client::new(),
            settings,
            granularity: granularity.to_string(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        OandaPriceSource::new(settings.oanda.clone(), &settings.granularity)
    }
}

#[async_trait]
impl PriceSource for OandaPriceSource {
    async fn fetch_closes(
        &self,
        instrument: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ApiResult<Vec<PricePoint>> {
        let candles = get_candles(
            &self.client,
            instrument,
            &self.granularity,
            from,
            to,
            &self.settings,
        )
        .await?;

        Ok(candles
            .iter()
            .map(|candle| PricePoint {
                time: candle.time,
                close: candle.settled_close(),
            })
            .collect())
    }
}

// Saturday and Sunday fall back to Friday at the same time of day.
pub fn last_trading_instant(at: DateTime<Utc>) -> DateTime<Utc> {
    match at.weekday() {
        Weekday::Sat => at - Duration::days(1),
        Weekday::Sun => at - Duration::days(2),
        _ => at,
    }
}

// Point nearest to `target`; on equal distance the earlier point wins.
pub fn closest_close(points: &[PricePoint], target: DateTime<Utc>) -> Option<PricePoint> {
    points
        .iter()
        .min_by_key(|point| ((point.time - target).num_milliseconds().abs(), point.time))
        .copied()
}

/// Resolves a pair's close price near an instant. Never touches the cache.
pub struct PriceResolver<'a, S: PriceSource> {
    source: S,
    pairs: &'a PairTable,
}

impl<'a, S: PriceSource> PriceResolver<'a, S> {
    pub fn new(source: S, pairs: &'a PairTable) -> Self {
        PriceResolver { source, pairs }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn resolve(&self, pair: &CurrencyPair, at: DateTime<Utc>) -> Result<f64, LedgerError> {
        let instrument = self
            .pairs
            .instrument(pair)
            .ok_or_else(|| LedgerError::UnknownPair(pair.to_string()))?;

        let unavailable = || LedgerError::PriceUnavailable {
            pair: pair.to_string(),
            at,
        };

        let now = Utc::now();
        if at > now {
            log::debug!("{} at {} is in the future", pair, at.to_rfc3339());
            return Err(unavailable());
        }

        let target = last_trading_instant(at);
        let from = target - Duration::days(1);
        let to = (target + Duration::days(1)).min(now);

        log::debug!("Resolving {} ({}) near {}", pair, instrument, target.to_rfc3339());
        let points = match self.source.fetch_closes(instrument, from, to).await {
            Ok(points) => points,
            Err(err) => {
                log::warn!("Price lookup for {} at {} failed: {}", pair, at.to_rfc3339(), err);
                return Err(unavailable());
            }
        };

        match closest_close(&points, target).and_then(|point| point.close) {
            Some(close) if close.is_finite() && close > 0.0 => Ok(close),
            Some(close) => {
                log::warn!("Unusable close {} for {} at {}", close, pair, at.to_rfc3339());
                Err(unavailable())
            }
            None => {
                log::warn!("No price data for {} around {}", pair, target.to_rfc3339());
                Err(unavailable())
            }
        }
    }
}
