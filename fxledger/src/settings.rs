use serde::Deserialize;

use crate::errors::LedgerError;
use crate::oanda::OandaSettings;
use crate::pairs::PairTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Keyword,
    Lexicon,
    External,
}

impl Default for ProviderKind {
    fn default() -> Self {
        ProviderKind::Keyword
    }
}

fn default_conf_threshold() -> f64 {
    0.75
}

fn default_hold_period_hours() -> i64 {
    24
}

fn default_ledger_path() -> String {
    "data/live_signals_log.csv".to_string()
}

fn default_cache_path() -> String {
    "data/price_cache.csv".to_string()
}

fn default_quarantine_path() -> String {
    "data/quarantined_rows.csv".to_string()
}

fn default_news_path() -> String {
    "data/cleaned_fx_news.csv".to_string()
}

fn default_log_path() -> String {
    "logs/fx-signals.log".to_string()
}

fn default_loop_interval_secs() -> u64 {
    600
}

fn default_news_limit() -> usize {
    100
}

fn default_granularity() -> String {
    "D".to_string()
}

/// Everything a run needs, loaded once and shared by reference.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Minimum confidence for a signal to qualify for return computation.
    #[serde(default = "default_conf_threshold")]
    pub conf_threshold: f64,
    /// Offset from entry to exit.
    #[serde(default = "default_hold_period_hours")]
    pub hold_period_hours: i64,
    #[serde(default)]
    pub pairs: PairTable,
    #[serde(default)]
    pub sentiment_provider: ProviderKind,

    #[serde(default = "default_ledger_path")]
    pub ledger_path: String,
    #[serde(default = "default_cache_path")]
    pub cache_path: String,
    #[serde(default = "default_quarantine_path")]
    pub quarantine_path: String,
    #[serde(default = "default_news_path")]
    pub news_path: String,
    #[serde(default = "default_log_path")]
    pub log_path: String,

    #[serde(default = "default_loop_interval_secs")]
    pub loop_interval_secs: u64,
    #[serde(default = "default_news_limit")]
    pub news_limit: usize,

    #[serde(default = "default_granularity")]
    pub granularity: String,
    #[serde(default)]
    pub oanda: OandaSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            conf_threshold: default_conf_threshold(),
            hold_period_hours: default_hold_period_hours(),
            pairs: PairTable::default(),
            sentiment_provider: ProviderKind::default(),
            ledger_path: default_ledger_path(),
            cache_path: default_cache_path(),
            quarantine_path: default_quarantine_path(),
            news_path: default_news_path(),
            log_path: default_log_path(),
            loop_interval_secs: default_loop_interval_secs(),
            news_limit: default_news_limit(),
            granularity: default_granularity(),
            oanda: OandaSettings::default(),
        }
    }
}

impl Settings {
    pub fn hold_period(&self) -> chrono::Duration {
        chrono::Duration::hours(self.hold_period_hours)
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if !(0.0..=1.0).contains(&self.conf_threshold) {
            return Err(LedgerError::Config(format!(
                "conf_threshold must be within [0, 1], got {}",
                self.conf_threshold
            )));
        }
        if self.hold_period_hours <= 0 {
            return Err(LedgerError::Config(format!(
                "hold_period_hours must be positive, got {}",
                self.hold_period_hours
            )));
        }
        if self.pairs.is_empty() {
            return Err(LedgerError::Config("pair table is empty".to_string()));
        }
        Ok(())
    }
}

pub fn parse_settings(json: &str) -> Result<Settings, LedgerError> {
    let settings: Settings = serde_json::from_str(json)
        .map_err(|e| LedgerError::Config(format!("invalid settings: {}", e)))?;
    settings.validate()?;
    Ok(settings)
}

pub fn read_settings(path: &str) -> Result<Settings, LedgerError> {
    let settings = std::fs::read_to_string(path)
        .map_err(|e| LedgerError::Config(format!("cannot read {}: {}", path, e)))?;
    parse_settings(&settings)
}
