use chrono::{DateTime, Utc};

// Per-record kinds (UnknownPair, PriceUnavailable) are recovered by the engine as a
// zero-return outcome. MalformedLedgerRow is isolated to its row. LedgerIo and Config abort the run.
#[derive(Debug)]
pub enum LedgerError {
    UnknownPair(String),
    PriceUnavailable { pair: String, at: DateTime<Utc> },
    MalformedLedgerRow { line: u64, reason: String },
    LedgerIo(std::io::Error),
    Config(String),
}

impl LedgerError {
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LedgerError::UnknownPair(_) | LedgerError::PriceUnavailable { .. }
        )
    }
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            LedgerError::UnknownPair(pair) => write!(f, "UnknownPair: {} is not in the pair table", pair),
            LedgerError::PriceUnavailable { pair, at } => {
                write!(f, "PriceUnavailable: no usable price for {} at {}", pair, at.to_rfc3339())
            }
            LedgerError::MalformedLedgerRow { line, reason } => {
                write!(f, "MalformedLedgerRow: line {}: {}", line, reason)
            }
            LedgerError::LedgerIo(err) => write!(f, "LedgerIOFailure: {}", err),
            LedgerError::Config(msg) => write!(f, "ConfigError: {}", msg),
        }
    }
}

impl std::error::Error for LedgerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LedgerError::LedgerIo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::LedgerIo(err)
    }
}

impl From<csv::Error> for LedgerError {
    fn from(err: csv::Error) -> Self {
        match err.into_kind() {
            csv::ErrorKind::Io(io_err) => LedgerError::LedgerIo(io_err),
            kind => LedgerError::LedgerIo(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("{:?}", kind),
            )),
        }
    }
}
