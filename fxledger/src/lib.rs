pub mod errors;
pub mod logging;
pub mod util;
pub mod settings;
pub mod pairs;
pub mod news;
pub mod stats;

pub mod oanda;
pub mod models;
pub mod prices;
pub mod ledger;
pub mod returns;

pub use errors::LedgerError;
pub use pairs::{CurrencyPair, PairTable};
pub use settings::{read_settings, Settings};
