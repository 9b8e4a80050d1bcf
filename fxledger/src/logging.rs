use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::filter::threshold::ThresholdFilter;

use crate::errors::LedgerError;

const PATTERN: &str = "[{d(%Y-%m-%d %H:%M:%S%.3f)}][{l}] {m}{n}";

// Console gets INFO and above, the log file gets everything from DEBUG.
pub fn configure_logger(path: &str) -> Result<(), LedgerError> {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build();

    let file = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build(path)?;

    let config = Config::builder()
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Info)))
                .build("stdout", Box::new(stdout)),
        )
        .appender(Appender::builder().build("file", Box::new(file)))
        .build(
            Root::builder()
                .appender("stdout")
                .appender("file")
                .build(LevelFilter::Debug),
        )
        .map_err(|e| LedgerError::Config(format!("invalid logger config: {}", e)))?;

    log4rs::init_config(config)
        .map_err(|e| LedgerError::Config(format!("logger already initialised: {}", e)))?;
    Ok(())
}
