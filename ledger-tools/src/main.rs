use fxledger::ledger::LedgerWriter;
use fxledger::logging;
use fxledger::models::{SentimentProviders, SignalClassifier};
use fxledger::news::CsvNewsSource;
use fxledger::prices::{OandaPriceSource, PriceCache};
use fxledger::returns::ReturnsEngine;
use fxledger::stats::LedgerStats;
use fxledger::Settings;

use anyhow::bail;
use std::env;

const DEFAULT_SETTINGS: &str = "settings.json";

fn usage(program: &str) -> String {
    format!(
        "Usage: {} <backfill|report|classify> [settings.json] [report.csv]",
        program
    )
}

async fn backfill(settings: &Settings) -> anyhow::Result<()> {
    let mut engine = ReturnsEngine::new(
        settings,
        OandaPriceSource::from_settings(settings),
        PriceCache::open(&settings.cache_path)?,
        LedgerWriter::new(&settings.ledger_path, &settings.quarantine_path),
    );
    let summary = engine.backfill().await?;
    println!("{}", summary);
    Ok(())
}

fn report(settings: &Settings, output: Option<&str>) -> anyhow::Result<()> {
    let mut ledger = LedgerWriter::new(&settings.ledger_path, &settings.quarantine_path);
    let loaded = ledger.load_all()?;
    if !loaded.quarantined.is_empty() {
        log::warn!("{} malformed row(s) excluded from the report", loaded.quarantined.len());
    }

    let stats = LedgerStats::summarize(&loaded.records, settings.conf_threshold);
    print!("{}", stats);

    if let Some(output) = output {
        stats.save_report(output)?;
        log::info!("Report saved to {}", output);
    }
    Ok(())
}

// Dry run of the classifier over the news file. Nothing is written.
fn classify(settings: &Settings) -> anyhow::Result<()> {
    let classifier = SignalClassifier::new(&settings.pairs, SentimentProviders::from_settings(settings));
    let items = CsvNewsSource::new(&settings.news_path).fetch()?;

    let mut count = 0;
    for item in &items {
        for signal in classifier.classify(item) {
            println!(
                "{} {:<8} {:<8} {:<7} {:.4} {}",
                item.published_at.to_rfc3339(),
                signal.pair.to_string(),
                signal.signal,
                signal.sentiment.label,
                signal.sentiment.confidence,
                item.title
            );
            count += 1;
        }
    }
    log::info!("{} signal(s) from {} headline(s)", count, items.len());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!(usage(&args[0]));
    }

    let settings_path = args.get(2).map(String::as_str).unwrap_or(DEFAULT_SETTINGS);
    let settings = fxledger::read_settings(settings_path)?;
    logging::configure_logger(&settings.log_path)?;

    match args[1].as_str() {
        "backfill" => backfill(&settings).await,
        "report" => report(&settings, args.get(3).map(String::as_str)),
        "classify" => classify(&settings),
        other => bail!("Unknown command: {}\n{}", other, usage(&args[0])),
    }
}
