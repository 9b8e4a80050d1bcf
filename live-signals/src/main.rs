use fxledger::ledger::LedgerWriter;
use fxledger::logging;
use fxledger::models::{SentimentProviders, SignalClassifier};
use fxledger::news::CsvNewsSource;
use fxledger::prices::{OandaPriceSource, PriceCache};
use fxledger::returns::ReturnsEngine;

use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_SETTINGS: &str = "settings.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Handle SIGINT
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let settings_path = env::args().nth(1).unwrap_or_else(|| DEFAULT_SETTINGS.to_string());
    let settings = fxledger::read_settings(&settings_path)?;

    logging::configure_logger(&settings.log_path)?;
    log::info!(
        "Loaded {} ({} pairs, threshold {}, hold {}h)",
        settings_path,
        settings.pairs.len(),
        settings.conf_threshold,
        settings.hold_period_hours
    );

    let classifier = SignalClassifier::new(&settings.pairs, SentimentProviders::from_settings(&settings));
    let news = CsvNewsSource::new(&settings.news_path);
    let mut engine = ReturnsEngine::new(
        &settings,
        OandaPriceSource::from_settings(&settings),
        PriceCache::open(&settings.cache_path)?,
        LedgerWriter::new(&settings.ledger_path, &settings.quarantine_path),
    );

    while running.load(Ordering::SeqCst) {
        let items = news.fetch()?;
        let latest = engine.ledger().latest_timestamp()?;

        // Only the most recent items are considered on each poll
        let skip = items.len().saturating_sub(settings.news_limit);
        let fresh: Vec<_> = items
            .into_iter()
            .skip(skip)
            .filter(|item| latest.map_or(true, |latest| item.published_at > latest))
            .collect();
        log::info!("{} new FX headline(s) since {:?}", fresh.len(), latest);

        let batch: Vec<_> = fresh.iter().flat_map(|item| classifier.records(item)).collect();
        for record in &batch {
            log::debug!(
                "{} {} {} ({:.2}) {}",
                record.pair,
                record.signal,
                record.label,
                record.confidence,
                record.title
            );
        }

        let summary = engine.append_batch(batch).await?;
        log::info!("Iteration complete: {}", summary);

        log::info!("Sleeping for {}s...", settings.loop_interval_secs);
        for _ in 0..settings.loop_interval_secs {
            if !running.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    log::info!("Shutting down");
    Ok(())
}
