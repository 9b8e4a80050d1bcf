use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use fxledger::ledger::{LedgerWriter, SignalRecord};
use fxledger::models::{KeywordPolarity, Label, Sentiment, Signal, SignalClassifier};
use fxledger::news::NewsItem;
use fxledger::oanda::ApiResult;
use fxledger::prices::{PriceCache, PricePoint, PriceSource};
use fxledger::returns::{cumulative, ReturnsEngine};
use fxledger::{CurrencyPair, Settings};

#[derive(Default, Clone)]
struct StaticSource {
    points: HashMap<String, Vec<PricePoint>>,
}

impl StaticSource {
    fn close(mut self, instrument: &str, day: u32, close: f64) -> Self {
        self.points.entry(instrument.to_string()).or_default().push(PricePoint {
            time: Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0).unwrap(),
            close: Some(close),
        });
        self
    }
}

#[async_trait]
impl PriceSource for StaticSource {
    async fn fetch_closes(
        &self,
        instrument: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ApiResult<Vec<PricePoint>> {
        Ok(self
            .points
            .get(instrument)
            .map(|points| {
                points
                    .iter()
                    .filter(|p| p.time >= from && p.time <= to)
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }
}

fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, minute, 0).unwrap()
}

struct Workspace {
    _dir: tempfile::TempDir,
    ledger_path: PathBuf,
    quarantine_path: PathBuf,
    cache_path: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        Workspace {
            ledger_path: dir.path().join("data/live_signals_log.csv"),
            quarantine_path: dir.path().join("data/quarantined_rows.csv"),
            cache_path: dir.path().join("data/price_cache.csv"),
            _dir: dir,
        }
    }

    fn engine<'a>(&self, settings: &'a Settings, source: StaticSource) -> ReturnsEngine<'a, StaticSource> {
        ReturnsEngine::new(
            settings,
            source,
            PriceCache::open(&self.cache_path).unwrap(),
            LedgerWriter::new(&self.ledger_path, &self.quarantine_path),
        )
    }
}

fn base_prices() -> StaticSource {
    StaticSource::default()
        .close("EUR_USD", 4, 1.1)
        .close("EUR_USD", 5, 1.105)
        .close("EUR_USD", 6, 1.1)
        .close("USD_JPY", 5, 150.0)
        .close("USD_JPY", 6, 151.5)
}

#[tokio::test]
async fn append_then_backfill_is_idempotent() {
    let workspace = Workspace::new();
    let settings = Settings::default();
    let classifier = SignalClassifier::new(&settings.pairs, KeywordPolarity::default());

    let news = vec![
        NewsItem::new("JPY weak after BoJ", "Yields stay pinned", at(5, 9, 30)),
        NewsItem::new("EUR rally on hawkish ECB", "", at(4, 9, 30)),
        NewsItem::new("EUR rally extends", "", at(6, 9, 30)),
    ];
    let mut batch: Vec<SignalRecord> = news.iter().flat_map(|item| classifier.records(item)).collect();
    batch.push(SignalRecord::new(
        at(5, 12, 0),
        CurrencyPair::new("EUR", "USD"),
        "EUR outlook",
        "",
        Sentiment::new(Label::Bullish, 0.5),
        Signal::Long,
    ));
    assert_eq!(batch.len(), 4);

    let mut engine = workspace.engine(&settings, base_prices());
    let summary = engine.append_batch(batch).await.unwrap();
    assert_eq!(summary.appended, 4);
    // The 6 March exit (7 March close) is not in the feed yet
    assert_eq!(summary.zero_priced, 1);

    let records = engine.ledger().load_all().unwrap().records;
    let returns: Vec<Option<f64>> = records.iter().map(|r| r.return_pct).collect();
    assert_eq!(returns, vec![Some(0.4545), Some(1.0), Some(0.0), Some(0.0)]);
    assert_eq!(records[1].pair, CurrencyPair::new("USD", "JPY"));
    assert_eq!(records[1].signal, Signal::Long);
    assert_eq!(records[3].entry_price, Some(1.1));
    assert_eq!(records[3].exit_price, None);
    assert_eq!(records[3].cumulative_return, Some(1.4545));

    // A torn row from some other writer
    {
        let mut file = std::fs::OpenOptions::new().append(true).open(&workspace.ledger_path).unwrap();
        writeln!(file, "2024-03-06T10:00:00Z,EUR/USD,torn").unwrap();
    }

    let prices = base_prices().close("EUR_USD", 7, 1.111);
    let mut engine = workspace.engine(&settings, prices.clone());
    let summary = engine.backfill().await.unwrap();
    assert_eq!(summary.quarantined, 1);
    assert_eq!(summary.repaired, 1);
    let first = std::fs::read(&workspace.ledger_path).unwrap();

    let records = engine.ledger().load_all().unwrap().records;
    assert_eq!(records.len(), 4);
    assert_eq!(records[3].exit_price, Some(1.111));
    assert_eq!(records[3].return_pct, Some(1.0));

    let expected = cumulative::running_totals(&records, settings.conf_threshold);
    let actual: Vec<f64> = records.iter().map(|r| r.cumulative_return.unwrap()).collect();
    assert_eq!(actual, expected);
    assert_eq!(actual.last(), Some(&2.4545));

    let quarantine = std::fs::read_to_string(&workspace.quarantine_path).unwrap();
    assert!(quarantine.contains("torn"));
    assert!(!String::from_utf8(first.clone()).unwrap().contains("torn"));

    let mut engine = workspace.engine(&settings, prices);
    let summary = engine.backfill().await.unwrap();
    assert_eq!(summary.quarantined, 0);
    assert_eq!(summary.repaired, 0);
    assert_eq!(std::fs::read(&workspace.ledger_path).unwrap(), first);
}

#[tokio::test]
async fn cached_prices_survive_restarts() {
    let workspace = Workspace::new();
    let settings = Settings::default();
    let record = SignalRecord::new(
        at(4, 9, 30),
        CurrencyPair::new("EUR", "USD"),
        "EUR rally",
        "",
        Sentiment::new(Label::Bullish, 0.9),
        Signal::Long,
    );

    let mut engine = workspace.engine(&settings, base_prices());
    engine.append_batch(vec![record.clone()]).await.unwrap();

    // No feed at all, so every price must come from the cache file
    let mut engine = workspace.engine(&settings, StaticSource::default());
    let mut later = record;
    later.timestamp = at(4, 15, 0);
    engine.append_batch(vec![later]).await.unwrap();

    let records = engine.ledger().load_all().unwrap().records;
    assert_eq!(records[1].entry_price, Some(1.1));
    assert_eq!(records[1].exit_price, Some(1.105));
    assert_eq!(records[1].cumulative_return, Some(0.909));
}
