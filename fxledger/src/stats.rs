use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::errors::LedgerError;
use crate::ledger::SignalRecord;
use crate::models::Label;

const TRADING_DAYS: f64 = 252.0;

/// Summary of a ledger's signal counts and the performance of its qualifying trades.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerStats {
    pub total_rows: usize,
    pub confident_rows: usize,
    pub directional_rows: usize,
    pub qualifying_rows: usize,
    pub priced_rows: usize,
    pub labels: BTreeMap<String, usize>,

    // Computed over qualifying priced rows only
    pub total_return: f64,
    pub mean_return: f64,
    pub win_rate: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
}

fn sharpe_ratio(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std = variance.sqrt();
    if std == 0.0 || !std.is_finite() {
        return 0.0;
    }
    mean / std * TRADING_DAYS.sqrt()
}

// Largest peak-to-trough fall of the running total, in return points.
fn max_drawdown(returns: &[f64]) -> f64 {
    let mut running = 0.0;
    let mut peak = 0.0;
    let mut max_drawdown = 0.0;
    for r in returns {
        running += r;
        if running > peak {
            peak = running;
        }
        let drawdown = peak - running;
        if drawdown > max_drawdown {
            max_drawdown = drawdown;
        }
    }
    max_drawdown
}

impl LedgerStats {
    pub fn summarize(records: &[SignalRecord], conf_threshold: f64) -> Self {
        let mut labels: BTreeMap<String, usize> = [Label::Bullish, Label::Bearish, Label::Neutral]
            .iter()
            .map(|label| (label.to_string(), 0))
            .collect();
        for record in records {
            *labels.entry(record.label.to_string()).or_default() += 1;
        }

        let returns: Vec<f64> = records
            .iter()
            .filter(|record| record.qualifies(conf_threshold) && record.is_priced())
            .filter_map(|record| record.return_pct)
            .collect();

        let total_return: f64 = returns.iter().sum();
        let (mean_return, win_rate) = if returns.is_empty() {
            (0.0, 0.0)
        } else {
            let n = returns.len() as f64;
            let wins = returns.iter().filter(|r| **r > 0.0).count() as f64;
            (total_return / n, wins / n)
        };

        LedgerStats {
            total_rows: records.len(),
            confident_rows: records.iter().filter(|r| r.confidence >= conf_threshold).count(),
            directional_rows: records.iter().filter(|r| r.label.is_directional()).count(),
            qualifying_rows: records.iter().filter(|r| r.qualifies(conf_threshold)).count(),
            priced_rows: returns.len(),
            labels,
            total_return,
            mean_return,
            win_rate,
            sharpe_ratio: sharpe_ratio(&returns),
            max_drawdown: max_drawdown(&returns),
        }
    }

    fn metrics(&self) -> Vec<(String, String)> {
        let mut metrics = vec![
            ("total_rows".to_string(), self.total_rows.to_string()),
            ("confident_rows".to_string(), self.confident_rows.to_string()),
            ("directional_rows".to_string(), self.directional_rows.to_string()),
            ("qualifying_rows".to_string(), self.qualifying_rows.to_string()),
            ("priced_rows".to_string(), self.priced_rows.to_string()),
        ];
        for (label, count) in &self.labels {
            metrics.push((format!("label_{}", label), count.to_string()));
        }
        metrics.extend([
            ("total_return".to_string(), format!("{:.4}", self.total_return)),
            ("mean_return".to_string(), format!("{:.4}", self.mean_return)),
            ("win_rate".to_string(), format!("{:.4}", self.win_rate)),
            ("sharpe_ratio".to_string(), format!("{:.4}", self.sharpe_ratio)),
            ("max_drawdown".to_string(), format!("{:.4}", self.max_drawdown)),
        ]);
        metrics
    }

    pub fn save_report<P: AsRef<Path>>(&self, output: P) -> Result<(), LedgerError> {
        let mut writer = csv::Writer::from_path(output)?;
        writer.write_record(["metric", "value"])?;
        for (metric, value) in self.metrics() {
            writer.write_record([metric, value])?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl fmt::Display for LedgerStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (metric, value) in self.metrics() {
            writeln!(f, "{:<18} {}", metric, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Sentiment, Signal};
    use crate::pairs::CurrencyPair;
    use chrono::{TimeZone, Utc};

    fn row(label: Label, confidence: f64, return_pct: Option<f64>) -> SignalRecord {
        let mut record = SignalRecord::new(
            Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap(),
            CurrencyPair::new("EUR", "USD"),
            "EUR headline",
            "",
            Sentiment::new(label, confidence),
            Signal::Long,
        );
        if return_pct.is_some() {
            record.entry_price = Some(1.0);
            record.exit_price = Some(1.0);
        }
        record.return_pct = return_pct;
        record
    }

    #[test]
    fn counts_and_performance() {
        let records = vec![
            row(Label::Bullish, 0.9, Some(1.0)),
            row(Label::Bearish, 0.8, Some(-2.0)),
            row(Label::Bullish, 0.9, Some(3.0)),
            row(Label::Bullish, 0.5, Some(0.0)),
            row(Label::Neutral, 0.95, Some(0.0)),
            row(Label::Bearish, 0.85, None),
        ];
        let stats = LedgerStats::summarize(&records, 0.75);

        assert_eq!(stats.total_rows, 6);
        assert_eq!(stats.confident_rows, 5);
        assert_eq!(stats.directional_rows, 5);
        assert_eq!(stats.qualifying_rows, 4);
        assert_eq!(stats.priced_rows, 3);
        assert_eq!(stats.labels["bullish"], 3);
        assert_eq!(stats.labels["neutral"], 1);

        assert_eq!(stats.total_return, 2.0);
        assert!((stats.mean_return - 2.0 / 3.0).abs() < 1e-12);
        assert!((stats.win_rate - 2.0 / 3.0).abs() < 1e-12);
        // Peak 1.0, trough -1.0
        assert_eq!(stats.max_drawdown, 2.0);
        assert!(stats.sharpe_ratio > 0.0);
    }

    #[test]
    fn degenerate_inputs_have_zero_ratios() {
        let stats = LedgerStats::summarize(&[], 0.75);
        assert_eq!(stats.total_rows, 0);
        assert_eq!(stats.sharpe_ratio, 0.0);
        assert_eq!(stats.win_rate, 0.0);

        let flat = vec![row(Label::Bullish, 0.9, Some(1.0)), row(Label::Bullish, 0.9, Some(1.0))];
        assert_eq!(LedgerStats::summarize(&flat, 0.75).sharpe_ratio, 0.0);
    }

    #[test]
    fn report_is_written_as_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        let stats = LedgerStats::summarize(&[row(Label::Bullish, 0.9, Some(1.5))], 0.75);
        stats.save_report(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("metric,value\n"));
        assert!(content.contains("total_return,1.5000\n"));
        assert!(stats.to_string().contains("label_bullish"));
    }
}
