use crate::ledger::{SignalRecord, RETURN_PLACES};
use crate::util::round_to;

// What a row adds to the running total. Non-qualifying rows never move it.
pub fn contribution(record: &SignalRecord, conf_threshold: f64) -> f64 {
    if record.qualifies(conf_threshold) {
        record.return_pct.unwrap_or(0.0)
    } else {
        0.0
    }
}

fn step(running: f64, record: &SignalRecord, conf_threshold: f64) -> f64 {
    round_to(running + contribution(record, conf_threshold), RETURN_PLACES as i32)
}

/// Running total after the last record. `records` must already be in timestamp order.
pub fn total(records: &[SignalRecord], conf_threshold: f64) -> f64 {
    records
        .iter()
        .fold(0.0, |running, record| step(running, record, conf_threshold))
}

pub fn running_totals(records: &[SignalRecord], conf_threshold: f64) -> Vec<f64> {
    records
        .iter()
        .scan(0.0, |running, record| {
            *running = step(*running, record, conf_threshold);
            Some(*running)
        })
        .collect()
}

// Rewrites every row's cumulative_return from scratch.
pub fn apply(records: &mut [SignalRecord], conf_threshold: f64) {
    let mut running = 0.0;
    for record in records.iter_mut() {
        running = step(running, record, conf_threshold);
        record.cumulative_return = Some(running);
    }
}
