use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::errors::LedgerError;
use crate::ledger::record::{SignalRecord, COLUMNS};
use crate::util::{ensure_parent_exists, open_csv_for_append};

/// A persisted row that could not be read as a `SignalRecord`. The fields are
/// kept exactly as they were on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct QuarantinedRow {
    pub line: u64,
    pub fields: csv::ByteRecord,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct LoadedLedger {
    // Stably sorted by timestamp
    pub records: Vec<SignalRecord>,
    pub quarantined: Vec<QuarantinedRow>,
}

/// Append-only CSV ledger.
///
/// Rows are appended in the order they are presented; nothing here sorts on
/// write. Readers never trust file order and sort by timestamp on load.
/// `replace_all` is the only way existing rows change, and it goes through a
/// temporary file and a rename so an interrupted write never leaves a torn ledger.
pub struct LedgerWriter {
    path: PathBuf,
    quarantine_path: PathBuf,
    last_timestamp: Option<DateTime<Utc>>,
}

impl LedgerWriter {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(path: P, quarantine_path: Q) -> Self {
        LedgerWriter {
            path: path.as_ref().to_path_buf(),
            quarantine_path: quarantine_path.as_ref().to_path_buf(),
            last_timestamp: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, record: &SignalRecord) -> Result<(), LedgerError> {
        if let Some(last) = self.last_timestamp {
            if record.timestamp < last {
                log::warn!(
                    "Appending {} {} before the latest ledger row ({}); backfill will reorder it",
                    record.pair,
                    record.timestamp.to_rfc3339(),
                    last.to_rfc3339()
                );
            }
        }

        let (mut writer, is_new) = open_csv_for_append(&self.path)?;
        if is_new {
            log::info!("Creating ledger at {}...", self.path.display());
            writer.write_record(COLUMNS)?;
        }
        writer.write_record(record.to_row())?;
        writer.flush()?;

        self.last_timestamp = Some(
            self.last_timestamp
                .map_or(record.timestamp, |last| last.max(record.timestamp)),
        );
        Ok(())
    }

    pub fn load_all(&mut self) -> Result<LoadedLedger, LedgerError> {
        if !self.path.exists() {
            return Ok(LoadedLedger::default());
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?;

        let headers = reader.byte_headers()?.clone();
        if !headers.is_empty() && headers.iter().ne(COLUMNS.iter().map(|c| c.as_bytes())) {
            return Err(LedgerError::MalformedLedgerRow {
                line: 1,
                reason: format!("unexpected ledger header: {:?}", headers),
            });
        }

        // Rows are read as bytes so a row that is not valid UTF-8 can still be
        // set aside verbatim.
        let mut loaded = LoadedLedger::default();
        for result in reader.byte_records() {
            let raw = match result {
                Ok(raw) => raw,
                Err(err) if err.is_io_error() => return Err(err.into()),
                Err(err) => {
                    let line = err.position().map_or(0, |p| p.line());
                    log::warn!("Quarantining unreadable ledger row at line {}: {}", line, err);
                    loaded.quarantined.push(QuarantinedRow {
                        line,
                        fields: csv::ByteRecord::new(),
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            let line = raw.position().map_or(0, |p| p.line());
            let parsed = csv::StringRecord::from_byte_record(raw.clone())
                .map_err(|err| LedgerError::MalformedLedgerRow {
                    line,
                    reason: err.to_string(),
                })
                .and_then(|fields| SignalRecord::from_row(&fields, line));

            match parsed {
                Ok(record) => loaded.records.push(record),
                Err(err) => {
                    log::warn!("Quarantining ledger row: {}", err);
                    loaded.quarantined.push(QuarantinedRow {
                        line,
                        fields: raw,
                        reason: err.to_string(),
                    });
                }
            }
        }

        // Stable: rows sharing a timestamp keep their file order
        loaded.records.sort_by_key(|record| record.timestamp);
        self.last_timestamp = loaded.records.last().map(|record| record.timestamp);
        Ok(loaded)
    }

    pub fn latest_timestamp(&mut self) -> Result<Option<DateTime<Utc>>, LedgerError> {
        Ok(self.load_all()?.records.last().map(|record| record.timestamp))
    }

    pub fn quarantine(&self, rows: &[QuarantinedRow]) -> Result<(), LedgerError> {
        if rows.is_empty() {
            return Ok(());
        }

        let (mut writer, is_new) = open_csv_for_append(&self.quarantine_path)?;
        if is_new {
            writer.write_record(COLUMNS)?;
        }
        for row in rows {
            writer.write_byte_record(&row.fields)?;
        }
        writer.flush()?;

        log::info!(
            "Set aside {} malformed row(s) in {}",
            rows.len(),
            self.quarantine_path.display()
        );
        Ok(())
    }

    pub fn replace_all(&mut self, records: &[SignalRecord]) -> Result<(), LedgerError> {
        ensure_parent_exists(&self.path)?;

        let mut tmp_name = self.path.as_os_str().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let mut writer = csv::Writer::from_path(&tmp_path)?;
        writer.write_record(COLUMNS)?;
        for record in records {
            writer.write_record(record.to_row())?;
        }
        writer.flush()?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        drop(file);

        std::fs::rename(&tmp_path, &self.path)?;
        self.last_timestamp = records.iter().map(|record| record.timestamp).max();
        Ok(())
    }
}
