use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use crate::log::ReadingLog;
use crate::models::{Reading, TimeSlot};

/// Header row of the persisted text format.
pub const HEADER: &str = "id,date,time,systolic,diastolic,heartRate";

const MIN_FIELDS: usize = 5;

/// Why a persisted row was left out of a load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("expected at least 5 fields, found {0}")]
    TooFewFields(usize),
    #[error("invalid {field} '{value}'")]
    InvalidField { field: &'static str, value: String },
    #[error("malformed row: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// 1-based line number in the input, header included.
    pub line: u64,
    pub reason: SkipReason,
}

/// Readings recovered from text plus the rows that had to be dropped.
#[derive(Debug, Clone, Default)]
pub struct ParseReport {
    pub readings: Vec<Reading>,
    pub skipped: Vec<SkippedRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("No valid data found in CSV")]
    NoValidRows,
}

/// Result of importing a whole file as the new collection.
#[derive(Debug, Clone)]
pub struct Imported {
    pub log: ReadingLog,
    pub skipped: Vec<SkippedRow>,
    pub duplicates: Vec<Reading>,
}

/// Parse persisted text into readings, in file order.
///
/// Never fails as a whole: bad rows are dropped. See [`parse_report`].
#[must_use]
pub fn parse(text: &str) -> Vec<Reading> {
    parse_report(text, Utc::now().timestamp_millis()).readings
}

/// Parse persisted bytes, reporting every dropped row.
///
/// The first non-empty line is the header and is never interpreted. A row
/// without a usable id gets `now_millis + line offset` instead. Rows that are
/// not valid UTF-8 are dropped like any other malformed row.
#[must_use]
pub fn parse_report(input: impl AsRef<[u8]>, now_millis: i64) -> ParseReport {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input.as_ref());

    let mut report = ParseReport::default();

    for (offset, result) in rdr.records().enumerate() {
        let fallback_line = offset as u64 + 2;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                let line = e.position().map_or(fallback_line, csv::Position::line);
                let reason = SkipReason::Malformed(e.to_string());
                warn!(line, %reason, "skipping row");
                report.skipped.push(SkippedRow { line, reason });
                continue;
            }
        };
        let line = record.position().map_or(fallback_line, csv::Position::line);

        let synthetic_id = now_millis.saturating_add(offset as i64 + 1);
        match parse_row(&record, synthetic_id) {
            Ok(reading) => report.readings.push(reading),
            Err(reason) => {
                warn!(line, %reason, "skipping row");
                report.skipped.push(SkippedRow { line, reason });
            }
        }
    }

    report
}

fn parse_row(record: &csv::StringRecord, synthetic_id: i64) -> Result<Reading, SkipReason> {
    if record.len() < MIN_FIELDS {
        return Err(SkipReason::TooFewFields(record.len()));
    }
    let field = |idx: usize| record.get(idx).unwrap_or("");
    let invalid = |name: &'static str, idx: usize| SkipReason::InvalidField {
        field: name,
        value: field(idx).to_string(),
    };

    let id = field(0).parse::<i64>().unwrap_or(synthetic_id);
    let date = NaiveDate::parse_from_str(field(1), "%Y-%m-%d").map_err(|_| invalid("date", 1))?;
    let slot = field(2).parse::<TimeSlot>().map_err(|_| invalid("time", 2))?;
    let systolic = parse_pressure(field(3)).ok_or_else(|| invalid("systolic", 3))?;
    let diastolic = parse_pressure(field(4)).ok_or_else(|| invalid("diastolic", 4))?;
    let heart_rate = field(5).parse::<u32>().ok().filter(|&hr| hr > 0);

    Ok(Reading {
        id,
        date,
        slot,
        systolic,
        diastolic,
        heart_rate,
    })
}

fn parse_pressure(s: &str) -> Option<u32> {
    s.parse::<u32>().ok().filter(|&v| v > 0)
}

/// Encode readings in collection order. A missing heart rate is an empty field.
#[must_use]
pub fn serialize(readings: &[Reading]) -> String {
    let mut out = String::with_capacity(HEADER.len() + 1 + readings.len() * 32);
    out.push_str(HEADER);
    out.push('\n');
    for r in readings {
        let hr = r.heart_rate.map(|hr| hr.to_string()).unwrap_or_default();
        let _ = writeln!(
            out,
            "{},{},{},{},{},{hr}",
            r.id,
            r.date.format("%Y-%m-%d"),
            r.slot,
            r.systolic,
            r.diastolic
        );
    }
    out
}

/// Parse an external file meant to replace the whole collection.
///
/// Fails when nothing usable is in it, so the caller keeps its current log.
pub fn import_text(input: impl AsRef<[u8]>, now_millis: i64) -> Result<Imported, ImportError> {
    let report = parse_report(input, now_millis);
    if report.readings.is_empty() {
        return Err(ImportError::NoValidRows);
    }
    let (log, duplicates) = ReadingLog::from_readings(report.readings);
    Ok(Imported {
        log,
        skipped: report.skipped,
        duplicates,
    })
}

/// The collection persisted as a flat file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the collection. A missing file is an empty collection.
    pub fn load(&self) -> Result<ReadingLog> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no data file yet");
            return Ok(ReadingLog::new());
        }
        let bytes = fs::read(&self.path)
            .with_context(|| format!("Failed to read data file: {}", self.path.display()))?;
        let report = parse_report(&bytes, Utc::now().timestamp_millis());
        let (log, duplicates) = ReadingLog::from_readings(report.readings);
        debug!(
            path = %self.path.display(),
            readings = log.len(),
            skipped = report.skipped.len(),
            duplicates = duplicates.len(),
            "loaded readings"
        );
        Ok(log)
    }

    /// Write the whole collection, replacing the file in one rename.
    pub fn save(&self, log: &ReadingLog) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create data directory: {}", dir.display()))?;
        }
        let tmp = self.path.with_extension("csv.tmp");
        fs::write(&tmp, serialize(log.readings()))
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace data file: {}", self.path.display()))?;
        debug!(path = %self.path.display(), readings = log.len(), "saved readings");
        Ok(())
    }
}
