use anyhow::{Context, Result};
use chrono::{Local, Utc};
use serde_json::json;

use bplog_core::log::{PendingReplacement, ReadingLog, Upsert};
use bplog_core::models::Reading;
use bplog_core::store::FileStore;

use super::helpers::{json_error, parse_log_args, prompt_yes_no, stdin_is_terminal};

/// How the logger settles a taken slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReplacePolicy {
    /// `--yes` was given.
    Always,
    /// Ask on the terminal.
    Ask,
    /// Stdin is not a terminal: replace and say so.
    Notify,
}

impl ReplacePolicy {
    pub(crate) fn detect(yes: bool) -> Self {
        if yes {
            ReplacePolicy::Always
        } else if stdin_is_terminal() {
            ReplacePolicy::Ask
        } else {
            ReplacePolicy::Notify
        }
    }

    fn decide(self, pending: &PendingReplacement) -> Result<bool> {
        let existing = pending.existing();
        match self {
            ReplacePolicy::Always => Ok(true),
            ReplacePolicy::Ask => prompt_yes_no(&format!(
                "Replace existing {} reading for {} ({}/{})?",
                existing.slot, existing.date, existing.systolic, existing.diastolic
            )),
            ReplacePolicy::Notify => {
                eprintln!(
                    "Replacing existing {} reading for {}",
                    existing.slot, existing.date
                );
                Ok(true)
            }
        }
    }
}

/// What happened to the incoming reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogOutcome {
    Added,
    Replaced,
    Kept,
}

/// Insert `reading`, settling a slot conflict with `decide`.
pub(crate) fn apply_reading<F>(
    log: ReadingLog,
    reading: Reading,
    decide: F,
) -> Result<(ReadingLog, LogOutcome)>
where
    F: FnOnce(&PendingReplacement) -> Result<bool>,
{
    match log.upsert(reading) {
        Upsert::Inserted(log) => Ok((log, LogOutcome::Added)),
        Upsert::Conflict(pending) => {
            if decide(&pending)? {
                Ok((pending.confirm(), LogOutcome::Replaced))
            } else {
                Ok((pending.decline(), LogOutcome::Kept))
            }
        }
    }
}

pub(crate) fn cmd_log(
    store: &FileStore,
    values: &[String],
    policy: ReplacePolicy,
    json: bool,
) -> Result<()> {
    let input = parse_log_args(values, Local::now().date_naive())?;
    let log = store.load()?;
    let id = log
        .next_id(Utc::now().timestamp_millis())
        .context("No reading ids left: the data file already holds the largest id")?;
    let reading = input.into_reading(id)?;

    let (log, outcome) = apply_reading(log, reading.clone(), |p| policy.decide(p))?;

    if outcome == LogOutcome::Kept {
        if json {
            println!("{}", json!({ "saved": false, "reading": reading }));
        } else {
            eprintln!("Kept existing {} reading for {}", reading.slot, reading.date);
        }
        return Ok(());
    }

    store.save(&log)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "saved": true,
                "replaced": outcome == LogOutcome::Replaced,
                "reading": reading,
                "category": reading.category(),
            }))?
        );
    } else {
        let hr = reading
            .heart_rate
            .map(|hr| format!(" HR:{hr}"))
            .unwrap_or_default();
        println!(
            "Saved: {}/{}{hr} [{}] {} - {}",
            reading.systolic,
            reading.diastolic,
            reading.slot,
            reading.date.format("%Y-%m-%d"),
            reading.category().severity()
        );
    }

    Ok(())
}

pub(crate) fn cmd_delete(store: &FileStore, id: i64, json: bool) -> Result<()> {
    let (log, removed) = store.load()?.remove(id);

    let Some(reading) = removed else {
        if json {
            println!("{}", json_error(&format!("Reading {id} not found")));
        } else {
            eprintln!("Reading {id} not found");
        }
        return Ok(());
    };

    store.save(&log)?;

    if json {
        println!("{}", json!({ "deleted": id }));
    } else {
        println!(
            "Deleted {}/{} [{}] {}",
            reading.systolic, reading.diastolic, reading.slot, reading.date
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bplog_core::models::TimeSlot;
    use bplog_core::store::HEADER;
    use chrono::NaiveDate;

    fn reading(id: i64, systolic: u32) -> Reading {
        Reading {
            id,
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            slot: TimeSlot::Am,
            systolic,
            diastolic: 80,
            heart_rate: None,
        }
    }

    #[test]
    fn test_apply_reading_adds() {
        let (log, outcome) =
            apply_reading(ReadingLog::new(), reading(1, 120), |_| Ok(false)).unwrap();
        assert_eq!(outcome, LogOutcome::Added);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_apply_reading_replaces_when_confirmed() {
        let (log, _) = apply_reading(ReadingLog::new(), reading(1, 120), |_| Ok(true)).unwrap();
        let (log, outcome) = apply_reading(log, reading(2, 135), |p| {
            assert_eq!(p.existing().id, 1);
            Ok(true)
        })
        .unwrap();
        assert_eq!(outcome, LogOutcome::Replaced);
        assert_eq!(log.len(), 1);
        assert_eq!(log.readings()[0].id, 2);
    }

    #[test]
    fn test_apply_reading_keeps_when_declined() {
        let (log, _) = apply_reading(ReadingLog::new(), reading(1, 120), |_| Ok(true)).unwrap();
        let (log, outcome) = apply_reading(log, reading(2, 135), |_| Ok(false)).unwrap();
        assert_eq!(outcome, LogOutcome::Kept);
        assert_eq!(log.readings()[0].id, 1);
    }

    #[test]
    fn test_apply_reading_propagates_prompt_error() {
        let (log, _) = apply_reading(ReadingLog::new(), reading(1, 120), |_| Ok(true)).unwrap();
        let result = apply_reading(log, reading(2, 135), |_| anyhow::bail!("no input"));
        assert!(result.is_err());
    }

    #[test]
    fn test_cmd_log_and_delete_persist() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = FileStore::new(tmp.path().join("bp-data.csv"));
        let values: Vec<String> = ["118", "76", "60", "PM"].map(String::from).to_vec();

        cmd_log(&store, &values, ReplacePolicy::Always, true).unwrap();
        let log = store.load().unwrap();
        assert_eq!(log.len(), 1);
        let saved = &log.readings()[0];
        assert_eq!(saved.slot, TimeSlot::Pm);
        assert_eq!(saved.heart_rate, Some(60));

        cmd_log(&store, &values, ReplacePolicy::Always, true).unwrap();
        assert_eq!(store.load().unwrap().len(), 1);

        let id = store.load().unwrap().readings()[0].id;
        cmd_delete(&store, id, true).unwrap();
        assert!(store.load().unwrap().is_empty());

        // Unknown id is not an error.
        cmd_delete(&store, id, true).unwrap();
    }

    #[test]
    fn test_cmd_log_missing_diastolic_fails_without_writing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = FileStore::new(tmp.path().join("bp-data.csv"));
        let values = vec!["120".to_string()];
        assert!(cmd_log(&store, &values, ReplacePolicy::Always, false).is_err());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_cmd_log_with_max_id_on_disk_fails_cleanly() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = FileStore::new(tmp.path().join("bp-data.csv"));
        let before = format!("{HEADER}\n{},2024-06-01,AM,118,76,\n", i64::MAX);
        std::fs::write(store.path(), &before).unwrap();
        let values: Vec<String> = ["120", "80"].map(String::from).to_vec();

        let err = cmd_log(&store, &values, ReplacePolicy::Always, true).unwrap_err();
        assert!(err.to_string().contains("No reading ids left"));
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), before);
    }
}
