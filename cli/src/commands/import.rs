use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, Utc};
use serde_json::json;

use bplog_core::store::{FileStore, ImportError, import_text, serialize};

use super::helpers::{json_error, prompt_yes_no, stdin_is_terminal};

pub(crate) fn cmd_import(store: &FileStore, path: &Path, yes: bool, json: bool) -> Result<()> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;

    let imported = match import_text(&bytes, Utc::now().timestamp_millis()) {
        Ok(imported) => imported,
        Err(e @ ImportError::NoValidRows) => {
            if json {
                println!("{}", json_error(&e.to_string()));
            } else {
                eprintln!("{e}.");
            }
            return Ok(());
        }
    };

    let count = imported.log.len();
    let confirmed = if yes {
        true
    } else if stdin_is_terminal() {
        prompt_yes_no(&format!(
            "Import {count} readings? This will replace current data."
        ))?
    } else {
        eprintln!("Refusing to replace current data without confirmation; pass --yes.");
        false
    };

    if !confirmed {
        if json {
            println!("{}", json!({ "imported": 0, "cancelled": true }));
        } else {
            eprintln!("Import cancelled.");
        }
        return Ok(());
    }

    store.save(&imported.log)?;

    let skipped = imported.skipped.len();
    let duplicates = imported.duplicates.len();
    if json {
        println!(
            "{}",
            json!({
                "imported": count,
                "skipped": skipped,
                "duplicates": duplicates,
            })
        );
    } else {
        println!("Import complete.\n");
        println!("  Readings imported: {count}");
        println!("  Rows skipped:      {skipped}");
        println!("  Duplicate slots:   {duplicates}");
        for row in &imported.skipped {
            eprintln!("  line {}: {}", row.line, row.reason);
        }
    }

    Ok(())
}

pub(crate) fn default_export_path(today: NaiveDate) -> PathBuf {
    PathBuf::from(format!("bp-data-{}.csv", today.format("%Y-%m-%d")))
}

pub(crate) fn cmd_export(store: &FileStore, path: Option<PathBuf>, json: bool) -> Result<()> {
    let path = path.unwrap_or_else(|| default_export_path(Local::now().date_naive()));
    let log = store.load()?;

    std::fs::write(&path, serialize(log.readings()))
        .with_context(|| format!("Failed to write export: {}", path.display()))?;

    if json {
        println!(
            "{}",
            json!({ "exported": log.len(), "path": path.display().to_string() })
        );
    } else {
        println!("Exported {} readings to {}", log.len(), path.display());
    }

    Ok(())
}
