use anyhow::Result;
use chrono::Local;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use bplog_core::models::Reading;
use bplog_core::stats::{DailyPoint, SERIES_DAYS, daily_series};
use bplog_core::store::FileStore;

use super::helpers::or_dash;

const DEFAULT_VIEW_COUNT: usize = 10;

/// Rows for `--view [n]`. A missing or zero count means the default.
pub(crate) fn view_count(requested: Option<usize>) -> usize {
    requested
        .filter(|&n| n > 0)
        .unwrap_or(DEFAULT_VIEW_COUNT)
}

#[derive(Tabled)]
struct ReadingRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "BP")]
    bp: String,
    #[tabled(rename = "HR")]
    hr: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "ID")]
    id: i64,
}

fn reading_rows(readings: &[Reading]) -> Vec<ReadingRow> {
    readings
        .iter()
        .map(|r| ReadingRow {
            date: r.date.format("%Y-%m-%d").to_string(),
            time: r.slot.to_string(),
            bp: format!("{}/{}", r.systolic, r.diastolic),
            hr: or_dash(r.heart_rate),
            status: r.category().severity().to_string(),
            id: r.id,
        })
        .collect()
}

pub(crate) fn cmd_view(store: &FileStore, count: usize, json: bool) -> Result<()> {
    let log = store.load()?;
    let recent = log.recent(count);

    if json {
        println!("{}", serde_json::to_string_pretty(recent)?);
        return Ok(());
    }

    if recent.is_empty() {
        println!("No readings yet.");
        return Ok(());
    }

    let table = Table::new(reading_rows(recent))
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}

#[derive(Tabled)]
struct ChartRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Systolic")]
    systolic: String,
    #[tabled(rename = "Diastolic")]
    diastolic: String,
}

fn chart_rows(series: &[DailyPoint]) -> Vec<ChartRow> {
    series
        .iter()
        .map(|p| ChartRow {
            date: p.date.format("%a %b %d").to_string(),
            systolic: or_dash(p.systolic),
            diastolic: or_dash(p.diastolic),
        })
        .collect()
}

pub(crate) fn cmd_chart(store: &FileStore, json: bool) -> Result<()> {
    let log = store.load()?;
    let series = daily_series(&log, Local::now().date_naive(), SERIES_DAYS);

    if json {
        println!("{}", serde_json::to_string_pretty(&series)?);
        return Ok(());
    }

    let table = Table::new(chart_rows(&series))
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}
