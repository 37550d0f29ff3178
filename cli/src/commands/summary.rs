use anyhow::Result;
use chrono::Local;

use bplog_core::classify::{Category, classify};
use bplog_core::stats::{Averages, Stats, summarize};
use bplog_core::store::FileStore;

pub(crate) fn cmd_stats(store: &FileStore, json: bool) -> Result<()> {
    let log = store.load()?;
    let stats = summarize(&log, Local::now().date_naive());

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    if stats.total_readings == 0 {
        println!("No readings yet.");
        return Ok(());
    }

    for line in render_stats(&stats) {
        println!("{line}");
    }
    Ok(())
}

fn bp_with_status(avg: &Averages, category: Category) -> String {
    format!("{}/{} ({})", avg.systolic, avg.diastolic, category.severity())
}

fn render_stats(stats: &Stats) -> Vec<String> {
    let mut lines = vec!["BP Statistics".to_string(), "-".repeat(30)];

    let total = stats.total_readings;
    let days = stats.total_days;
    lines.push(format!("Total readings:  {total} over {days} days"));
    let week = stats.last_week_readings;
    let week_days = stats.last_week_days;
    lines.push(format!("Last 7 days:     {week} ({week_days} days)"));
    lines.push(String::new());

    if let (Some(avg), Some(category)) = (&stats.all_time, stats.category) {
        lines.push(format!("Average BP:      {}", bp_with_status(avg, category)));
        if let Some(hr) = avg.heart_rate {
            lines.push(format!("Average HR:      {hr} bpm"));
        }
    }
    if let Some(avg) = &stats.last_week {
        let category = classify(avg.systolic, avg.diastolic);
        lines.push(format!("Last 7 average:  {}", bp_with_status(avg, category)));
    }
    lines.push(String::new());

    if let (Some(sys), Some(dia)) = (stats.systolic_range, stats.diastolic_range) {
        lines.push(format!("Highest:         {}/{}", sys.max, dia.max));
        lines.push(format!("Lowest:          {}/{}", sys.min, dia.min));
    }

    match stats.trend {
        Some(t) => lines.push(format!(
            "Trend:           {:+} mmHg ({})",
            t.delta,
            t.direction.label()
        )),
        None if stats.last_week.is_none() => {
            lines.push("Trend:           unavailable (no readings in the last 7 days)".to_string());
        }
        None => lines.push("Trend:           unavailable (no readings 8-14 days ago)".to_string()),
    }

    lines
}
