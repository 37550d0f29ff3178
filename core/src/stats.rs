use std::collections::HashSet;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::classify::{Category, classify};
use crate::log::ReadingLog;
use crate::models::Reading;

/// Number of trailing days in the chart series, today included.
pub const SERIES_DAYS: usize = 14;

/// Trend deltas beyond this many mmHg count as a change in direction.
pub const TREND_THRESHOLD: i64 = 5;

/// A subset of readings selected by age in whole days (`today - date`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    All,
    /// `age <= n`. Future-dated readings have negative age and are included.
    LastDays(i64),
    /// `after < age <= through`.
    Between { after: i64, through: i64 },
}

/// The current week.
pub const LAST_WEEK: Window = Window::LastDays(7);
/// The week before [`LAST_WEEK`], used for the trend.
pub const PREVIOUS_WEEK: Window = Window::Between {
    after: 7,
    through: 14,
};

impl Window {
    #[must_use]
    pub fn contains(self, date: NaiveDate, today: NaiveDate) -> bool {
        let age = (today - date).num_days();
        match self {
            Window::All => true,
            Window::LastDays(n) => age <= n,
            Window::Between { after, through } => age > after && age <= through,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Averages {
    pub systolic: u32,
    pub diastolic: u32,
    /// Only readings that carry a heart rate count.
    pub heart_rate: Option<u32>,
    pub readings: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrendDirection {
    Improving,
    Stable,
    Rising,
}

impl TrendDirection {
    #[must_use]
    pub fn from_delta(delta: i64) -> Self {
        if delta < -TREND_THRESHOLD {
            TrendDirection::Improving
        } else if delta > TREND_THRESHOLD {
            TrendDirection::Rising
        } else {
            TrendDirection::Stable
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            TrendDirection::Improving => "Improving",
            TrendDirection::Stable => "Stable",
            TrendDirection::Rising => "Rising",
        }
    }
}

/// Change in average systolic between this week and the week before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Trend {
    pub delta: i64,
    pub direction: TrendDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Range {
    pub min: u32,
    pub max: u32,
}

/// One day of the chart series. `None` is a gap, not zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub systolic: Option<u32>,
    pub diastolic: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub today: NaiveDate,
    pub total_readings: usize,
    pub total_days: usize,
    pub all_time: Option<Averages>,
    /// Category of the all-time average.
    pub category: Option<Category>,
    pub last_week: Option<Averages>,
    pub last_week_readings: usize,
    pub last_week_days: usize,
    /// `None` when either week has no readings.
    pub trend: Option<Trend>,
    pub systolic_range: Option<Range>,
    pub diastolic_range: Option<Range>,
    pub series: Vec<DailyPoint>,
}

/// Mean rounded half up, in exact integer arithmetic.
fn round_mean(sum: u64, count: u64) -> Option<u32> {
    if count == 0 {
        return None;
    }
    Some(((2 * sum + count) / (2 * count)) as u32)
}

fn in_window(log: &ReadingLog, window: Window, today: NaiveDate) -> impl Iterator<Item = &Reading> {
    log.iter().filter(move |r| window.contains(r.date, today))
}

#[must_use]
pub fn averages(log: &ReadingLog, window: Window, today: NaiveDate) -> Option<Averages> {
    let (mut sys, mut dia, mut hr, mut n, mut hr_n) = (0u64, 0u64, 0u64, 0u64, 0u64);
    for r in in_window(log, window, today) {
        sys += u64::from(r.systolic);
        dia += u64::from(r.diastolic);
        n += 1;
        if let Some(h) = r.heart_rate {
            hr += u64::from(h);
            hr_n += 1;
        }
    }
    Some(Averages {
        systolic: round_mean(sys, n)?,
        diastolic: round_mean(dia, n)?,
        heart_rate: round_mean(hr, hr_n),
        readings: n as usize,
    })
}

/// Trend of average systolic, or `None` if either week is empty.
#[must_use]
pub fn trend(log: &ReadingLog, today: NaiveDate) -> Option<Trend> {
    let previous = averages(log, PREVIOUS_WEEK, today)?;
    let current = averages(log, LAST_WEEK, today)?;
    let delta = i64::from(current.systolic) - i64::from(previous.systolic);
    Some(Trend {
        delta,
        direction: TrendDirection::from_delta(delta),
    })
}

fn range_of(values: impl Iterator<Item = u32>) -> Option<Range> {
    values.fold(None, |acc, v| match acc {
        None => Some(Range { min: v, max: v }),
        Some(r) => Some(Range {
            min: r.min.min(v),
            max: r.max.max(v),
        }),
    })
}

/// Lowest and highest systolic in the whole collection.
#[must_use]
pub fn range(log: &ReadingLog) -> Option<Range> {
    range_of(log.iter().map(|r| r.systolic))
}

#[must_use]
pub fn diastolic_range(log: &ReadingLog) -> Option<Range> {
    range_of(log.iter().map(|r| r.diastolic))
}

/// Distinct dates in the window. A day with both AM and PM counts once.
#[must_use]
pub fn unique_day_count(log: &ReadingLog, window: Window, today: NaiveDate) -> usize {
    in_window(log, window, today)
        .map(|r| r.date)
        .collect::<HashSet<_>>()
        .len()
}

/// Per-day mean systolic and diastolic for the trailing `days` days, oldest first.
#[must_use]
pub fn daily_series(log: &ReadingLog, today: NaiveDate, days: usize) -> Vec<DailyPoint> {
    (0..days as i64)
        .rev()
        .map(|back| {
            let date = today - Duration::days(back);
            let (mut sys, mut dia, mut n) = (0u64, 0u64, 0u64);
            for r in log.iter().filter(|r| r.date == date) {
                sys += u64::from(r.systolic);
                dia += u64::from(r.diastolic);
                n += 1;
            }
            DailyPoint {
                date,
                systolic: round_mean(sys, n),
                diastolic: round_mean(dia, n),
            }
        })
        .collect()
}

#[must_use]
pub fn summarize(log: &ReadingLog, today: NaiveDate) -> Stats {
    let all_time = averages(log, Window::All, today);
    let last_week = averages(log, LAST_WEEK, today);
    Stats {
        today,
        total_readings: log.len(),
        total_days: unique_day_count(log, Window::All, today),
        category: all_time.map(|a| classify(a.systolic, a.diastolic)),
        all_time,
        last_week_readings: last_week.map_or(0, |a| a.readings),
        last_week,
        last_week_days: unique_day_count(log, LAST_WEEK, today),
        trend: trend(log, today),
        systolic_range: range(log),
        diastolic_range: diastolic_range(log),
        series: daily_series(log, today, SERIES_DAYS),
    }
}
