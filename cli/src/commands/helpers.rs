use anyhow::{Context, Result, bail};
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::io::{self, BufRead, IsTerminal, Write};

use bplog_core::models::{NewReading, TimeSlot};

/// Parse `<systolic> <diastolic> [heartrate] [AM|PM] [-N | YYYY-MM-DD]`.
///
/// Everything after the two pressures is sniffed by shape, in any order:
/// an AM/PM token, a negative day offset, an ISO date, or a heart rate.
pub(crate) fn parse_log_args(values: &[String], today: NaiveDate) -> Result<NewReading> {
    let (Some(sys), Some(dia)) = (values.first(), values.get(1)) else {
        bail!("systolic and diastolic required");
    };
    let systolic = parse_pressure(sys, "systolic")?;
    let diastolic = parse_pressure(dia, "diastolic")?;

    let mut slot = TimeSlot::Am;
    let mut date = today;
    let mut heart_rate = None;

    for arg in &values[2..] {
        if let Ok(s) = arg.parse::<TimeSlot>() {
            slot = s;
        } else if let Some(days) = arg.strip_prefix('-') {
            let days: i64 = days
                .parse()
                .with_context(|| format!("Invalid day offset '{arg}'. Use -1 for yesterday"))?;
            date = Duration::try_days(days)
                .and_then(|back| today.checked_sub_signed(back))
                .with_context(|| format!("Invalid day offset '{arg}'. Too far back"))?;
        } else if arg.contains('-') {
            date = NaiveDate::parse_from_str(arg, "%Y-%m-%d")
                .with_context(|| format!("Invalid date '{arg}'. Use YYYY-MM-DD"))?;
        } else if is_digits(arg) {
            heart_rate = Some(
                arg.parse::<u32>()
                    .with_context(|| format!("Invalid heart rate '{arg}'"))?,
            );
        } else {
            bail!("Unrecognized argument '{arg}'");
        }
    }

    Ok(NewReading {
        date,
        slot,
        systolic: Some(systolic),
        diastolic: Some(diastolic),
        heart_rate,
    })
}

fn parse_pressure(s: &str, name: &str) -> Result<u32> {
    if !is_digits(s) {
        bail!("Invalid {name} '{s}'. Use a whole number like 120");
    }
    let value: u32 = s
        .parse()
        .with_context(|| format!("Invalid {name} '{s}'"))?;
    if value == 0 {
        bail!("{name} must be greater than 0");
    }
    Ok(value)
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Ask a yes/no question on stderr. Anything but y/yes is a no.
pub(crate) fn prompt_yes_no(question: &str) -> Result<bool> {
    eprint!("{question} [y/N]: ");
    io::stderr().flush()?;
    let stdin = io::stdin();
    let Some(line) = stdin.lock().lines().next() else {
        return Ok(false);
    };
    let answer = line?.trim().to_ascii_lowercase();
    Ok(matches!(answer.as_str(), "y" | "yes"))
}

pub(crate) fn stdin_is_terminal() -> bool {
    io::stdin().is_terminal()
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn or_dash(value: Option<u32>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn args(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_parse_log_args_minimal() {
        let r = parse_log_args(&args("120 80"), today()).unwrap();
        assert_eq!(r.systolic, Some(120));
        assert_eq!(r.diastolic, Some(80));
        assert_eq!(r.slot, TimeSlot::Am);
        assert_eq!(r.date, today());
        assert_eq!(r.heart_rate, None);
    }

    #[test]
    fn test_parse_log_args_all_fields() {
        let r = parse_log_args(&args("118 78 72 PM -3"), today()).unwrap();
        assert_eq!(r.heart_rate, Some(72));
        assert_eq!(r.slot, TimeSlot::Pm);
        assert_eq!(r.date, NaiveDate::from_ymd_opt(2024, 6, 12).unwrap());
    }

    #[test]
    fn test_parse_log_args_order_insensitive() {
        let a = parse_log_args(&args("118 78 -1 pm 65"), today()).unwrap();
        let b = parse_log_args(&args("118 78 65 -1 PM"), today()).unwrap();
        assert_eq!(a.date, b.date);
        assert_eq!(a.slot, b.slot);
        assert_eq!(a.heart_rate, b.heart_rate);
    }

    #[test]
    fn test_parse_log_args_iso_date() {
        let r = parse_log_args(&args("120 80 AM 2024-12-25"), today()).unwrap();
        assert_eq!(r.date, NaiveDate::from_ymd_opt(2024, 12, 25).unwrap());
    }

    #[test]
    fn test_parse_log_args_missing_pressure() {
        let err = parse_log_args(&args("120"), today()).unwrap_err();
        assert!(err.to_string().contains("systolic and diastolic required"));
        assert!(parse_log_args(&[], today()).is_err());
    }

    #[test]
    fn test_parse_log_args_invalid() {
        assert!(parse_log_args(&args("abc 80"), today()).is_err());
        assert!(parse_log_args(&args("120 0"), today()).is_err());
        assert!(parse_log_args(&args("120 80 2024-13-40"), today()).is_err());
        assert!(parse_log_args(&args("120 80 -x"), today()).is_err());
        assert!(parse_log_args(&args("120 80 +5"), today()).is_err());
        assert!(parse_log_args(&args("120 80 noon"), today()).is_err());
    }

    #[test]
    fn test_parse_log_args_offset_out_of_range() {
        let err = parse_log_args(&args("120 80 -99999999"), today()).unwrap_err();
        assert!(err.to_string().contains("Invalid day offset"));
        assert!(parse_log_args(&args("120 80 -9223372036854775807"), today()).is_err());
        assert!(parse_log_args(&args("120 80 -99999999999999999999"), today()).is_err());

        let r = parse_log_args(&args("120 80 -365"), today()).unwrap();
        assert_eq!(r.date, NaiveDate::from_ymd_opt(2023, 6, 16).unwrap());
    }

    #[test]
    fn test_json_error() {
        assert_eq!(json_error("nope"), r#"{"error":"nope"}"#);
    }

    #[test]
    fn test_or_dash() {
        assert_eq!(or_dash(None), "-");
        assert_eq!(or_dash(Some(72)), "72");
    }
}
