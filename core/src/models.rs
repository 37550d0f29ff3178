use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classify::{Category, classify};

/// Morning or evening measurement slot. Not a clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeSlot {
    Am,
    Pm,
}

impl TimeSlot {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TimeSlot::Am => "AM",
            TimeSlot::Pm => "PM",
        }
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeSlot {
    type Err = ReadingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AM" => Ok(TimeSlot::Am),
            "PM" => Ok(TimeSlot::Pm),
            _ => Err(ReadingError::InvalidSlot(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadingError {
    #[error("systolic and diastolic required")]
    MissingPressure,
    #[error("{0} must be greater than 0")]
    NonPositive(&'static str),
    #[error("invalid time slot '{0}', expected AM or PM")]
    InvalidSlot(String),
}

/// A single blood pressure measurement.
///
/// `id` is identity only (used for deletion), never for ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    pub id: i64,
    pub date: NaiveDate,
    #[serde(rename = "time")]
    pub slot: TimeSlot,
    pub systolic: u32,
    pub diastolic: u32,
    pub heart_rate: Option<u32>,
}

impl Reading {
    #[must_use]
    pub fn category(&self) -> Category {
        classify(self.systolic, self.diastolic)
    }

    #[must_use]
    pub fn slot_key(&self) -> (NaiveDate, TimeSlot) {
        (self.date, self.slot)
    }
}

/// User or CLI input for a reading that has not been assigned an id yet.
///
/// Pressures are optional so a half-filled form can be represented; turning
/// it into a `Reading` refuses anything incomplete.
#[derive(Debug, Clone)]
pub struct NewReading {
    pub date: NaiveDate,
    pub slot: TimeSlot,
    pub systolic: Option<u32>,
    pub diastolic: Option<u32>,
    pub heart_rate: Option<u32>,
}

impl NewReading {
    pub fn into_reading(self, id: i64) -> Result<Reading, ReadingError> {
        let (Some(systolic), Some(diastolic)) = (self.systolic, self.diastolic) else {
            return Err(ReadingError::MissingPressure);
        };
        if systolic == 0 {
            return Err(ReadingError::NonPositive("systolic"));
        }
        if diastolic == 0 {
            return Err(ReadingError::NonPositive("diastolic"));
        }
        Ok(Reading {
            id,
            date: self.date,
            slot: self.slot,
            systolic,
            diastolic,
            // A zero pulse means the field was left blank.
            heart_rate: self.heart_rate.filter(|&hr| hr > 0),
        })
    }
}
