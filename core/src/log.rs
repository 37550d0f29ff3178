use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use crate::models::{Reading, TimeSlot};

/// The reading collection.
///
/// Invariants, held after every operation:
/// - at most one reading per (date, slot)
/// - sorted by date descending, PM before AM within a date
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ReadingLog {
    readings: Vec<Reading>,
}

/// Outcome of [`ReadingLog::upsert`].
#[derive(Debug)]
pub enum Upsert {
    /// The slot was free; the reading is in the returned log.
    Inserted(ReadingLog),
    /// The slot is taken; the host must confirm or decline.
    Conflict(PendingReplacement),
}

/// A replacement waiting on the host's decision. Holds the untouched log.
#[derive(Debug)]
pub struct PendingReplacement {
    log: ReadingLog,
    incoming: Reading,
    existing: usize,
}

impl ReadingLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a log from rows in file order.
    ///
    /// When two rows share a slot the first one wins; the rest are returned.
    #[must_use]
    pub fn from_readings(readings: Vec<Reading>) -> (Self, Vec<Reading>) {
        let mut seen = HashSet::new();
        let (kept, dropped): (Vec<_>, Vec<_>) = readings
            .into_iter()
            .partition(|r| seen.insert(r.slot_key()));
        for r in &dropped {
            debug!(id = r.id, date = %r.date, slot = %r.slot, "dropping duplicate slot");
        }
        let mut log = Self { readings: kept };
        log.sort();
        (log, dropped)
    }

    #[must_use]
    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    #[must_use]
    pub fn into_readings(self) -> Vec<Reading> {
        self.readings
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Reading> {
        self.readings.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// The `n` most recent readings.
    #[must_use]
    pub fn recent(&self, n: usize) -> &[Reading] {
        &self.readings[..n.min(self.readings.len())]
    }

    #[must_use]
    pub fn find_slot(&self, date: NaiveDate, slot: TimeSlot) -> Option<&Reading> {
        self.readings
            .iter()
            .find(|r| r.date == date && r.slot == slot)
    }

    /// Allocate an id from the creation time, bumped past any existing id.
    ///
    /// `None` once a stored id already sits at `i64::MAX`.
    #[must_use]
    pub fn next_id(&self, now_millis: i64) -> Option<i64> {
        let max = self.readings.iter().map(|r| r.id).max();
        match max {
            Some(m) if m >= now_millis => m.checked_add(1),
            _ => Some(now_millis),
        }
    }

    /// Insert a reading, or report a conflict if its slot is already taken.
    #[must_use]
    pub fn upsert(mut self, reading: Reading) -> Upsert {
        if let Some(existing) = self
            .readings
            .iter()
            .position(|r| r.slot_key() == reading.slot_key())
        {
            return Upsert::Conflict(PendingReplacement {
                log: self,
                incoming: reading,
                existing,
            });
        }
        info!(id = reading.id, date = %reading.date, slot = %reading.slot, "reading added");
        self.readings.push(reading);
        self.sort();
        Upsert::Inserted(self)
    }

    /// Remove the reading with `id`. Unknown ids leave the log unchanged.
    #[must_use]
    pub fn remove(mut self, id: i64) -> (Self, Option<Reading>) {
        let removed = self
            .readings
            .iter()
            .position(|r| r.id == id)
            .map(|idx| self.readings.remove(idx));
        if removed.is_some() {
            info!(id, "reading removed");
        }
        (self, removed)
    }

    fn sort(&mut self) {
        self.readings
            .sort_by(|a, b| b.date.cmp(&a.date).then(b.slot.cmp(&a.slot)));
    }
}

impl<'a> IntoIterator for &'a ReadingLog {
    type Item = &'a Reading;
    type IntoIter = std::slice::Iter<'a, Reading>;

    fn into_iter(self) -> Self::IntoIter {
        self.readings.iter()
    }
}

impl Upsert {
    /// Settle the outcome, asking `confirm` only when there is a conflict.
    ///
    /// Returns the resulting log and whether an existing reading was replaced.
    pub fn resolve_with<F>(self, confirm: F) -> (ReadingLog, bool)
    where
        F: FnOnce(&PendingReplacement) -> bool,
    {
        match self {
            Upsert::Inserted(log) => (log, false),
            Upsert::Conflict(pending) => {
                if confirm(&pending) {
                    (pending.confirm(), true)
                } else {
                    (pending.decline(), false)
                }
            }
        }
    }
}

impl PendingReplacement {
    #[must_use]
    pub fn existing(&self) -> &Reading {
        &self.log.readings[self.existing]
    }

    #[must_use]
    pub fn incoming(&self) -> &Reading {
        &self.incoming
    }

    /// Drop the old reading and insert the new one.
    #[must_use]
    pub fn confirm(self) -> ReadingLog {
        let Self {
            mut log,
            incoming,
            existing,
        } = self;
        let old = log.readings.remove(existing);
        info!(
            old_id = old.id,
            new_id = incoming.id,
            date = %incoming.date,
            slot = %incoming.slot,
            "reading replaced"
        );
        log.readings.push(incoming);
        log.sort();
        log
    }

    /// Keep the log exactly as it was.
    #[must_use]
    pub fn decline(self) -> ReadingLog {
        debug!(date = %self.incoming.date, slot = %self.incoming.slot, "replacement declined");
        self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn reading(id: i64, d: &str, slot: TimeSlot, systolic: u32, diastolic: u32) -> Reading {
        Reading {
            id,
            date: date(d),
            slot,
            systolic,
            diastolic,
            heart_rate: None,
        }
    }

    fn insert(log: ReadingLog, r: Reading) -> ReadingLog {
        match log.upsert(r) {
            Upsert::Inserted(log) => log,
            Upsert::Conflict(_) => panic!("unexpected conflict"),
        }
    }

    fn assert_invariants(log: &ReadingLog) {
        let keys: HashSet<_> = log.iter().map(Reading::slot_key).collect();
        assert_eq!(keys.len(), log.len(), "duplicate slot in log");
        for pair in log.readings().windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(a.date > b.date || (a.date == b.date && a.slot == TimeSlot::Pm && b.slot == TimeSlot::Am));
        }
    }

    #[test]
    fn test_upsert_orders_by_date_desc_pm_first() {
        let mut log = ReadingLog::new();
        log = insert(log, reading(1, "2024-06-01", TimeSlot::Am, 118, 76));
        log = insert(log, reading(2, "2024-06-03", TimeSlot::Am, 120, 80));
        log = insert(log, reading(3, "2024-06-01", TimeSlot::Pm, 122, 81));
        log = insert(log, reading(4, "2024-06-03", TimeSlot::Pm, 125, 79));

        let ids: Vec<i64> = log.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![4, 2, 3, 1]);
        assert_invariants(&log);
    }

    #[test]
    fn test_upsert_conflict_confirmed_replaces() {
        let log = insert(
            ReadingLog::new(),
            reading(1, "2024-06-01", TimeSlot::Am, 118, 76),
        );
        let log = insert(log, reading(2, "2024-06-01", TimeSlot::Pm, 122, 81));

        let Upsert::Conflict(pending) = log.upsert(reading(3, "2024-06-01", TimeSlot::Am, 130, 85))
        else {
            panic!("expected conflict");
        };
        assert_eq!(pending.existing().id, 1);
        assert_eq!(pending.incoming().id, 3);

        let log = pending.confirm();
        assert_eq!(log.len(), 2);
        let am = log.find_slot(date("2024-06-01"), TimeSlot::Am).unwrap();
        assert_eq!(am.id, 3);
        assert_eq!(am.systolic, 130);
        assert!(log.iter().all(|r| r.id != 1));
        assert_invariants(&log);
    }

    #[test]
    fn test_upsert_conflict_declined_is_noop() {
        let log = insert(
            ReadingLog::new(),
            reading(1, "2024-06-01", TimeSlot::Am, 118, 76),
        );
        let before = log.clone();

        let Upsert::Conflict(pending) = log.upsert(reading(2, "2024-06-01", TimeSlot::Am, 140, 90))
        else {
            panic!("expected conflict");
        };
        assert_eq!(pending.decline(), before);
    }

    #[test]
    fn test_resolve_with_only_asks_on_conflict() {
        let log = ReadingLog::new();
        let (log, replaced) = log
            .upsert(reading(1, "2024-06-01", TimeSlot::Am, 118, 76))
            .resolve_with(|_| panic!("no conflict expected"));
        assert!(!replaced);

        let (log, replaced) = log
            .upsert(reading(2, "2024-06-01", TimeSlot::Am, 119, 77))
            .resolve_with(|p| p.existing().id == 1);
        assert!(replaced);
        assert_eq!(log.len(), 1);
        assert_eq!(log.readings()[0].id, 2);
    }

    #[test]
    fn test_remove_by_id() {
        let log = insert(
            ReadingLog::new(),
            reading(1, "2024-06-01", TimeSlot::Am, 118, 76),
        );
        let log = insert(log, reading(2, "2024-06-02", TimeSlot::Am, 120, 80));

        let (log, removed) = log.remove(1);
        assert_eq!(removed.map(|r| r.id), Some(1));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_remove_unknown_id_is_noop() {
        let log = insert(
            ReadingLog::new(),
            reading(1, "2024-06-01", TimeSlot::Am, 118, 76),
        );
        let before = log.clone();
        let (log, removed) = log.remove(99);
        assert!(removed.is_none());
        assert_eq!(log, before);
    }

    #[test]
    fn test_from_readings_sorts_and_keeps_first_duplicate() {
        let (log, dropped) = ReadingLog::from_readings(vec![
            reading(1, "2024-06-01", TimeSlot::Am, 118, 76),
            reading(2, "2024-06-02", TimeSlot::Am, 120, 80),
            reading(3, "2024-06-01", TimeSlot::Am, 150, 95),
            reading(4, "2024-06-01", TimeSlot::Pm, 122, 81),
        ]);
        let ids: Vec<i64> = log.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 4, 1]);
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].id, 3);
        assert_invariants(&log);
    }

    #[test]
    fn test_next_id_is_unique() {
        let log = insert(
            ReadingLog::new(),
            reading(5_000, "2024-06-01", TimeSlot::Am, 118, 76),
        );
        assert_eq!(log.next_id(10_000), Some(10_000));
        assert_eq!(log.next_id(5_000), Some(5_001));
        assert_eq!(log.next_id(1_000), Some(5_001));
        assert_eq!(ReadingLog::new().next_id(7), Some(7));
    }

    #[test]
    fn test_next_id_at_max_id() {
        let log = insert(
            ReadingLog::new(),
            reading(i64::MAX, "2024-06-01", TimeSlot::Am, 118, 76),
        );
        assert_eq!(log.next_id(1_700_000_000_000), None);

        let log = insert(
            ReadingLog::new(),
            reading(i64::MAX - 1, "2024-06-01", TimeSlot::Am, 118, 76),
        );
        assert_eq!(log.next_id(1_700_000_000_000), Some(i64::MAX));
    }

    #[test]
    fn test_recent_clamps_to_len() {
        let log = insert(
            ReadingLog::new(),
            reading(1, "2024-06-01", TimeSlot::Am, 118, 76),
        );
        assert_eq!(log.recent(10).len(), 1);
        assert_eq!(log.recent(0).len(), 0);
    }
}
