//! Daily live-network usage counter.
//!
//! The counter is a best-effort, file-backed `{date, count}` record. It resets
//! whenever the stored date is not today, treats a missing or corrupt file as
//! a fresh zero counter, and silently drops writes it cannot persist
//! (read-only filesystems). Concurrent processes are not locked against each
//! other, so the ceiling can be overshot by a small margin.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Durable daily counter shared across process restarts.
pub trait UsageCounter: Send + Sync {
    /// Profiles consumed today.
    fn read(&self) -> u32;
    /// Adds `n` to today's count. Never fails; persistence errors are swallowed.
    fn increment(&self, n: u32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub date: NaiveDate,
    pub count: u32,
}

impl UsageRecord {
    fn fresh(date: NaiveDate) -> Self {
        Self { date, count: 0 }
    }
}

/// JSON file store: `{"date": "YYYY-MM-DD", "count": n}`.
pub struct FileUsageCounter {
    path: PathBuf,
    // Serializes read-modify-write within this process only.
    lock: Mutex<()>,
}

impl FileUsageCounter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Today's record as seen on `today`; stale or unreadable files read as zero.
    pub fn load_on(&self, today: NaiveDate) -> UsageRecord {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "usage file unreadable, starting at zero");
                return UsageRecord::fresh(today);
            }
        };

        match serde_json::from_str::<UsageRecord>(&raw) {
            Ok(record) if record.date == today => record,
            Ok(_) => UsageRecord::fresh(today),
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "usage file corrupt, starting at zero");
                UsageRecord::fresh(today)
            }
        }
    }

    pub fn increment_on(&self, today: NaiveDate, n: u32) {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut record = self.load_on(today);
        record.count = record.count.saturating_add(n);
        self.store(&record);
    }

    /// Writes via a sibling temp file and rename so readers never see a torn record.
    fn store(&self, record: &UsageRecord) {
        let result = (|| -> std::io::Result<()> {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let tmp = self.path.with_extension("json.tmp");
            let body = serde_json::to_vec(record)?;
            std::fs::write(&tmp, body)?;
            std::fs::rename(&tmp, &self.path)
        })();

        if let Err(e) = result {
            debug!(path = %self.path.display(), error = %e, "usage file not persisted");
        }
    }
}

impl UsageCounter for FileUsageCounter {
    fn read(&self) -> u32 {
        self.load_on(today()).count
    }

    fn increment(&self, n: u32) {
        self.increment_on(today(), n);
    }
}

/// Used when no usage file location is available: always reads zero.
pub struct NullUsageCounter;

impl UsageCounter for NullUsageCounter {
    fn read(&self) -> u32 {
        0
    }

    fn increment(&self, _n: u32) {}
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaLevel {
    Ok,
    Low,
    Critical,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuotaStatus {
    pub used: u32,
    pub limit: u32,
    pub remaining: u32,
    pub level: QuotaLevel,
}

/// Enforces the daily live-network ceiling on top of a `UsageCounter`.
#[derive(Clone)]
pub struct QuotaGovernor {
    counter: Arc<dyn UsageCounter>,
    daily_limit: u32,
}

impl QuotaGovernor {
    pub fn new(counter: Arc<dyn UsageCounter>, daily_limit: u32) -> Self {
        Self {
            counter,
            daily_limit,
        }
    }

    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    pub fn used(&self) -> u32 {
        self.counter.read()
    }

    pub fn remaining(&self) -> u32 {
        self.daily_limit.saturating_sub(self.used())
    }

    pub fn is_exhausted(&self) -> bool {
        self.used() >= self.daily_limit
    }

    /// Lowers a requested profile cap to what is left of today's quota.
    pub fn clamp(&self, requested: u32) -> u32 {
        requested.min(self.remaining())
    }

    pub fn record(&self, profiles: u32) {
        self.counter.increment(profiles);
    }

    pub fn status(&self) -> QuotaStatus {
        let used = self.used();
        let remaining = self.daily_limit.saturating_sub(used);
        let level = if remaining > 500 {
            QuotaLevel::Ok
        } else if remaining > 200 {
            QuotaLevel::Low
        } else {
            QuotaLevel::Critical
        };
        QuotaStatus {
            used,
            limit: self.daily_limit,
            remaining,
            level,
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;

    /// Process-local counter for pipeline tests.
    #[derive(Default)]
    pub struct MemoryUsageCounter(Mutex<u32>);

    impl MemoryUsageCounter {
        pub fn starting_at(count: u32) -> Self {
            Self(Mutex::new(count))
        }
    }

    impl UsageCounter for MemoryUsageCounter {
        fn read(&self) -> u32 {
            *self.0.lock().unwrap()
        }

        fn increment(&self, n: u32) {
            *self.0.lock().unwrap() += n;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MemoryUsageCounter;
    use super::*;
    use tempfile::TempDir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[test]
    fn test_missing_file_reads_zero() {
        let dir = TempDir::new().unwrap();
        let counter = FileUsageCounter::new(dir.path().join("usage.json"));
        assert_eq!(counter.load_on(day(1)), UsageRecord::fresh(day(1)));
    }

    #[test]
    fn test_increments_accumulate_and_persist() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("usage.json");
        let counter = FileUsageCounter::new(&path);
        counter.increment_on(day(3), 25);
        counter.increment_on(day(3), 17);

        // A second process opening the same file mid-day sees the same count.
        let other = FileUsageCounter::new(&path);
        assert_eq!(other.load_on(day(3)).count, 42);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"2026-10-03\""), "raw was {raw}");
    }

    #[test]
    fn test_new_day_resets_count() {
        let dir = TempDir::new().unwrap();
        let counter = FileUsageCounter::new(dir.path().join("usage.json"));
        counter.increment_on(day(3), 900);
        assert_eq!(counter.load_on(day(4)).count, 0);

        counter.increment_on(day(4), 5);
        assert_eq!(counter.load_on(day(4)).count, 5);
    }

    #[test]
    fn test_corrupt_file_reads_zero() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("usage.json");
        std::fs::write(&path, "{not json").unwrap();
        let counter = FileUsageCounter::new(&path);
        assert_eq!(counter.load_on(day(2)).count, 0);

        counter.increment_on(day(2), 3);
        assert_eq!(counter.load_on(day(2)).count, 3);
    }

    #[test]
    fn test_unwritable_location_degrades_silently() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "a file, not a directory").unwrap();
        let counter = FileUsageCounter::new(blocker.join("usage.json"));

        counter.increment_on(day(5), 10);
        assert_eq!(counter.load_on(day(5)).count, 0);
    }

    #[test]
    fn test_governor_clamps_to_remaining() {
        let governor = QuotaGovernor::new(Arc::new(MemoryUsageCounter::starting_at(940)), 1000);
        assert_eq!(governor.remaining(), 60);
        assert_eq!(governor.clamp(100), 60);
        assert_eq!(governor.clamp(25), 25);
        assert!(!governor.is_exhausted());
    }

    #[test]
    fn test_governor_exhausted_at_and_over_limit() {
        let counter = Arc::new(MemoryUsageCounter::starting_at(1000));
        let governor = QuotaGovernor::new(counter.clone(), 1000);
        assert!(governor.is_exhausted());
        assert_eq!(governor.remaining(), 0);

        counter.increment(30);
        assert!(governor.is_exhausted());
        assert_eq!(governor.clamp(50), 0);
    }

    #[test]
    fn test_status_levels() {
        let level_at = |used| {
            QuotaGovernor::new(Arc::new(MemoryUsageCounter::starting_at(used)), 1000)
                .status()
                .level
        };
        assert_eq!(level_at(0), QuotaLevel::Ok);
        assert_eq!(level_at(600), QuotaLevel::Low);
        assert_eq!(level_at(800), QuotaLevel::Critical);
    }

    #[test]
    fn test_null_counter_never_counts() {
        let governor = QuotaGovernor::new(Arc::new(NullUsageCounter), 1000);
        governor.record(500);
        assert_eq!(governor.used(), 0);
    }
}
