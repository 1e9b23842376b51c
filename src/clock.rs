//! Wall-clock access, injectable for tests.

use chrono::{DateTime, Local, NaiveDate};

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current local time.
    fn now(&self) -> DateTime<Local>;

    /// Current local calendar date. This is the ledger key.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// The host's local clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Local>);

impl FixedClock {
    /// Freeze at the given local date and time. Returns `None` for
    /// out-of-range or ambiguous local times.
    pub fn at(date: NaiveDate, hour: u32, min: u32) -> Option<Self> {
        let naive = date.and_hms_opt(hour, min, 0)?;
        naive.and_local_timezone(Local).single().map(Self)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use chrono::Timelike;

    #[test]
    fn fixed_clock_reports_its_date() {
        let date = NaiveDate::from_ymd_opt(2023, 10, 10).unwrap();
        let clock = FixedClock::at(date, 12, 30).unwrap();
        assert_eq!(clock.today(), date);
        assert_eq!(clock.now().minute(), 30);
    }
}
