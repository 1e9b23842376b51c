//! Ledger rows and their CSV text form.

use crate::error::{Result, StreakError};
use chrono::NaiveDate;

/// Header row of the ledger file.
pub const LEDGER_HEADER: &str = "date,contributions,daily_limit";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One calendar date's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyRecord {
    /// Ledger key. Unique within a ledger.
    pub date: NaiveDate,
    /// Contributions made on `date`.
    pub contributions: u32,
    /// Cap drawn the first time `date` was seen. Never changes afterwards.
    pub daily_limit: u32,
}

impl DailyRecord {
    /// Whether today's quota is used up.
    pub fn quota_exhausted(&self) -> bool {
        crate::policy::quota_exhausted(self.contributions, self.daily_limit)
    }

    fn to_row(self) -> String {
        format!(
            "{},{},{}",
            self.date.format(DATE_FORMAT),
            self.contributions,
            self.daily_limit
        )
    }

    fn parse_row(line: &str, line_no: usize) -> Result<Self> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let [date, contributions, daily_limit] = fields.as_slice() else {
            return Err(StreakError::Ledger(format!(
                "line {line_no}: expected 3 fields, found {}",
                fields.len()
            )));
        };

        let date = NaiveDate::parse_from_str(date, DATE_FORMAT)
            .map_err(|e| StreakError::Ledger(format!("line {line_no}: bad date {date:?}: {e}")))?;
        let contributions = contributions.parse::<u32>().map_err(|e| {
            StreakError::Ledger(format!(
                "line {line_no}: bad contributions {contributions:?}: {e}"
            ))
        })?;
        let daily_limit = daily_limit.parse::<u32>().map_err(|e| {
            StreakError::Ledger(format!(
                "line {line_no}: bad daily_limit {daily_limit:?}: {e}"
            ))
        })?;

        Ok(Self {
            date,
            contributions,
            daily_limit,
        })
    }
}

/// The full ledger, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    records: Vec<DailyRecord>,
}

impl Ledger {
    /// Parse ledger text. An empty string or a lone header is an empty ledger.
    ///
    /// A repeated date keeps its first position but takes the later values.
    pub fn parse(text: &str) -> Result<Self> {
        let mut ledger = Self::default();
        let mut seen_content = false;

        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let first = !seen_content;
            seen_content = true;
            if first && line == LEDGER_HEADER {
                continue;
            }

            let record = DailyRecord::parse_row(line, idx + 1)?;
            if let Some(existing) = ledger.records.iter_mut().find(|r| r.date == record.date) {
                tracing::warn!(
                    "ledger has a duplicate row for {}; keeping the later one",
                    record.date
                );
                *existing = record;
            } else {
                ledger.records.push(record);
            }
        }

        Ok(ledger)
    }

    /// Render as CSV text: header plus one row per record, newline-terminated.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(32 * (self.records.len() + 1));
        out.push_str(LEDGER_HEADER);
        out.push('\n');
        for record in &self.records {
            out.push_str(&record.to_row());
            out.push('\n');
        }
        out
    }

    /// The record for `date`, if any.
    pub fn get(&self, date: NaiveDate) -> Option<&DailyRecord> {
        self.records.iter().find(|r| r.date == date)
    }

    /// Set `contributions` for `date`. A new row draws its limit from `new_limit`;
    /// an existing row keeps its limit.
    pub fn set_count(
        &mut self,
        date: NaiveDate,
        contributions: u32,
        new_limit: impl FnOnce() -> u32,
    ) -> DailyRecord {
        if let Some(existing) = self.records.iter_mut().find(|r| r.date == date) {
            existing.contributions = contributions;
            return *existing;
        }

        let record = DailyRecord {
            date,
            contributions,
            daily_limit: new_limit(),
        };
        self.records.push(record);
        record
    }

    /// All records in file order.
    pub fn records(&self) -> &[DailyRecord] {
        &self.records
    }

    /// Number of dates recorded.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no date has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
