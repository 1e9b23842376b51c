//! Per-date contribution ledger.
//!
//! One CSV row per calendar date: `date,contributions,daily_limit`. Rows are
//! created lazily the first time a date is touched and updated in place
//! afterwards; nothing is ever deleted.

pub mod record;
pub mod store;

pub use record::{DailyRecord, LEDGER_HEADER, Ledger};
pub use store::LedgerStore;
