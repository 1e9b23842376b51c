use crate::helpers::{Harness, clock, date};
use rand::SeedableRng;
use rand::rngs::StdRng;
use streak::StreakError;
use streak::ledger::LEDGER_HEADER;

#[test]
fn reads_do_not_create_the_file() {
    let h = Harness::new();
    assert_eq!(h.store().read_today_count(&clock(10)).unwrap(), 0);
    assert!(!h.ledger_path().exists());

    h.store().ensure_initialized().unwrap();
    let text = std::fs::read_to_string(h.ledger_path()).unwrap();
    assert_eq!(text, format!("{LEDGER_HEADER}\n"));
}

#[test]
fn ledger_directory_is_created() {
    let h = Harness::new();
    let store = streak::ledger::LedgerStore::new(h.dir.path().join("nested/deeper/c.csv"), 3..=12);
    store.ensure_initialized().unwrap();
    assert!(store.path().exists());
}

#[test]
fn limit_is_stable_for_a_day() {
    let h = Harness::new();
    let store = h.store();
    let mut rng = StdRng::seed_from_u64(3);

    let first = store.read_today_limit(&clock(10), &mut rng).unwrap();
    let second = store.read_today_limit(&clock(10), &mut rng).unwrap();
    assert_eq!(first, second);

    let record = store.write_today_count(&clock(10), 1, &mut rng).unwrap();
    assert_eq!(record.daily_limit, first);
}

#[test]
fn write_keeps_other_days_untouched() {
    let h = Harness::new();
    h.seed_ledger("date,contributions,daily_limit\n2023-10-08,3,7\n2023-10-09,2,4\n");
    let mut rng = StdRng::seed_from_u64(5);

    h.store().write_today_count(&clock(9), 3, &mut rng).unwrap();
    let text = std::fs::read_to_string(h.ledger_path()).unwrap();
    assert_eq!(
        text,
        "date,contributions,daily_limit\n2023-10-08,3,7\n2023-10-09,3,4\n"
    );
}

#[test]
fn existing_row_limit_is_read_back() {
    let h = Harness::new();
    h.seed_ledger("date,contributions,daily_limit\n2023-10-10,2,9\n");
    let mut rng = StdRng::seed_from_u64(0);

    assert_eq!(h.store().read_today_count(&clock(10)).unwrap(), 2);
    assert_eq!(h.store().read_today_limit(&clock(10), &mut rng).unwrap(), 9);
}

#[test]
fn malformed_row_is_a_ledger_error() {
    let h = Harness::new();
    h.seed_ledger("date,contributions,daily_limit\n2023-10-10,many,9\n");

    let err = h.store().read_today_count(&clock(10)).unwrap_err();
    assert!(matches!(err, StreakError::Ledger(_)));
}

#[test]
fn records_follow_dates_in_order_of_first_write() {
    let h = Harness::new();
    let mut rng = StdRng::seed_from_u64(2);
    let store = h.store();
    store.write_today_count(&clock(12), 1, &mut rng).unwrap();
    store.write_today_count(&clock(13), 1, &mut rng).unwrap();
    store.write_today_count(&clock(12), 2, &mut rng).unwrap();

    let ledger = store.load().unwrap();
    let dates: Vec<_> = ledger.records().iter().map(|r| r.date).collect();
    assert_eq!(dates, vec![date(12), date(13)]);
    assert_eq!(ledger.get(date(12)).unwrap().contributions, 2);
}
