use crate::helpers::{EXE, MemoryCrontab, clock, target};
use rand::SeedableRng;
use rand::rngs::StdRng;
use streak::scheduler::Rescheduler;

fn rescheduler(crontab: &MemoryCrontab) -> Rescheduler {
    Rescheduler::new(Box::new(crontab.clone()), target(), 15..=45).unwrap()
}

#[test]
fn installs_into_empty_table() {
    let crontab = MemoryCrontab::default();
    let mut rng = StdRng::seed_from_u64(9);

    let next = rescheduler(&crontab).reschedule(&clock(10), &mut rng).unwrap();
    assert_eq!(
        crontab.text(),
        format!(
            "{} * * * * cd /srv/repo && {EXE} run --config /etc/streak/config.toml\n",
            next.minute()
        )
    );
}

#[test]
fn minute_is_offset_from_now() {
    let crontab = MemoryCrontab::default();
    let mut rng = StdRng::seed_from_u64(4);

    // Clock reads 10:00, so the minute equals the offset.
    let next = rescheduler(&crontab).reschedule(&clock(10), &mut rng).unwrap();
    assert!((15..=45).contains(&next.minute_offset));
    assert_eq!(next.minute(), next.minute_offset);
}

#[test]
fn repeated_reschedules_keep_one_line() {
    let crontab = MemoryCrontab::with_table("0 3 * * * backup\n");
    let rescheduler = rescheduler(&crontab);
    let mut rng = StdRng::seed_from_u64(11);

    for _ in 0..5 {
        rescheduler.reschedule(&clock(10), &mut rng).unwrap();
    }
    let table = crontab.text();
    assert_eq!(table.lines().count(), 2);
    assert!(table.starts_with("0 3 * * * backup\n"));
    assert_eq!(rescheduler.installed_lines().unwrap().len(), 1);
}

#[test]
fn unschedule_without_line_leaves_table_alone() {
    let crontab = MemoryCrontab::with_table("0 3 * * * backup\n");
    assert_eq!(rescheduler(&crontab).unschedule().unwrap(), 0);
    assert_eq!(crontab.text(), "0 3 * * * backup\n");
}
