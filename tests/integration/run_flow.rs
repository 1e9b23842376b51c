use crate::helpers::{EXE, Harness, MemoryCrontab, clock};
use streak::config::GeneratorConfig;
use streak::generator::DeferredGenerator;
use streak::lock::RunLock;
use streak::policy::Decision;
use streak::{RunOutcome, RunState, StreakError};

const GENERATED: &str = "Sure! - feat(api): add endpoint";

#[test]
fn exhausted_quota_exits_without_side_effects() {
    let h = Harness::new();
    h.seed_ledger("date,contributions,daily_limit\n2023-10-10,5,5\n");

    let outcome = h.orchestrator(10, 1.0, GENERATED).run().expect("run");
    assert_eq!(outcome, RunOutcome::QuotaExhausted { count: 5, limit: 5 });
    assert_eq!(outcome.terminal_state(), RunState::ExitQuota);
    assert!(h.calls().is_empty());
    assert!(h.crontab.text().is_empty());
}

#[test]
fn unbuildable_generator_only_fails_acting_runs() {
    let h = Harness::new();
    h.seed_ledger("date,contributions,daily_limit\n2023-10-10,5,5\n");
    let generator = || {
        Box::new(DeferredGenerator::new(GeneratorConfig {
            api_key_env: Some("STREAK_TEST_KEY_THAT_IS_NEVER_SET".to_owned()),
            ..GeneratorConfig::default()
        }))
    };

    let outcome = h.orchestrator_with(10, 1.0, generator()).run().expect("quota run");
    assert_eq!(outcome, RunOutcome::QuotaExhausted { count: 5, limit: 5 });

    let err = h
        .orchestrator_with(11, 1.0, generator())
        .run()
        .expect_err("acting run needs a generator");
    assert!(matches!(err, StreakError::Config(_)));
}

#[test]
fn skip_leaves_count_and_schedule_alone() {
    let h = Harness::new();
    let outcome = h.orchestrator(10, 0.0, GENERATED).run().expect("run");
    assert_eq!(outcome.terminal_state(), RunState::ExitSkip);

    let RunOutcome::Skipped { count, limit } = outcome else {
        panic!("expected skip, got {outcome:?}");
    };
    assert_eq!(count, 0);
    assert!((3..=12).contains(&limit));
    assert_eq!(h.store().read_today_count(&clock(10)).expect("count"), 0);
    assert!(h.calls().is_empty());
    assert!(h.crontab.text().is_empty());
}

#[test]
fn acting_run_records_commits_pushes_and_reschedules() {
    let h = Harness::new();
    let outcome = h.orchestrator(10, 1.0, GENERATED).run().expect("run");
    assert_eq!(outcome.terminal_state(), RunState::End);
    assert!(outcome.contributed());

    let RunOutcome::Contributed {
        record,
        message,
        committed,
        pushed,
        next_run,
    } = outcome
    else {
        panic!("expected contribution, got {outcome:?}");
    };
    assert_eq!(record.contributions, 1);
    assert_eq!(message, "feat(api): add endpoint");
    assert!(committed);
    assert!(pushed);
    assert!((15..=45).contains(&next_run.minute_offset));

    assert_eq!(
        h.calls(),
        vec!["add .", "commit feat(api): add endpoint", "push"]
    );
    assert_eq!(h.store().read_today_count(&clock(10)).expect("count"), 1);

    let table = h.crontab.text();
    let own: Vec<&str> = table.lines().filter(|l| l.contains(EXE)).collect();
    assert_eq!(own.len(), 1);
    assert!(own[0].starts_with(&format!("{} * * * * cd /srv/repo && ", next_run.minute())));
}

#[test]
fn push_failure_still_reschedules() {
    let mut h = Harness::new();
    h.vcs.push_stderr = Some("fatal: could not read from remote".to_owned());

    let outcome = h.orchestrator(10, 1.0, GENERATED).run().expect("run");
    let RunOutcome::Contributed { pushed, .. } = outcome else {
        panic!("expected contribution, got {outcome:?}");
    };
    assert!(!pushed);
    assert_eq!(h.crontab.text().lines().count(), 1);
}

#[test]
fn unusable_generated_text_aborts_before_commit() {
    let h = Harness::new();
    let err = h
        .orchestrator(10, 1.0, "no bullet anywhere")
        .run()
        .expect_err("format error");
    assert!(matches!(err, StreakError::GenerationFormat { .. }));

    assert_eq!(h.calls(), vec!["add ."]);
    assert!(h.crontab.text().is_empty());
    // Recording happens before the commit step.
    assert_eq!(h.store().read_today_count(&clock(10)).expect("count"), 1);
}

#[test]
fn runs_until_quota_then_stop() {
    let h = Harness::new();
    let mut orchestrator = h.orchestrator(10, 1.0, GENERATED);

    let mut contributions = 0;
    let limit = loop {
        match orchestrator.run().expect("run") {
            RunOutcome::Contributed { .. } => contributions += 1,
            RunOutcome::QuotaExhausted { count, limit } => {
                assert_eq!(count, limit);
                break limit;
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(contributions <= 12, "limit never reached");
    };

    assert_eq!(contributions, limit);
    assert!((3..=12).contains(&limit));
    let commits = h.calls().iter().filter(|c| c.starts_with("commit")).count();
    assert_eq!(commits as u32, limit);
    assert_eq!(h.store().load().expect("ledger").len(), 1);
    assert_eq!(
        h.crontab.text().lines().filter(|l| l.contains(EXE)).count(),
        1
    );
}

#[test]
fn new_day_starts_a_new_row() {
    let h = Harness::new();
    h.seed_ledger("date,contributions,daily_limit\n2023-10-10,5,5\n");

    h.orchestrator(11, 1.0, GENERATED).run().expect("run");
    let ledger = h.store().load().expect("ledger");
    assert_eq!(ledger.len(), 2);
    assert_eq!(ledger.records()[0].contributions, 5);
    assert_eq!(ledger.records()[1].contributions, 1);
}

#[test]
fn held_lock_rejects_second_run() {
    let h = Harness::new();
    let lock_path = RunLock::path_for(&h.ledger_path());
    let _held = RunLock::acquire(&lock_path).expect("first lock");

    let err = h
        .orchestrator(10, 1.0, GENERATED)
        .with_lock(lock_path.clone())
        .run()
        .expect_err("lock contention");
    assert!(matches!(err, StreakError::Lock(_)));
    assert!(h.calls().is_empty());
}

#[test]
fn lock_released_after_run() {
    let h = Harness::new();
    let lock_path = RunLock::path_for(&h.ledger_path());
    h.orchestrator(10, 1.0, GENERATED)
        .with_lock(lock_path.clone())
        .run()
        .expect("run");
    assert!(!lock_path.exists());
}

#[test]
fn dry_run_records_nothing() {
    let h = Harness::new();
    let outcome = h
        .orchestrator(10, 1.0, GENERATED)
        .dry_run(true)
        .run()
        .expect("dry run");
    assert_eq!(
        outcome,
        RunOutcome::DryRun {
            count: 0,
            limit: None,
            decision: Decision::Act,
        }
    );
    assert!(!h.ledger_path().exists());
    assert!(h.calls().is_empty());
    assert!(h.crontab.text().is_empty());
}

#[test]
fn stage_paths_are_configurable() {
    let h = Harness::new();
    h.orchestrator(10, 1.0, GENERATED)
        .with_stage_paths(vec!["contributions.csv".to_owned(), "notes.md".to_owned()])
        .run()
        .expect("run");
    assert_eq!(h.calls()[0], "add contributions.csv notes.md");
}

#[test]
fn unrelated_cron_lines_survive_a_run() {
    let mut h = Harness::new();
    h.crontab = MemoryCrontab::with_table(&format!(
        "0 3 * * * backup\n5 * * * * cd /srv/repo && {EXE} run\n*/5 * * * * poll\n"
    ));

    h.orchestrator(10, 1.0, GENERATED).run().expect("run");
    let table = h.crontab.text();
    assert!(table.contains("0 3 * * * backup\n"));
    assert!(table.contains("*/5 * * * * poll\n"));
    assert!(!table.contains(&format!("5 * * * * cd /srv/repo && {EXE} run\n")));
    assert_eq!(table.lines().filter(|l| l.contains(EXE)).count(), 1);
}
