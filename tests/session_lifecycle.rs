//! Session lifecycle scenarios: shelf resume, conflicts, failed posts

use cadastre::{
    BlockKey, BranchEngine, Config, ConflictPolicy, Dataset, EditSession, FeatureId, Notifier,
    NotifyOutcome, Polygon, Process, ProcessName, ProcessStatus, ProcessType, RecordingTransport,
    SessionState,
};

fn name() -> ProcessName {
    ProcessName::parse("226/2019").unwrap()
}

fn seeded_engine() -> BranchEngine {
    let mut ds = Dataset::new();
    let p = Process {
        id: FeatureId::new(),
        name: name(),
        process_type: ProcessType::Ordinary,
        status: ProcessStatus::Submitted,
        border: Polygon::empty(),
        block: BlockKey::new(2069, 0),
    };
    ds.processes.insert(p.id, p);
    BranchEngine::new(ds)
}

fn test_config() -> (Config, tempfile::TempDir) {
    let tmp = tempfile::tempdir().unwrap();
    let config = Config {
        library_dir: tmp.path().to_path_buf(),
        ..Config::default()
    };
    (config, tmp)
}

#[test]
fn reopen_reuses_record_and_branch() {
    let engine = seeded_engine();
    let (config, _tmp) = test_config();
    let first = EditSession::open(&engine, &config, &name(), "surveyor").unwrap();
    let second = EditSession::open(&engine, &config, &name(), "surveyor").unwrap();
    assert_eq!(first.record_id(), second.record_id());
    assert_eq!(first.branch(), second.branch());
    assert_eq!(engine.branch_names().len(), 1);
}

#[test]
fn expired_shelf_entry_forces_fresh_branch() {
    let engine = seeded_engine();
    let (config, _tmp) = test_config();
    let config = Config {
        shelf_ttl_hours: 0,
        ..config
    };
    let first = EditSession::open(&engine, &config, &name(), "surveyor").unwrap();
    let second = EditSession::open(&engine, &config, &name(), "surveyor").unwrap();
    assert_eq!(first.branch(), "226_2019_surveyor_1");
    assert_eq!(second.branch(), "226_2019_surveyor_2");
}

#[test]
fn concurrent_baseline_edit_resolves_in_favor_of_branch() {
    let engine = seeded_engine();
    let (config, _tmp) = test_config();
    let mut session = EditSession::open(&engine, &config, &name(), "surveyor").unwrap();

    // Someone else moves the same process row in the baseline while the
    // session is editing it in its branch.
    engine.with_baseline_mut(|ds| {
        ds.processes.update_where(
            |p| p.name == name(),
            |p| p.status = ProcessStatus::InEditing,
        );
    });

    let report = session.close(&engine, &config).unwrap();
    assert!(!report.conflicts.is_empty());
    // The branch's final status wins over the concurrent baseline edit.
    let status = engine.with_baseline(|ds| ds.processes_named(&name())[0].status);
    assert_eq!(status, ProcessStatus::Recorded);
}

#[test]
fn failed_post_leaves_session_reconciling() {
    let engine = seeded_engine();
    let (config, _tmp) = test_config();
    let mut session = EditSession::open(&engine, &config, &name(), "surveyor").unwrap();
    // Sabotage: the branch gets posted behind the session's back, so the
    // session's own post must fail.
    engine
        .post(session.branch(), ConflictPolicy::FavorEdit)
        .unwrap();
    assert!(session.close(&engine, &config).is_err());
    assert_eq!(session.state(), SessionState::Reconciling);
    // The branch still exists; nothing was deleted or recreated.
    assert_eq!(engine.branch_names().len(), 1);
}

#[test]
fn notifier_rejection_does_not_fail_the_close() {
    let engine = seeded_engine();
    let (config, _tmp) = test_config();
    let mut session = EditSession::open(&engine, &config, &name(), "surveyor").unwrap();
    session.close(&engine, &config).unwrap();
    assert_eq!(session.state(), SessionState::Closed);

    // The case system answering 404 is an outcome, not an error.
    let notifier = Notifier::new(
        "http://cms.local/processes",
        RecordingTransport::answering(NotifyOutcome::NotFound),
    );
    let outcome = engine.with_baseline(|ds| {
        let process = ds.processes_named(&name())[0].clone();
        notifier.notify(&process, process.status)
    });
    assert_eq!(outcome, NotifyOutcome::NotFound);
    // The registry keeps its recorded state regardless.
    let status = engine.with_baseline(|ds| ds.processes_named(&name())[0].status);
    assert_eq!(status, ProcessStatus::Recorded);
}

#[test]
fn record_is_one_to_one_with_process() {
    let engine = seeded_engine();
    let (config, _tmp) = test_config();
    let mut session = EditSession::open(&engine, &config, &name(), "surveyor").unwrap();
    session.close(&engine, &config).unwrap();
    let record_count = engine.with_baseline(|ds| ds.records.len());
    assert_eq!(record_count, 1);
}
