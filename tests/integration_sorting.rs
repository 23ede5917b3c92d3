use assert_fs::prelude::*;
use assert_fs::TempDir;
use autosort::core::config::{Config, ConflictResolution, MemoryConfigStore};
use autosort::core::mover::{ChannelResolver, ConflictDecision, MoveOutcome};
use autosort::core::rules::{Condition, SortRule};
use autosort::events::{Event, EventChannel, MoveEvent};
use autosort::{AutoSortError, AutoSorter};
use predicates::prelude::*;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

fn sorter_with(temp: &TempDir, configure: impl FnOnce(&mut Config)) -> AutoSorter {
    let mut config = Config::with_folders(temp.child("Downloads").path(), temp.child("Sorted").path());
    config.grace_period_seconds = 3600;
    config.rules = vec![
        SortRule::new("Large", "Large", 80)
            .with_id("large")
            .with_condition(Condition::SizeGreaterThan(10_000_000)),
        SortRule::for_extensions("Docs", &["pdf"], "Docs", 50).with_id("docs"),
        SortRule::new("Camera", "Camera", 60)
            .with_id("camera")
            .with_condition(Condition::NameRegex(r"^IMG_\d+".to_string())),
    ];
    configure(&mut config);
    temp.child("Downloads").create_dir_all().unwrap();

    AutoSorter::builder()
        .config_store(Box::new(MemoryConfigStore::with_config(config)))
        .build()
        .unwrap()
}

#[test]
fn test_large_pdf_goes_to_higher_priority_rule() {
    let temp = TempDir::new().unwrap();
    let sorter = sorter_with(&temp, |_| {});
    let report = temp.child("Downloads/report.pdf");
    report.write_binary(&vec![0u8; 15_000_000]).unwrap();

    let pending = sorter.scan().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].matched_destination_folder, "Large");

    sorter.move_now(&pending[0].id).unwrap();

    temp.child("Sorted/Large/report.pdf").assert(predicate::path::is_file());
    report.assert(predicate::path::missing());
}

#[test]
fn test_caret_pattern_only_matches_name_start() {
    let temp = TempDir::new().unwrap();
    let sorter = sorter_with(&temp, |_| {});
    temp.child("Downloads/IMG_1024.jpg").write_str("a").unwrap();
    temp.child("Downloads/vacation_IMG_1024.jpg").write_str("b").unwrap();

    let pending = sorter.scan().unwrap();

    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].file_name, "IMG_1024.jpg");
    assert_eq!(pending[0].matched_destination_folder, "Camera");
}

#[test]
fn test_rename_policy_numbers_duplicates() {
    let temp = TempDir::new().unwrap();
    let sorter = sorter_with(&temp, |_| {});
    temp.child("Sorted/Docs/report.pdf").write_str("first").unwrap();
    temp.child("Sorted/Docs/report (1).pdf").write_str("second").unwrap();
    temp.child("Downloads/report.pdf").write_str("third").unwrap();

    let file = sorter.scan().unwrap().remove(0);
    sorter.move_now(&file.id).unwrap();

    temp.child("Sorted/Docs/report (2).pdf")
        .assert(predicate::str::contains("third"));
    temp.child("Sorted/Docs/report.pdf")
        .assert(predicate::str::contains("first"));
}

#[test]
fn test_overwrite_cannot_be_undone() {
    let temp = TempDir::new().unwrap();
    let sorter = sorter_with(&temp, |c| c.conflict_resolution = ConflictResolution::Overwrite);
    temp.child("Sorted/Docs/report.pdf").write_str("old").unwrap();
    temp.child("Downloads/report.pdf").write_str("new").unwrap();

    let file = sorter.scan().unwrap().remove(0);
    sorter.move_now(&file.id).unwrap();

    temp.child("Sorted/Docs/report.pdf").assert("new");
    let record = sorter.history().remove(0);
    assert!(!record.can_undo);
    assert!(matches!(sorter.undo(&record.id), Err(AutoSortError::Undo(_))));
}

#[test]
fn test_skip_leaves_file_and_writes_no_history() {
    let temp = TempDir::new().unwrap();
    let sorter = sorter_with(&temp, |c| c.conflict_resolution = ConflictResolution::Skip);
    temp.child("Sorted/Docs/report.pdf").write_str("old").unwrap();
    temp.child("Downloads/report.pdf").write_str("new").unwrap();

    let file = sorter.scan().unwrap().remove(0);
    let outcome = sorter.move_now(&file.id).unwrap();

    assert!(matches!(outcome, MoveOutcome::Skipped { .. }));
    temp.child("Downloads/report.pdf").assert("new");
    assert!(sorter.history().is_empty());
    assert!(sorter.pending().is_empty());
}

#[test]
fn test_ask_policy_uses_resolver_answer() {
    let temp = TempDir::new().unwrap();
    let mut config = Config::with_folders(temp.child("Downloads").path(), temp.child("Sorted").path());
    config.grace_period_seconds = 3600;
    config.conflict_resolution = ConflictResolution::Ask;
    config.rules = vec![SortRule::for_extensions("Docs", &["pdf"], "Docs", 50).with_id("docs")];
    temp.child("Downloads").create_dir_all().unwrap();
    temp.child("Sorted/Docs/report.pdf").write_str("old").unwrap();
    temp.child("Downloads/report.pdf").write_str("new").unwrap();

    let (resolver, requests) = ChannelResolver::new();
    let sorter = AutoSorter::builder()
        .config_store(Box::new(MemoryConfigStore::with_config(config)))
        .resolver(Arc::new(resolver))
        .ask_timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    let ui = thread::spawn(move || {
        let request = requests.recv().unwrap();
        assert_eq!(request.prompt.file_name, "report.pdf");
        request.respond(ConflictDecision::Skip);
    });

    let file = sorter.scan().unwrap().remove(0);
    let outcome = sorter.move_now(&file.id).unwrap();
    ui.join().unwrap();

    assert!(matches!(outcome, MoveOutcome::Skipped { .. }));
    temp.child("Sorted/Docs/report.pdf").assert("old");
}

#[test]
fn test_ask_without_resolver_fails_the_move() {
    let temp = TempDir::new().unwrap();
    let sorter = sorter_with(&temp, |c| c.conflict_resolution = ConflictResolution::Ask);
    temp.child("Sorted/Docs/report.pdf").write_str("old").unwrap();
    temp.child("Downloads/report.pdf").write_str("new").unwrap();

    let file = sorter.scan().unwrap().remove(0);
    let result = sorter.move_now(&file.id);

    assert!(matches!(result, Err(AutoSortError::Move(_))));
    assert!(sorter.pending().is_empty());
    temp.child("Downloads/report.pdf").assert(predicate::path::exists());
}

#[test]
fn test_cancel_and_move_now_race() {
    for _ in 0..10 {
        let temp = TempDir::new().unwrap();
        let sorter = Arc::new(sorter_with(&temp, |_| {}));
        temp.child("Downloads/report.pdf").write_str("pdf").unwrap();
        let id = sorter.scan().unwrap().remove(0).id;
        let barrier = Arc::new(Barrier::new(2));

        let canceller = {
            let (sorter, barrier, id) = (sorter.clone(), barrier.clone(), id.clone());
            thread::spawn(move || {
                barrier.wait();
                sorter.cancel(&id)
            })
        };
        let mover = {
            let (sorter, barrier, id) = (sorter.clone(), barrier.clone(), id.clone());
            thread::spawn(move || {
                barrier.wait();
                sorter.move_now(&id).is_ok()
            })
        };

        let cancelled = canceller.join().unwrap();
        let moved = mover.join().unwrap();

        assert!(cancelled ^ moved);
        assert_eq!(sorter.history().len(), usize::from(moved));
    }
}

#[test]
fn test_timer_fires_after_grace_period() {
    let temp = TempDir::new().unwrap();
    let (sender, events) = EventChannel::new();
    let mut config = Config::with_folders(temp.child("Downloads").path(), temp.child("Sorted").path());
    config.grace_period_seconds = 0;
    config.rules = vec![SortRule::for_extensions("Docs", &["pdf"], "Docs", 50).with_id("docs")];
    temp.child("Downloads").create_dir_all().unwrap();
    temp.child("Downloads/report.pdf").write_str("pdf").unwrap();

    let sorter = AutoSorter::builder()
        .config_store(Box::new(MemoryConfigStore::with_config(config)))
        .events(sender)
        .build()
        .unwrap();
    let scheduled = sorter.scan().unwrap().remove(0);
    assert_eq!(scheduled.move_at, scheduled.added_at);

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut completed = None;
    while Instant::now() < deadline {
        if let Some(Event::Move(MoveEvent::Completed { record })) =
            events.recv_timeout(Duration::from_millis(100))
        {
            completed = Some(record);
            break;
        }
    }

    let record = completed.expect("timer should have moved the file");
    assert_eq!(record.new_path, temp.child("Sorted/Docs/report.pdf").path());
    assert_eq!(sorter.stats().lifetime_moved, 1);
}

#[test]
fn test_watcher_schedules_new_downloads() {
    let temp = TempDir::new().unwrap();
    let sorter = sorter_with(&temp, |_| {});
    sorter.start().unwrap();

    temp.child("Downloads/notes.pdf").write_str("pdf").unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while sorter.pending().is_empty() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(20));
    }
    sorter.stop();

    let pending = sorter.pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].file_name, "notes.pdf");
    assert!(!sorter.status().is_running);
}

#[test]
fn test_same_name_downloaded_twice_is_sorted_twice() {
    let temp = TempDir::new().unwrap();
    let sorter = sorter_with(&temp, |_| {});
    let report = temp.child("Downloads/report.pdf");

    report.write_str("first").unwrap();
    let first = sorter.scan().unwrap().remove(0);
    sorter.move_now(&first.id).unwrap();

    report.write_str("second, a different file").unwrap();
    let second = sorter.scan().unwrap();
    assert_eq!(second.len(), 1);
    sorter.move_now(&second[0].id).unwrap();

    temp.child("Sorted/Docs/report.pdf").assert("first");
    temp.child("Sorted/Docs/report (1).pdf").assert("second, a different file");
    assert_eq!(sorter.history().len(), 2);
}
