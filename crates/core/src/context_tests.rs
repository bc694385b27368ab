use super::*;

use std::{fs, thread, time::Duration};

use crate::{
    ChannelObserver, DirEvent, ManualMonitor, MonitorEvent, MonitorEventKind,
    testutil::{context_with, manual_settings, wait_listed},
};

#[test]
fn same_path_yields_same_model() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let ctx = context_with(&ManualMonitor::new(), manual_settings());

    let first = ctx.get_or_create(tmp.path());
    let second = ctx.get_or_create(tmp.path());
    let with_slash = ctx.get_or_create(format!("{}/", tmp.path().display()));
    let with_dot = ctx.get_or_create(tmp.path().join("."));

    assert!(first.same_model(&second));
    assert!(first.same_model(&with_slash));
    assert!(first.same_model(&with_dot));
    assert_eq!(ctx.dir_count(), 1);
}

#[test]
fn model_is_destroyed_after_last_release() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let monitor = ManualMonitor::new();
    let ctx = context_with(&monitor, manual_settings());

    let first = ctx.get_or_create(tmp.path());
    let second = ctx.get_or_create(tmp.path());
    wait_listed(&first);
    assert!(monitor.is_watched(first.path()));

    first.release();
    let existing = ctx.get_existing(tmp.path()).expect("still referenced");
    assert!(existing.same_model(&second));
    drop(existing);

    second.release();
    assert!(ctx.get_existing(tmp.path()).is_none());
    assert_eq!(ctx.dir_count(), 0);
    assert!(monitor.watched_paths().is_empty());
}

#[test]
fn reopening_after_release_scans_again() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    fs::write(tmp.path().join("a.txt"), b"a").expect("write a.txt");
    let ctx = context_with(&ManualMonitor::new(), manual_settings());

    let first = ctx.get_or_create(tmp.path());
    wait_listed(&first);
    drop(first);

    fs::write(tmp.path().join("b.txt"), b"b").expect("write b.txt");
    let second = ctx.get_or_create(tmp.path());
    wait_listed(&second);

    assert_eq!(second.file_count(), 2);
}

#[test]
fn get_existing_does_not_create() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let ctx = context_with(&ManualMonitor::new(), manual_settings());

    assert!(ctx.get_existing(tmp.path()).is_none());
    assert_eq!(ctx.dir_count(), 0);
}

#[test]
fn concurrent_lookups_share_one_model() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let ctx = context_with(&ManualMonitor::new(), manual_settings());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ctx = ctx.clone();
            let path = tmp.path().to_path_buf();
            thread::spawn(move || ctx.get_or_create(path))
        })
        .collect();

    let dirs: Vec<VfsDir> = handles
        .into_iter()
        .map(|h| h.join().expect("lookup thread"))
        .collect();

    for dir in &dirs[1..] {
        assert!(dirs[0].same_model(dir));
    }
    assert_eq!(ctx.dir_count(), 1);
}

#[test]
fn releasing_mid_scan_cancels_it() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    for i in 0..200 {
        fs::write(tmp.path().join(format!("f{i}")), b"x").expect("write file");
    }
    let ctx = context_with(&ManualMonitor::new(), manual_settings());

    // Dropping must join the scan worker whatever phase it is in.
    let dir = ctx.get_or_create(tmp.path());
    drop(dir);

    assert!(ctx.get_existing(tmp.path()).is_none());
    assert!(!ctx.inner.pump.is_running());
}

#[test]
fn normalize_strips_dot_and_trailing_separator() {
    assert_eq!(normalize(Path::new("/a/./b/")), PathBuf::from("/a/b"));
    assert_eq!(normalize(Path::new("/")), PathBuf::from("/"));
}

#[test]
fn global_context_is_shared() {
    let a = VfsContext::global();
    let b = VfsContext::global();
    assert!(std::ptr::eq(a, b));
    assert!(Arc::ptr_eq(&a.inner, &b.inner));
}

fn expect_created(events: &crossbeam::channel::Receiver<DirEvent>, name: &str) {
    match events.recv_timeout(Duration::from_secs(5)) {
        Ok(DirEvent::Created(entry)) => assert_eq!(entry.name(), name),
        other => panic!("expected creation of {name}, got {other:?}"),
    }
}

#[test]
fn sweep_rearms_when_its_timer_was_lost() {
    let monitor = ManualMonitor::new();
    let tmp = tempfile::tempdir().expect("create temp dir");
    let settings = VfsSettings {
        change_debounce_ms: 20,
        ..manual_settings()
    };
    let ctx = context_with(&monitor, settings);
    let dir = ctx.get_or_create(tmp.path());
    wait_listed(&dir);
    assert!(!ctx.inner.pump.is_running());

    // A deadline recorded for a timer whose pump no longer exists.
    *lock(&ctx.inner.sweep_due) = Some(Instant::now() + Duration::from_secs(60));

    let (observer, events) = ChannelObserver::new();
    dir.add_observer(Arc::new(observer));
    fs::write(tmp.path().join("new.txt"), b"x").expect("write new.txt");
    monitor.emit(dir.path(), MonitorEvent::child(MonitorEventKind::Create, "new.txt"));

    expect_created(&events, "new.txt");
}

#[test]
fn reopening_after_last_release_still_sweeps() {
    let monitor = ManualMonitor::new();
    let first = tempfile::tempdir().expect("create temp dir");
    let second = tempfile::tempdir().expect("create temp dir");
    let settings = VfsSettings {
        change_debounce_ms: 20,
        ..manual_settings()
    };
    let ctx = context_with(&monitor, settings);

    // Leave a sweep armed on the pump, then let the registry empty out.
    let dir = ctx.get_or_create(first.path());
    wait_listed(&dir);
    dir.emit_file_created("pending.txt", true);
    assert!(ctx.inner.pump.is_running());
    drop(dir);
    assert!(!ctx.inner.pump.is_running());
    assert!(lock(&ctx.inner.sweep_due).is_none());

    let dir = ctx.get_or_create(second.path());
    wait_listed(&dir);
    let (observer, events) = ChannelObserver::new();
    dir.add_observer(Arc::new(observer));
    fs::write(second.path().join("fresh.txt"), b"x").expect("write fresh.txt");
    monitor.emit(dir.path(), MonitorEvent::child(MonitorEventKind::Create, "fresh.txt"));

    expect_created(&events, "fresh.txt");
}
