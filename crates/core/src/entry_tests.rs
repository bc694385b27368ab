use super::*;

use std::fs::write as write_file;

use crate::mime::GuessClassifier;

#[test]
fn load_reads_stat_and_defaults_display_name() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    write_file(tmp.path().join("notes.txt"), b"hello").expect("write file");

    let entry = FileEntry::load(tmp.path(), OsStr::new("notes.txt")).expect("load entry");

    assert_eq!(entry.name(), OsStr::new("notes.txt"));
    assert_eq!(entry.path(), tmp.path().join("notes.txt"));
    assert_eq!(entry.disp_name(), "notes.txt");
    assert_eq!(entry.size(), 5);
    assert!(!entry.has_mime());
    assert!(!entry.is_dir());
}

#[test]
fn load_missing_name_fails() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    assert!(FileEntry::load(tmp.path(), OsStr::new("missing")).is_err());
}

#[test]
fn refresh_picks_up_new_size_and_invalidates_caches() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let path = tmp.path().join("grow.txt");
    write_file(&path, b"ab").expect("write file");

    let entry = FileEntry::load(tmp.path(), OsStr::new("grow.txt")).expect("load entry");
    entry.resolve_mime(&GuessClassifier::new());
    assert_eq!(entry.disp_size(), "2 B");
    entry.set_thumbnail(true, Arc::new(RgbaImage::new(1, 1)));

    write_file(&path, vec![b'x'; 2048]).expect("rewrite file");
    entry.refresh().expect("refresh");

    assert_eq!(entry.size(), 2048);
    assert_eq!(entry.disp_size(), "2.0 KiB");
    assert!(!entry.has_mime());
    assert!(!entry.is_thumbnail_loaded(true));
}

#[test]
fn refresh_after_removal_errors() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let path = tmp.path().join("gone.txt");
    write_file(&path, b"x").expect("write file");

    let entry = FileEntry::load(tmp.path(), OsStr::new("gone.txt")).expect("load entry");
    std::fs::remove_file(&path).expect("remove file");

    assert!(entry.refresh().is_err());
}

#[test]
fn desktop_entry_takes_name_and_icon() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    write_file(
        tmp.path().join("editor.desktop"),
        "[Desktop Entry]\nName=Text Editor\nIcon=accessories-text-editor\n",
    )
    .expect("write desktop file");

    let entry = FileEntry::load(tmp.path(), OsStr::new("editor.desktop")).expect("load entry");
    entry.resolve_mime(&GuessClassifier::new());

    assert!(entry.is_desktop_entry());
    assert_eq!(entry.disp_name(), "Text Editor");
    assert_eq!(entry.icon_name().as_deref(), Some("accessories-text-editor"));
}

#[test]
fn deep_size_overrides_directory_size() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    std::fs::create_dir(tmp.path().join("sub")).expect("create dir");

    let entry = FileEntry::load(tmp.path(), OsStr::new("sub")).expect("load entry");
    assert!(entry.is_dir());
    let _ = entry.disp_size();

    entry.set_deep_size(3 * 1024);
    assert!(entry.flags().contains(EntryFlags::DEEP_SIZE));
    assert_eq!(entry.disp_size(), "3.0 KiB");
}

#[test]
fn ref_count_tracks_holders() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    write_file(tmp.path().join("a"), b"").expect("write file");

    let entry: FileEntryRef =
        Arc::new(FileEntry::load(tmp.path(), OsStr::new("a")).expect("load entry"));
    assert_eq!(FileEntry::ref_count(&entry), 1);

    let watcher = Arc::clone(&entry);
    assert_eq!(FileEntry::ref_count(&entry), 2);
    drop(watcher);
    assert_eq!(FileEntry::ref_count(&entry), 1);
}

#[test]
fn permission_string_describes_the_link_itself() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    std::fs::create_dir(tmp.path().join("real")).expect("create dir");
    std::os::unix::fs::symlink(tmp.path().join("real"), tmp.path().join("alias"))
        .expect("create symlink");

    let link = FileEntry::load(tmp.path(), OsStr::new("alias")).expect("load link");
    let dir = FileEntry::load(tmp.path(), OsStr::new("real")).expect("load dir");

    assert!(link.is_dir());
    assert!(link.disp_perm().starts_with('l'), "{}", link.disp_perm());
    assert!(dir.disp_perm().starts_with('d'), "{}", dir.disp_perm());
}
