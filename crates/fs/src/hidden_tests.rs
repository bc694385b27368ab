use super::*;
use std::fs::write;

#[test]
fn parse_skips_blank_lines_and_carriage_returns() {
    let list = HiddenList::parse(b"a.txt\n\nb.jpg\r\n  spaced  \n");

    assert_eq!(list.len(), 3);
    assert!(list.contains(OsStr::new("a.txt")));
    assert!(list.contains(OsStr::new("b.jpg")));
    assert!(list.contains(OsStr::new("  spaced  ")));
    assert!(!list.contains(OsStr::new("spaced")));
}

#[test]
fn parse_empty_input() {
    assert!(HiddenList::parse(b"").is_empty());
    assert!(HiddenList::parse(b"\n\n").is_empty());
}

#[test]
fn load_reads_hidden_file_from_dir() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    write(tmp.path().join(".hidden"), b"a.txt\n").expect("write .hidden");

    let list = HiddenList::load(tmp.path()).expect("list should load");
    assert!(list.contains(OsStr::new("a.txt")));
}

#[test]
fn load_missing_file_is_none() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    assert!(HiddenList::load(tmp.path()).is_none());
}

#[test]
fn load_truncates_at_read_limit() {
    let tmp = tempfile::tempdir().expect("create temp dir");

    // One name that fills the whole buffer, then one past the limit.
    let mut contents = "x".repeat(HIDDEN_LIST_MAX_BYTES as usize - 1);
    contents.push('\n');
    contents.push_str("beyond\n");
    write(tmp.path().join(".hidden"), contents).expect("write .hidden");

    let list = HiddenList::load(tmp.path()).expect("list should load");
    assert_eq!(list.len(), 1);
    assert!(!list.contains(OsStr::new("beyond")));
}
