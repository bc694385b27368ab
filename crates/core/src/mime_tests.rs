use super::*;

use vfsdir_fs::{S_IFDIR, S_IFREG};

fn regular() -> FileStat {
    FileStat {
        mode: S_IFREG | 0o644,
        ..FileStat::default()
    }
}

#[test]
fn classifies_by_extension() {
    let classifier = GuessClassifier::new();

    let png = classifier.classify(Path::new("/p/photo.PNG"), &regular());
    assert_eq!(png.name(), "image/png");
    assert!(png.is_image());
    assert!(!png.is_video());

    let mp4 = classifier.classify(Path::new("/p/clip.mp4"), &regular());
    assert!(mp4.is_video());
}

#[test]
fn directories_and_desktop_entries() {
    let classifier = GuessClassifier::new();

    let dir = FileStat {
        mode: S_IFDIR | 0o755,
        ..FileStat::default()
    };
    let mime = classifier.classify(Path::new("/p/photos.png"), &dir);
    assert!(mime.is_dir());
    assert_eq!(mime.description(), "Folder");

    let desktop = classifier.classify(Path::new("/p/app.desktop"), &regular());
    assert!(desktop.is_desktop_entry());
}

#[test]
fn unknown_extension_falls_back() {
    let classifier = GuessClassifier::new();
    let mime = classifier.classify(Path::new("/p/blob.zzzqqq"), &regular());
    assert_eq!(mime.name(), MIME_UNKNOWN);

    let exe = FileStat {
        mode: S_IFREG | 0o755,
        ..FileStat::default()
    };
    let mime = classifier.classify(Path::new("/p/tool"), &exe);
    assert_eq!(mime.name(), MIME_EXECUTABLE);
}

#[test]
fn broken_links_are_not_guessed_from_name() {
    let classifier = GuessClassifier::new();
    let stat = FileStat {
        is_symlink: true,
        is_broken_link: true,
        ..regular()
    };
    let mime = classifier.classify(Path::new("/p/dangling.png"), &stat);
    assert!(!mime.is_image());
}

#[test]
fn equal_types_share_a_handle_until_reload() {
    let classifier = GuessClassifier::new();
    let a = classifier.classify(Path::new("/p/a.png"), &regular());
    let b = classifier.classify(Path::new("/p/b.png"), &regular());
    assert!(MimeType::ptr_eq(&a, &b));

    classifier.reload();
    let c = classifier.classify(Path::new("/p/c.png"), &regular());
    assert!(!MimeType::ptr_eq(&a, &c));
    assert_eq!(a, c);
}

#[test]
fn describe_builds_readable_names() {
    assert_eq!(describe("image/png"), "PNG image");
    assert_eq!(describe("application/pdf"), "PDF file");
    assert_eq!(describe("text/plain"), "Plain text");
    assert_eq!(describe("image/svg+xml"), "SVG image");
    assert_eq!(describe(MIME_DIRECTORY), "Folder");
}
