use super::*;
use crate::stat::S_IFREG;

#[test]
fn format_size_cases() {
    let cases: &[(u64, &str)] = &[
        (0, "0 B"),
        (512, "512 B"),
        (1023, "1023 B"),
        (1024, "1.0 KiB"),
        (1536, "1.5 KiB"),
        (500 * 1024, "500.0 KiB"),
        (5 * 1024 * 1024, "5.0 MiB"),
        (3 * 1024 * 1024 * 1024, "3.0 GiB"),
    ];

    for (size, expected) in cases {
        assert_eq!(format_size(*size), *expected, "format_size({size})");
    }
}

#[test]
fn format_permissions_cases() {
    let cases: &[(u32, &str)] = &[
        (S_IFREG | 0o644, "-rw-r--r--"),
        (S_IFDIR | 0o755, "drwxr-xr-x"),
        (S_IFLNK | 0o777, "lrwxrwxrwx"),
        (S_IFREG | 0o4755, "-rwsr-xr-x"),
        (S_IFREG | 0o2644, "-rw-r-Sr--"),
        (S_IFDIR | 0o1777, "drwxrwxrwt"),
        (S_IFDIR | 0o1776, "drwxrwxrwT"),
        (S_IFIFO | 0o600, "prw-------"),
    ];

    for (mode, expected) in cases {
        assert_eq!(format_permissions(*mode), *expected, "mode {mode:o}");
    }
}

#[test]
fn format_mtime_has_minute_precision() {
    let s = format_mtime(1_700_000_000);
    // YYYY-MM-DD HH:MM
    assert_eq!(s.len(), 16, "unexpected format: {s}");
    assert_eq!(&s[4..5], "-");
    assert_eq!(&s[13..14], ":");
}

#[test]
fn format_owner_is_numeric_pair() {
    assert_eq!(format_owner(1000, 100), "1000:100");
}
