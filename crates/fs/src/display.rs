use chrono::{Local, TimeZone};

use crate::stat::{
    S_IFBLK, S_IFCHR, S_IFDIR, S_IFIFO, S_IFLNK, S_IFMT, S_IFSOCK,
};

const SIZE_UNITS: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

pub fn format_size(size: u64) -> String {
    let mut value = size as f64;
    let mut unit = 0usize;

    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", size, SIZE_UNITS[0])
    } else {
        format!("{:.1} {}", value, SIZE_UNITS[unit])
    }
}

/// Local time as `%Y-%m-%d %H:%M`; empty for timestamps chrono rejects.
pub fn format_mtime(secs: i64) -> String {
    match Local.timestamp_opt(secs, 0).single() {
        Some(t) => t.format("%Y-%m-%d %H:%M").to_string(),
        None => String::new(),
    }
}

/// `ls -l` style permission string, e.g. `drwxr-xr-x`.
pub fn format_permissions(mode: u32) -> String {
    let kind = match mode & S_IFMT {
        S_IFDIR => 'd',
        S_IFLNK => 'l',
        S_IFCHR => 'c',
        S_IFBLK => 'b',
        S_IFIFO => 'p',
        S_IFSOCK => 's',
        _ => '-',
    };

    let mut out = String::with_capacity(10);
    out.push(kind);

    // (read, write, exec, special bit, special char when exec set / unset)
    let triads = [
        (0o400, 0o200, 0o100, 0o4000, ('s', 'S')),
        (0o040, 0o020, 0o010, 0o2000, ('s', 'S')),
        (0o004, 0o002, 0o001, 0o1000, ('t', 'T')),
    ];

    for (r, w, x, special, (set_exec, set_noexec)) in triads {
        out.push(if mode & r != 0 { 'r' } else { '-' });
        out.push(if mode & w != 0 { 'w' } else { '-' });
        out.push(match (mode & x != 0, mode & special != 0) {
            (true, true) => set_exec,
            (false, true) => set_noexec,
            (true, false) => 'x',
            (false, false) => '-',
        });
    }

    out
}

pub fn format_owner(uid: u32, gid: u32) -> String {
    format!("{uid}:{gid}")
}

#[cfg(test)]
#[path = "display_tests.rs"]
mod tests;
