use std::{fs, io, path::Path};

const DESKTOP_GROUP: &str = "[Desktop Entry]";

/// The bits of a `.desktop` file a listing shows instead of the file name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesktopEntry {
    pub name: Option<String>,
    pub icon: Option<String>,
}

impl DesktopEntry {
    pub fn load(path: &Path) -> io::Result<Self> {
        let raw = fs::read(path)?;
        Ok(Self::parse(&String::from_utf8_lossy(&raw)))
    }

    /// Only unlocalized `Name=` and `Icon=` keys of the `[Desktop Entry]`
    /// group are read; everything else is ignored.
    pub fn parse(contents: &str) -> Self {
        let mut entry = Self::default();
        let mut in_group = false;

        for line in contents.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') {
                in_group = line == DESKTOP_GROUP;
                continue;
            }

            if !in_group {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            match key.trim_end() {
                "Name" if entry.name.is_none() => entry.name = Some(value.to_owned()),
                "Icon" if entry.icon.is_none() => entry.icon = Some(value.to_owned()),
                _ => {}
            }
        }

        entry
    }
}

#[cfg(test)]
#[path = "desktop_tests.rs"]
mod tests;
