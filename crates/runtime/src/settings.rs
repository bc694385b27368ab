use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::default_settings_path;

const MIB: u64 = 1024 * 1024;

/// Tunables for directory tracking. Every field has a default so a partial
/// settings file only overrides what it names.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct VfsSettings {
    /// Delay of the shared sweep that drains pending change queues.
    pub change_debounce_ms: u64,

    /// How long a delayed image/video change must stay untouched before it
    /// is processed.
    pub delayed_quiet_ms: u64,

    /// Image and video files smaller than this go to the delayed queue on
    /// change; bigger ones are processed with the regular sweep.
    pub delayed_change_max_size: u64,

    /// Pixel size of large thumbnails.
    pub thumbnail_size_large: u32,

    /// Pixel size of small thumbnails.
    pub thumbnail_size_small: u32,

    /// Images bigger than this are never decoded for thumbnails.
    pub max_thumbnail_file_size: u64,

    /// Directories under any of these prefixes ignore unforced create and
    /// change notifications.
    pub avoid_changes_prefixes: Vec<PathBuf>,
}

impl Default for VfsSettings {
    fn default() -> Self {
        Self {
            change_debounce_ms: 200,
            delayed_quiet_ms: 1000,
            delayed_change_max_size: 20 * MIB,
            thumbnail_size_large: 128,
            thumbnail_size_small: 48,
            max_thumbnail_file_size: 16 * MIB,
            avoid_changes_prefixes: Vec::new(),
        }
    }
}

impl VfsSettings {
    /// Load settings from the default location.
    ///
    /// A missing file yields the defaults. A file that cannot be parsed is
    /// reported and also yields the defaults.
    pub fn load() -> Self {
        let path = default_settings_path();
        if !path.exists() {
            debug!("no settings file at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("ignoring settings file: {e:#}");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings at {}", path.display()))?;

        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse settings at {}", path.display()))
    }

    #[inline]
    pub fn change_debounce(&self) -> Duration {
        Duration::from_millis(self.change_debounce_ms)
    }

    #[inline]
    pub fn delayed_quiet(&self) -> Duration {
        Duration::from_millis(self.delayed_quiet_ms)
    }

    #[inline]
    pub fn thumbnail_size(&self, large: bool) -> u32 {
        if large {
            self.thumbnail_size_large
        } else {
            self.thumbnail_size_small
        }
    }

    /// Whether `dir` falls under one of the avoid-changes prefixes.
    pub fn avoids_changes(&self, dir: &Path) -> bool {
        self.avoid_changes_prefixes
            .iter()
            .any(|prefix| dir.starts_with(prefix))
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
