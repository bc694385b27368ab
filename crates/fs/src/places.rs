use std::path::{Path, PathBuf};

/// Well-known user directories a listing gets flagged against.
#[derive(Debug, Clone, Default)]
pub struct Places {
    home: Option<PathBuf>,
    desktop: Option<PathBuf>,
    trash: TrashConfig,
}

#[derive(Debug, Clone, Default)]
pub struct TrashConfig {
    pub(crate) roots: Vec<PathBuf>,
}

impl Places {
    /// Resolve the current user's home, desktop and trash directories.
    pub fn detect() -> Self {
        Self {
            home: dirs::home_dir(),
            desktop: dirs::desktop_dir(),
            trash: TrashConfig::new(),
        }
    }

    pub fn with_dirs(home: Option<PathBuf>, desktop: Option<PathBuf>, trash: TrashConfig) -> Self {
        Self {
            home,
            desktop,
            trash,
        }
    }

    #[inline]
    pub fn is_home(&self, dir: &Path) -> bool {
        self.home.as_deref() == Some(dir)
    }

    #[inline]
    pub fn is_desktop(&self, dir: &Path) -> bool {
        self.desktop.as_deref() == Some(dir)
    }

    #[inline]
    pub fn is_trash(&self, dir: &Path) -> bool {
        self.trash.is_in_trash(dir)
    }
}

impl TrashConfig {
    pub fn new() -> Self {
        // $XDG_DATA_HOME/Trash, or ~/.local/share/Trash
        let roots = dirs::data_dir()
            .map(|data| data.join("Trash"))
            .into_iter()
            .collect();

        TrashConfig { roots }
    }

    /// Inside the home trash, or inside a per-volume `.Trash-<uid>` /
    /// `.Trash/<uid>` directory.
    #[inline]
    pub fn is_in_trash(&self, path: &Path) -> bool {
        if self.roots.iter().any(|root| path.starts_with(root)) {
            return true;
        }

        let mut prev_was_trash = false;
        for comp in path.components() {
            let comp = comp.as_os_str().to_string_lossy();
            if comp.starts_with(".Trash-") || prev_was_trash {
                return true;
            }
            prev_was_trash = comp == ".Trash";
        }

        false
    }

    pub fn add_root(&mut self, root: PathBuf) {
        self.roots.push(root);
    }
}

#[cfg(test)]
#[path = "places_tests.rs"]
mod tests;
