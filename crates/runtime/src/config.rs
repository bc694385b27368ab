use std::path::PathBuf;

pub const PROGRAM_NAME: &str = "vfsdir";
pub const PROGRAM_LOG_LEVEL: &str = "VFSDIR_LOG_LEVEL";
pub const PROGRAM_LOG_FILE: &str = "VFSDIR_LOG_FILE";
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Name of the per-directory exclusion list.
pub const HIDDEN_LIST_NAME: &str = ".hidden";

/// Upper bound on how much of a `.hidden` file is read. Anything past this
/// point is silently ignored.
pub const HIDDEN_LIST_MAX_BYTES: u64 = 4096;

pub fn xdg_or_home(xdg_var: &str, home_suffix: &str) -> PathBuf {
    if let Some(dir) = std::env::var_os(xdg_var) {
        PathBuf::from(dir)
    } else {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(home_suffix)
    }
}

pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| xdg_or_home("XDG_CONFIG_HOME", ".config"))
        .join(PROGRAM_NAME)
}

pub fn cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| xdg_or_home("XDG_CACHE_HOME", ".cache"))
        .join(PROGRAM_NAME)
}

/// Default location of the settings file
pub fn default_settings_path() -> PathBuf {
    config_dir().join(SETTINGS_FILE_NAME)
}

/// Root of the thumbnail cache; renders live in one subdirectory per pixel size.
pub fn thumbnail_cache_root() -> PathBuf {
    cache_dir().join("thumbnails")
}

/// Mount roots that recursive size walks never descend into. These are
/// virtual filesystems where walking is either meaningless or can hang.
pub const UNSAFE_MOUNT_ROOTS: &[&str] = &["/proc", "/sys", "/dev", "/run", "/var/run"];
