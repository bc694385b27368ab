mod config;
pub mod logging;
pub mod settings;

pub use config::{
    HIDDEN_LIST_MAX_BYTES, HIDDEN_LIST_NAME, PROGRAM_NAME, UNSAFE_MOUNT_ROOTS, cache_dir,
    config_dir, default_settings_path, thumbnail_cache_root,
};

pub use logging::init;
pub use settings::VfsSettings;
