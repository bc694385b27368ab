mod desktop;
mod display;
mod hidden;
mod places;
mod stat;
mod walker;

pub use desktop::DesktopEntry;
pub use display::{format_mtime, format_owner, format_permissions, format_size};
pub use hidden::HiddenList;
pub use places::{Places, TrashConfig};
pub use stat::{FileStat, S_IFBLK, S_IFCHR, S_IFDIR, S_IFIFO, S_IFLNK, S_IFMT, S_IFREG, S_IFSOCK};
pub use walker::{DirSize, dir_size, is_unsafe_mount};
