mod loader;

use std::{
    fs,
    os::unix::fs::MetadataExt,
    path::{Path, PathBuf},
};

use image::{DynamicImage, ImageFormat, RgbaImage};
use log::{debug, trace};
use vfsdir_runtime::thumbnail_cache_root;

pub(crate) use loader::ThumbnailLoader;

/// Renders thumbnails for image files.
pub trait ThumbnailDecoder: Send + Sync {
    /// Scaled copy of the image at `path` fitting in a `size` square, or
    /// `None` when it cannot be decoded. `mtime` is the source's modification
    /// time, for validating anything the decoder cached earlier.
    fn decode(&self, path: &Path, size: u32, mtime: i64) -> Option<RgbaImage>;
}

/// Decoder built on the `image` crate with an on-disk PNG cache.
///
/// Cached renders live at `<root>/<size>/<md5 of file URI>.png` and are
/// reused while they are at least as new as the source.
pub struct ImageThumbnailer {
    cache_root: Option<PathBuf>,
}

impl Default for ImageThumbnailer {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageThumbnailer {
    pub fn new() -> Self {
        Self {
            cache_root: Some(thumbnail_cache_root()),
        }
    }

    pub fn with_cache_root(root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: Some(root.into()),
        }
    }

    pub fn without_cache() -> Self {
        Self { cache_root: None }
    }

    fn cache_path(&self, path: &Path, size: u32) -> Option<PathBuf> {
        let root = self.cache_root.as_ref()?;
        let digest = md5::compute(file_uri(path).as_bytes());
        Some(root.join(size.to_string()).join(format!("{digest:x}.png")))
    }

    fn load_cached(cached: &Path, mtime: i64) -> Option<RgbaImage> {
        let meta = fs::metadata(cached).ok()?;
        if meta.mtime() < mtime {
            trace!("[thumbnail] stale cache entry {:?}", cached);
            return None;
        }
        image::open(cached).ok().map(|img| img.to_rgba8())
    }

    fn store(cached: &Path, thumb: &RgbaImage) {
        if let Some(parent) = cached.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            debug!("[thumbnail] cannot create {:?}: {e}", parent);
            return;
        }
        if let Err(e) = thumb.save_with_format(cached, ImageFormat::Png) {
            debug!("[thumbnail] cannot write {:?}: {e}", cached);
        }
    }
}

impl ThumbnailDecoder for ImageThumbnailer {
    fn decode(&self, path: &Path, size: u32, mtime: i64) -> Option<RgbaImage> {
        let cached = self.cache_path(path, size);

        if let Some(thumb) = cached.as_deref().and_then(|c| Self::load_cached(c, mtime)) {
            return Some(thumb);
        }

        let img = match image::open(path) {
            Ok(img) => img,
            Err(e) => {
                debug!("[thumbnail] cannot decode {:?}: {e}", path);
                return None;
            }
        };
        let thumb = scale(img, size);

        if let Some(cached) = cached {
            Self::store(&cached, &thumb);
        }
        Some(thumb)
    }
}

/// Shrink to fit a `size` square keeping the aspect ratio; never enlarges.
fn scale(img: DynamicImage, size: u32) -> RgbaImage {
    if img.width() <= size && img.height() <= size {
        return img.to_rgba8();
    }
    img.thumbnail(size, size).to_rgba8()
}

fn file_uri(path: &Path) -> String {
    let encoded = urlencoding::encode(&path.to_string_lossy()).replace("%2F", "/");
    format!("file://{encoded}")
}

#[cfg(test)]
#[path = "thumbnail_tests.rs"]
mod tests;
