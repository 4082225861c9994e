// src/acquire/mod.rs
pub mod camera;
pub mod permissions;
pub mod picker;

use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

use permissions::Capability;

#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("{0} permission denied")]
    PermissionDenied(Capability),
    #[error("no capture device available")]
    NoDevice,
    #[error("capture failed: {0}")]
    Capture(String),
    #[error("clipboard error: {0}")]
    Clipboard(String),
    #[error("could not stage image: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not encode image: {0}")]
    Encode(#[from] image::ImageError),
}

/// Where a selection came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
    Camera,
    Picker,
    Clipboard,
}

/// A media reference as handed over by a source. Picker paths are readable
/// directly; clipboard content only exists as bytes and has to be staged
/// into a temp file before it can be uploaded.
pub enum ContentRef {
    Path(PathBuf),
    Bytes { file_name: String, data: Vec<u8> },
}

/// Staged temp file, removed as soon as the last selection holding it
/// is dropped or replaced.
#[derive(Debug)]
struct StagedTemp(PathBuf);

impl Drop for StagedTemp {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.0) {
            warn!("Failed to remove staged file {}: {}", self.0.display(), e);
        } else {
            info!("Removed staged file {}", self.0.display());
        }
    }
}

/// One readable local file ready for upload.
#[derive(Clone, Debug)]
pub struct SelectedImage {
    path: PathBuf,
    file_name: String,
    source: Source,
    staged: Option<Arc<StagedTemp>>,
}

impl SelectedImage {
    pub fn from_path(path: PathBuf, source: Source) -> Self {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.png")
            .to_string();
        Self {
            path,
            file_name,
            source,
            staged: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn is_staged(&self) -> bool {
        self.staged.is_some()
    }
}

static STAGE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Resolve a content reference into a readable local file. Byte-backed
/// content is copied into a private temp file, and that temp file (not the
/// original reference) is what gets uploaded.
pub fn stage(content: ContentRef, source: Source) -> Result<SelectedImage, AcquireError> {
    match content {
        ContentRef::Path(path) => Ok(SelectedImage::from_path(path, source)),
        ContentRef::Bytes { file_name, data } => {
            let dir = storage_dir()?;
            let seq = STAGE_SEQ.fetch_add(1, Ordering::Relaxed);
            let path = dir.join(format!("upload_{}_{}_{}", std::process::id(), seq, file_name));
            fs::write(&path, &data)?;
            info!("Staged {} bytes to {}", data.len(), path.display());
            Ok(SelectedImage {
                path: path.clone(),
                file_name,
                source,
                staged: Some(Arc::new(StagedTemp(path))),
            })
        }
    }
}

/// Private picture/staging directory for this application.
pub fn storage_dir() -> std::io::Result<PathBuf> {
    let dir = std::env::temp_dir().join("helmetsnap");
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_backed_content_passes_through_unstaged() {
        let selected = stage(
            ContentRef::Path(PathBuf::from("/pictures/site_photo.jpg")),
            Source::Picker,
        )
        .unwrap();

        assert_eq!(selected.path(), Path::new("/pictures/site_photo.jpg"));
        assert_eq!(selected.file_name(), "site_photo.jpg");
        assert!(!selected.is_staged());
    }

    #[test]
    fn byte_backed_content_is_copied_to_a_temp_file() {
        let data = vec![7u8, 1, 9, 200, 33];
        let selected = stage(
            ContentRef::Bytes {
                file_name: "pasted.png".to_string(),
                data: data.clone(),
            },
            Source::Clipboard,
        )
        .unwrap();

        assert!(selected.is_staged());
        assert_eq!(selected.file_name(), "pasted.png");
        // The staged copy, not the original reference, is what gets uploaded.
        assert_eq!(fs::read(selected.path()).unwrap(), data);
    }

    #[test]
    fn staged_temp_is_removed_when_selection_is_dropped() {
        let selected = stage(
            ContentRef::Bytes {
                file_name: "pasted.png".to_string(),
                data: vec![1, 2, 3],
            },
            Source::Clipboard,
        )
        .unwrap();
        let path = selected.path().to_path_buf();

        assert!(path.exists());
        drop(selected);
        assert!(!path.exists());
    }

    #[test]
    fn clones_share_the_staged_temp() {
        let selected = stage(
            ContentRef::Bytes {
                file_name: "pasted.png".to_string(),
                data: vec![4, 5, 6],
            },
            Source::Clipboard,
        )
        .unwrap();
        let path = selected.path().to_path_buf();

        let worker_copy = selected.clone();
        drop(selected);
        assert!(path.exists());
        drop(worker_copy);
        assert!(!path.exists());
    }
}
