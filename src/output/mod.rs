//! Output sinks: temp file materialisation, sharing and saving
//!
//! Every share or save writes a fresh `QR-<millis>.png` into the cache
//! directory. Stamps are strictly increasing within the process, so
//! concurrent invocations never touch the same file.

pub mod platform;

use crate::codec::DisplayableImage;
use crate::error::{Error, FileOperation, PhotoAccess, Result};
use platform::{MediaLibrary, PermissionGate, ShareTarget};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::AsyncWriteExt;

static LAST_STAMP: AtomicU64 = AtomicU64::new(0);

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Next millisecond stamp, never repeating within this process.
fn next_stamp() -> u64 {
    let now = now_millis();
    let mut last = LAST_STAMP.load(Ordering::Relaxed);
    loop {
        let candidate = now.max(last + 1);
        match LAST_STAMP.compare_exchange_weak(last, candidate, Ordering::AcqRel, Ordering::Relaxed)
        {
            Ok(_) => return candidate,
            Err(actual) => last = actual,
        }
    }
}

/// Name for a new temporary image file.
pub fn temp_file_name() -> String {
    format!("QR-{}.png", next_stamp())
}

/// Write the image bytes to a new uniquely named file under `dir`.
pub async fn write_temp_image(dir: &Path, image: &DisplayableImage) -> io::Result<PathBuf> {
    let bytes = image
        .to_bytes()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

    tokio::fs::create_dir_all(dir).await?;

    loop {
        let path = dir.join(temp_file_name());
        // Another process may have used the same stamp.
        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        };

        file.write_all(&bytes).await?;
        file.flush().await?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Wrote temporary QR image");
        return Ok(path);
    }
}

/// Share and save operations over the platform collaborators
#[derive(Clone)]
pub struct OutputSink {
    cache_dir: PathBuf,
    share: Arc<dyn ShareTarget>,
    library: Arc<dyn MediaLibrary>,
    permissions: Arc<dyn PermissionGate>,
}

impl OutputSink {
    /// Build a sink writing temp files into `cache_dir`.
    pub fn new(
        cache_dir: impl Into<PathBuf>,
        share: Arc<dyn ShareTarget>,
        library: Arc<dyn MediaLibrary>,
        permissions: Arc<dyn PermissionGate>,
    ) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            share,
            library,
            permissions,
        }
    }

    /// Directory receiving temp files
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Permission gate shared with the rest of the session
    pub fn permissions(&self) -> &dyn PermissionGate {
        self.permissions.as_ref()
    }

    /// Write a temp file and hand it to the share mechanism.
    ///
    /// Returns the temp file path; it is left in place for the receiving application.
    pub async fn share(&self, image: &DisplayableImage) -> Result<PathBuf> {
        let path = write_temp_image(&self.cache_dir, image)
            .await
            .map_err(|e| Error::file_system(FileOperation::Share, e))?;

        self.share.share(&path).await.map_err(|e| {
            tracing::warn!(path = %path.display(), "Share failed: {e}");
            Error::file_system(FileOperation::Share, e)
        })?;

        tracing::info!(path = %path.display(), "Shared QR code");
        Ok(path)
    }

    /// Write a temp file and import it into the photo library.
    ///
    /// Returns the library location of the saved image.
    pub async fn save(&self, image: &DisplayableImage) -> Result<PathBuf> {
        if !self.permissions.granted(PhotoAccess::Write) {
            return Err(Error::Permission(PhotoAccess::Write));
        }

        let path = write_temp_image(&self.cache_dir, image)
            .await
            .map_err(|e| Error::file_system(FileOperation::Save, e))?;

        let stored = self.library.import(&path).await.map_err(|e| {
            tracing::warn!(path = %path.display(), "Save to library failed: {e}");
            Error::file_system(FileOperation::Save, e)
        })?;

        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::debug!(path = %path.display(), "Could not remove temp file: {e}");
        }

        tracing::info!(stored = %stored.display(), "Saved QR code to library");
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_names_are_unique_and_well_formed() {
        let first = temp_file_name();
        let second = temp_file_name();
        assert_ne!(first, second);

        for name in [&first, &second] {
            let stamp = name
                .strip_prefix("QR-")
                .and_then(|rest| rest.strip_suffix(".png"))
                .unwrap();
            assert!(stamp.parse::<u64>().is_ok(), "bad stamp in {name}");
        }
    }

    #[test]
    fn stamps_increase_strictly() {
        let stamps: Vec<u64> = (0..100).map(|_| next_stamp()).collect();
        assert!(stamps.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[tokio::test]
    async fn temp_image_holds_decoded_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let image = DisplayableImage::from_hex("89504e470d0a1a0a").unwrap();

        let path = write_temp_image(dir.path(), &image).await.unwrap();
        assert_eq!(
            tokio::fs::read(&path).await.unwrap(),
            vec![0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a]
        );
    }
}
