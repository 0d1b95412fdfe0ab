use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use image::io::Reader;
use image::DynamicImage;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not decode {}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// The single on-disk slot holding the most recent upload.
pub struct ImageStore {
    dir: PathBuf,
    path: PathBuf,
    // Held across write and decode so a request always reads back its own bytes.
    slot: Mutex<()>,
}

impl ImageStore {
    /// Creates `dir` if needed.
    pub fn open(dir: impl Into<PathBuf>, file_name: &str) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let path = dir.join(file_name);
        Ok(Self {
            dir,
            path,
            slot: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the stored image with `bytes` and decodes it back from disk.
    ///
    /// Blocking; call from `web::block`.
    pub fn replace_and_decode(&self, bytes: &[u8]) -> Result<DynamicImage, StoreError> {
        let _guard = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        self.replace(bytes).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;
        tracing::info!(path = %self.path.display(), bytes = bytes.len(), "new image received and saved");

        self.decode().map_err(|source| StoreError::Decode {
            path: self.path.clone(),
            source,
        })
    }

    // The device always posts to a `.jpg` slot, so sniff the real format.
    fn decode(&self) -> Result<DynamicImage, image::ImageError> {
        Reader::open(&self.path)?.with_guessed_format()?.decode()
    }

    fn replace(&self, bytes: &[u8]) -> io::Result<()> {
        // Same directory as the target so the rename cannot cross filesystems.
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(bytes)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}
