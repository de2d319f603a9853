//! Atomic file persistence for the record file and vault blobs.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::crypto::aead;
use crate::error::Result;

/// One file written with write-temp / fsync / rename, so a crash leaves
/// either the old contents or the new contents, never a torn write.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(&self) -> Result<Vec<u8>> {
        Ok(fs::read(&self.path)?)
    }

    /// Replace the file's contents atomically, creating parent directories
    /// on demand. The temporary file carries a random suffix so concurrent
    /// writers in the same directory never collide.
    pub fn save(&self, data: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.tmp_path()?;
        let mut tmp_file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)?;
        tmp_file.write_all(data)?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        // Persist the rename itself.
        if let Some(parent) = self.path.parent() {
            File::open(parent)?.sync_all()?;
        }
        Ok(())
    }

    fn tmp_path(&self) -> Result<PathBuf> {
        let mut suffix = [0u8; 8];
        aead::fill_random(&mut suffix)?;

        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(self
            .path
            .with_file_name(format!("{file_name}.tmp.{}", hex::encode(suffix))))
    }
}
