use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tempfile::{NamedTempFile, TempPath};
use thiserror::Error;
use tokio::io::{AsyncWriteExt, BufWriter};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Creates `dir` when missing and checks that files can be created in it.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    // Probe file is deleted on drop.
    NamedTempFile::new_in(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    Ok(())
}

/// Small whole-file writes (the failure log) via temp file and rename.
#[derive(Debug, Clone)]
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }

    /// Removes `{dir}/{filename}` if present. Returns whether a file was removed.
    pub fn remove(&self, filename: &str) -> Result<bool, PersistError> {
        match fs::remove_file(self.dir.join(filename)) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

/// A download in progress, streamed into a hidden `.part` file next to its
/// destination.
///
/// Only [`PartialDownload::commit`] makes the destination name appear.
/// Dropping an uncommitted download deletes the temp file.
#[derive(Debug)]
pub struct PartialDownload {
    writer: BufWriter<tokio::fs::File>,
    temp_path: TempPath,
    target: PathBuf,
    bytes_written: u64,
}

impl PartialDownload {
    pub fn create(dir: &Path, filename: &str, buffer_size: usize) -> Result<Self, PersistError> {
        let short: String = filename.chars().take(32).collect();
        let tmp = tempfile::Builder::new()
            .prefix(&format!(".{short}."))
            .suffix(".part")
            .tempfile_in(dir)?;
        let (file, temp_path) = tmp.into_parts();
        Ok(Self {
            writer: BufWriter::with_capacity(buffer_size, tokio::fs::File::from_std(file)),
            temp_path,
            target: dir.join(filename),
            bytes_written: 0,
        })
    }

    pub async fn write_chunk(&mut self, chunk: &Bytes) -> Result<(), PersistError> {
        self.writer.write_all(chunk).await?;
        self.bytes_written += chunk.len() as u64;
        Ok(())
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Flushes, syncs and renames the temp file onto the destination.
    pub async fn commit(mut self) -> Result<PathBuf, PersistError> {
        self.writer.flush().await?;
        let file = self.writer.into_inner();
        file.sync_all().await?;
        drop(file);

        self.temp_path
            .persist(&self.target)
            .map_err(|e| PersistError::Io(e.error))?;
        Ok(self.target)
    }
}
