//! Blob storage for derived artifacts. The only module that touches the
//! filesystem on behalf of a unit.

use crate::error::{BenchError, Result};
use crate::options::{Buffering, LARGE_BUFFER_SIZE};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Main copy of unit `index`
pub fn copy_name(index: usize) -> String {
    format!("{}.txt", index)
}

/// Persisted digest of unit `index`
pub fn digest_name(index: usize) -> String {
    format!("{}.sha", index)
}

/// Decoded output of unit `index`. Must never equal another unit's main
/// copy; without the separator unit 1 would write `12.txt`.
pub fn decoded_name(index: usize) -> String {
    format!("{}_2.txt", index)
}

/// Named byte blobs under one root directory
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
    buffering: Buffering,
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>, buffering: Buffering) -> Self {
        Self {
            root: root.into(),
            buffering,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Make sure the root directory exists. Returns true if it was created.
    pub fn create_root(&self) -> Result<bool> {
        if self.root.is_dir() {
            return Ok(false);
        }
        fs::create_dir_all(&self.root)
            .map_err(|e| BenchError::storage(self.root.display().to_string(), e))?;
        Ok(true)
    }

    /// Remove the root directory; fails if anything is left in it
    pub fn remove_root(&self) -> Result<()> {
        fs::remove_dir(&self.root)
            .map_err(|e| BenchError::storage(self.root.display().to_string(), e))
    }

    /// Create or truncate `name` and write `bytes` to it.
    /// On failure the artifact is left in an undefined state.
    pub fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        write_with(&self.path(name), bytes, self.buffering).map_err(|e| BenchError::storage(name, e))
    }

    /// Read the full contents of `name`
    pub fn read(&self, name: &str) -> Result<Vec<u8>> {
        read_with(&self.path(name), self.buffering).map_err(|e| BenchError::storage(name, e))
    }

    /// Remove the root directory and anything still in it
    pub fn purge_root(&self) -> Result<()> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BenchError::storage(self.root.display().to_string(), e)),
        }
    }

    /// Remove `name`. Returns false if it did not exist.
    pub fn remove(&self, name: &str) -> Result<bool> {
        match fs::remove_file(self.path(name)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(BenchError::storage(name, e)),
        }
    }

    #[cfg(test)]
    pub fn exists(&self, name: &str) -> bool {
        self.path(name).is_file()
    }

    /// Remove every artifact derived for unit `index`.
    /// Returns the number of files actually removed.
    pub fn remove_unit(&self, index: usize) -> Result<usize> {
        let mut removed = 0;
        for name in [copy_name(index), digest_name(index), decoded_name(index)] {
            if self.remove(&name)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Read a file outside any storage root, e.g. the run's source
pub fn read_file(path: &Path, buffering: Buffering) -> Result<Vec<u8>> {
    read_with(path, buffering).map_err(|e| BenchError::storage(path.display().to_string(), e))
}

/// Write a file outside any storage root
pub fn write_file(path: &Path, bytes: &[u8], buffering: Buffering) -> Result<()> {
    write_with(path, bytes, buffering).map_err(|e| BenchError::storage(path.display().to_string(), e))
}

fn write_with(path: &Path, bytes: &[u8], buffering: Buffering) -> io::Result<()> {
    match buffering {
        Buffering::Unbuffered => fs::write(path, bytes),
        Buffering::LargeBuffer => write_buffered(path, bytes),
    }
}

fn read_with(path: &Path, buffering: Buffering) -> io::Result<Vec<u8>> {
    match buffering {
        Buffering::Unbuffered => fs::read(path),
        Buffering::LargeBuffer => read_buffered(path),
    }
}

fn write_buffered(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(LARGE_BUFFER_SIZE, file);
    writer.write_all(bytes)?;
    writer.flush()
}

fn read_buffered(path: &Path) -> io::Result<Vec<u8>> {
    let file = File::open(path)?;
    let size_hint = file.metadata().map(|m| m.len() as usize).unwrap_or(0);
    let mut reader = BufReader::with_capacity(LARGE_BUFFER_SIZE, file);
    let mut out = Vec::with_capacity(size_hint);
    reader.read_to_end(&mut out)?;
    Ok(out)
}
