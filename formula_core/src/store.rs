//! JSON file persistence with file locking.
//!
//! Reads take a shared lock on the data file. Saves write a temp file in the
//! same directory, sync it, and rename it over the original. Read-modify-write
//! cycles hold an exclusive lock on a `.lock` sidecar for their whole duration
//! so concurrent processes cannot interleave updates.

use crate::{Error, Result};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Load a value, or its default when the file doesn't exist.
///
/// A file that exists but can't be parsed is an error: the caller would
/// otherwise overwrite real data with an empty store on the next save.
pub fn load_json<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        tracing::debug!("No store file at {:?}, using empty store", path);
        return Ok(T::default());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let mut contents = String::new();
    let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
    file.unlock()?;
    read?;

    serde_json::from_str(&contents)
        .map_err(|e| Error::Store(format!("Failed to parse {:?}: {}", path, e)))
}

/// Atomically write a value
pub fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::Other, "store path missing parent")
    })?;
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    temp.as_file().lock_exclusive()?;

    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        let contents = serde_json::to_string_pretty(value)?;
        writer.write_all(contents.as_bytes())?;
        writer.flush()?;
    }

    temp.as_file().sync_all()?;
    temp.as_file().unlock()?;

    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    tracing::debug!("Saved store to {:?}", path);
    Ok(())
}

/// Load, modify and save under an exclusive lock.
///
/// Nothing is written when `f` fails.
pub fn update_json<T, F, R>(path: &Path, f: F) -> Result<R>
where
    T: DeserializeOwned + Serialize + Default,
    F: FnOnce(&mut T) -> Result<R>,
{
    let lock = acquire_update_lock(path)?;

    let result: Result<R> = (|| {
        let mut value: T = load_json(path)?;
        let out = f(&mut value)?;
        save_json(&value, path)?;
        Ok(out)
    })();

    lock.unlock()?;
    result
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    path.with_file_name(name)
}

fn acquire_update_lock(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let lock = OpenOptions::new()
        .create(true)
        .write(true)
        .open(lock_path(path))?;
    lock.lock_exclusive()?;
    Ok(lock)
}
