//! Directory-backed persistent storage.

use super::{entry_size, KeyValueStorage};
use crate::error::{Result, StoreError};
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Extension of entry files.
const ENTRY_EXT: &str = "kv";

/// Extension of in-flight writes.
const TEMP_EXT: &str = "tmp";

/// Name of the lock file guarding the directory.
const LOCK_FILE: &str = "LOCK";

/// Persistent storage: one file per key inside a directory.
///
/// The directory is locked exclusively for the lifetime of the value, so a
/// second `FileStorage` on the same path fails with [`StoreError::Locked`].
pub struct FileStorage {
    /// Base directory.
    path: PathBuf,

    /// Maximum total bytes (keys plus values), if limited.
    quota: Option<usize>,

    /// Lock file for exclusive access.
    _lock_file: File,

    /// Serializes writers so quota checks see a stable directory.
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// Open (creating if needed) storage rooted at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_quota(path, None)
    }

    pub fn open_with_quota(path: impl AsRef<Path>, quota: Option<usize>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        fs::create_dir_all(&path)?;

        let lock_file = Self::acquire_lock(&path)?;

        Ok(Self {
            path,
            quota,
            _lock_file: lock_file,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Total bytes currently stored.
    pub fn used_bytes(&self) -> Result<usize> {
        let mut total = 0usize;
        for (key, path) in self.entries()? {
            total += key.len() + fs::metadata(&path)?.len() as usize;
        }
        Ok(total)
    }

    fn acquire_lock(path: &Path) -> Result<File> {
        let lock_file = File::create(path.join(LOCK_FILE))?;

        lock_file
            .try_lock_exclusive()
            .map_err(|_| StoreError::Locked)?;

        Ok(lock_file)
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.path.join(format!("{}.{}", encode_key(key), ENTRY_EXT))
    }

    /// Decoded keys with their file paths.
    fn entries(&self) -> Result<Vec<(String, PathBuf)>> {
        let mut entries = Vec::new();

        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXT) {
                continue;
            }
            let stem = match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) => stem,
                None => continue,
            };
            if let Some(key) = decode_key(stem) {
                entries.push((key, path));
            }
        }

        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.entry_path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _lock = self.write_lock.lock();

        if let Some(quota) = self.quota {
            let mut used = 0usize;
            for (existing, path) in self.entries()? {
                if existing != key {
                    used += existing.len() + fs::metadata(&path)?.len() as usize;
                }
            }
            let needed = used + entry_size(key, value);
            if needed > quota {
                return Err(StoreError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    quota,
                });
            }
        }

        // Write to a sibling file then rename, so readers never see a torn value.
        let target = self.entry_path(key);
        let temp = target.with_extension(TEMP_EXT);
        if let Err(e) = write_then_rename(&temp, &target, value) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let _lock = self.write_lock.lock();

        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries()?.into_iter().map(|(key, _)| key).collect())
    }
}

fn write_then_rename(temp: &Path, target: &Path, value: &str) -> std::io::Result<()> {
    {
        let mut file = File::create(temp)?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(temp, target)
}

/// Map a key to a portable file stem: `[A-Za-z0-9_-]` pass through, every
/// other byte becomes `%XX`.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

fn decode_key(stem: &str) -> Option<String> {
    let bytes = stem.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = stem.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}
