//! Shared persistence utilities: atomic file writes, JSON/YAML load/save, digests.
//!
//! Stages never write a file in place: content goes to a `.tmp` sibling first
//! and is renamed over the target, so an artifact never points at a
//! half-written file.

use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::Fault;

/// Atomically write JSON data to a file.
///
/// Creates parent directories if they don't exist.
pub fn atomic_write_json<T: serde::Serialize>(path: &Path, data: &T) -> Result<(), Fault> {
    let json = serde_json::to_string_pretty(data)?;
    Ok(atomic_write(path, json.as_bytes())?)
}

/// Atomically write YAML data to a file.
pub fn atomic_write_yaml<T: serde::Serialize>(path: &Path, data: &T) -> Result<(), Fault> {
    let yaml = serde_yaml::to_string(data)?;
    Ok(atomic_write(path, yaml.as_bytes())?)
}

/// Atomically write raw bytes to a file.
pub fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Load and deserialize JSON from a file that must exist.
///
/// A read failure is a [`Fault::Io`]; unparseable content is a
/// [`Fault::Serde`].
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, Fault> {
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

/// Load and deserialize YAML from a file that must exist.
pub fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, Fault> {
    let data = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&data)?)
}

/// Create `dir` directly inside an existing parent.
///
/// Unlike `create_dir_all` this fails when the parent is gone, which is how a
/// stage notices that its run directory disappeared underneath it. An already
/// existing `dir` is accepted.
pub fn create_stage_dir(dir: &Path) -> io::Result<()> {
    match std::fs::create_dir(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(e) => Err(io::Error::new(
            e.kind(),
            format!("cannot create {}: {e}", dir.display()),
        )),
    }
}

/// Compute SHA-256 hash of file contents.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let content = std::fs::read(path)?;
    Ok(hash_bytes(&content))
}

/// Compute SHA-256 hash of arbitrary bytes.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
