//! On-disk checkpoints of the record catalog.
//!
//! File layout inside the data directory:
//!
//! ```text
//! checkpoint_0000000000000007.dvc.zst   zstd(msgpack(CheckpointData)) ++ sha256
//! checkpoint_0000000000000007.dvc.hmac  hex HMAC-SHA256 of the .zst file (when keyed)
//! ```
//!
//! The writer keeps the newest two checkpoints so a torn or corrupt newest
//! file can fall back to its predecessor in permissive recovery.

pub mod loader;
pub mod writer;

use crate::catalog::Catalog;
use crate::error::DocVaultError;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fs;
use std::path::{Path, PathBuf};

pub use loader::{LoadedCheckpoint, load_checkpoint, load_latest};
pub use writer::{CheckpointMeta, write_checkpoint};

pub(crate) const CHECKPOINT_PREFIX: &str = "checkpoint_";
pub(crate) const CHECKPOINT_SUFFIX: &str = ".dvc.zst";
pub(crate) const HMAC_SUFFIX: &str = ".dvc.hmac";
pub(crate) const RETAINED_CHECKPOINTS: usize = 2;
const ZSTD_LEVEL: i32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckpointData {
    pub seq: u64,
    pub created_at_micros: u64,
    pub catalog: Catalog,
}

pub fn checkpoint_filename(seq: u64) -> String {
    format!("{CHECKPOINT_PREFIX}{seq:016}{CHECKPOINT_SUFFIX}")
}

pub(crate) fn hmac_path_for(checkpoint: &Path) -> PathBuf {
    let name = checkpoint
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let stem = name.trim_end_matches(CHECKPOINT_SUFFIX);
    checkpoint.with_file_name(format!("{stem}{HMAC_SUFFIX}"))
}

pub fn parse_checkpoint_seq(name: &str) -> Option<u64> {
    name.strip_prefix(CHECKPOINT_PREFIX)?
        .strip_suffix(CHECKPOINT_SUFFIX)?
        .parse::<u64>()
        .ok()
}

/// Checkpoint files in `dir`, oldest first. A missing directory has none.
pub fn list_checkpoints(dir: &Path) -> Result<Vec<(u64, PathBuf)>, DocVaultError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if let Some(seq) = parse_checkpoint_seq(&name) {
            found.push((seq, entry.path()));
        }
    }
    found.sort_by_key(|(seq, _)| *seq);
    Ok(found)
}

pub(crate) fn hmac_hex(key: &[u8], bytes: &[u8]) -> Result<String, DocVaultError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).map_err(|e| DocVaultError::InvalidConfig {
        message: format!("invalid hmac key: {e}"),
    })?;
    mac.update(bytes);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

pub(crate) fn verify_hmac(key: &[u8], bytes: &[u8], expected_hex: &str) -> Result<(), DocVaultError> {
    let expected = hex::decode(expected_hex.trim()).map_err(|_| DocVaultError::IntegrityError {
        message: "checkpoint hmac must be hex".into(),
    })?;
    let mut mac = Hmac::<Sha256>::new_from_slice(key).map_err(|e| DocVaultError::InvalidConfig {
        message: format!("invalid hmac key: {e}"),
    })?;
    mac.update(bytes);
    mac.verify_slice(&expected)
        .map_err(|_| DocVaultError::IntegrityError {
            message: "checkpoint hmac mismatch".into(),
        })
}

pub(crate) fn fsync_dir(path: &Path) -> Result<(), DocVaultError> {
    let dir = fs::File::open(path)?;
    dir.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{checkpoint_filename, hmac_path_for, parse_checkpoint_seq};
    use std::path::Path;

    #[test]
    fn filenames_round_trip_through_the_parser() {
        let name = checkpoint_filename(42);
        assert_eq!(name, "checkpoint_0000000000000042.dvc.zst");
        assert_eq!(parse_checkpoint_seq(&name), Some(42));
        assert_eq!(parse_checkpoint_seq("checkpoint_x.dvc.zst"), None);
        assert_eq!(parse_checkpoint_seq("segment_0001.dvc.zst"), None);
    }

    #[test]
    fn hmac_sidecar_sits_next_to_the_checkpoint() {
        let path = Path::new("/data").join(checkpoint_filename(3));
        assert_eq!(
            hmac_path_for(&path),
            Path::new("/data/checkpoint_0000000000000003.dvc.hmac")
        );
    }
}
