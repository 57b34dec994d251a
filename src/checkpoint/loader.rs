use crate::checkpoint::{CheckpointData, hmac_path_for, list_checkpoints, verify_hmac};
use crate::error::DocVaultError;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct LoadedCheckpoint {
    pub path: PathBuf,
    pub data: CheckpointData,
    /// Newer checkpoints that failed to load and were skipped.
    pub skipped: Vec<PathBuf>,
}

pub fn load_checkpoint(
    path: &Path,
    hmac_key: Option<&[u8]>,
) -> Result<CheckpointData, DocVaultError> {
    let bytes = fs::read(path)?;
    if let Some(key) = hmac_key {
        let expected = fs::read_to_string(hmac_path_for(path)).map_err(|_| {
            DocVaultError::IntegrityError {
                message: format!("checkpoint hmac missing for {}", path.display()),
            }
        })?;
        verify_hmac(key, &bytes, &expected)?;
    }
    if bytes.len() < 32 {
        return Err(DocVaultError::Decode("checkpoint too small".into()));
    }
    let (compressed, trailer_hash) = bytes.split_at(bytes.len() - 32);
    let actual = Sha256::digest(compressed);
    if actual.as_slice() != trailer_hash {
        return Err(DocVaultError::IntegrityError {
            message: format!("checkpoint hash mismatch in {}", path.display()),
        });
    }
    let decompressed = zstd::stream::decode_all(compressed)
        .map_err(|e| DocVaultError::Io(std::io::Error::other(e.to_string())))?;
    rmp_serde::from_slice(&decompressed).map_err(|e| DocVaultError::Decode(e.to_string()))
}

/// Loads the newest readable checkpoint in `dir`.
///
/// Returns `Ok(None)` when the directory holds no checkpoints at all. In
/// strict mode the newest file must load; otherwise older files are tried in
/// turn and the ones skipped are reported.
pub fn load_latest(
    dir: &Path,
    hmac_key: Option<&[u8]>,
    strict: bool,
) -> Result<Option<LoadedCheckpoint>, DocVaultError> {
    let candidates = list_checkpoints(dir)?;
    if candidates.is_empty() {
        return Ok(None);
    }
    let mut skipped = Vec::new();
    let mut last_err = None;
    for (seq, path) in candidates.into_iter().rev() {
        match load_checkpoint(&path, hmac_key) {
            Ok(data) if data.seq == seq => {
                return Ok(Some(LoadedCheckpoint {
                    path,
                    data,
                    skipped,
                }));
            }
            Ok(data) => {
                let err = DocVaultError::IntegrityError {
                    message: format!(
                        "checkpoint {} carries seq {} but is named for {seq}",
                        path.display(),
                        data.seq
                    ),
                };
                if strict {
                    return Err(err);
                }
                last_err = Some(err);
            }
            Err(err) => {
                if strict {
                    return Err(err);
                }
                last_err = Some(err);
            }
        }
        warn!(path = %path.display(), "skipping unreadable checkpoint");
        skipped.push(path);
    }
    Err(last_err.unwrap_or_else(|| DocVaultError::Unavailable {
        message: "no readable checkpoint".into(),
    }))
}
