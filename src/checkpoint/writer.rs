use crate::catalog::Catalog;
use crate::checkpoint::{
    CheckpointData, RETAINED_CHECKPOINTS, ZSTD_LEVEL, checkpoint_filename, fsync_dir, hmac_hex,
    hmac_path_for, list_checkpoints,
};
use crate::error::DocVaultError;
use crate::lib_helpers::now_micros;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckpointMeta {
    pub filename: String,
    pub seq: u64,
    pub sha256_hex: String,
    pub created_at_micros: u64,
    pub signed: bool,
}

pub fn write_checkpoint(
    catalog: &Catalog,
    seq: u64,
    dir: &Path,
    hmac_key: Option<&[u8]>,
) -> Result<CheckpointMeta, DocVaultError> {
    fs::create_dir_all(dir)?;
    let created_at_micros = now_micros();
    let data = CheckpointData {
        seq,
        created_at_micros,
        catalog: catalog.clone(),
    };
    let encoded = rmp_serde::to_vec(&data).map_err(|e| DocVaultError::Encode(e.to_string()))?;
    let mut payload = zstd::stream::encode_all(encoded.as_slice(), ZSTD_LEVEL)
        .map_err(|e| DocVaultError::Io(std::io::Error::other(e.to_string())))?;
    let trailer = Sha256::digest(&payload);
    payload.extend_from_slice(&trailer);

    let filename = checkpoint_filename(seq);
    let final_path = dir.join(&filename);

    // The sidecar lands first so the checkpoint never exists unsigned.
    let sig_path = hmac_path_for(&final_path);
    if let Some(key) = hmac_key {
        let mut sig = NamedTempFile::new_in(dir)?;
        sig.write_all(hmac_hex(key, &payload)?.as_bytes())?;
        sig.as_file().sync_all()?;
        sig.persist(&sig_path).map_err(|e| DocVaultError::Io(e.error))?;
    } else {
        let _ = fs::remove_file(&sig_path);
    }

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&payload)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(&final_path)
        .map_err(|e| DocVaultError::Io(e.error))?;
    fsync_dir(dir)?;
    prune_old_checkpoints(dir)?;

    Ok(CheckpointMeta {
        filename,
        seq,
        sha256_hex: hex::encode(Sha256::digest(&payload)),
        created_at_micros,
        signed: hmac_key.is_some(),
    })
}

fn prune_old_checkpoints(dir: &Path) -> Result<(), DocVaultError> {
    let existing = list_checkpoints(dir)?;
    let excess = existing.len().saturating_sub(RETAINED_CHECKPOINTS);
    for (_, path) in existing.into_iter().take(excess) {
        fs::remove_file(&path)?;
        let _ = fs::remove_file(hmac_path_for(&path));
    }
    Ok(())
}
