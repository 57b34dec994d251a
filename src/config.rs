use crate::error::DocVaultError;
use std::sync::Arc;
use zeroize::Zeroizing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Durability {
    /// State lives only in memory and is lost on drop.
    Memory,
    /// Every successful mutation rewrites the checkpoint before returning.
    CheckpointOnCommit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryMode {
    Strict,
    Permissive,
}

/// Runtime configuration for a [`crate::DocVault`].
#[derive(Debug, Clone)]
pub struct DocVaultConfig {
    pub max_upload_bytes: u64,
    pub max_filename_bytes: usize,
    pub max_tags_per_document: usize,
    /// Uploads must name a project. Legacy project-less documents stay readable.
    pub require_project_for_upload: bool,
    /// New uploads start in `processing` and wait for an annotation outcome.
    /// When off, uploads are `ready` immediately.
    pub annotate_on_upload: bool,
    pub durability: Durability,
    pub recovery_mode: RecoveryMode,
    /// HMAC key for checkpoint integrity. Wrapped in Arc<Zeroizing<>> so the
    /// key is zeroed when the last reference is dropped.
    pub checkpoint_hmac_key: Option<Arc<Zeroizing<Vec<u8>>>>,
}

impl Default for DocVaultConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 50 * 1024 * 1024,
            max_filename_bytes: 255,
            max_tags_per_document: 64,
            require_project_for_upload: true,
            annotate_on_upload: false,
            durability: Durability::CheckpointOnCommit,
            recovery_mode: RecoveryMode::Strict,
            checkpoint_hmac_key: None,
        }
    }
}

impl DocVaultConfig {
    pub fn production(hmac_key: [u8; 32]) -> Self {
        Self {
            checkpoint_hmac_key: Some(Arc::new(Zeroizing::new(hmac_key.to_vec()))),
            recovery_mode: RecoveryMode::Strict,
            durability: Durability::CheckpointOnCommit,
            ..Self::default()
        }
    }

    pub fn development() -> Self {
        Self {
            checkpoint_hmac_key: None,
            recovery_mode: RecoveryMode::Permissive,
            durability: Durability::Memory,
            ..Self::default()
        }
    }

    pub fn strict_recovery(&self) -> bool {
        matches!(self.recovery_mode, RecoveryMode::Strict)
    }

    pub fn hmac_key(&self) -> Option<&[u8]> {
        self.checkpoint_hmac_key
            .as_ref()
            .map(|arc| &***arc as &[u8])
    }

    pub fn with_hmac_key(mut self, key: Vec<u8>) -> Self {
        self.checkpoint_hmac_key = Some(Arc::new(Zeroizing::new(key)));
        self
    }

    pub fn with_durability(mut self, durability: Durability) -> Self {
        self.durability = durability;
        self
    }

    pub fn with_max_upload_bytes(mut self, bytes: u64) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    pub fn with_annotation(mut self, enabled: bool) -> Self {
        self.annotate_on_upload = enabled;
        self
    }

    pub fn with_legacy_uploads(mut self, allowed: bool) -> Self {
        self.require_project_for_upload = !allowed;
        self
    }

    pub fn validate(&self) -> Result<(), DocVaultError> {
        if self.max_upload_bytes == 0 {
            return Err(DocVaultError::InvalidConfig {
                message: "max_upload_bytes must be > 0".into(),
            });
        }
        if self.max_filename_bytes == 0 {
            return Err(DocVaultError::InvalidConfig {
                message: "max_filename_bytes must be > 0".into(),
            });
        }
        if self.max_tags_per_document == 0 {
            return Err(DocVaultError::InvalidConfig {
                message: "max_tags_per_document must be > 0".into(),
            });
        }
        if let Some(key) = self.hmac_key()
            && key.len() < 16
        {
            return Err(DocVaultError::InvalidConfig {
                message: "checkpoint_hmac_key must be at least 16 bytes".into(),
            });
        }
        if self.hmac_key().is_some() && self.durability == Durability::Memory {
            return Err(DocVaultError::InvalidConfig {
                message: "checkpoint_hmac_key requires checkpoint durability".into(),
            });
        }
        Ok(())
    }
}
