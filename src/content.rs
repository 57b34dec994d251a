use crate::checkpoint::fsync_dir;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContentStoreError {
    #[error("content '{0}' not found")]
    NotFound(String),
    #[error("invalid content key '{0}'")]
    InvalidKey(String),
    #[error("content io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("content backend unavailable: {0}")]
    Unavailable(String),
}

/// Byte storage for uploaded document bodies.
///
/// `put` returns the key the body can later be fetched with. Implementations
/// may derive it from `key_hint` but must not reuse a key for different bytes.
pub trait ContentStore: Send + Sync {
    fn put(&self, key_hint: &str, mime_type: &str, bytes: &[u8])
    -> Result<String, ContentStoreError>;
    fn get(&self, key: &str) -> Result<Vec<u8>, ContentStoreError>;
    fn delete(&self, key: &str) -> Result<(), ContentStoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryContentStore {
    objects: RwLock<HashMap<String, StoredObject>>,
}

#[derive(Debug, Clone)]
struct StoredObject {
    mime_type: String,
    bytes: Vec<u8>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.read().contains_key(key)
    }

    pub fn mime_type(&self, key: &str) -> Option<String> {
        self.objects.read().get(key).map(|o| o.mime_type.clone())
    }
}

impl ContentStore for MemoryContentStore {
    fn put(
        &self,
        key_hint: &str,
        mime_type: &str,
        bytes: &[u8],
    ) -> Result<String, ContentStoreError> {
        validate_key(key_hint)?;
        let mut objects = self.objects.write();
        if objects.contains_key(key_hint) {
            return Err(ContentStoreError::InvalidKey(key_hint.to_string()));
        }
        objects.insert(
            key_hint.to_string(),
            StoredObject {
                mime_type: mime_type.to_string(),
                bytes: bytes.to_vec(),
            },
        );
        Ok(key_hint.to_string())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, ContentStoreError> {
        self.objects
            .read()
            .get(key)
            .map(|o| o.bytes.clone())
            .ok_or_else(|| ContentStoreError::NotFound(key.to_string()))
    }

    fn delete(&self, key: &str) -> Result<(), ContentStoreError> {
        self.objects
            .write()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| ContentStoreError::NotFound(key.to_string()))
    }
}

/// Content kept as flat files under one directory.
#[derive(Debug, Clone)]
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, ContentStoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, ContentStoreError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

impl ContentStore for FsContentStore {
    fn put(
        &self,
        key_hint: &str,
        _mime_type: &str,
        bytes: &[u8],
    ) -> Result<String, ContentStoreError> {
        let path = self.path_for(key_hint)?;
        if path.exists() {
            return Err(ContentStoreError::InvalidKey(key_hint.to_string()));
        }
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(bytes)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist_noclobber(&path)
            .map_err(|e| ContentStoreError::Io(e.error))?;
        fsync_dir(&self.root).map_err(|e| ContentStoreError::Unavailable(e.to_string()))?;
        Ok(key_hint.to_string())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, ContentStoreError> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ContentStoreError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, key: &str) -> Result<(), ContentStoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ContentStoreError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn validate_key(key: &str) -> Result<(), ContentStoreError> {
    let bad = key.is_empty()
        || key == "."
        || key == ".."
        || key.contains('/')
        || key.contains('\\')
        || key.contains('\0');
    if bad {
        return Err(ContentStoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}
