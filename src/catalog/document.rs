use crate::error::DocVaultError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Processing lifecycle. Moves forward only: `Processing -> Ready | Error`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    #[default]
    Processing,
    Ready,
    Error,
}

impl DocumentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentStatus::Processing => "processing",
            DocumentStatus::Ready => "ready",
            DocumentStatus::Error => "error",
        }
    }

    pub fn can_transition_to(self, next: DocumentStatus) -> bool {
        matches!(
            (self, next),
            (DocumentStatus::Processing, DocumentStatus::Ready)
                | (DocumentStatus::Processing, DocumentStatus::Error)
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContentLocation {
    /// Held by the external document store.
    Remote,
    /// Remote store unavailable at upload time; bytes kept locally.
    Local,
}

/// Pointer to the document bytes in whichever store accepted them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ContentRef {
    pub location: ContentLocation,
    pub key: String,
}

impl ContentRef {
    pub fn remote(key: impl Into<String>) -> Self {
        Self {
            location: ContentLocation::Remote,
            key: key.into(),
        }
    }

    pub fn local(key: impl Into<String>) -> Self {
        Self {
            location: ContentLocation::Local,
            key: key.into(),
        }
    }

    pub fn is_local_only(&self) -> bool {
        self.location == ContentLocation::Local
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummaryAnnotation {
    pub content: serde_json::Value,
    pub generated_at_micros: u64,
    #[serde(default)]
    pub rating: Option<u8>,
}

/// AI-derived payloads. Inert as far as access control is concerned.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Annotations {
    pub summary: Option<SummaryAnnotation>,
    pub entities: Option<serde_json::Value>,
    pub sentiment: Option<serde_json::Value>,
    pub analytics: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    pub document_id: String,
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub content: ContentRef,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub uploaded_by: String,
    #[serde(default)]
    pub project_id: Option<String>,
    pub status: DocumentStatus,
    #[serde(default)]
    pub annotations: Annotations,
    #[serde(default)]
    pub processing_error: Option<String>,
    pub created_at_micros: u64,
    pub updated_at_micros: u64,
}

impl Document {
    pub fn transition(&mut self, next: DocumentStatus, now_micros: u64) -> Result<(), DocVaultError> {
        if !self.status.can_transition_to(next) {
            return Err(DocVaultError::InvalidTransition {
                document_id: self.document_id.clone(),
                from: self.status.as_str(),
                to: next.as_str(),
            });
        }
        self.status = next;
        self.updated_at_micros = now_micros;
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.status == DocumentStatus::Ready
    }

    /// Case-insensitive match over filename, original name and tags.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.filename.to_lowercase().contains(&needle)
            || self.original_name.to_lowercase().contains(&needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&needle))
    }

    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        tags.is_empty() || tags.iter().any(|t| self.tags.contains(t.trim()))
    }
}

/// Trims tags, drops empties and duplicates.
pub fn normalize_tags<I, S>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Strips any directory components a client may have sent with the name.
pub fn sanitize_filename(raw: &str) -> Result<String, DocVaultError> {
    let base = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if base.is_empty() || base == "." || base == ".." {
        return Err(DocVaultError::Validation(format!(
            "invalid filename '{raw}'"
        )));
    }
    Ok(base.to_string())
}
