use crate::catalog::account::Account;
use crate::catalog::document::Document;
use crate::catalog::grant::AccessGrant;
use crate::catalog::project::Project;
use crate::permission::EffectiveLevel;
use serde::{Deserialize, Serialize};

/// Narrowing applied on top of the visibility filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentQuery {
    pub project_id: Option<String>,
    /// Case-insensitive substring over filename, original name and tags.
    pub search: Option<String>,
    /// Matches documents carrying any of these tags.
    pub tags: Vec<String>,
    pub limit: Option<usize>,
}

impl DocumentQuery {
    pub fn in_project(project_id: impl Into<String>) -> Self {
        Self {
            project_id: Some(project_id.into()),
            ..Self::default()
        }
    }

    pub fn search(mut self, needle: impl Into<String>) -> Self {
        self.search = Some(needle.into());
        self
    }

    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub(crate) fn matches(&self, document: &Document) -> bool {
        if let Some(project_id) = &self.project_id
            && document.project_id.as_deref() != Some(project_id.as_str())
        {
            return false;
        }
        if let Some(needle) = &self.search
            && !document.matches_search(needle)
        {
            return false;
        }
        document.has_any_tag(&self.tags)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectListOptions {
    pub include_inactive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub project: Project,
    pub permission: EffectiveLevel,
    pub is_owner: bool,
    pub document_count: usize,
    /// Only reported to global admins.
    pub grant_count: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDetail {
    pub project: Project,
    pub permission: EffectiveLevel,
    pub grants: Vec<AccessGrant>,
    pub document_count: usize,
}

/// A removed document record and, if its bytes could not be deleted, the
/// content key left behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDeletion {
    pub document: Document,
    pub orphaned_content: Option<String>,
}

/// What a cascading project delete removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDeletion {
    pub project_id: String,
    pub grants_removed: usize,
    pub documents_removed: usize,
    /// Content keys whose remote deletion failed; metadata is gone regardless.
    pub orphaned_content: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountOverview {
    pub account: Account,
    pub grants: Vec<AccessGrant>,
    pub owned_projects: Vec<Project>,
}

#[cfg(test)]
mod tests {
    use super::DocumentQuery;
    use crate::catalog::document::{ContentRef, Document, DocumentStatus, normalize_tags};

    fn doc(project: Option<&str>, name: &str, tags: &[&str]) -> Document {
        Document {
            document_id: name.into(),
            filename: name.into(),
            original_name: name.to_uppercase(),
            mime_type: "text/plain".into(),
            size_bytes: 1,
            content: ContentRef::remote(name),
            tags: normalize_tags(tags.iter().copied()),
            metadata: Default::default(),
            uploaded_by: "u".into(),
            project_id: project.map(str::to_string),
            status: DocumentStatus::Ready,
            annotations: Default::default(),
            processing_error: None,
            created_at_micros: 1,
            updated_at_micros: 1,
        }
    }

    #[test]
    fn query_narrows_by_project_search_and_tags() {
        let report = doc(Some("p1"), "report.pdf", &["finance", "q3"]);
        let memo = doc(None, "memo.txt", &["internal"]);

        assert!(DocumentQuery::default().matches(&report));
        assert!(DocumentQuery::in_project("p1").matches(&report));
        assert!(!DocumentQuery::in_project("p1").matches(&memo));
        assert!(DocumentQuery::default().search("REPORT").matches(&report));
        assert!(DocumentQuery::default().search("finan").matches(&report));
        assert!(!DocumentQuery::default().search("budget").matches(&report));
        assert!(DocumentQuery::default().tagged("internal").matches(&memo));
        assert!(!DocumentQuery::default().tagged("internal").matches(&report));
    }
}
