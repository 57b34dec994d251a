pub mod authz;
pub mod catalog;
pub mod checkpoint;
pub mod config;
pub mod content;
pub mod error;
pub mod identity;
mod lib_helpers;
pub mod offline;
pub mod permission;
pub mod query;
pub mod store;

pub use crate::authz::visibility::{DocumentFilter, ProjectFilter};
pub use crate::authz::{ProjectAccess, Target, resolve};
pub use crate::config::{DocVaultConfig, Durability, RecoveryMode};
pub use crate::error::{DocVaultError, ErrorCode, ResourceType};
pub use crate::permission::{AccessLevel, Decision, DenialReason, EffectiveLevel, Role};

use crate::catalog::Catalog;
use crate::catalog::account::{Account, AccountUpdate, FederatedProfile, NewAccount, normalize_email};
use crate::catalog::document::{
    Annotations, ContentLocation, ContentRef, Document, DocumentStatus, normalize_tags,
    sanitize_filename,
};
use crate::catalog::grant::AccessGrant;
use crate::catalog::project::{NewProject, Project, ProjectUpdate};
use crate::checkpoint::{CheckpointMeta, load_latest, write_checkpoint};
use crate::content::{ContentStore, FsContentStore, MemoryContentStore};
use crate::identity::IdentityProvider;
use crate::lib_helpers::*;
use crate::query::{
    AccountOverview, DocumentDeletion, DocumentQuery, ProjectDeletion, ProjectDetail,
    ProjectListOptions, ProjectSummary,
};
use crate::store::{MemoryStore, RecordStore};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Document vault instance: records, content and the authorization rules
/// that sit between callers and both.
///
/// Every caller-facing operation takes the caller's [`Account`] explicitly.
/// The account is re-read from the store on each call, so role changes and
/// deactivation apply immediately.
pub struct DocVault {
    config: DocVaultConfig,
    dir: Option<PathBuf>,
    store: Arc<dyn RecordStore>,
    local_content: Arc<dyn ContentStore>,
    remote_content: Option<Arc<dyn ContentStore>>,
    identity: Option<Arc<dyn IdentityProvider>>,
    /// Serializes checkpoint writes. Holds the last written sequence number.
    checkpoint_gate: Mutex<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub project_id: Option<String>,
    pub tags: Vec<String>,
    pub metadata: BTreeMap<String, String>,
}

impl UploadRequest {
    pub fn new(
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
            project_id: None,
            tags: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn in_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Result reported by the annotation producer for a `processing` document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingOutcome {
    Ready(Annotations),
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentContent {
    pub document: Document,
    pub bytes: Vec<u8>,
}

impl DocVault {
    /// Opens (or initializes) a vault in `dir`, recovering the newest
    /// readable checkpoint. Uploaded bytes live under `dir/content`.
    pub fn open(config: DocVaultConfig, dir: &Path) -> Result<Self, DocVaultError> {
        config.validate()?;
        info!(
            max_upload_bytes = config.max_upload_bytes,
            require_project_for_upload = config.require_project_for_upload,
            annotate_on_upload = config.annotate_on_upload,
            durability = ?config.durability,
            recovery_mode = ?config.recovery_mode,
            checkpoint_hmac_enabled = config.checkpoint_hmac_key.is_some(),
            dir = %dir.display(),
            "docvault config"
        );
        create_private_dir_all(dir)?;
        let (catalog, seq) =
            match load_latest(dir, config.hmac_key(), config.strict_recovery())? {
                Some(loaded) => {
                    if !loaded.skipped.is_empty() {
                        warn!(
                            seq = loaded.data.seq,
                            skipped = loaded.skipped.len(),
                            "recovered from an older checkpoint"
                        );
                    }
                    (loaded.data.catalog, loaded.data.seq)
                }
                None => (Catalog::default(), 0),
            };
        let local = FsContentStore::open(dir.join(CONTENT_DIR)).map_err(|e| {
            DocVaultError::Unavailable {
                message: format!("local content store: {e}"),
            }
        })?;
        Ok(Self {
            config,
            dir: Some(dir.to_path_buf()),
            store: Arc::new(MemoryStore::from_catalog(catalog)),
            local_content: Arc::new(local),
            remote_content: None,
            identity: None,
            checkpoint_gate: Mutex::new(seq),
        })
    }

    /// A vault with no data directory. Nothing survives the instance.
    pub fn in_memory(config: DocVaultConfig) -> Result<Self, DocVaultError> {
        config.validate()?;
        Ok(Self {
            config,
            dir: None,
            store: Arc::new(MemoryStore::new()),
            local_content: Arc::new(MemoryContentStore::new()),
            remote_content: None,
            identity: None,
            checkpoint_gate: Mutex::new(0),
        })
    }

    pub fn with_store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_remote_content(mut self, content: Arc<dyn ContentStore>) -> Self {
        self.remote_content = Some(content);
        self
    }

    pub fn with_local_content(mut self, content: Arc<dyn ContentStore>) -> Self {
        self.local_content = content;
        self
    }

    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn config(&self) -> &DocVaultConfig {
        &self.config
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    // ---- accounts ----------------------------------------------------------

    /// Self-registration. Only the very first account may register as admin;
    /// later admins are promoted through [`DocVault::update_account`].
    pub async fn register_account(&self, request: NewAccount) -> Result<Account, DocVaultError> {
        let account = Account::new(new_id(), request, now_micros())?;
        if account.role.is_admin() {
            self.store.insert_first_account(account.clone())?;
        } else {
            self.store.insert_account(account.clone())?;
        }
        info!(account_id = %account.account_id, role = %account.role, "account registered");
        self.commit_durable().await?;
        Ok(account)
    }

    /// Login through an external identity provider. Links the subject to an
    /// existing account with the same email, or provisions a `user` account.
    pub async fn federated_login(
        &self,
        profile: FederatedProfile,
    ) -> Result<Account, DocVaultError> {
        let now = now_micros();
        let existing = match self
            .store
            .account_by_federated_subject(profile.subject.trim())?
        {
            Some(account) => Some(account),
            None => self
                .store
                .account_by_email(&normalize_email(&profile.email)?)?,
        };
        let account = match existing {
            Some(account) => {
                if !account.is_active {
                    return Err(DocVaultError::Unauthenticated(format!(
                        "account '{}' is disabled",
                        account.account_id
                    )));
                }
                self.store.modify_account(&account.account_id, &mut |a| {
                    a.apply_federated_profile(&profile, now)
                })?
            }
            None => {
                let account = Account::from_federated(new_id(), &profile, now)?;
                self.store.insert_account(account.clone())?;
                info!(account_id = %account.account_id, "federated account provisioned");
                account
            }
        };
        self.commit_durable().await?;
        Ok(account)
    }

    pub async fn authenticate(&self, token: &str) -> Result<Account, DocVaultError> {
        let identity = self.identity.as_ref().ok_or_else(|| {
            DocVaultError::Unauthenticated("no identity provider configured".into())
        })?;
        let account_id = identity.resolve_token(token)?;
        match self.store.account(&account_id)? {
            Some(account) if account.is_active => Ok(account),
            Some(_) => Err(DocVaultError::Unauthenticated(format!(
                "account '{account_id}' is disabled"
            ))),
            None => Err(DocVaultError::Unauthenticated(format!(
                "unknown account '{account_id}'"
            ))),
        }
    }

    pub async fn touch(&self, account_id: &str) -> Result<Account, DocVaultError> {
        let now = now_micros();
        let account = self.store.modify_account(account_id, &mut |a| {
            a.last_active_micros = now;
            Ok(())
        })?;
        self.commit_durable().await?;
        Ok(account)
    }

    /// Sets a local password on an account, typically a federated one.
    /// Allowed for the account itself and for global admins.
    pub async fn set_password_hash(
        &self,
        caller: &Account,
        account_id: &str,
        hash: impl Into<String>,
    ) -> Result<Account, DocVaultError> {
        let caller = self.current_caller(caller)?;
        self.require_account(account_id)?;
        if caller.account_id != account_id && !caller.is_admin() {
            return Err(DocVaultError::denied(DenialReason::NoAccess));
        }
        let hash = hash.into();
        let now = now_micros();
        let account = self
            .store
            .modify_account(account_id, &mut |a| a.set_password_hash(hash.clone(), now))?;
        self.commit_durable().await?;
        Ok(account)
    }

    pub async fn update_account(
        &self,
        caller: &Account,
        account_id: &str,
        update: AccountUpdate,
    ) -> Result<Account, DocVaultError> {
        let caller = self.current_caller(caller)?;
        self.require_account(account_id)?;
        require_admin_role(&caller)?;
        let now = now_micros();
        let account = self
            .store
            .modify_account(account_id, &mut |a| a.apply_update(&update, now))?;
        if update.role.is_some() {
            info!(
                account_id,
                role = %account.role,
                changed_by = %caller.account_id,
                "account role updated"
            );
        }
        self.commit_durable().await?;
        Ok(account)
    }

    pub async fn list_accounts(&self, caller: &Account) -> Result<Vec<Account>, DocVaultError> {
        let caller = self.current_caller(caller)?;
        require_admin_role(&caller)?;
        self.store.list_accounts()
    }

    pub async fn account_overview(
        &self,
        caller: &Account,
        account_id: &str,
    ) -> Result<AccountOverview, DocVaultError> {
        let caller = self.current_caller(caller)?;
        let account = self.require_account(account_id)?;
        require_admin_role(&caller)?;
        let grants = self.store.grants_for_account(account_id)?;
        let owned_projects = self
            .store
            .list_projects()?
            .into_iter()
            .filter(|p| p.is_owned_by(account_id))
            .collect();
        Ok(AccountOverview {
            account,
            grants,
            owned_projects,
        })
    }

    // ---- projects ----------------------------------------------------------

    pub async fn create_project(
        &self,
        caller: &Account,
        request: NewProject,
    ) -> Result<Project, DocVaultError> {
        let caller = self.current_caller(caller)?;
        require_admin_role(&caller)?;
        let project = Project::new(new_id(), &caller.account_id, request, now_micros())?;
        self.store.insert_project(project.clone())?;
        info!(
            project_id = %project.project_id,
            owner_id = %project.owner_id,
            "project created"
        );
        self.commit_durable().await?;
        Ok(project)
    }

    pub async fn update_project(
        &self,
        caller: &Account,
        project_id: &str,
        update: ProjectUpdate,
    ) -> Result<Project, DocVaultError> {
        let caller = self.current_caller(caller)?;
        let project = self.require_project(project_id)?;
        self.require_project_admin(&caller, &project, "update_project")?;
        let now = now_micros();
        let project = self
            .store
            .modify_project(project_id, &mut |p| p.apply_update(&update, now))?;
        self.commit_durable().await?;
        Ok(project)
    }

    /// Deletes a project and everything scoped to it: grants, documents and
    /// (best effort) their stored bytes.
    ///
    /// Records are removed through [`RecordStore::delete_project_cascade`],
    /// so uploads or grants racing the delete either land before it and are
    /// removed with it, or fail with `NotFound`. A store that cannot remove
    /// everything returns `PartialFailure` naming the steps that completed.
    pub async fn delete_project(
        &self,
        caller: &Account,
        project_id: &str,
    ) -> Result<ProjectDeletion, DocVaultError> {
        let caller = self.current_caller(caller)?;
        let project = self.require_project(project_id)?;
        require_admin_role(&caller)?;
        audit_admin_override(&caller, &project, "delete_project");

        let removal = match self.store.delete_project_cascade(project_id) {
            Ok(Some(removal)) => removal,
            Ok(None) => return Err(DocVaultError::not_found(ResourceType::Project, project_id)),
            Err(err) => {
                if matches!(err, DocVaultError::PartialFailure { .. })
                    && let Err(persist_err) = self.commit_durable().await
                {
                    warn!(project_id, error = %persist_err, "checkpoint after partial delete failed");
                }
                return Err(err);
            }
        };
        let orphaned_content = removal
            .documents
            .iter()
            .filter_map(|d| self.discard_content(d).err())
            .collect::<Vec<_>>();
        info!(
            project_id,
            grants_removed = removal.grants.len(),
            documents_removed = removal.documents.len(),
            orphaned_content = orphaned_content.len(),
            "project deleted"
        );
        self.commit_durable().await?;
        Ok(ProjectDeletion {
            project_id: project_id.to_string(),
            grants_removed: removal.grants.len(),
            documents_removed: removal.documents.len(),
            orphaned_content,
        })
    }

    pub async fn get_project(
        &self,
        caller: &Account,
        project_id: &str,
    ) -> Result<ProjectDetail, DocVaultError> {
        let caller = self.current_caller(caller)?;
        let project = self.require_project(project_id)?;
        let permission =
            self.authorize_project(&caller, &project, AccessLevel::Read, "get_project")?;
        let grants = if permission == EffectiveLevel::Admin {
            self.store.grants_for_project(project_id)?
        } else {
            self.store
                .grant(project_id, &caller.account_id)?
                .into_iter()
                .collect()
        };
        Ok(ProjectDetail {
            document_count: self.store.count_documents_in_project(project_id)?,
            project,
            permission,
            grants,
        })
    }

    pub async fn list_projects(
        &self,
        caller: &Account,
        options: ProjectListOptions,
    ) -> Result<Vec<ProjectSummary>, DocVaultError> {
        let caller = self.current_caller(caller)?;
        let projects = self.store.list_projects()?;
        let grants = self.store.grants_for_account(&caller.account_id)?;
        let filter = ProjectFilter::for_account(
            &caller,
            projects.iter(),
            grants.iter(),
            options.include_inactive,
        );
        let by_project: HashMap<&str, &AccessGrant> = grants
            .iter()
            .map(|g| (g.project_id.as_str(), g))
            .collect();

        let mut summaries = Vec::new();
        for project in projects.iter().filter(|p| filter.matches(p)) {
            let access = ProjectAccess::new(
                project,
                by_project.get(project.project_id.as_str()).copied(),
            );
            let Some(permission) =
                authz::resolve_project(&caller, &access, AccessLevel::Read).level()
            else {
                continue;
            };
            let grant_count = if caller.is_admin() {
                Some(self.store.grants_for_project(&project.project_id)?.len())
            } else {
                None
            };
            summaries.push(ProjectSummary {
                project: project.clone(),
                permission,
                is_owner: project.is_owned_by(&caller.account_id),
                document_count: self.store.count_documents_in_project(&project.project_id)?,
                grant_count,
            });
        }
        Ok(summaries)
    }

    pub async fn list_project_grants(
        &self,
        caller: &Account,
        project_id: &str,
    ) -> Result<Vec<AccessGrant>, DocVaultError> {
        let caller = self.current_caller(caller)?;
        let project = self.require_project(project_id)?;
        self.require_project_admin(&caller, &project, "list_project_grants")?;
        self.store.grants_for_project(project_id)
    }

    /// Resolves the caller's access to a project. Missing projects are
    /// `NotFound`, never a denial.
    pub async fn resolve_project_access(
        &self,
        caller: &Account,
        project_id: &str,
        requested: AccessLevel,
    ) -> Result<Decision, DocVaultError> {
        let caller = self.current_caller(caller)?;
        let project = self.require_project(project_id)?;
        self.project_decision(&caller, &project, requested)
    }

    // ---- grants ------------------------------------------------------------

    /// Creates or replaces the grant for `(project, account)`. The caller must
    /// hold admin-level access on the project (global admin or owner).
    pub async fn grant_access(
        &self,
        caller: &Account,
        project_id: &str,
        account_id: &str,
        permission: AccessLevel,
    ) -> Result<AccessGrant, DocVaultError> {
        let caller = self.current_caller(caller)?;
        let project = self.require_project(project_id)?;
        self.require_account(account_id)?;
        self.require_project_admin(&caller, &project, "grant_access")?;
        let grant = self.store.upsert_grant(AccessGrant::new(
            project_id,
            account_id,
            permission,
            &caller.account_id,
            now_micros(),
        ))?;
        info!(
            project_id,
            account_id,
            permission = %permission,
            granted_by = %caller.account_id,
            "access granted"
        );
        self.commit_durable().await?;
        Ok(grant)
    }

    /// Removes the grant for `(project, account)`. A missing grant is
    /// `NotFound(Grant)`.
    pub async fn revoke_access(
        &self,
        caller: &Account,
        project_id: &str,
        account_id: &str,
    ) -> Result<AccessGrant, DocVaultError> {
        let caller = self.current_caller(caller)?;
        let project = self.require_project(project_id)?;
        self.require_project_admin(&caller, &project, "revoke_access")?;
        let removed = self
            .store
            .delete_grant(project_id, account_id)?
            .ok_or_else(|| {
                DocVaultError::not_found(ResourceType::Grant, grant_id(project_id, account_id))
            })?;
        info!(
            project_id,
            account_id,
            revoked_by = %caller.account_id,
            "access revoked"
        );
        self.commit_durable().await?;
        Ok(removed)
    }

    // ---- documents ---------------------------------------------------------

    pub async fn upload_document(
        &self,
        caller: &Account,
        request: UploadRequest,
    ) -> Result<Document, DocVaultError> {
        let caller = self.current_caller(caller)?;
        let project = request
            .project_id
            .as_deref()
            .map(|project_id| self.require_project(project_id))
            .transpose()?;
        if caller.role == Role::Guest {
            return Err(DocVaultError::denied(DenialReason::RoleNotAllowed));
        }
        if request.bytes.is_empty() {
            return Err(DocVaultError::Validation("upload is empty".into()));
        }
        if request.bytes.len() as u64 > self.config.max_upload_bytes {
            return Err(DocVaultError::Validation(format!(
                "upload of {} bytes exceeds limit of {} bytes",
                request.bytes.len(),
                self.config.max_upload_bytes
            )));
        }
        match &project {
            Some(project) => {
                self.authorize_project(
                    &caller,
                    project,
                    AccessLevel::ReadWrite,
                    "upload_document",
                )?;
            }
            None if self.config.require_project_for_upload => {
                return Err(DocVaultError::Validation(
                    "uploads must name a project".into(),
                ));
            }
            None => {}
        }
        let filename = sanitize_filename(&request.filename)?;
        if filename.len() > self.config.max_filename_bytes {
            return Err(DocVaultError::Validation(format!(
                "filename exceeds {} bytes",
                self.config.max_filename_bytes
            )));
        }
        let tags = normalize_tags(&request.tags);
        if tags.len() > self.config.max_tags_per_document {
            return Err(DocVaultError::Validation(format!(
                "at most {} tags per document",
                self.config.max_tags_per_document
            )));
        }
        let mime_type = match request.mime_type.trim() {
            "" => DEFAULT_MIME_TYPE.to_string(),
            mime => mime.to_string(),
        };

        let document_id = new_id();
        let content = self.store_content(&document_id, &filename, &mime_type, &request.bytes)?;
        let now = now_micros();
        let mut document = Document {
            document_id,
            filename,
            original_name: request.filename.trim().to_string(),
            mime_type,
            size_bytes: request.bytes.len() as u64,
            content,
            tags,
            metadata: request.metadata,
            uploaded_by: caller.account_id.clone(),
            project_id: request.project_id,
            status: DocumentStatus::Processing,
            annotations: Annotations::default(),
            processing_error: None,
            created_at_micros: now,
            updated_at_micros: now,
        };
        if !self.config.annotate_on_upload {
            document.transition(DocumentStatus::Ready, now)?;
        }
        if let Err(err) = self.store.insert_document(document.clone()) {
            // Rollback of the bytes just written; a failure is only logged.
            let _ = self.discard_content(&document);
            return Err(err);
        }
        self.commit_durable().await?;
        Ok(document)
    }

    pub async fn get_document(
        &self,
        caller: &Account,
        document_id: &str,
    ) -> Result<Document, DocVaultError> {
        let caller = self.current_caller(caller)?;
        let document = self.require_document(document_id)?;
        self.authorize_document(&caller, &document, AccessLevel::Read, "get_document")?;
        Ok(document)
    }

    pub async fn download_document(
        &self,
        caller: &Account,
        document_id: &str,
    ) -> Result<DocumentContent, DocVaultError> {
        let caller = self.current_caller(caller)?;
        let document = self.require_document(document_id)?;
        self.authorize_document(&caller, &document, AccessLevel::Read, "download_document")?;
        let store = self.content_store_for(&document.content)?;
        let bytes = store
            .get(&document.content.key)
            .map_err(|e| DocVaultError::Unavailable {
                message: format!("content for document '{document_id}': {e}"),
            })?;
        Ok(DocumentContent { document, bytes })
    }

    /// Removes the document record, then its bytes on a best-effort basis.
    /// A key whose bytes survived is reported in `orphaned_content`.
    pub async fn delete_document(
        &self,
        caller: &Account,
        document_id: &str,
    ) -> Result<DocumentDeletion, DocVaultError> {
        let caller = self.current_caller(caller)?;
        let document = self.require_document(document_id)?;
        self.authorize_document(&caller, &document, AccessLevel::ReadWrite, "delete_document")?;
        let removed = self
            .store
            .delete_document(document_id)?
            .ok_or_else(|| DocVaultError::not_found(ResourceType::Document, document_id))?;
        let orphaned_content = self.discard_content(&removed).err();
        info!(
            document_id,
            orphaned_content = orphaned_content.is_some(),
            "document deleted"
        );
        self.commit_durable().await?;
        Ok(DocumentDeletion {
            document: removed,
            orphaned_content,
        })
    }

    /// Documents the caller may read, narrowed by `query`, newest first.
    pub async fn list_documents(
        &self,
        caller: &Account,
        query: DocumentQuery,
    ) -> Result<Vec<Document>, DocVaultError> {
        let caller = self.current_caller(caller)?;
        if let Some(project_id) = &query.project_id {
            let project = self.require_project(project_id)?;
            self.project_decision(&caller, &project, AccessLevel::Read)?
                .into_result()?;
        }
        let filter = self.filter_for(&caller)?;
        let mut documents: Vec<Document> = self
            .store
            .list_documents()?
            .into_iter()
            .filter(|d| filter.matches(d) && query.matches(d))
            .collect();
        if let Some(limit) = query.limit {
            documents.truncate(limit);
        }
        Ok(documents)
    }

    /// The listing predicate for `caller`, built from current state.
    pub async fn document_filter(&self, caller: &Account) -> Result<DocumentFilter, DocVaultError> {
        let caller = self.current_caller(caller)?;
        self.filter_for(&caller)
    }

    pub async fn resolve_document_access(
        &self,
        caller: &Account,
        document_id: &str,
        requested: AccessLevel,
    ) -> Result<Decision, DocVaultError> {
        let caller = self.current_caller(caller)?;
        let document = self.require_document(document_id)?;
        let (decision, _) = self.document_decision(&caller, &document, requested)?;
        Ok(decision)
    }

    /// Entry point for the annotation producer. Only `processing` documents
    /// accept an outcome.
    pub async fn complete_processing(
        &self,
        document_id: &str,
        outcome: ProcessingOutcome,
    ) -> Result<Document, DocVaultError> {
        let now = now_micros();
        let document = self
            .store
            .modify_document(document_id, &mut |doc| match &outcome {
                ProcessingOutcome::Ready(annotations) => {
                    doc.transition(DocumentStatus::Ready, now)?;
                    doc.annotations = annotations.clone();
                    doc.processing_error = None;
                    Ok(())
                }
                ProcessingOutcome::Failed { message } => {
                    doc.transition(DocumentStatus::Error, now)?;
                    doc.processing_error = Some(message.clone());
                    Ok(())
                }
            })?;
        self.commit_durable().await?;
        Ok(document)
    }

    pub async fn rate_summary(
        &self,
        caller: &Account,
        document_id: &str,
        rating: u8,
    ) -> Result<Document, DocVaultError> {
        if rating > 5 {
            return Err(DocVaultError::Validation(
                "rating must be between 0 and 5".into(),
            ));
        }
        let caller = self.current_caller(caller)?;
        let document = self.require_document(document_id)?;
        self.authorize_document(&caller, &document, AccessLevel::Read, "rate_summary")?;
        let now = now_micros();
        let document = self.store.modify_document(document_id, &mut |doc| {
            let summary = doc.annotations.summary.as_mut().ok_or_else(|| {
                DocVaultError::Validation("document has no summary to rate".into())
            })?;
            summary.rating = Some(rating);
            doc.updated_at_micros = now;
            Ok(())
        })?;
        self.commit_durable().await?;
        Ok(document)
    }

    pub async fn update_tags(
        &self,
        caller: &Account,
        document_id: &str,
        tags: Vec<String>,
    ) -> Result<Document, DocVaultError> {
        let caller = self.current_caller(caller)?;
        let document = self.require_document(document_id)?;
        self.authorize_document(&caller, &document, AccessLevel::ReadWrite, "update_tags")?;
        let tags = normalize_tags(&tags);
        if tags.len() > self.config.max_tags_per_document {
            return Err(DocVaultError::Validation(format!(
                "at most {} tags per document",
                self.config.max_tags_per_document
            )));
        }
        let now = now_micros();
        let document = self.store.modify_document(document_id, &mut |doc| {
            doc.tags = tags.clone();
            doc.updated_at_micros = now;
            Ok(())
        })?;
        self.commit_durable().await?;
        Ok(document)
    }

    // ---- durability --------------------------------------------------------

    /// Writes the current catalog as a new checkpoint.
    pub async fn checkpoint(&self) -> Result<CheckpointMeta, DocVaultError> {
        let dir = self
            .dir
            .as_deref()
            .ok_or_else(|| DocVaultError::InvalidConfig {
                message: "in-memory vault has no data directory".into(),
            })?;
        self.write_next_checkpoint(dir).await
    }

    pub async fn checkpoint_seq(&self) -> u64 {
        *self.checkpoint_gate.lock().await
    }

    async fn commit_durable(&self) -> Result<(), DocVaultError> {
        if self.config.durability != Durability::CheckpointOnCommit {
            return Ok(());
        }
        let Some(dir) = self.dir.as_deref() else {
            return Ok(());
        };
        self.write_next_checkpoint(dir).await.map(|_| ())
    }

    async fn write_next_checkpoint(&self, dir: &Path) -> Result<CheckpointMeta, DocVaultError> {
        let mut seq = self.checkpoint_gate.lock().await;
        let catalog = self.store.snapshot()?;
        let meta = write_checkpoint(&catalog, *seq + 1, dir, self.config.hmac_key())?;
        *seq = meta.seq;
        Ok(meta)
    }

    // ---- internals ---------------------------------------------------------

    fn current_caller(&self, caller: &Account) -> Result<Account, DocVaultError> {
        match self.store.account(&caller.account_id)? {
            Some(account) if account.is_active => Ok(account),
            Some(_) => Err(DocVaultError::Unauthenticated(format!(
                "account '{}' is disabled",
                caller.account_id
            ))),
            None => Err(DocVaultError::Unauthenticated(format!(
                "unknown account '{}'",
                caller.account_id
            ))),
        }
    }

    fn require_account(&self, account_id: &str) -> Result<Account, DocVaultError> {
        self.store
            .account(account_id)?
            .ok_or_else(|| DocVaultError::not_found(ResourceType::Account, account_id))
    }

    fn require_project(&self, project_id: &str) -> Result<Project, DocVaultError> {
        self.store
            .project(project_id)?
            .ok_or_else(|| DocVaultError::not_found(ResourceType::Project, project_id))
    }

    fn require_document(&self, document_id: &str) -> Result<Document, DocVaultError> {
        self.store
            .document(document_id)?
            .ok_or_else(|| DocVaultError::not_found(ResourceType::Document, document_id))
    }

    fn project_decision(
        &self,
        caller: &Account,
        project: &Project,
        requested: AccessLevel,
    ) -> Result<Decision, DocVaultError> {
        let grant = self.store.grant(&project.project_id, &caller.account_id)?;
        Ok(authz::resolve_project(
            caller,
            &ProjectAccess::new(project, grant.as_ref()),
            requested,
        ))
    }

    fn document_decision(
        &self,
        caller: &Account,
        document: &Document,
        requested: AccessLevel,
    ) -> Result<(Decision, Option<Project>), DocVaultError> {
        let Some(project_id) = document.project_id.as_deref() else {
            return Ok((
                authz::resolve_document(caller, document, None, requested),
                None,
            ));
        };
        let project = self.require_project(project_id)?;
        let grant = self.store.grant(project_id, &caller.account_id)?;
        let access = ProjectAccess::new(&project, grant.as_ref());
        let decision = authz::resolve_document(caller, document, Some(&access), requested);
        Ok((decision, Some(project)))
    }

    fn authorize_project(
        &self,
        caller: &Account,
        project: &Project,
        requested: AccessLevel,
        operation: &'static str,
    ) -> Result<EffectiveLevel, DocVaultError> {
        let level = self
            .project_decision(caller, project, requested)?
            .into_result()?;
        audit_admin_override(caller, project, operation);
        Ok(level)
    }

    fn authorize_document(
        &self,
        caller: &Account,
        document: &Document,
        requested: AccessLevel,
        operation: &'static str,
    ) -> Result<EffectiveLevel, DocVaultError> {
        let (decision, project) = self.document_decision(caller, document, requested)?;
        let level = decision.into_result()?;
        if let Some(project) = &project {
            audit_admin_override(caller, project, operation);
        }
        Ok(level)
    }

    /// Admin-level project access: global admin or owner. A grant, even
    /// `read-write`, is not enough.
    fn require_project_admin(
        &self,
        caller: &Account,
        project: &Project,
        operation: &'static str,
    ) -> Result<(), DocVaultError> {
        match self.project_decision(caller, project, AccessLevel::ReadWrite)? {
            Decision::Granted(EffectiveLevel::Admin) => {
                audit_admin_override(caller, project, operation);
                Ok(())
            }
            Decision::Granted(_) => Err(DocVaultError::denied(
                DenialReason::InsufficientPermission,
            )),
            Decision::Denied(reason) => Err(DocVaultError::denied(reason)),
        }
    }

    fn filter_for(&self, caller: &Account) -> Result<DocumentFilter, DocVaultError> {
        if caller.is_admin() {
            return Ok(DocumentFilter::for_account(caller, [], []));
        }
        let projects = self.store.list_projects()?;
        let grants = self.store.grants_for_account(&caller.account_id)?;
        Ok(DocumentFilter::for_account(
            caller,
            projects.iter(),
            grants.iter(),
        ))
    }

    fn store_content(
        &self,
        document_id: &str,
        filename: &str,
        mime_type: &str,
        bytes: &[u8],
    ) -> Result<ContentRef, DocVaultError> {
        if let Some(remote) = &self.remote_content {
            match remote.put(&remote_content_key(document_id, filename), mime_type, bytes) {
                Ok(key) => return Ok(ContentRef::remote(key)),
                Err(err) => {
                    warn!(
                        document_id,
                        error = %err,
                        "remote content store failed, keeping bytes locally"
                    );
                }
            }
        }
        let key = self
            .local_content
            .put(&local_content_key(), mime_type, bytes)
            .map_err(|e| DocVaultError::Unavailable {
                message: format!("local content store: {e}"),
            })?;
        Ok(ContentRef::local(key))
    }

    fn content_store_for(
        &self,
        content: &ContentRef,
    ) -> Result<&Arc<dyn ContentStore>, DocVaultError> {
        match content.location {
            ContentLocation::Local => Ok(&self.local_content),
            ContentLocation::Remote => {
                self.remote_content
                    .as_ref()
                    .ok_or_else(|| DocVaultError::Unavailable {
                        message: "no remote content store configured".into(),
                    })
            }
        }
    }

    /// Best-effort byte removal. Returns the key on failure so callers can
    /// report it; never fails the surrounding operation.
    fn discard_content(&self, document: &Document) -> Result<(), String> {
        let key = &document.content.key;
        let result = self
            .content_store_for(&document.content)
            .map_err(|e| e.to_string())
            .and_then(|store| store.delete(key).map_err(|e| e.to_string()));
        if let Err(error) = result {
            warn!(
                document_id = %document.document_id,
                content_key = %key,
                error = %error,
                "content deletion failed"
            );
            return Err(key.clone());
        }
        Ok(())
    }
}

fn require_admin_role(caller: &Account) -> Result<(), DocVaultError> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(DocVaultError::denied(DenialReason::RoleNotAllowed))
    }
}

fn audit_admin_override(caller: &Account, project: &Project, operation: &'static str) {
    if caller.is_admin() && !project.is_owned_by(&caller.account_id) {
        warn!(
            account_id = %caller.account_id,
            project_id = %project.project_id,
            operation,
            "global admin override"
        );
    }
}
