pub mod memory;

use crate::catalog::{Catalog, ProjectRemoval};
use crate::catalog::account::Account;
use crate::catalog::document::Document;
use crate::catalog::grant::AccessGrant;
use crate::catalog::project::Project;
use crate::error::{DocVaultError, ResourceType};

pub use memory::MemoryStore;

pub type AccountEdit<'a> = &'a mut dyn FnMut(&mut Account) -> Result<(), DocVaultError>;
pub type ProjectEdit<'a> = &'a mut dyn FnMut(&mut Project) -> Result<(), DocVaultError>;
pub type DocumentEdit<'a> = &'a mut dyn FnMut(&mut Document) -> Result<(), DocVaultError>;

/// Persistence collaborator for the four record types.
///
/// Every method is atomic on its own. `upsert_grant` in particular must be a
/// single keyed write on `(project, account)`, never a read followed by a
/// separate write, so concurrent grants for the same pair cannot produce two
/// rows. The `modify_*` methods apply the closure under the same guarantee.
///
/// Lookups return `Ok(None)` for missing records; mutations of missing records
/// return `DocVaultError::NotFound`.
pub trait RecordStore: Send + Sync {
    fn account(&self, account_id: &str) -> Result<Option<Account>, DocVaultError>;
    fn account_by_email(&self, email: &str) -> Result<Option<Account>, DocVaultError>;
    fn account_by_federated_subject(&self, subject: &str)
    -> Result<Option<Account>, DocVaultError>;
    fn insert_account(&self, account: Account) -> Result<(), DocVaultError>;
    /// Inserts `account` only if no account exists yet, as one write.
    /// Otherwise `PermissionDenied(RoleNotAllowed)`.
    fn insert_first_account(&self, account: Account) -> Result<(), DocVaultError>;
    fn modify_account(&self, account_id: &str, edit: AccountEdit<'_>)
    -> Result<Account, DocVaultError>;
    fn list_accounts(&self) -> Result<Vec<Account>, DocVaultError>;

    fn project(&self, project_id: &str) -> Result<Option<Project>, DocVaultError>;
    fn insert_project(&self, project: Project) -> Result<(), DocVaultError>;
    fn modify_project(&self, project_id: &str, edit: ProjectEdit<'_>)
    -> Result<Project, DocVaultError>;
    fn delete_project(&self, project_id: &str) -> Result<Option<Project>, DocVaultError>;
    fn list_projects(&self) -> Result<Vec<Project>, DocVaultError>;

    fn grant(&self, project_id: &str, account_id: &str)
    -> Result<Option<AccessGrant>, DocVaultError>;
    fn upsert_grant(&self, grant: AccessGrant) -> Result<AccessGrant, DocVaultError>;
    fn delete_grant(
        &self,
        project_id: &str,
        account_id: &str,
    ) -> Result<Option<AccessGrant>, DocVaultError>;
    fn delete_grants_for_project(&self, project_id: &str) -> Result<usize, DocVaultError>;
    fn grants_for_project(&self, project_id: &str) -> Result<Vec<AccessGrant>, DocVaultError>;
    fn grants_for_account(&self, account_id: &str) -> Result<Vec<AccessGrant>, DocVaultError>;

    fn document(&self, document_id: &str) -> Result<Option<Document>, DocVaultError>;
    fn insert_document(&self, document: Document) -> Result<(), DocVaultError>;
    fn modify_document(
        &self,
        document_id: &str,
        edit: DocumentEdit<'_>,
    ) -> Result<Document, DocVaultError>;
    fn delete_document(&self, document_id: &str) -> Result<Option<Document>, DocVaultError>;
    fn delete_documents_for_project(&self, project_id: &str)
    -> Result<Vec<Document>, DocVaultError>;
    fn list_documents(&self) -> Result<Vec<Document>, DocVaultError>;
    fn count_documents_in_project(&self, project_id: &str) -> Result<usize, DocVaultError>;

    /// Removes a project with its grants and documents. `Ok(None)` when the
    /// project does not exist.
    ///
    /// The default runs grants, documents, project as separate writes and
    /// then sweeps once more: once the project row is gone nothing new can
    /// reference it, so the sweep catches writes that landed between steps.
    /// A failure after any completed step is `PartialFailure`. Stores that
    /// can do the whole removal as one write should override this.
    fn delete_project_cascade(
        &self,
        project_id: &str,
    ) -> Result<Option<ProjectRemoval>, DocVaultError> {
        const OP: &str = "delete_project";
        if self.project(project_id)?.is_none() {
            return Ok(None);
        }
        let mut completed: Vec<String> = Vec::new();
        let mut grants = self
            .grants_for_project(project_id)
            .map_err(|e| DocVaultError::partial(OP, &completed, e))?;
        self.delete_grants_for_project(project_id)
            .map_err(|e| DocVaultError::partial(OP, &completed, e))?;
        completed.push("grants".into());
        let mut documents = self
            .delete_documents_for_project(project_id)
            .map_err(|e| DocVaultError::partial(OP, &completed, e))?;
        completed.push("documents".into());
        let Some(project) = self
            .delete_project(project_id)
            .map_err(|e| DocVaultError::partial(OP, &completed, e))?
        else {
            return Err(DocVaultError::partial(
                OP,
                &completed,
                DocVaultError::not_found(ResourceType::Project, project_id),
            ));
        };
        completed.push("project".into());
        grants.extend(
            self.grants_for_project(project_id)
                .map_err(|e| DocVaultError::partial(OP, &completed, e))?,
        );
        self.delete_grants_for_project(project_id)
            .map_err(|e| DocVaultError::partial(OP, &completed, e))?;
        documents.extend(
            self.delete_documents_for_project(project_id)
                .map_err(|e| DocVaultError::partial(OP, &completed, e))?,
        );
        Ok(Some(ProjectRemoval {
            project,
            grants,
            documents,
        }))
    }

    /// Point-in-time copy of everything, used for checkpoints.
    fn snapshot(&self) -> Result<Catalog, DocVaultError>;
}
