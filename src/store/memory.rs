use crate::catalog::{Catalog, ProjectRemoval};
use crate::catalog::account::Account;
use crate::catalog::document::Document;
use crate::catalog::grant::AccessGrant;
use crate::catalog::project::Project;
use crate::error::DocVaultError;
use crate::store::{AccountEdit, DocumentEdit, ProjectEdit, RecordStore};
use parking_lot::RwLock;

/// In-process store over a [`Catalog`]. Each call holds the lock for the
/// whole read or write, which is what makes `upsert_grant` and the
/// `modify_*` calls atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    catalog: RwLock<Catalog>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_catalog(catalog: Catalog) -> Self {
        Self {
            catalog: RwLock::new(catalog),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&Catalog) -> T) -> T {
        f(&self.catalog.read())
    }

    fn write<T>(&self, f: impl FnOnce(&mut Catalog) -> T) -> T {
        f(&mut self.catalog.write())
    }
}

impl RecordStore for MemoryStore {
    fn account(&self, account_id: &str) -> Result<Option<Account>, DocVaultError> {
        Ok(self.read(|c| c.account(account_id).cloned()))
    }

    fn account_by_email(&self, email: &str) -> Result<Option<Account>, DocVaultError> {
        Ok(self.read(|c| c.account_by_email(email).cloned()))
    }

    fn account_by_federated_subject(
        &self,
        subject: &str,
    ) -> Result<Option<Account>, DocVaultError> {
        Ok(self.read(|c| c.account_by_subject(subject).cloned()))
    }

    fn insert_account(&self, account: Account) -> Result<(), DocVaultError> {
        self.write(|c| c.insert_account(account))
    }

    fn insert_first_account(&self, account: Account) -> Result<(), DocVaultError> {
        self.write(|c| c.insert_first_account(account))
    }

    fn modify_account(
        &self,
        account_id: &str,
        edit: AccountEdit<'_>,
    ) -> Result<Account, DocVaultError> {
        self.write(|c| c.modify_account(account_id, edit))
    }

    fn list_accounts(&self) -> Result<Vec<Account>, DocVaultError> {
        let mut accounts = self.read(|c| c.accounts.values().cloned().collect::<Vec<_>>());
        accounts.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(accounts)
    }

    fn project(&self, project_id: &str) -> Result<Option<Project>, DocVaultError> {
        Ok(self.read(|c| c.project(project_id).cloned()))
    }

    fn insert_project(&self, project: Project) -> Result<(), DocVaultError> {
        self.write(|c| c.insert_project(project))
    }

    fn modify_project(
        &self,
        project_id: &str,
        edit: ProjectEdit<'_>,
    ) -> Result<Project, DocVaultError> {
        self.write(|c| c.modify_project(project_id, edit))
    }

    fn delete_project(&self, project_id: &str) -> Result<Option<Project>, DocVaultError> {
        Ok(self.write(|c| c.remove_project(project_id)))
    }

    fn list_projects(&self) -> Result<Vec<Project>, DocVaultError> {
        let mut projects = self.read(|c| c.projects.values().cloned().collect::<Vec<_>>());
        projects.sort_by(|a, b| {
            b.created_at_micros
                .cmp(&a.created_at_micros)
                .then_with(|| a.project_id.cmp(&b.project_id))
        });
        Ok(projects)
    }

    fn grant(
        &self,
        project_id: &str,
        account_id: &str,
    ) -> Result<Option<AccessGrant>, DocVaultError> {
        Ok(self.read(|c| c.grant(project_id, account_id).cloned()))
    }

    fn upsert_grant(&self, grant: AccessGrant) -> Result<AccessGrant, DocVaultError> {
        self.write(|c| c.upsert_grant(grant))
    }

    fn delete_grant(
        &self,
        project_id: &str,
        account_id: &str,
    ) -> Result<Option<AccessGrant>, DocVaultError> {
        Ok(self.write(|c| c.remove_grant(project_id, account_id)))
    }

    fn delete_grants_for_project(&self, project_id: &str) -> Result<usize, DocVaultError> {
        Ok(self.write(|c| c.remove_grants_for_project(project_id).len()))
    }

    fn grants_for_project(&self, project_id: &str) -> Result<Vec<AccessGrant>, DocVaultError> {
        Ok(self.read(|c| c.grants_for_project(project_id)))
    }

    fn grants_for_account(&self, account_id: &str) -> Result<Vec<AccessGrant>, DocVaultError> {
        Ok(self.read(|c| c.grants_for_account(account_id)))
    }

    fn document(&self, document_id: &str) -> Result<Option<Document>, DocVaultError> {
        Ok(self.read(|c| c.document(document_id).cloned()))
    }

    fn insert_document(&self, document: Document) -> Result<(), DocVaultError> {
        self.write(|c| c.insert_document(document))
    }

    fn modify_document(
        &self,
        document_id: &str,
        edit: DocumentEdit<'_>,
    ) -> Result<Document, DocVaultError> {
        self.write(|c| c.modify_document(document_id, edit))
    }

    fn delete_document(&self, document_id: &str) -> Result<Option<Document>, DocVaultError> {
        Ok(self.write(|c| c.remove_document(document_id)))
    }

    fn delete_documents_for_project(
        &self,
        project_id: &str,
    ) -> Result<Vec<Document>, DocVaultError> {
        Ok(self.write(|c| c.remove_documents_for_project(project_id)))
    }

    fn list_documents(&self) -> Result<Vec<Document>, DocVaultError> {
        let mut documents = self.read(|c| c.documents.values().cloned().collect::<Vec<_>>());
        documents.sort_by(|a, b| {
            b.created_at_micros
                .cmp(&a.created_at_micros)
                .then_with(|| a.document_id.cmp(&b.document_id))
        });
        Ok(documents)
    }

    fn count_documents_in_project(&self, project_id: &str) -> Result<usize, DocVaultError> {
        Ok(self.read(|c| c.count_documents_in_project(project_id)))
    }

    fn delete_project_cascade(
        &self,
        project_id: &str,
    ) -> Result<Option<ProjectRemoval>, DocVaultError> {
        Ok(self.write(|c| c.remove_project_cascade(project_id)))
    }

    fn snapshot(&self) -> Result<Catalog, DocVaultError> {
        Ok(self.read(Catalog::clone))
    }
}
