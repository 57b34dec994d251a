pub mod account;
pub mod document;
pub mod grant;
pub mod project;

use crate::catalog::account::Account;
use crate::catalog::document::Document;
use crate::catalog::grant::{AccessGrant, GrantKey};
use crate::catalog::project::Project;
use crate::error::{DocVaultError, ResourceType};
use crate::permission::DenialReason;
use im::HashMap;
use serde::{Deserialize, Serialize};

/// Authoritative record state: accounts, projects, grants and documents
/// plus the secondary indexes that enforce uniqueness.
///
/// Maps are persistent (`im`), so cloning a catalog for a snapshot or a
/// checkpoint is O(1) and never blocks writers for long.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Catalog {
    pub accounts: HashMap<String, Account>,
    /// normalized email -> account_id
    pub email_index: HashMap<String, String>,
    /// federated subject -> account_id
    pub subject_index: HashMap<String, String>,
    pub projects: HashMap<String, Project>,
    pub grants: HashMap<GrantKey, AccessGrant>,
    pub documents: HashMap<String, Document>,
}

/// Everything a project cascade took out of the catalog.
#[derive(Debug, Clone)]
pub struct ProjectRemoval {
    pub project: Project,
    pub grants: Vec<AccessGrant>,
    pub documents: Vec<Document>,
}

impl Catalog {
    pub fn account(&self, account_id: &str) -> Option<&Account> {
        self.accounts.get(account_id)
    }

    pub fn account_by_email(&self, email: &str) -> Option<&Account> {
        let normalized = email.trim().to_lowercase();
        self.email_index
            .get(&normalized)
            .and_then(|id| self.accounts.get(id))
    }

    pub fn account_by_subject(&self, subject: &str) -> Option<&Account> {
        self.subject_index
            .get(subject)
            .and_then(|id| self.accounts.get(id))
    }

    pub fn insert_account(&mut self, account: Account) -> Result<(), DocVaultError> {
        if self.accounts.contains_key(&account.account_id) {
            return Err(DocVaultError::already_exists(
                ResourceType::Account,
                account.account_id,
            ));
        }
        self.check_account_unique(&account)?;
        self.index_account(&account);
        self.accounts.insert(account.account_id.clone(), account);
        Ok(())
    }

    /// Inserts an account only while the catalog has none. Anything else is
    /// `RoleNotAllowed`, which is how self-registered admins stay unique.
    pub fn insert_first_account(&mut self, account: Account) -> Result<(), DocVaultError> {
        if !self.accounts.is_empty() {
            return Err(DocVaultError::denied(DenialReason::RoleNotAllowed));
        }
        self.insert_account(account)
    }

    /// Replaces an existing account, re-checking email/subject uniqueness
    /// against every other account.
    pub fn replace_account(&mut self, account: Account) -> Result<(), DocVaultError> {
        let Some(previous) = self.accounts.get(&account.account_id).cloned() else {
            return Err(DocVaultError::not_found(
                ResourceType::Account,
                account.account_id,
            ));
        };
        self.check_account_unique(&account)?;
        self.email_index.remove(&previous.email);
        if let Some(subject) = &previous.federated_subject {
            self.subject_index.remove(subject);
        }
        self.index_account(&account);
        self.accounts.insert(account.account_id.clone(), account);
        Ok(())
    }

    pub fn modify_account(
        &mut self,
        account_id: &str,
        f: &mut dyn FnMut(&mut Account) -> Result<(), DocVaultError>,
    ) -> Result<Account, DocVaultError> {
        let mut account = self
            .accounts
            .get(account_id)
            .cloned()
            .ok_or_else(|| DocVaultError::not_found(ResourceType::Account, account_id))?;
        f(&mut account)?;
        account.account_id = account_id.to_string();
        self.replace_account(account.clone())?;
        Ok(account)
    }

    fn check_account_unique(&self, account: &Account) -> Result<(), DocVaultError> {
        if let Some(owner) = self.email_index.get(&account.email)
            && owner != &account.account_id
        {
            return Err(DocVaultError::already_exists(
                ResourceType::Account,
                account.email.clone(),
            ));
        }
        if let Some(subject) = &account.federated_subject
            && let Some(owner) = self.subject_index.get(subject)
            && owner != &account.account_id
        {
            return Err(DocVaultError::already_exists(
                ResourceType::Account,
                subject.clone(),
            ));
        }
        Ok(())
    }

    fn index_account(&mut self, account: &Account) {
        self.email_index
            .insert(account.email.clone(), account.account_id.clone());
        if let Some(subject) = &account.federated_subject {
            self.subject_index
                .insert(subject.clone(), account.account_id.clone());
        }
    }

    pub fn project(&self, project_id: &str) -> Option<&Project> {
        self.projects.get(project_id)
    }

    pub fn insert_project(&mut self, project: Project) -> Result<(), DocVaultError> {
        if self.projects.contains_key(&project.project_id) {
            return Err(DocVaultError::already_exists(
                ResourceType::Project,
                project.project_id,
            ));
        }
        if !self.accounts.contains_key(&project.owner_id) {
            return Err(DocVaultError::not_found(
                ResourceType::Account,
                project.owner_id,
            ));
        }
        self.projects.insert(project.project_id.clone(), project);
        Ok(())
    }

    pub fn modify_project(
        &mut self,
        project_id: &str,
        f: &mut dyn FnMut(&mut Project) -> Result<(), DocVaultError>,
    ) -> Result<Project, DocVaultError> {
        let current = self
            .projects
            .get(project_id)
            .ok_or_else(|| DocVaultError::not_found(ResourceType::Project, project_id))?;
        let mut updated = current.clone();
        f(&mut updated)?;
        if updated.owner_id != current.owner_id {
            return Err(DocVaultError::Validation(format!(
                "owner of project '{project_id}' is immutable"
            )));
        }
        updated.project_id = project_id.to_string();
        self.projects.insert(project_id.to_string(), updated.clone());
        Ok(updated)
    }

    /// Removes only the project row; see [`Catalog::remove_project_cascade`].
    pub fn remove_project(&mut self, project_id: &str) -> Option<Project> {
        self.projects.remove(project_id)
    }

    /// Removes the project together with its grants and documents in one
    /// mutation. `None` leaves the catalog untouched.
    pub fn remove_project_cascade(&mut self, project_id: &str) -> Option<ProjectRemoval> {
        let project = self.projects.remove(project_id)?;
        let grants = self.remove_grants_for_project(project_id);
        let documents = self.remove_documents_for_project(project_id);
        Some(ProjectRemoval {
            project,
            grants,
            documents,
        })
    }

    pub fn grant(&self, project_id: &str, account_id: &str) -> Option<&AccessGrant> {
        self.grants
            .get(&(project_id.to_string(), account_id.to_string()))
    }

    /// Insert-or-replace keyed on `(project, account)`. The original
    /// `created_at_micros` survives a level change.
    pub fn upsert_grant(&mut self, mut grant: AccessGrant) -> Result<AccessGrant, DocVaultError> {
        if !self.projects.contains_key(&grant.project_id) {
            return Err(DocVaultError::not_found(
                ResourceType::Project,
                grant.project_id,
            ));
        }
        if !self.accounts.contains_key(&grant.account_id) {
            return Err(DocVaultError::not_found(
                ResourceType::Account,
                grant.account_id,
            ));
        }
        let key = grant.key();
        if let Some(existing) = self.grants.get(&key) {
            grant.created_at_micros = existing.created_at_micros;
        }
        self.grants.insert(key, grant.clone());
        Ok(grant)
    }

    pub fn remove_grant(&mut self, project_id: &str, account_id: &str) -> Option<AccessGrant> {
        self.grants
            .remove(&(project_id.to_string(), account_id.to_string()))
    }

    pub fn remove_grants_for_project(&mut self, project_id: &str) -> Vec<AccessGrant> {
        let keys: Vec<GrantKey> = self
            .grants
            .keys()
            .filter(|(p, _)| p == project_id)
            .cloned()
            .collect();
        keys.into_iter()
            .filter_map(|key| self.grants.remove(&key))
            .collect()
    }

    pub fn grants_for_project(&self, project_id: &str) -> Vec<AccessGrant> {
        let mut grants: Vec<AccessGrant> = self
            .grants
            .values()
            .filter(|g| g.project_id == project_id)
            .cloned()
            .collect();
        grants.sort_by(|a, b| b.created_at_micros.cmp(&a.created_at_micros));
        grants
    }

    pub fn grants_for_account(&self, account_id: &str) -> Vec<AccessGrant> {
        self.grants
            .values()
            .filter(|g| g.account_id == account_id)
            .cloned()
            .collect()
    }

    pub fn document(&self, document_id: &str) -> Option<&Document> {
        self.documents.get(document_id)
    }

    pub fn insert_document(&mut self, document: Document) -> Result<(), DocVaultError> {
        if self.documents.contains_key(&document.document_id) {
            return Err(DocVaultError::already_exists(
                ResourceType::Document,
                document.document_id,
            ));
        }
        if let Some(project_id) = &document.project_id
            && !self.projects.contains_key(project_id)
        {
            return Err(DocVaultError::not_found(
                ResourceType::Project,
                project_id.clone(),
            ));
        }
        self.documents
            .insert(document.document_id.clone(), document);
        Ok(())
    }

    pub fn modify_document(
        &mut self,
        document_id: &str,
        f: &mut dyn FnMut(&mut Document) -> Result<(), DocVaultError>,
    ) -> Result<Document, DocVaultError> {
        let mut document = self
            .documents
            .get(document_id)
            .cloned()
            .ok_or_else(|| DocVaultError::not_found(ResourceType::Document, document_id))?;
        f(&mut document)?;
        document.document_id = document_id.to_string();
        self.documents
            .insert(document_id.to_string(), document.clone());
        Ok(document)
    }

    pub fn remove_document(&mut self, document_id: &str) -> Option<Document> {
        self.documents.remove(document_id)
    }

    pub fn remove_documents_for_project(&mut self, project_id: &str) -> Vec<Document> {
        let ids: Vec<String> = self
            .documents
            .values()
            .filter(|d| d.project_id.as_deref() == Some(project_id))
            .map(|d| d.document_id.clone())
            .collect();
        ids.into_iter()
            .filter_map(|id| self.documents.remove(&id))
            .collect()
    }

    pub fn count_documents_in_project(&self, project_id: &str) -> usize {
        self.documents
            .values()
            .filter(|d| d.project_id.as_deref() == Some(project_id))
            .count()
    }
}
