use crate::catalog::account::Account;
use crate::catalog::document::Document;
use crate::catalog::grant::AccessGrant;
use crate::catalog::project::Project;
use crate::permission::{AccessLevel, Role};
use std::collections::{HashMap, HashSet};

/// Project-level facts about one account, gathered once per listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessIndex {
    pub owned: HashSet<String>,
    pub granted: HashMap<String, AccessLevel>,
    pub public_read: HashSet<String>,
}

impl AccessIndex {
    pub fn build<'a, P, G>(account_id: &str, projects: P, grants: G) -> Self
    where
        P: IntoIterator<Item = &'a Project>,
        G: IntoIterator<Item = &'a AccessGrant>,
    {
        let mut index = AccessIndex::default();
        let mut known = HashSet::new();
        for project in projects {
            known.insert(project.project_id.clone());
            if project.is_owned_by(account_id) {
                index.owned.insert(project.project_id.clone());
            }
            if project.settings.allow_public_read {
                index.public_read.insert(project.project_id.clone());
            }
        }
        for grant in grants {
            if grant.account_id == account_id && known.contains(&grant.project_id) {
                index
                    .granted
                    .insert(grant.project_id.clone(), grant.permission);
            }
        }
        index
    }

    /// Readable under the project rules (owner, any grant, public read).
    pub fn can_read_project(&self, project_id: &str) -> bool {
        self.owned.contains(project_id)
            || self.granted.contains_key(project_id)
            || self.public_read.contains(project_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Scope {
    Everything,
    Restricted(AccessIndex),
}

/// Listing predicate over documents. Accepts exactly the documents for
/// which `authz::resolve_document(.., AccessLevel::Read)` is granted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFilter {
    account_id: String,
    ready_only: bool,
    scope: Scope,
}

impl DocumentFilter {
    pub fn for_account<'a, P, G>(account: &Account, projects: P, grants: G) -> Self
    where
        P: IntoIterator<Item = &'a Project>,
        G: IntoIterator<Item = &'a AccessGrant>,
    {
        if account.role.is_admin() {
            return Self {
                account_id: account.account_id.clone(),
                ready_only: false,
                scope: Scope::Everything,
            };
        }
        Self {
            account_id: account.account_id.clone(),
            ready_only: account.role == Role::Guest,
            scope: Scope::Restricted(AccessIndex::build(&account.account_id, projects, grants)),
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self.scope, Scope::Everything)
    }

    pub fn matches(&self, document: &Document) -> bool {
        let index = match &self.scope {
            Scope::Everything => return true,
            Scope::Restricted(index) => index,
        };
        if self.ready_only && !document.is_ready() {
            return false;
        }
        match &document.project_id {
            Some(project_id) => index.can_read_project(project_id),
            None => document.uploaded_by == self.account_id || document.is_ready(),
        }
    }

    pub fn apply<I>(&self, documents: I) -> Vec<Document>
    where
        I: IntoIterator<Item = Document>,
    {
        documents.into_iter().filter(|d| self.matches(d)).collect()
    }
}

/// Listing predicate over projects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectFilter {
    include_inactive: bool,
    scope: Scope,
}

impl ProjectFilter {
    pub fn for_account<'a, P, G>(
        account: &Account,
        projects: P,
        grants: G,
        include_inactive: bool,
    ) -> Self
    where
        P: IntoIterator<Item = &'a Project>,
        G: IntoIterator<Item = &'a AccessGrant>,
    {
        let scope = if account.role.is_admin() {
            Scope::Everything
        } else {
            Scope::Restricted(AccessIndex::build(&account.account_id, projects, grants))
        };
        Self {
            include_inactive,
            scope,
        }
    }

    pub fn matches(&self, project: &Project) -> bool {
        if !project.is_active && !self.include_inactive {
            return false;
        }
        match &self.scope {
            Scope::Everything => true,
            Scope::Restricted(index) => index.can_read_project(&project.project_id),
        }
    }
}
