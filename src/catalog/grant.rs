use crate::permission::AccessLevel;
use serde::{Deserialize, Serialize};

/// Unique key of a grant: `(project_id, account_id)`.
pub type GrantKey = (String, String);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessGrant {
    pub project_id: String,
    pub account_id: String,
    pub permission: AccessLevel,
    pub granted_by: String,
    pub created_at_micros: u64,
    pub updated_at_micros: u64,
}

impl AccessGrant {
    pub fn new(
        project_id: impl Into<String>,
        account_id: impl Into<String>,
        permission: AccessLevel,
        granted_by: impl Into<String>,
        now_micros: u64,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            account_id: account_id.into(),
            permission,
            granted_by: granted_by.into(),
            created_at_micros: now_micros,
            updated_at_micros: now_micros,
        }
    }

    pub fn key(&self) -> GrantKey {
        (self.project_id.clone(), self.account_id.clone())
    }

    pub fn applies_to(&self, project_id: &str, account_id: &str) -> bool {
        self.project_id == project_id && self.account_id == account_id
    }
}
