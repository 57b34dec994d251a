use crate::error::DocVaultError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct ProjectSettings {
    pub allow_public_read: bool,
    /// Stored for clients; resolution never grants write access from it.
    pub allow_public_write: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    pub allow_public_read: Option<bool>,
    pub allow_public_write: Option<bool>,
}

impl ProjectSettings {
    pub fn merge(&mut self, patch: SettingsPatch) {
        if let Some(v) = patch.allow_public_read {
            self.allow_public_read = v;
        }
        if let Some(v) = patch.allow_public_write {
            self.allow_public_write = v;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Project {
    pub project_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub owner_id: String,
    pub is_active: bool,
    #[serde(default)]
    pub settings: ProjectSettings,
    pub created_at_micros: u64,
    pub updated_at_micros: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub settings: ProjectSettings,
}

impl NewProject {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_settings(mut self, settings: ProjectSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// Partial update. `description: Some(None)` clears the description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub settings: Option<SettingsPatch>,
    pub is_active: Option<bool>,
}

impl Project {
    pub fn new(
        project_id: impl Into<String>,
        owner_id: impl Into<String>,
        request: NewProject,
        now_micros: u64,
    ) -> Result<Self, DocVaultError> {
        Ok(Self {
            project_id: project_id.into(),
            name: validate_project_name(&request.name)?,
            description: normalize_description(request.description),
            owner_id: owner_id.into(),
            is_active: true,
            settings: request.settings,
            created_at_micros: now_micros,
            updated_at_micros: now_micros,
        })
    }

    pub fn is_owned_by(&self, account_id: &str) -> bool {
        self.owner_id == account_id
    }

    pub fn apply_update(&mut self, update: &ProjectUpdate, now_micros: u64) -> Result<(), DocVaultError> {
        if let Some(name) = &update.name {
            self.name = validate_project_name(name)?;
        }
        if let Some(description) = &update.description {
            self.description = normalize_description(description.clone());
        }
        if let Some(patch) = update.settings {
            self.settings.merge(patch);
        }
        if let Some(active) = update.is_active {
            self.is_active = active;
        }
        self.updated_at_micros = now_micros;
        Ok(())
    }
}

pub fn validate_project_name(raw: &str) -> Result<String, DocVaultError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DocVaultError::Validation(
            "project name must not be empty".into(),
        ));
    }
    Ok(name.to_string())
}

fn normalize_description(raw: Option<String>) -> Option<String> {
    raw.map(|d| d.trim().to_string()).filter(|d| !d.is_empty())
}
