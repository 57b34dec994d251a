use crate::error::DocVaultError;
use crate::permission::Role;
use serde::{Deserialize, Serialize};

/// How an account proves its identity when it is first created.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Credential {
    /// Salted hash produced by the caller's password hasher. Opaque here.
    PasswordHash(String),
    /// Identity asserted by an external federation provider.
    Federated { subject: String },
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::PasswordHash(_) => f.write_str("PasswordHash(<redacted>)"),
            Credential::Federated { subject } => f
                .debug_struct("Federated")
                .field("subject", subject)
                .finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub credential: Credential,
}

impl NewAccount {
    pub fn with_password_hash(
        name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            role: Role::User,
            credential: Credential::PasswordHash(password_hash.into()),
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
}

/// Admin-driven profile change. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Profile asserted by the federation provider on each login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedProfile {
    pub subject: String,
    pub email: String,
    pub display_name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub account_id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub password_hash: Option<String>,
    #[serde(default)]
    pub federated_subject: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    pub is_active: bool,
    pub created_at_micros: u64,
    pub updated_at_micros: u64,
    pub last_active_micros: u64,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("account_id", &self.account_id)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("has_password", &self.password_hash.is_some())
            .field("federated_subject", &self.federated_subject)
            .field("is_active", &self.is_active)
            .finish_non_exhaustive()
    }
}

impl Account {
    pub fn new(
        account_id: impl Into<String>,
        request: NewAccount,
        now_micros: u64,
    ) -> Result<Self, DocVaultError> {
        let name = validate_display_name(&request.name)?;
        let email = normalize_email(&request.email)?;
        let (password_hash, federated_subject) = match request.credential {
            Credential::PasswordHash(hash) => {
                if hash.is_empty() {
                    return Err(DocVaultError::Validation(
                        "password hash must not be empty".into(),
                    ));
                }
                (Some(hash), None)
            }
            Credential::Federated { subject } => (None, Some(validate_subject(&subject)?)),
        };
        Ok(Self {
            account_id: account_id.into(),
            name,
            email,
            role: request.role,
            password_hash,
            federated_subject,
            picture: None,
            is_active: true,
            created_at_micros: now_micros,
            updated_at_micros: now_micros,
            last_active_micros: now_micros,
        })
    }

    /// First federated login: role is always `user`, no local password.
    pub fn from_federated(
        account_id: impl Into<String>,
        profile: &FederatedProfile,
        now_micros: u64,
    ) -> Result<Self, DocVaultError> {
        let email = normalize_email(&profile.email)?;
        let name = profile
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .or_else(|| email.split('@').next().map(str::to_string))
            .unwrap_or_else(|| "federated user".to_string());
        let mut account = Self::new(
            account_id,
            NewAccount {
                name,
                email,
                role: Role::User,
                credential: Credential::Federated {
                    subject: profile.subject.clone(),
                },
            },
            now_micros,
        )?;
        account.picture = profile.picture.clone();
        Ok(account)
    }

    /// Re-login through federation. Links the subject when the account was
    /// created locally, refreshes name/picture, never touches `role`.
    pub fn apply_federated_profile(
        &mut self,
        profile: &FederatedProfile,
        now_micros: u64,
    ) -> Result<(), DocVaultError> {
        let subject = validate_subject(&profile.subject)?;
        match self.federated_subject.as_deref() {
            None => self.federated_subject = Some(subject),
            Some(existing) if existing == subject => {}
            Some(_) => {
                return Err(DocVaultError::already_exists(
                    crate::error::ResourceType::Account,
                    self.email.clone(),
                ));
            }
        }
        if self.picture.is_none() {
            self.picture = profile.picture.clone();
        }
        if let Some(name) = profile
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
        {
            self.name = name.to_string();
        }
        self.last_active_micros = now_micros;
        self.updated_at_micros = now_micros;
        Ok(())
    }

    pub fn apply_update(&mut self, update: &AccountUpdate, now_micros: u64) -> Result<(), DocVaultError> {
        if let Some(name) = &update.name {
            self.name = validate_display_name(name)?;
        }
        if let Some(email) = &update.email {
            self.email = normalize_email(email)?;
        }
        if let Some(role) = update.role {
            self.role = role;
        }
        if let Some(active) = update.is_active {
            self.is_active = active;
        }
        self.updated_at_micros = now_micros;
        Ok(())
    }

    pub fn set_password_hash(&mut self, hash: String, now_micros: u64) -> Result<(), DocVaultError> {
        if hash.is_empty() {
            return Err(DocVaultError::Validation(
                "password hash must not be empty".into(),
            ));
        }
        self.password_hash = Some(hash);
        self.updated_at_micros = now_micros;
        Ok(())
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn has_local_password(&self) -> bool {
        self.password_hash.is_some()
    }

    pub fn is_federated(&self) -> bool {
        self.federated_subject.is_some()
    }
}

/// Lower-cases and trims an email address; uniqueness is checked on this form.
pub fn normalize_email(raw: &str) -> Result<String, DocVaultError> {
    let email = raw.trim().to_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty() && !domain.contains('@'));
    if !valid {
        return Err(DocVaultError::Validation(format!(
            "invalid email address '{raw}'"
        )));
    }
    Ok(email)
}

fn validate_display_name(raw: &str) -> Result<String, DocVaultError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DocVaultError::Validation("name must not be empty".into()));
    }
    Ok(name.to_string())
}

fn validate_subject(raw: &str) -> Result<String, DocVaultError> {
    let subject = raw.trim();
    if subject.is_empty() {
        return Err(DocVaultError::Validation(
            "federated subject must not be empty".into(),
        ));
    }
    Ok(subject.to_string())
}
