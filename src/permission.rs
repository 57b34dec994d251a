use serde::{Deserialize, Serialize};
use std::fmt;

/// Global capability tier of an account, independent of any project.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
    Guest,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
            Role::Guest => "guest",
        }
    }

    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Level requested by a caller or stored on an access grant.
///
/// The derived ordering is the permission order: `ReadWrite` covers
/// everything `Read` covers, never the other way around.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
pub enum AccessLevel {
    #[default]
    #[serde(rename = "read")]
    Read,
    #[serde(rename = "read-write")]
    ReadWrite,
}

impl AccessLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessLevel::Read => "read",
            AccessLevel::ReadWrite => "read-write",
        }
    }

    /// True when holding `self` is enough for a `requested` operation.
    pub fn covers(self, requested: AccessLevel) -> bool {
        self >= requested
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccessLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(AccessLevel::Read),
            "read-write" => Ok(AccessLevel::ReadWrite),
            other => Err(format!("unknown access level '{other}'")),
        }
    }
}

/// Permission actually in force after admin/owner/grant/public precedence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum EffectiveLevel {
    Read,
    ReadWrite,
    /// Structural access: global admin, project owner, or legacy uploader.
    Admin,
}

impl EffectiveLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            EffectiveLevel::Read => "read",
            EffectiveLevel::ReadWrite => "read-write",
            EffectiveLevel::Admin => "admin",
        }
    }

    pub fn satisfies(self, requested: AccessLevel) -> bool {
        match self {
            EffectiveLevel::Admin | EffectiveLevel::ReadWrite => true,
            EffectiveLevel::Read => requested == AccessLevel::Read,
        }
    }
}

impl From<AccessLevel> for EffectiveLevel {
    fn from(level: AccessLevel) -> Self {
        match level {
            AccessLevel::Read => EffectiveLevel::Read,
            AccessLevel::ReadWrite => EffectiveLevel::ReadWrite,
        }
    }
}

impl fmt::Display for EffectiveLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// No ownership, no grant, no public fallback applies.
    NoAccess,
    /// A `read` grant exists but `read-write` was requested.
    InsufficientPermission,
    /// Guests only ever see documents that finished processing.
    DocumentNotReady,
    /// The caller's global role may not perform the operation at all.
    RoleNotAllowed,
}

impl DenialReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DenialReason::NoAccess => "no_access",
            DenialReason::InsufficientPermission => "insufficient_permission",
            DenialReason::DocumentNotReady => "document_not_ready",
            DenialReason::RoleNotAllowed => "role_not_allowed",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one authorization resolution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Decision {
    Granted(EffectiveLevel),
    Denied(DenialReason),
}

impl Decision {
    pub fn is_granted(&self) -> bool {
        matches!(self, Decision::Granted(_))
    }

    pub fn level(&self) -> Option<EffectiveLevel> {
        match self {
            Decision::Granted(level) => Some(*level),
            Decision::Denied(_) => None,
        }
    }

    pub fn denial(&self) -> Option<DenialReason> {
        match self {
            Decision::Granted(_) => None,
            Decision::Denied(reason) => Some(*reason),
        }
    }

    pub fn into_result(self) -> Result<EffectiveLevel, crate::error::DocVaultError> {
        match self {
            Decision::Granted(level) => Ok(level),
            Decision::Denied(reason) => Err(crate::error::DocVaultError::PermissionDenied { reason }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AccessLevel, Decision, DenialReason, EffectiveLevel, Role};

    #[test]
    fn read_write_covers_read_but_not_the_reverse() {
        assert!(AccessLevel::ReadWrite.covers(AccessLevel::Read));
        assert!(AccessLevel::ReadWrite.covers(AccessLevel::ReadWrite));
        assert!(AccessLevel::Read.covers(AccessLevel::Read));
        assert!(!AccessLevel::Read.covers(AccessLevel::ReadWrite));
    }

    #[test]
    fn effective_read_only_satisfies_read() {
        assert!(EffectiveLevel::Read.satisfies(AccessLevel::Read));
        assert!(!EffectiveLevel::Read.satisfies(AccessLevel::ReadWrite));
        assert!(EffectiveLevel::Admin.satisfies(AccessLevel::ReadWrite));
    }

    #[test]
    fn access_level_wire_names_are_stable() {
        let encoded = serde_json::to_string(&AccessLevel::ReadWrite).expect("encode");
        assert_eq!(encoded, "\"read-write\"");
        let decoded: AccessLevel = serde_json::from_str("\"read\"").expect("decode");
        assert_eq!(decoded, AccessLevel::Read);
        assert!("write".parse::<AccessLevel>().is_err());
        assert_eq!(
            serde_json::to_string(&Role::Guest).expect("encode role"),
            "\"guest\""
        );
    }

    #[test]
    fn denied_decision_converts_into_permission_error() {
        let err = Decision::Denied(DenialReason::InsufficientPermission)
            .into_result()
            .expect_err("denied");
        assert_eq!(err.code_str(), "permission_denied");
        assert!(err.is_denied());
    }
}
