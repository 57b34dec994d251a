use crate::permission::DenialReason;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Account,
    Project,
    Document,
    Grant,
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceType::Account => write!(f, "account"),
            ResourceType::Project => write!(f, "project"),
            ResourceType::Document => write!(f, "document"),
            ResourceType::Grant => write!(f, "grant"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Io,
    Encode,
    Decode,
    Validation,
    InvalidConfig,
    IntegrityError,
    Unavailable,
    Unauthenticated,
    AccountAlreadyExists,
    ProjectAlreadyExists,
    DocumentAlreadyExists,
    GrantAlreadyExists,
    AccountNotFound,
    ProjectNotFound,
    DocumentNotFound,
    GrantNotFound,
    PermissionDenied,
    InvalidTransition,
    PartialFailure,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Io => "io",
            ErrorCode::Encode => "encode",
            ErrorCode::Decode => "decode",
            ErrorCode::Validation => "validation",
            ErrorCode::InvalidConfig => "invalid_config",
            ErrorCode::IntegrityError => "integrity_error",
            ErrorCode::Unavailable => "unavailable",
            ErrorCode::Unauthenticated => "unauthenticated",
            ErrorCode::AccountAlreadyExists => "account_already_exists",
            ErrorCode::ProjectAlreadyExists => "project_already_exists",
            ErrorCode::DocumentAlreadyExists => "document_already_exists",
            ErrorCode::GrantAlreadyExists => "grant_already_exists",
            ErrorCode::AccountNotFound => "account_not_found",
            ErrorCode::ProjectNotFound => "project_not_found",
            ErrorCode::DocumentNotFound => "document_not_found",
            ErrorCode::GrantNotFound => "grant_not_found",
            ErrorCode::PermissionDenied => "permission_denied",
            ErrorCode::InvalidTransition => "invalid_transition",
            ErrorCode::PartialFailure => "partial_failure",
        }
    }
}

#[derive(Debug, Error)]
pub enum DocVaultError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encode error: {0}")]
    Encode(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("invalid config: {message}")]
    InvalidConfig { message: String },
    #[error("integrity error: {message}")]
    IntegrityError { message: String },
    #[error("resource unavailable: {message}")]
    Unavailable { message: String },
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("{resource_type} '{resource_id}' already exists")]
    AlreadyExists {
        resource_type: ResourceType,
        resource_id: String,
    },
    #[error("{resource_type} '{resource_id}' not found")]
    NotFound {
        resource_type: ResourceType,
        resource_id: String,
    },
    #[error("permission denied: {reason}")]
    PermissionDenied { reason: DenialReason },
    #[error("invalid status transition for document '{document_id}': {from} -> {to}")]
    InvalidTransition {
        document_id: String,
        from: &'static str,
        to: &'static str,
    },
    #[error("{operation} partially applied (completed: {}): {source}", .completed.join(", "))]
    PartialFailure {
        operation: &'static str,
        completed: Vec<String>,
        #[source]
        source: Box<DocVaultError>,
    },
}

impl DocVaultError {
    pub fn not_found(resource_type: ResourceType, resource_id: impl Into<String>) -> Self {
        DocVaultError::NotFound {
            resource_type,
            resource_id: resource_id.into(),
        }
    }

    pub fn already_exists(resource_type: ResourceType, resource_id: impl Into<String>) -> Self {
        DocVaultError::AlreadyExists {
            resource_type,
            resource_id: resource_id.into(),
        }
    }

    pub fn denied(reason: DenialReason) -> Self {
        DocVaultError::PermissionDenied { reason }
    }

    /// Wraps `source` as a partial failure once any step has completed.
    pub fn partial(operation: &'static str, completed: &[String], source: DocVaultError) -> Self {
        if completed.is_empty() {
            return source;
        }
        DocVaultError::PartialFailure {
            operation,
            completed: completed.to_vec(),
            source: Box::new(source),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            DocVaultError::Io(_) => ErrorCode::Io,
            DocVaultError::Encode(_) => ErrorCode::Encode,
            DocVaultError::Decode(_) => ErrorCode::Decode,
            DocVaultError::Validation(_) => ErrorCode::Validation,
            DocVaultError::InvalidConfig { .. } => ErrorCode::InvalidConfig,
            DocVaultError::IntegrityError { .. } => ErrorCode::IntegrityError,
            DocVaultError::Unavailable { .. } => ErrorCode::Unavailable,
            DocVaultError::Unauthenticated(_) => ErrorCode::Unauthenticated,
            DocVaultError::AlreadyExists { resource_type, .. } => match resource_type {
                ResourceType::Account => ErrorCode::AccountAlreadyExists,
                ResourceType::Project => ErrorCode::ProjectAlreadyExists,
                ResourceType::Document => ErrorCode::DocumentAlreadyExists,
                ResourceType::Grant => ErrorCode::GrantAlreadyExists,
            },
            DocVaultError::NotFound { resource_type, .. } => match resource_type {
                ResourceType::Account => ErrorCode::AccountNotFound,
                ResourceType::Project => ErrorCode::ProjectNotFound,
                ResourceType::Document => ErrorCode::DocumentNotFound,
                ResourceType::Grant => ErrorCode::GrantNotFound,
            },
            DocVaultError::PermissionDenied { .. } => ErrorCode::PermissionDenied,
            DocVaultError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            DocVaultError::PartialFailure { .. } => ErrorCode::PartialFailure,
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code().as_str()
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DocVaultError::NotFound { .. })
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, DocVaultError::PermissionDenied { .. })
    }

    pub fn denial_reason(&self) -> Option<DenialReason> {
        match self {
            DocVaultError::PermissionDenied { reason } => Some(*reason),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DocVaultError, ErrorCode, ResourceType};
    use crate::permission::DenialReason;

    #[test]
    fn error_code_strings_are_stable() {
        assert_eq!(ErrorCode::ProjectNotFound.as_str(), "project_not_found");
        assert_eq!(
            ErrorCode::AccountAlreadyExists.as_str(),
            "account_already_exists"
        );
        assert_eq!(ErrorCode::PartialFailure.as_str(), "partial_failure");
    }

    #[test]
    fn not_found_and_denied_never_share_a_code() {
        let missing = DocVaultError::not_found(ResourceType::Document, "d1");
        let denied = DocVaultError::denied(DenialReason::NoAccess);
        assert_eq!(missing.code(), ErrorCode::DocumentNotFound);
        assert_eq!(denied.code(), ErrorCode::PermissionDenied);
        assert!(missing.is_not_found() && !missing.is_denied());
        assert!(denied.is_denied() && !denied.is_not_found());
        assert_eq!(denied.denial_reason(), Some(DenialReason::NoAccess));
    }

    #[test]
    fn partial_failure_message_lists_completed_steps() {
        let err = DocVaultError::PartialFailure {
            operation: "delete_project",
            completed: vec!["grants".into(), "documents".into()],
            source: Box::new(DocVaultError::Unavailable {
                message: "store offline".into(),
            }),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("grants, documents"), "{rendered}");
        assert!(rendered.contains("store offline"), "{rendered}");
        assert_eq!(err.code_str(), "partial_failure");
    }
}
