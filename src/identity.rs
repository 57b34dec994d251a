use crate::error::DocVaultError;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Maps an opaque bearer token to the account it was issued for.
///
/// Session mechanics live outside this crate; the vault only needs a
/// verified account id to authorize against.
pub trait IdentityProvider: Send + Sync {
    fn resolve_token(&self, token: &str) -> Result<String, DocVaultError>;
}

/// Token table held in memory, for tests and embedded deployments.
#[derive(Debug, Default)]
pub struct StaticTokenIdentity {
    tokens: RwLock<HashMap<String, String>>,
}

impl StaticTokenIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self, token: impl Into<String>, account_id: impl Into<String>) {
        self.tokens.write().insert(token.into(), account_id.into());
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.tokens.write().remove(token).is_some()
    }
}

impl IdentityProvider for StaticTokenIdentity {
    fn resolve_token(&self, token: &str) -> Result<String, DocVaultError> {
        self.tokens
            .read()
            .get(token)
            .cloned()
            .ok_or_else(|| DocVaultError::Unauthenticated("unknown token".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::{IdentityProvider, StaticTokenIdentity};

    #[test]
    fn issue_resolve_revoke() {
        let identity = StaticTokenIdentity::new();
        identity.issue("t-1", "alice");
        assert_eq!(identity.resolve_token("t-1").expect("known"), "alice");
        assert!(identity.revoke("t-1"));
        let err = identity.resolve_token("t-1").expect_err("revoked");
        assert_eq!(err.code_str(), "unauthenticated");
    }
}
