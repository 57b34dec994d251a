use crate::error::DocVaultError;
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

pub(crate) const CONTENT_DIR: &str = "content";
pub(crate) const LOCAL_CONTENT_PREFIX: &str = "local-";

pub(crate) fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u64
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Key for bytes that could not reach the remote content store.
pub(crate) fn local_content_key() -> String {
    format!("{LOCAL_CONTENT_PREFIX}{}", uuid::Uuid::new_v4())
}

pub(crate) fn remote_content_key(document_id: &str, filename: &str) -> String {
    format!("{document_id}-{filename}")
}

pub(crate) fn grant_id(project_id: &str, account_id: &str) -> String {
    format!("{project_id}/{account_id}")
}

/// Creates a directory readable only by the current user (0o700 on Unix).
pub(crate) fn create_private_dir_all(path: &Path) -> Result<(), DocVaultError> {
    #[cfg(unix)]
    {
        use std::fs::DirBuilder;
        use std::os::unix::fs::DirBuilderExt;
        use std::os::unix::fs::PermissionsExt;

        DirBuilder::new().recursive(true).mode(0o700).create(path)?;
        let metadata = fs::metadata(path)?;
        if !metadata.is_dir() {
            return Err(DocVaultError::Validation(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }
        let mut perms = metadata.permissions();
        if perms.mode() & 0o777 != 0o700 {
            perms.set_mode(0o700);
            fs::set_permissions(path, perms)?;
        }
    }
    #[cfg(not(unix))]
    {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{grant_id, local_content_key, new_id, remote_content_key};

    #[test]
    fn ids_are_unique_and_local_keys_are_prefixed() {
        assert_ne!(new_id(), new_id());
        let key = local_content_key();
        assert!(key.starts_with("local-"));
        assert_eq!(key.len(), "local-".len() + 36);
        assert_eq!(remote_content_key("d1", "a.pdf"), "d1-a.pdf");
        assert_eq!(grant_id("p", "a"), "p/a");
    }
}
