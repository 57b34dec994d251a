use crate::catalog::Catalog;
use crate::catalog::account::Account;
use crate::catalog::document::Document;
use crate::catalog::grant::AccessGrant;
use crate::catalog::project::Project;
use crate::checkpoint::load_latest;
use crate::config::DocVaultConfig;
use crate::error::DocVaultError;
use crate::lib_helpers::now_micros;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const DUMP_FORMAT_VERSION: u32 = 1;

/// JSON export of one checkpoint. Grants are flattened into a list because
/// their catalog key is a tuple, which JSON objects cannot carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonDump {
    pub version: u32,
    pub exported_at_micros: u64,
    pub checkpoint_seq: u64,
    pub accounts: Vec<Account>,
    pub projects: Vec<Project>,
    pub grants: Vec<AccessGrant>,
    pub documents: Vec<Document>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DumpReport {
    pub checkpoint_seq: u64,
    pub sha256_hex: String,
    pub counts: RecordCounts,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordCounts {
    pub accounts: u64,
    pub projects: u64,
    pub grants: u64,
    pub documents: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvariantReport {
    pub ok: bool,
    pub checkpoint_seq: u64,
    pub counts: RecordCounts,
    pub violations: Vec<String>,
}

/// Loads the newest checkpoint in `data_dir` and checks referential and
/// uniqueness invariants over it. An empty directory is a clean report.
pub fn check_invariants(
    data_dir: &Path,
    config: &DocVaultConfig,
) -> Result<InvariantReport, DocVaultError> {
    let (seq, catalog) = recover(data_dir, config)?;
    let violations = find_violations(&catalog);
    Ok(InvariantReport {
        ok: violations.is_empty(),
        checkpoint_seq: seq,
        counts: counts(&catalog),
        violations,
    })
}

pub fn export_json(
    data_dir: &Path,
    config: &DocVaultConfig,
    out_path: &Path,
) -> Result<DumpReport, DocVaultError> {
    let (seq, catalog) = recover(data_dir, config)?;
    let dump = to_dump(seq, &catalog);
    let bytes =
        serde_json::to_vec_pretty(&dump).map_err(|e| DocVaultError::Encode(e.to_string()))?;
    fs::write(out_path, &bytes)?;
    Ok(DumpReport {
        checkpoint_seq: seq,
        sha256_hex: hex::encode(Sha256::digest(&bytes)),
        counts: counts(&catalog),
    })
}

pub fn load_json_dump(path: &Path) -> Result<JsonDump, DocVaultError> {
    let bytes = fs::read(path)?;
    let dump: JsonDump =
        serde_json::from_slice(&bytes).map_err(|e| DocVaultError::Decode(e.to_string()))?;
    if dump.version != DUMP_FORMAT_VERSION {
        return Err(DocVaultError::Validation(format!(
            "unsupported dump format version: {}",
            dump.version
        )));
    }
    Ok(dump)
}

fn recover(data_dir: &Path, config: &DocVaultConfig) -> Result<(u64, Catalog), DocVaultError> {
    match load_latest(data_dir, config.hmac_key(), config.strict_recovery())? {
        Some(loaded) => Ok((loaded.data.seq, loaded.data.catalog)),
        None => Ok((0, Catalog::default())),
    }
}

fn to_dump(seq: u64, catalog: &Catalog) -> JsonDump {
    let mut accounts: Vec<Account> = catalog.accounts.values().cloned().collect();
    accounts.sort_by(|a, b| a.account_id.cmp(&b.account_id));
    let mut projects: Vec<Project> = catalog.projects.values().cloned().collect();
    projects.sort_by(|a, b| a.project_id.cmp(&b.project_id));
    let mut grants: Vec<AccessGrant> = catalog.grants.values().cloned().collect();
    grants.sort_by(|a, b| a.key().cmp(&b.key()));
    let mut documents: Vec<Document> = catalog.documents.values().cloned().collect();
    documents.sort_by(|a, b| a.document_id.cmp(&b.document_id));
    JsonDump {
        version: DUMP_FORMAT_VERSION,
        exported_at_micros: now_micros(),
        checkpoint_seq: seq,
        accounts,
        projects,
        grants,
        documents,
    }
}

fn counts(catalog: &Catalog) -> RecordCounts {
    RecordCounts {
        accounts: catalog.accounts.len() as u64,
        projects: catalog.projects.len() as u64,
        grants: catalog.grants.len() as u64,
        documents: catalog.documents.len() as u64,
    }
}

fn find_violations(catalog: &Catalog) -> Vec<String> {
    let mut violations = Vec::new();

    let mut by_email: HashMap<&str, &str> = HashMap::new();
    for account in catalog.accounts.values() {
        if let Some(other) = by_email.insert(account.email.as_str(), account.account_id.as_str()) {
            violations.push(format!(
                "duplicate email {} on accounts {other} and {}",
                account.email, account.account_id
            ));
        }
        if account.password_hash.is_none() && account.federated_subject.is_none() {
            violations.push(format!("account {} has no credential", account.account_id));
        }
        if catalog.email_index.get(&account.email) != Some(&account.account_id) {
            violations.push(format!(
                "email index out of sync for account {}",
                account.account_id
            ));
        }
    }

    for project in catalog.projects.values() {
        if !catalog.accounts.contains_key(&project.owner_id) {
            violations.push(format!(
                "project {} owned by missing account {}",
                project.project_id, project.owner_id
            ));
        }
    }

    for ((project_id, account_id), grant) in catalog.grants.iter() {
        if !grant.applies_to(project_id, account_id) {
            violations.push(format!("grant key {project_id}/{account_id} disagrees with row"));
        }
        if !catalog.projects.contains_key(project_id) {
            violations.push(format!(
                "grant {project_id}/{account_id} references missing project"
            ));
        }
        if !catalog.accounts.contains_key(account_id) {
            violations.push(format!(
                "grant {project_id}/{account_id} references missing account"
            ));
        }
    }

    for document in catalog.documents.values() {
        if let Some(project_id) = &document.project_id
            && !catalog.projects.contains_key(project_id)
        {
            violations.push(format!(
                "document {} references missing project {project_id}",
                document.document_id
            ));
        }
        if !catalog.accounts.contains_key(&document.uploaded_by) {
            violations.push(format!(
                "document {} uploaded by missing account {}",
                document.document_id, document.uploaded_by
            ));
        }
    }

    violations.sort();
    violations
}

#[cfg(test)]
mod tests {
    use super::find_violations;
    use crate::catalog::Catalog;
    use crate::catalog::account::{Account, NewAccount};
    use crate::catalog::grant::AccessGrant;
    use crate::catalog::project::{NewProject, Project};
    use crate::permission::AccessLevel;

    #[test]
    fn dangling_references_are_reported() {
        let mut catalog = Catalog::default();
        catalog
            .insert_account(
                Account::new(
                    "alice",
                    NewAccount::with_password_hash("Alice", "alice@example.com", "h"),
                    1,
                )
                .expect("account"),
            )
            .expect("insert");
        catalog
            .insert_project(Project::new("p1", "alice", NewProject::named("P1"), 1).expect("p"))
            .expect("insert project");
        assert!(find_violations(&catalog).is_empty());

        catalog.grants.insert(
            ("p1".into(), "ghost".into()),
            AccessGrant::new("p1", "ghost", AccessLevel::Read, "alice", 1),
        );
        catalog.accounts.remove("alice");
        let violations = find_violations(&catalog);
        assert_eq!(violations.len(), 2, "{violations:?}");
        assert!(violations.iter().any(|v| v.contains("owned by missing account")));
        assert!(violations.iter().any(|v| v.contains("missing account")));
    }
}
