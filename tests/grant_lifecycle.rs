use docvault::catalog::account::{Account, NewAccount};
use docvault::catalog::project::NewProject;
use docvault::config::DocVaultConfig;
use docvault::{AccessLevel, Decision, DocVault, EffectiveLevel, Role};
use std::sync::Arc;

async fn setup() -> (Arc<DocVault>, Account, Account, String) {
    let vault = DocVault::in_memory(DocVaultConfig::development()).expect("vault");
    let carol = vault
        .register_account(
            NewAccount::with_password_hash("Carol", "carol@example.com", "h")
                .with_role(Role::Admin),
        )
        .await
        .expect("carol");
    let bob = vault
        .register_account(NewAccount::with_password_hash("Bob", "bob@example.com", "h"))
        .await
        .expect("bob");
    let project = vault
        .create_project(&carol, NewProject::named("Shared"))
        .await
        .expect("project");
    (Arc::new(vault), carol, bob, project.project_id)
}

#[tokio::test]
async fn regrant_replaces_the_level_in_place() {
    let (vault, carol, bob, project_id) = setup().await;
    let first = vault
        .grant_access(&carol, &project_id, &bob.account_id, AccessLevel::Read)
        .await
        .expect("read");
    let second = vault
        .grant_access(&carol, &project_id, &bob.account_id, AccessLevel::ReadWrite)
        .await
        .expect("read-write");

    let grants = vault
        .list_project_grants(&carol, &project_id)
        .await
        .expect("grants");
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].permission, AccessLevel::ReadWrite);
    assert_eq!(second.created_at_micros, first.created_at_micros);
    assert_eq!(second.granted_by, carol.account_id);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_grants_for_one_pair_leave_a_single_row() {
    let (vault, carol, bob, project_id) = setup().await;
    let mut handles = Vec::new();
    for i in 0..32 {
        let vault = Arc::clone(&vault);
        let carol = carol.clone();
        let bob_id = bob.account_id.clone();
        let project_id = project_id.clone();
        handles.push(tokio::spawn(async move {
            let level = if i % 2 == 0 {
                AccessLevel::Read
            } else {
                AccessLevel::ReadWrite
            };
            vault
                .grant_access(&carol, &project_id, &bob_id, level)
                .await
                .map(|_| ())
        }));
    }
    for handle in handles {
        handle.await.expect("join").expect("grant");
    }
    let grants = vault
        .list_project_grants(&carol, &project_id)
        .await
        .expect("grants");
    assert_eq!(grants.len(), 1);

    vault
        .grant_access(&carol, &project_id, &bob.account_id, AccessLevel::ReadWrite)
        .await
        .expect("final");
    assert_eq!(
        vault
            .resolve_project_access(&bob, &project_id, AccessLevel::ReadWrite)
            .await
            .expect("resolve"),
        Decision::Granted(EffectiveLevel::ReadWrite)
    );
}

#[tokio::test]
async fn revoke_then_regrant() {
    let (vault, carol, bob, project_id) = setup().await;
    vault
        .grant_access(&carol, &project_id, &bob.account_id, AccessLevel::Read)
        .await
        .expect("grant");
    let removed = vault
        .revoke_access(&carol, &project_id, &bob.account_id)
        .await
        .expect("revoke");
    assert_eq!(removed.permission, AccessLevel::Read);

    let err = vault
        .revoke_access(&carol, &project_id, &bob.account_id)
        .await
        .expect_err("second revoke");
    assert_eq!(err.code_str(), "grant_not_found");
    assert!(err.is_not_found());

    vault
        .grant_access(&carol, &project_id, &bob.account_id, AccessLevel::ReadWrite)
        .await
        .expect("regrant");
    assert!(
        vault
            .resolve_project_access(&bob, &project_id, AccessLevel::ReadWrite)
            .await
            .expect("resolve")
            .is_granted()
    );
}

#[tokio::test]
async fn grant_on_missing_project_is_not_found() {
    let (vault, carol, bob, _) = setup().await;
    let err = vault
        .grant_access(&carol, "missing", &bob.account_id, AccessLevel::Read)
        .await
        .expect_err("missing");
    assert_eq!(err.code_str(), "project_not_found");
    let err = vault
        .revoke_access(&carol, "missing", &bob.account_id)
        .await
        .expect_err("missing");
    assert_eq!(err.code_str(), "project_not_found");
}
