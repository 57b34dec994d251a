use docvault::catalog::account::NewAccount;
use docvault::config::DocVaultConfig;
use docvault::{DenialReason, DocVault, Role};
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_admin_registrations_admit_exactly_one() {
    let vault = Arc::new(DocVault::in_memory(DocVaultConfig::development()).expect("vault"));
    let mut handles = Vec::new();
    for i in 0..16 {
        let vault = Arc::clone(&vault);
        handles.push(tokio::spawn(async move {
            vault
                .register_account(
                    NewAccount::with_password_hash(
                        format!("admin{i}"),
                        format!("admin{i}@example.com"),
                        "h",
                    )
                    .with_role(Role::Admin),
                )
                .await
        }));
    }

    let mut admitted = 0;
    for handle in handles {
        match handle.await.expect("join") {
            Ok(account) => {
                assert_eq!(account.role, Role::Admin);
                admitted += 1;
            }
            Err(err) => assert_eq!(err.denial_reason(), Some(DenialReason::RoleNotAllowed)),
        }
    }
    assert_eq!(admitted, 1);

    let accounts = vault.store().list_accounts().expect("accounts");
    assert_eq!(accounts.len(), 1);
    assert!(accounts[0].is_admin());
}

#[tokio::test]
async fn users_may_register_after_the_bootstrap_admin() {
    let vault = DocVault::in_memory(DocVaultConfig::development()).expect("vault");
    let user = vault
        .register_account(NewAccount::with_password_hash("Ann", "ann@example.com", "h"))
        .await
        .expect("user first");
    assert_eq!(user.role, Role::User);

    let err = vault
        .register_account(
            NewAccount::with_password_hash("Root", "root@example.com", "h").with_role(Role::Admin),
        )
        .await
        .expect_err("vault no longer empty");
    assert_eq!(err.denial_reason(), Some(DenialReason::RoleNotAllowed));
    assert_eq!(vault.store().list_accounts().expect("accounts").len(), 1);
}
