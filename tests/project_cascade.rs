use docvault::catalog::account::{Account, NewAccount};
use docvault::catalog::project::NewProject;
use docvault::config::DocVaultConfig;
use docvault::content::MemoryContentStore;
use docvault::query::DocumentQuery;
use docvault::{AccessLevel, DocVault, Role, UploadRequest};
use std::sync::Arc;

async fn register(vault: &DocVault, name: &str, role: Role) -> Account {
    vault
        .register_account(
            NewAccount::with_password_hash(name, format!("{name}@example.com"), "h")
                .with_role(role),
        )
        .await
        .expect("register")
}

#[tokio::test]
async fn deleted_project_resolves_to_not_found() {
    let remote = Arc::new(MemoryContentStore::new());
    let vault = DocVault::in_memory(DocVaultConfig::development())
        .expect("vault")
        .with_remote_content(remote.clone());
    let carol = register(&vault, "carol", Role::Admin).await;
    let bob = register(&vault, "bob", Role::User).await;

    let doomed = vault
        .create_project(&carol, NewProject::named("Doomed"))
        .await
        .expect("doomed");
    let survivor = vault
        .create_project(&carol, NewProject::named("Survivor"))
        .await
        .expect("survivor");
    for project in [&doomed, &survivor] {
        vault
            .grant_access(&carol, &project.project_id, &bob.account_id, AccessLevel::ReadWrite)
            .await
            .expect("grant");
    }
    let doomed_doc = vault
        .upload_document(
            &bob,
            UploadRequest::new("a.txt", "text/plain", b"a".to_vec())
                .in_project(doomed.project_id.clone()),
        )
        .await
        .expect("upload");
    vault
        .upload_document(
            &bob,
            UploadRequest::new("b.txt", "text/plain", b"b".to_vec())
                .in_project(survivor.project_id.clone()),
        )
        .await
        .expect("upload");
    assert_eq!(remote.len(), 2);

    let report = vault
        .delete_project(&carol, &doomed.project_id)
        .await
        .expect("delete");
    assert_eq!(report.grants_removed, 1);
    assert_eq!(report.documents_removed, 1);
    assert!(report.orphaned_content.is_empty());
    assert_eq!(remote.len(), 1);

    let err = vault
        .resolve_project_access(&bob, &doomed.project_id, AccessLevel::Read)
        .await
        .expect_err("gone");
    assert_eq!(err.code_str(), "project_not_found");
    assert!(!err.is_denied());
    let err = vault
        .get_document(&bob, &doomed_doc.document_id)
        .await
        .expect_err("gone");
    assert_eq!(err.code_str(), "document_not_found");
    let err = vault
        .list_documents(&bob, DocumentQuery::in_project(doomed.project_id.clone()))
        .await
        .expect_err("gone");
    assert_eq!(err.code_str(), "project_not_found");

    let remaining = vault
        .list_documents(&bob, DocumentQuery::default())
        .await
        .expect("list");
    assert_eq!(remaining.len(), 1);
    assert!(
        vault
            .resolve_project_access(&bob, &survivor.project_id, AccessLevel::ReadWrite)
            .await
            .expect("resolve")
            .is_granted()
    );
}

#[tokio::test]
async fn only_global_admins_delete_projects() {
    let vault = DocVault::in_memory(DocVaultConfig::development()).expect("vault");
    let carol = register(&vault, "carol", Role::Admin).await;
    let bob = register(&vault, "bob", Role::User).await;
    let project = vault
        .create_project(&carol, NewProject::named("Keep"))
        .await
        .expect("project");
    vault
        .grant_access(&carol, &project.project_id, &bob.account_id, AccessLevel::ReadWrite)
        .await
        .expect("grant");
    let err = vault
        .delete_project(&bob, &project.project_id)
        .await
        .expect_err("user");
    assert!(err.is_denied());
    vault
        .get_project(&bob, &project.project_id)
        .await
        .expect("still there");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn uploads_racing_a_delete_leave_nothing_behind() {
    let vault = Arc::new(DocVault::in_memory(DocVaultConfig::development()).expect("vault"));
    let carol = register(&vault, "carol", Role::Admin).await;
    let bob = register(&vault, "bob", Role::User).await;
    let project = vault
        .create_project(&carol, NewProject::named("Racing"))
        .await
        .expect("project");
    vault
        .grant_access(&carol, &project.project_id, &bob.account_id, AccessLevel::ReadWrite)
        .await
        .expect("grant");

    let mut uploads = Vec::new();
    for i in 0..24 {
        let vault = Arc::clone(&vault);
        let bob = bob.clone();
        let project_id = project.project_id.clone();
        uploads.push(tokio::spawn(async move {
            vault
                .upload_document(
                    &bob,
                    UploadRequest::new(format!("{i}.txt"), "text/plain", b"x".to_vec())
                        .in_project(project_id),
                )
                .await
        }));
    }
    let deleter = {
        let vault = Arc::clone(&vault);
        let carol = carol.clone();
        let project_id = project.project_id.clone();
        tokio::spawn(async move { vault.delete_project(&carol, &project_id).await })
    };

    deleter.await.expect("join").expect("delete");
    for upload in uploads {
        if let Err(err) = upload.await.expect("join") {
            assert!(
                err.is_not_found() || err.is_denied(),
                "unexpected upload error: {err:?}"
            );
        }
    }

    let store = vault.store();
    assert!(store.project(&project.project_id).expect("lookup").is_none());
    assert_eq!(
        store
            .count_documents_in_project(&project.project_id)
            .expect("count"),
        0
    );
    assert!(
        store
            .grants_for_project(&project.project_id)
            .expect("grants")
            .is_empty()
    );
}
