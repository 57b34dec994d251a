use docvault::catalog::account::{Account, NewAccount};
use docvault::catalog::document::{ContentLocation, DocumentStatus};
use docvault::catalog::project::NewProject;
use docvault::config::{DocVaultConfig, Durability};
use docvault::content::{ContentStore, FsContentStore};
use docvault::{AccessLevel, DocVault, ProcessingOutcome, Role, UploadRequest};
use std::sync::Arc;
use tempfile::tempdir;

async fn seeded(vault: &DocVault) -> (Account, Account, String) {
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
        .create_project(&carol, NewProject::named("Inbox"))
        .await
        .expect("project");
    vault
        .grant_access(&carol, &project.project_id, &bob.account_id, AccessLevel::ReadWrite)
        .await
        .expect("grant");
    (carol, bob, project.project_id)
}

#[tokio::test]
async fn bytes_land_in_the_data_directory_and_leave_with_the_document() {
    let dir = tempdir().expect("temp");
    let config = DocVaultConfig::default().with_durability(Durability::Memory);
    let vault = DocVault::open(config, dir.path()).expect("open");
    let (_carol, bob, project_id) = seeded(&vault).await;

    let doc = vault
        .upload_document(
            &bob,
            UploadRequest::new("report.pdf", "application/pdf", b"%PDF-1.7".to_vec())
                .in_project(project_id)
                .with_tags(["q3", " finance "])
                .with_metadata("source", "scanner-2"),
        )
        .await
        .expect("upload");
    assert_eq!(doc.content.location, ContentLocation::Local);
    assert_eq!(doc.metadata.get("source").map(String::as_str), Some("scanner-2"));
    assert!(doc.tags.contains("finance"));

    let on_disk = FsContentStore::open(dir.path().join("content")).expect("content dir");
    assert_eq!(on_disk.get(&doc.content.key).expect("file"), b"%PDF-1.7");

    let deletion = vault
        .delete_document(&bob, &doc.document_id)
        .await
        .expect("delete");
    assert_eq!(deletion.document.document_id, doc.document_id);
    assert_eq!(deletion.orphaned_content, None);
    assert!(on_disk.get(&doc.content.key).is_err());
    let err = vault
        .download_document(&bob, &doc.document_id)
        .await
        .expect_err("gone");
    assert_eq!(err.code_str(), "document_not_found");
}

#[tokio::test]
async fn missing_bytes_surface_as_unavailable() {
    let local = Arc::new(docvault::content::MemoryContentStore::new());
    let vault = DocVault::in_memory(DocVaultConfig::development())
        .expect("vault")
        .with_local_content(local.clone());
    let (_carol, bob, project_id) = seeded(&vault).await;
    let doc = vault
        .upload_document(
            &bob,
            UploadRequest::new("a.txt", "text/plain", b"a".to_vec()).in_project(project_id),
        )
        .await
        .expect("upload");
    local.delete(&doc.content.key).expect("lose the bytes");

    let err = vault
        .download_document(&bob, &doc.document_id)
        .await
        .expect_err("bytes gone");
    assert_eq!(err.code_str(), "unavailable");

    let deletion = vault
        .delete_document(&bob, &doc.document_id)
        .await
        .expect("metadata removed even though content deletion fails");
    assert_eq!(deletion.orphaned_content, Some(doc.content.key.clone()));
    let err = vault
        .get_document(&bob, &doc.document_id)
        .await
        .expect_err("record gone");
    assert_eq!(err.code_str(), "document_not_found");
}

#[tokio::test]
async fn annotation_pipeline_moves_documents_forward_once() {
    let vault = DocVault::in_memory(DocVaultConfig::development().with_annotation(true))
        .expect("vault");
    let (_carol, bob, project_id) = seeded(&vault).await;
    let doc = vault
        .upload_document(
            &bob,
            UploadRequest::new("a.txt", "text/plain", b"a".to_vec()).in_project(project_id),
        )
        .await
        .expect("upload");
    assert_eq!(doc.status, DocumentStatus::Processing);

    let done = vault
        .complete_processing(&doc.document_id, ProcessingOutcome::Ready(Default::default()))
        .await
        .expect("ready");
    assert_eq!(done.status, DocumentStatus::Ready);
    assert!(done.updated_at_micros >= doc.updated_at_micros);

    let err = vault
        .complete_processing(&doc.document_id, ProcessingOutcome::Ready(Default::default()))
        .await
        .expect_err("twice");
    assert_eq!(err.code_str(), "invalid_transition");
    let err = vault
        .complete_processing("missing", ProcessingOutcome::Ready(Default::default()))
        .await
        .expect_err("missing");
    assert_eq!(err.code_str(), "document_not_found");
}

#[tokio::test]
async fn tag_limit_is_enforced() {
    let mut config = DocVaultConfig::development();
    config.max_tags_per_document = 2;
    let vault = DocVault::in_memory(config).expect("vault");
    let (_carol, bob, project_id) = seeded(&vault).await;
    let err = vault
        .upload_document(
            &bob,
            UploadRequest::new("a.txt", "text/plain", b"a".to_vec())
                .in_project(project_id.clone())
                .with_tags(["a", "b", "c"]),
        )
        .await
        .expect_err("too many tags");
    assert_eq!(err.code_str(), "validation");
    vault
        .upload_document(
            &bob,
            UploadRequest::new("a.txt", "text/plain", b"a".to_vec())
                .in_project(project_id)
                .with_tags(["a", "a", "b"]),
        )
        .await
        .expect("duplicates collapse");
}
