use docvault::authz::{ProjectAccess, resolve_project};
use docvault::catalog::account::{Account, NewAccount};
use docvault::catalog::grant::AccessGrant;
use docvault::catalog::project::{NewProject, Project, ProjectSettings};
use docvault::config::DocVaultConfig;
use docvault::query::DocumentQuery;
use docvault::{AccessLevel, DocVault, DocumentFilter, Role, UploadRequest};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use tokio::runtime::Runtime;

const PROJECTS: usize = 200;
const DOCUMENTS_PER_PROJECT: usize = 25;

fn account(id: &str, role: Role) -> Account {
    Account::new(
        id,
        NewAccount::with_password_hash(id, format!("{id}@example.com"), "h").with_role(role),
        1,
    )
    .expect("account")
}

fn projects_and_grants() -> (Vec<Project>, Vec<AccessGrant>) {
    let mut projects = Vec::with_capacity(PROJECTS);
    let mut grants = Vec::new();
    for i in 0..PROJECTS {
        let id = format!("p{i}");
        projects.push(
            Project::new(
                id.as_str(),
                "owner",
                NewProject::named(&id).with_settings(ProjectSettings {
                    allow_public_read: i % 7 == 0,
                    allow_public_write: false,
                }),
                1,
            )
            .expect("project"),
        );
        if i % 3 == 0 {
            grants.push(AccessGrant::new(id.as_str(), "bob", AccessLevel::Read, "owner", 1));
        }
    }
    (projects, grants)
}

fn bench_resolver(c: &mut Criterion) {
    let (projects, grants) = projects_and_grants();
    let bob = account("bob", Role::User);
    let grant = grants.first();
    let access = ProjectAccess::new(&projects[0], grant);
    c.bench_function("resolve_project_read_grant", |b| {
        b.iter(|| resolve_project(black_box(&bob), black_box(&access), AccessLevel::ReadWrite))
    });
    c.bench_function("document_filter_build", |b| {
        b.iter(|| DocumentFilter::for_account(black_box(&bob), projects.iter(), grants.iter()))
    });
}

async fn seeded_vault() -> (DocVault, Account) {
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
    for i in 0..PROJECTS {
        let project = vault
            .create_project(&carol, NewProject::named(format!("project {i}")))
            .await
            .expect("project");
        if i % 3 == 0 {
            vault
                .grant_access(&carol, &project.project_id, &bob.account_id, AccessLevel::Read)
                .await
                .expect("grant");
        }
        for d in 0..DOCUMENTS_PER_PROJECT {
            vault
                .upload_document(
                    &carol,
                    UploadRequest::new(format!("doc-{d}.txt"), "text/plain", b"x".to_vec())
                        .in_project(project.project_id.clone()),
                )
                .await
                .expect("upload");
        }
    }
    (vault, bob)
}

fn bench_listing(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");
    let (vault, bob) = rt.block_on(seeded_vault());
    c.bench_function("list_documents_filtered_user", |b| {
        b.iter(|| {
            rt.block_on(async {
                let docs = vault
                    .list_documents(&bob, DocumentQuery::default().search("doc-1"))
                    .await
                    .expect("list");
                black_box(docs.len());
            })
        })
    });
}

criterion_group!(benches, bench_resolver, bench_listing);
criterion_main!(benches);
