//! Authorization resolution.
//!
//! Everything in this module is a pure function over records the caller has
//! already fetched. Existence is the caller's concern: a missing project or
//! document must surface as `NotFound` before any of this runs.
//!
//! Precedence for project-scoped targets, first match wins:
//! 1. global `admin` role → `Granted(Admin)`, regardless of `is_active`
//! 2. project owner → `Granted(Admin)`
//! 3. explicit grant → `Granted(level)` if the level covers the request,
//!    otherwise `Denied(InsufficientPermission)`
//! 4. `allow_public_read` and a `read` request → `Granted(Read)`
//! 5. `Denied(NoAccess)`
//!
//! `allow_public_write` never participates.
//!
//! Documents without a project use the legacy rule: admin, then uploader,
//! then `ready` documents are readable by anyone. Guests never get past a
//! document that is still processing (or failed), whichever regime applies.

pub mod visibility;

use crate::catalog::account::Account;
use crate::catalog::document::Document;
use crate::catalog::grant::AccessGrant;
use crate::catalog::project::Project;
use crate::permission::{AccessLevel, Decision, DenialReason, EffectiveLevel, Role};

/// A project together with the caller's grant on it, if one exists.
#[derive(Debug, Clone, Copy)]
pub struct ProjectAccess<'a> {
    pub project: &'a Project,
    pub grant: Option<&'a AccessGrant>,
}

impl<'a> ProjectAccess<'a> {
    pub fn new(project: &'a Project, grant: Option<&'a AccessGrant>) -> Self {
        Self { project, grant }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Project(ProjectAccess<'a>),
    Document {
        document: &'a Document,
        /// `None` for legacy documents that carry no project.
        project: Option<ProjectAccess<'a>>,
    },
}

pub fn resolve(account: &Account, target: &Target<'_>, requested: AccessLevel) -> Decision {
    match target {
        Target::Project(access) => resolve_project(account, access, requested),
        Target::Document { document, project } => {
            resolve_document(account, document, project.as_ref(), requested)
        }
    }
}

pub fn resolve_project(
    account: &Account,
    access: &ProjectAccess<'_>,
    requested: AccessLevel,
) -> Decision {
    if account.role.is_admin() {
        return Decision::Granted(EffectiveLevel::Admin);
    }
    let project = access.project;
    if project.is_owned_by(&account.account_id) {
        return Decision::Granted(EffectiveLevel::Admin);
    }
    let grant = access
        .grant
        .filter(|g| g.applies_to(&project.project_id, &account.account_id));
    if let Some(grant) = grant {
        return if grant.permission.covers(requested) {
            Decision::Granted(grant.permission.into())
        } else {
            Decision::Denied(DenialReason::InsufficientPermission)
        };
    }
    if requested == AccessLevel::Read && project.settings.allow_public_read {
        return Decision::Granted(EffectiveLevel::Read);
    }
    Decision::Denied(DenialReason::NoAccess)
}

pub fn resolve_document(
    account: &Account,
    document: &Document,
    project: Option<&ProjectAccess<'_>>,
    requested: AccessLevel,
) -> Decision {
    if account.role.is_admin() {
        return Decision::Granted(EffectiveLevel::Admin);
    }
    if account.role == Role::Guest && !document.is_ready() {
        return Decision::Denied(DenialReason::DocumentNotReady);
    }
    match project {
        Some(access) => resolve_project(account, access, requested),
        None => resolve_legacy(account, document, requested),
    }
}

fn resolve_legacy(account: &Account, document: &Document, requested: AccessLevel) -> Decision {
    if document.uploaded_by == account.account_id {
        return Decision::Granted(EffectiveLevel::Admin);
    }
    if document.is_ready() && requested == AccessLevel::Read {
        return Decision::Granted(EffectiveLevel::Read);
    }
    Decision::Denied(DenialReason::NoAccess)
}
