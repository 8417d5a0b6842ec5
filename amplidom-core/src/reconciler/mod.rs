//! Convergent apply for Amplify resources.
//!
//! `reconcile` looks the declared resource up, creates it only when the
//! service has no record of it, and reports the observed phase. `finalize`
//! removes it by persisted id. Repeating either call is a no-op once the
//! service has converged.

pub mod domain_association;

pub use domain_association::{DomainAssociationReconciler, DomainAssociationStatus, ResourcePhase};

use anyhow::Result;
use async_trait::async_trait;

use crate::id::ExternalId;

#[async_trait]
pub trait Reconciler: Send + Sync {
    /// Declared configuration of one resource.
    type Spec;
    /// Phase and id reported after an apply.
    type Status;

    /// Creates the resource if absent and reports what the service holds.
    async fn reconcile(&self, spec: &Self::Spec) -> Result<Self::Status>;

    /// Deletes the resource; an id that is already gone succeeds.
    async fn finalize(&self, id: &ExternalId) -> Result<()>;
}
