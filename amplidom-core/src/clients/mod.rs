//! Clients for the Amplify domain association API.
//!
//! The reconciler only needs three calls from the service. Anything that can
//! create, fetch and delete a domain association can back it:
//! - [`MemoryAmplify`]: in-process simulation with eventual consistency

pub mod memory;

pub use memory::{MemoryAmplify, MemoryAmplifyConfig, Operation};

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::model::{CreateDomainAssociationRequest, DomainAssociation};

/// The calls the reconciler makes against the service.
#[async_trait]
pub trait AmplifyClient: Send + Sync {
    /// Create a domain association and return the service's view of it.
    async fn create_domain_association(
        &self,
        request: &CreateDomainAssociationRequest,
    ) -> Result<DomainAssociation, ApiError>;

    /// Fetch one domain association. Absence is reported as
    /// [`ApiError::NotFound`].
    async fn get_domain_association(
        &self,
        app_id: &str,
        domain_name: &str,
    ) -> Result<DomainAssociation, ApiError>;

    /// Delete one domain association.
    async fn delete_domain_association(
        &self,
        app_id: &str,
        domain_name: &str,
    ) -> Result<(), ApiError>;
}

#[async_trait]
impl<C: AmplifyClient + ?Sized> AmplifyClient for Arc<C> {
    async fn create_domain_association(
        &self,
        request: &CreateDomainAssociationRequest,
    ) -> Result<DomainAssociation, ApiError> {
        (**self).create_domain_association(request).await
    }

    async fn get_domain_association(
        &self,
        app_id: &str,
        domain_name: &str,
    ) -> Result<DomainAssociation, ApiError> {
        (**self).get_domain_association(app_id, domain_name).await
    }

    async fn delete_domain_association(
        &self,
        app_id: &str,
        domain_name: &str,
    ) -> Result<(), ApiError> {
        (**self).delete_domain_association(app_id, domain_name).await
    }
}
