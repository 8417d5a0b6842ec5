//! Exact-key lookup of domain associations.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::clients::AmplifyClient;
use crate::error::ApiError;
use crate::id::ResourceKey;
use crate::model::DomainAssociation;

/// Result of a single lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Found(DomainAssociation),
    NotFound,
    Error(ApiError),
}

impl LookupOutcome {
    pub fn is_not_found(&self) -> bool {
        matches!(self, LookupOutcome::NotFound)
    }

    /// Folds the outcome into a `Result`, keeping absence as `Ok(None)`.
    pub fn into_result(self) -> Result<Option<DomainAssociation>, ApiError> {
        match self {
            LookupOutcome::Found(association) => Ok(Some(association)),
            LookupOutcome::NotFound => Ok(None),
            LookupOutcome::Error(e) => Err(e),
        }
    }
}

/// Looks up domain associations by their exact key.
///
/// Issues exactly one API call per lookup; retrying is left to the caller.
pub struct Finder<C: ?Sized> {
    client: Arc<C>,
}

impl<C: ?Sized> Clone for Finder<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
        }
    }
}

impl<C: AmplifyClient + ?Sized> Finder<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    pub async fn find_by_key(&self, key: &ResourceKey) -> LookupOutcome {
        match self
            .client
            .get_domain_association(key.app_id(), key.domain_name())
            .await
        {
            Ok(association) if association.matches(key) => LookupOutcome::Found(association),
            Ok(association) => {
                warn!(
                    %key,
                    returned_app_id = %association.app_id,
                    returned_domain_name = %association.domain_name,
                    "Lookup returned a different domain association"
                );
                LookupOutcome::Error(ApiError::Unexpected(format!(
                    "asked for {}, got {}",
                    key,
                    association.key()
                )))
            }
            Err(ApiError::NotFound(reason)) => {
                debug!(%key, %reason, "Domain association not found");
                LookupOutcome::NotFound
            }
            Err(e) => LookupOutcome::Error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{MemoryAmplify, Operation};
    use crate::model::{CreateDomainAssociationRequest, SubDomain};

    async fn seeded() -> Arc<MemoryAmplify> {
        let amplify = Arc::new(MemoryAmplify::default());
        amplify.add_app("app1", &["main", "dev"]).await;
        for (domain_name, branch) in [("example.com", "main"), ("www.example.com", "dev")] {
            amplify
                .create_domain_association(&CreateDomainAssociationRequest {
                    app_id: "app1".to_string(),
                    domain_name: domain_name.to_string(),
                    sub_domains: vec![SubDomain::new(branch, "www")],
                    enable_auto_sub_domain: false,
                })
                .await
                .unwrap();
        }
        amplify
    }

    #[tokio::test]
    async fn test_find_matches_exact_domain() {
        let finder = Finder::new(seeded().await);

        let LookupOutcome::Found(found) = finder
            .find_by_key(&ResourceKey::new("app1", "example.com"))
            .await
        else {
            panic!("expected example.com to be found");
        };
        assert_eq!(found.domain_name, "example.com");
        assert_eq!(found.sub_domains[0].settings.branch_name, "main");

        let outcome = finder
            .find_by_key(&ResourceKey::new("app1", "ample.com"))
            .await;
        assert!(outcome.is_not_found());
    }

    #[tokio::test]
    async fn test_transport_error_is_not_not_found() {
        let amplify = seeded().await;
        amplify
            .inject_fault(
                Operation::Get,
                ApiError::Transport("connection reset".to_string()),
            )
            .await;
        let finder = Finder::new(Arc::clone(&amplify));

        let outcome = finder
            .find_by_key(&ResourceKey::new("app1", "missing.com"))
            .await;
        assert!(matches!(outcome, LookupOutcome::Error(ApiError::Transport(_))));
        assert_eq!(amplify.calls(Operation::Get), 1);
    }

    #[tokio::test]
    async fn test_unknown_app_is_not_found() {
        let finder = Finder::new(seeded().await);
        let outcome = finder
            .find_by_key(&ResourceKey::new("other", "example.com"))
            .await;
        assert_eq!(outcome.into_result().unwrap(), None);
    }
}
