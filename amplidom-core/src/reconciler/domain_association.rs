//! Domain association reconciler - drives associations through the Amplify API.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, error, info};

use super::Reconciler;
use crate::clients::AmplifyClient;
use crate::config::ReconcilerConfig;
use crate::error::{ApiError, CreateError, DeleteError, ReadError, WaitError};
use crate::finder::{Finder, LookupOutcome};
use crate::id::{ExternalId, ResourceKey, format_id};
use crate::model::{
    CreateDomainAssociationRequest, DomainAssociation, DomainAssociationSpec, DomainStatus,
    VerificationStatus,
};
use crate::waiter::VerificationWaiter;

/// Coarse lifecycle phase reported by [`Reconciler::reconcile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourcePhase {
    Creating,
    Pending,
    Ready,
    Failed,
}

impl From<DomainStatus> for ResourcePhase {
    fn from(status: DomainStatus) -> Self {
        match status {
            DomainStatus::Creating | DomainStatus::RequestingCertificate => ResourcePhase::Creating,
            DomainStatus::PendingVerification
            | DomainStatus::InProgress
            | DomainStatus::Updating => ResourcePhase::Pending,
            DomainStatus::Available | DomainStatus::PendingDeployment => ResourcePhase::Ready,
            DomainStatus::Failed => ResourcePhase::Failed,
        }
    }
}

/// Domain association status reported back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainAssociationStatus {
    pub id: ExternalId,
    pub phase: ResourcePhase,
    pub domain_status: Option<DomainStatus>,
    pub message: Option<String>,
}

impl DomainAssociationStatus {
    fn observed(id: ExternalId, association: &DomainAssociation) -> Self {
        Self {
            id,
            phase: association.status.into(),
            domain_status: Some(association.status),
            message: association.status_reason.clone(),
        }
    }

    fn failed(id: ExternalId, message: String) -> Self {
        Self {
            id,
            phase: ResourcePhase::Failed,
            domain_status: None,
            message: Some(message),
        }
    }
}

/// Reconciler for Amplify domain associations.
///
/// Holds no per-key state; the service is the source of truth, so one
/// instance can serve any number of keys concurrently.
pub struct DomainAssociationReconciler<C: ?Sized> {
    client: Arc<C>,
    finder: Finder<C>,
    waiter: VerificationWaiter<C>,
    config: ReconcilerConfig,
}

impl<C: AmplifyClient + ?Sized> DomainAssociationReconciler<C> {
    pub fn new(client: Arc<C>, config: ReconcilerConfig) -> Self {
        let finder = Finder::new(Arc::clone(&client));
        let waiter = VerificationWaiter::new(
            finder.clone(),
            config.backoff.clone(),
            config.not_found_grace(),
        );
        Self {
            client,
            finder,
            waiter,
            config,
        }
    }

    pub fn finder(&self) -> &Finder<C> {
        &self.finder
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Create the declared association and return its persisted id.
    ///
    /// Waits for verification when the spec asks for it, otherwise until the
    /// association has been observed once. Validation and API failures return
    /// no id; failures after the object exists carry the id for cleanup.
    pub async fn create(&self, spec: &DomainAssociationSpec) -> Result<ExternalId, CreateError> {
        spec.validate().map_err(CreateError::Validation)?;
        let key = spec.key();
        info!(
            app_id = %spec.app_id,
            domain_name = %spec.domain_name,
            sub_domains = spec.sub_domains.len(),
            "Creating domain association"
        );

        let created_at = Instant::now();
        let request = CreateDomainAssociationRequest::from(spec);
        let created = self
            .client
            .create_domain_association(&request)
            .await
            .map_err(|e| match e {
                ApiError::BadRequest(reason) => CreateError::Validation(reason),
                other => CreateError::Transport(other),
            })?;
        if !created.matches(&key) {
            return Err(CreateError::Transport(ApiError::Unexpected(format!(
                "created {}, expected {}",
                created.key(),
                key
            ))));
        }

        let id = format_id(&key);
        if spec.wait_for_verification {
            let observed = self
                .waiter
                .wait_for_terminal(&key, self.config.verification_timeout(), created_at)
                .await
                .map_err(|source| CreateError::Wait {
                    id: id.clone(),
                    source,
                })?;
            if observed.status.verification() == VerificationStatus::Failed {
                error!(%id, reason = ?observed.status_reason, "Domain association failed verification");
                return Err(CreateError::VerificationFailed {
                    id,
                    reason: observed
                        .status_reason
                        .unwrap_or_else(|| "no reason given".to_string()),
                });
            }
        } else {
            self.waiter
                .wait_until_visible(&key, self.config.visibility_timeout(), created_at)
                .await
                .map_err(|source| CreateError::Wait {
                    id: id.clone(),
                    source,
                })?;
        }

        info!(%id, "Created domain association");
        Ok(id)
    }

    /// Read the association addressed by a persisted id.
    pub async fn read(&self, id: &ExternalId) -> Result<DomainAssociation, ReadError> {
        let key = id.key()?;
        match self.finder.find_by_key(&key).await {
            LookupOutcome::Found(association) => Ok(association),
            LookupOutcome::NotFound => Err(ReadError::Gone(id.clone())),
            LookupOutcome::Error(e) => Err(ReadError::Transport(e)),
        }
    }

    /// Delete the association addressed by a persisted id.
    ///
    /// Succeeds when the association is already gone.
    pub async fn delete(&self, id: &ExternalId) -> Result<(), DeleteError> {
        let key = id.key()?;
        match self.finder.find_by_key(&key).await {
            LookupOutcome::Found(_) => {}
            LookupOutcome::NotFound => {
                debug!(%id, "Domain association already deleted");
                return Ok(());
            }
            LookupOutcome::Error(e) => return Err(DeleteError::Transport(e)),
        }

        info!(%id, "Deleting domain association");
        match self
            .client
            .delete_domain_association(key.app_id(), key.domain_name())
            .await
        {
            Ok(()) => Ok(()),
            Err(ApiError::NotFound(_)) => {
                debug!(%id, "Domain association deleted concurrently");
                Ok(())
            }
            Err(e) => Err(DeleteError::Transport(e)),
        }
    }

    /// Wait until verification of `key` reaches a terminal status.
    pub async fn wait_for_verification(
        &self,
        key: &ResourceKey,
        timeout: Duration,
    ) -> Result<VerificationStatus, WaitError> {
        self.waiter.wait_for_verification(key, timeout).await
    }
}

#[async_trait]
impl<C: AmplifyClient + ?Sized + 'static> Reconciler for DomainAssociationReconciler<C> {
    type Spec = DomainAssociationSpec;
    type Status = DomainAssociationStatus;

    async fn reconcile(&self, spec: &Self::Spec) -> Result<Self::Status> {
        let key = spec.key();
        let id = format_id(&key);
        info!("Reconciling domain association {}", key);

        match self.finder.find_by_key(&key).await {
            LookupOutcome::Found(association) => {
                Ok(DomainAssociationStatus::observed(id, &association))
            }
            LookupOutcome::NotFound => match self.create(spec).await {
                Ok(id) => {
                    let association = self.read(&id).await?;
                    Ok(DomainAssociationStatus::observed(id, &association))
                }
                Err(CreateError::Validation(reason)) => {
                    error!("Rejected domain association {}: {}", key, reason);
                    Ok(DomainAssociationStatus::failed(id, reason))
                }
                Err(CreateError::VerificationFailed { id, reason }) => {
                    Ok(DomainAssociationStatus::failed(id, reason))
                }
                Err(e) => Err(e.into()),
            },
            LookupOutcome::Error(e) => Err(e.into()),
        }
    }

    async fn finalize(&self, id: &ExternalId) -> Result<()> {
        info!("Finalizing domain association {}", id);
        self.delete(id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{MemoryAmplify, MemoryAmplifyConfig, Operation};
    use crate::config::BackoffConfig;
    use crate::error::DecodeError;
    use crate::model::SubDomain;

    fn test_config() -> ReconcilerConfig {
        ReconcilerConfig {
            verification_timeout_secs: 60,
            visibility_timeout_secs: 10,
            not_found_grace_secs: 5,
            backoff: BackoffConfig {
                initial_delay_ms: 100,
                max_delay_ms: 2000,
                multiplier: 2.0,
                jitter: 0.1,
            },
        }
    }

    fn make_spec(wait_for_verification: bool) -> DomainAssociationSpec {
        DomainAssociationSpec {
            app_id: "app1".to_string(),
            domain_name: "example.com".to_string(),
            sub_domains: vec![SubDomain::new("main", "www")],
            enable_auto_sub_domain: false,
            wait_for_verification,
        }
    }

    async fn setup(
        config: MemoryAmplifyConfig,
    ) -> (
        Arc<MemoryAmplify>,
        DomainAssociationReconciler<MemoryAmplify>,
    ) {
        let amplify = Arc::new(MemoryAmplify::new(config));
        amplify.add_app("app1", &["main", "dev"]).await;
        let reconciler = DomainAssociationReconciler::new(Arc::clone(&amplify), test_config());
        (amplify, reconciler)
    }

    #[tokio::test]
    async fn test_invalid_spec_makes_no_call() {
        let (amplify, reconciler) = setup(MemoryAmplifyConfig::default()).await;
        let mut spec = make_spec(false);
        spec.sub_domains.clear();

        let err = reconciler.create(&spec).await.unwrap_err();
        assert!(matches!(err, CreateError::Validation(_)));
        assert_eq!(amplify.calls(Operation::Create), 0);
    }

    #[tokio::test]
    async fn test_create_unknown_branch_is_validation_error() {
        let (_amplify, reconciler) = setup(MemoryAmplifyConfig::default()).await;
        let mut spec = make_spec(false);
        spec.sub_domains = vec![SubDomain::new("missing", "www")];

        let err = reconciler.create(&spec).await.unwrap_err();
        assert!(matches!(err, CreateError::Validation(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_create_transport_failure_carries_no_id() {
        let (amplify, reconciler) = setup(MemoryAmplifyConfig::default()).await;
        amplify
            .inject_fault(Operation::Create, ApiError::Transport("timeout".to_string()))
            .await;

        let err = reconciler.create(&make_spec(false)).await.unwrap_err();
        assert!(matches!(err, CreateError::Transport(ApiError::Transport(_))));

        let id = format_id(&ResourceKey::new("app1", "example.com"));
        assert!(matches!(
            reconciler.read(&id).await,
            Err(ReadError::Gone(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_waits_for_verification() {
        let (amplify, reconciler) = setup(MemoryAmplifyConfig {
            visibility_delay: Duration::from_secs(1),
            verification_delay: Duration::from_secs(20),
            ..Default::default()
        })
        .await;

        let started = Instant::now();
        let id = reconciler.create(&make_spec(true)).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(20));

        let association = reconciler.read(&id).await.unwrap();
        assert_eq!(association.status, DomainStatus::Available);
        assert!(amplify.calls(Operation::Get) > 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_without_wait_returns_once_visible() {
        let (_amplify, reconciler) = setup(MemoryAmplifyConfig {
            visibility_delay: Duration::from_secs(1),
            verification_delay: Duration::from_secs(600),
            ..Default::default()
        })
        .await;

        let started = Instant::now();
        let id = reconciler.create(&make_spec(false)).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(10));

        let association = reconciler.read(&id).await.unwrap();
        assert_eq!(association.status, DomainStatus::PendingVerification);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_verification_reports_id() {
        let (_amplify, reconciler) = setup(MemoryAmplifyConfig {
            verification_delay: Duration::from_secs(3),
            fail_verification: true,
            ..Default::default()
        })
        .await;

        let err = reconciler.create(&make_spec(true)).await.unwrap_err();
        let CreateError::VerificationFailed { id, reason } = err else {
            panic!("expected verification failure, got {err:?}");
        };
        assert_eq!(id.as_str(), "app1/example.com");
        assert!(reason.contains("verification"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_verification_timeout_is_wait_error() {
        let amplify = Arc::new(MemoryAmplify::new(MemoryAmplifyConfig {
            verification_delay: Duration::from_secs(3600),
            ..Default::default()
        }));
        amplify.add_app("app1", &["main"]).await;
        let mut config = test_config();
        config.verification_timeout_secs = 30;
        let reconciler = DomainAssociationReconciler::new(Arc::clone(&amplify), config);

        let err = reconciler.create(&make_spec(true)).await.unwrap_err();
        assert!(matches!(
            err,
            CreateError::Wait {
                source: WaitError::Timeout { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_delete_twice_succeeds() {
        let (amplify, reconciler) = setup(MemoryAmplifyConfig::default()).await;
        let id = reconciler.create(&make_spec(false)).await.unwrap();

        reconciler.delete(&id).await.unwrap();
        reconciler.delete(&id).await.unwrap();
        assert_eq!(amplify.calls(Operation::Delete), 1);
    }

    #[tokio::test]
    async fn test_delete_tolerates_concurrent_removal() {
        let (amplify, reconciler) = setup(MemoryAmplifyConfig::default()).await;
        let id = reconciler.create(&make_spec(false)).await.unwrap();
        amplify
            .inject_fault(Operation::Delete, ApiError::NotFound("gone".to_string()))
            .await;

        reconciler.delete(&id).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_surfaces_transport_errors() {
        let (amplify, reconciler) = setup(MemoryAmplifyConfig::default()).await;
        let id = reconciler.create(&make_spec(false)).await.unwrap();
        amplify
            .inject_fault(Operation::Get, ApiError::Transport("reset".to_string()))
            .await;

        let err = reconciler.delete(&id).await.unwrap_err();
        assert!(matches!(err, DeleteError::Transport(_)));
        assert!(reconciler.read(&id).await.is_ok());
    }

    #[tokio::test]
    async fn test_read_and_delete_reject_bad_ids() {
        let (_amplify, reconciler) = setup(MemoryAmplifyConfig::default()).await;
        let bad = ExternalId::from_persisted("no-separator");

        assert!(matches!(
            reconciler.read(&bad).await,
            Err(ReadError::InvalidId(DecodeError::Malformed { .. }))
        ));
        assert!(matches!(
            reconciler.delete(&bad).await,
            Err(DeleteError::InvalidId(_))
        ));
    }

    #[tokio::test]
    async fn test_reconcile_creates_once() {
        let (amplify, reconciler) = setup(MemoryAmplifyConfig::default()).await;
        let spec = make_spec(true);

        let status = reconciler.reconcile(&spec).await.unwrap();
        assert_eq!(status.phase, ResourcePhase::Ready);
        assert_eq!(status.id.as_str(), "app1/example.com");

        let status = reconciler.reconcile(&spec).await.unwrap();
        assert_eq!(status.phase, ResourcePhase::Ready);
        assert_eq!(amplify.calls(Operation::Create), 1);

        reconciler.finalize(&status.id).await.unwrap();
        reconciler.finalize(&status.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_reconcile_reports_rejected_spec() {
        let (_amplify, reconciler) = setup(MemoryAmplifyConfig::default()).await;
        let mut spec = make_spec(false);
        spec.sub_domains = vec![SubDomain::new("", "www")];

        let status = reconciler.reconcile(&spec).await.unwrap();
        assert_eq!(status.phase, ResourcePhase::Failed);
        assert!(status.message.is_some());
    }
}
