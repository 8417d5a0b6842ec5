//! In-memory Amplify backend.
//!
//! Behaves like the service as seen from a client: new associations are
//! invisible for a while, then sit in `PENDING_VERIFICATION` until the
//! certificate is verified, then turn `AVAILABLE` (or `FAILED`).

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::debug;

use super::AmplifyClient;
use crate::error::ApiError;
use crate::id::ResourceKey;
use crate::model::{
    CreateDomainAssociationRequest, DomainAssociation, DomainStatus, SubDomainState,
};

/// API operations, for fault injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Get,
    Delete,
}

/// Behavior of the simulated service.
#[derive(Debug, Clone)]
pub struct MemoryAmplifyConfig {
    pub partition: String,
    pub region: String,
    pub account_id: String,
    /// Time between create and the association showing up in reads.
    pub visibility_delay: Duration,
    /// Time between create and verification finishing.
    pub verification_delay: Duration,
    /// Whether verification ends in `FAILED` instead of `AVAILABLE`.
    pub fail_verification: bool,
}

impl Default for MemoryAmplifyConfig {
    fn default() -> Self {
        Self {
            partition: "aws".to_string(),
            region: "us-west-2".to_string(),
            account_id: "123456789012".to_string(),
            visibility_delay: Duration::ZERO,
            verification_delay: Duration::ZERO,
            fail_verification: false,
        }
    }
}

struct StoredAssociation {
    request: CreateDomainAssociationRequest,
    created_at: Instant,
    distribution: String,
    certificate_token: String,
}

#[derive(Default)]
struct CallCounts {
    create: AtomicUsize,
    get: AtomicUsize,
    delete: AtomicUsize,
}

impl CallCounts {
    fn counter(&self, op: Operation) -> &AtomicUsize {
        match op {
            Operation::Create => &self.create,
            Operation::Get => &self.get,
            Operation::Delete => &self.delete,
        }
    }
}

/// Simulated Amplify service holding apps, branches and domain associations.
pub struct MemoryAmplify {
    config: MemoryAmplifyConfig,
    /// app id -> branch names
    apps: RwLock<HashMap<String, HashSet<String>>>,
    associations: RwLock<HashMap<ResourceKey, StoredAssociation>>,
    faults: Mutex<HashMap<Operation, VecDeque<ApiError>>>,
    calls: CallCounts,
}

impl MemoryAmplify {
    pub fn new(config: MemoryAmplifyConfig) -> Self {
        Self {
            config,
            apps: RwLock::new(HashMap::new()),
            associations: RwLock::new(HashMap::new()),
            faults: Mutex::new(HashMap::new()),
            calls: CallCounts::default(),
        }
    }

    /// Register an app and its branches.
    pub async fn add_app(&self, app_id: &str, branches: &[&str]) {
        let mut apps = self.apps.write().await;
        let entry = apps.entry(app_id.to_string()).or_default();
        entry.extend(branches.iter().map(|b| b.to_string()));
    }

    /// Make the next call of `op` fail with `error`.
    pub async fn inject_fault(&self, op: Operation, error: ApiError) {
        let mut faults = self.faults.lock().await;
        faults.entry(op).or_default().push_back(error);
    }

    /// Number of calls made for `op`, including failed ones.
    pub fn calls(&self, op: Operation) -> usize {
        self.calls.counter(op).load(Ordering::SeqCst)
    }

    async fn begin(&self, op: Operation) -> Result<(), ApiError> {
        self.calls.counter(op).fetch_add(1, Ordering::SeqCst);
        let mut faults = self.faults.lock().await;
        match faults.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn arn(&self, app_id: &str, domain_name: &str) -> String {
        format!(
            "arn:{}:amplify:{}:{}:apps/{}/domains/{}",
            self.config.partition, self.config.region, self.config.account_id, app_id, domain_name
        )
    }

    fn status_at(&self, stored: &StoredAssociation, now: Instant) -> DomainStatus {
        let elapsed = now.saturating_duration_since(stored.created_at);
        if elapsed < self.config.verification_delay {
            DomainStatus::PendingVerification
        } else if self.config.fail_verification {
            DomainStatus::Failed
        } else {
            DomainStatus::Available
        }
    }

    fn render(&self, stored: &StoredAssociation, status: DomainStatus) -> DomainAssociation {
        let request = &stored.request;
        let verified = status == DomainStatus::Available;
        let sub_domains = request
            .sub_domains
            .iter()
            .map(|sub| SubDomainState {
                settings: sub.clone(),
                verified,
                dns_record: format!("{} CNAME {}.cloudfront.net", sub.prefix, stored.distribution),
            })
            .collect();

        DomainAssociation {
            app_id: request.app_id.clone(),
            domain_name: request.domain_name.clone(),
            arn: self.arn(&request.app_id, &request.domain_name),
            enable_auto_sub_domain: request.enable_auto_sub_domain,
            status,
            status_reason: (status == DomainStatus::Failed)
                .then(|| "certificate verification failed".to_string()),
            certificate_verification_dns_record: Some(format!(
                "_{}.{}. CNAME _{}.acm-validations.aws.",
                stored.certificate_token, request.domain_name, stored.certificate_token
            )),
            sub_domains,
        }
    }
}

impl Default for MemoryAmplify {
    fn default() -> Self {
        Self::new(MemoryAmplifyConfig::default())
    }
}

#[async_trait]
impl AmplifyClient for MemoryAmplify {
    async fn create_domain_association(
        &self,
        request: &CreateDomainAssociationRequest,
    ) -> Result<DomainAssociation, ApiError> {
        self.begin(Operation::Create).await?;
        debug!(app_id = %request.app_id, domain_name = %request.domain_name, "memory: create");

        {
            let apps = self.apps.read().await;
            let branches = apps
                .get(&request.app_id)
                .ok_or_else(|| ApiError::NotFound(format!("app {}", request.app_id)))?;
            if let Some(sub) = request
                .sub_domains
                .iter()
                .find(|sub| !branches.contains(&sub.branch_name))
            {
                return Err(ApiError::BadRequest(format!(
                    "branch {} does not exist in app {}",
                    sub.branch_name, request.app_id
                )));
            }
        }

        let key = ResourceKey::new(&request.app_id, &request.domain_name);
        let mut associations = self.associations.write().await;
        if associations.contains_key(&key) {
            return Err(ApiError::BadRequest(format!(
                "domain association {} already exists",
                key
            )));
        }

        let stored = StoredAssociation {
            request: request.clone(),
            created_at: Instant::now(),
            distribution: format!("d{}", &uuid::Uuid::new_v4().simple().to_string()[..13]),
            certificate_token: uuid::Uuid::new_v4().simple().to_string(),
        };
        let created = self.render(&stored, DomainStatus::Creating);
        associations.insert(key, stored);
        Ok(created)
    }

    async fn get_domain_association(
        &self,
        app_id: &str,
        domain_name: &str,
    ) -> Result<DomainAssociation, ApiError> {
        self.begin(Operation::Get).await?;

        if !self.apps.read().await.contains_key(app_id) {
            return Err(ApiError::NotFound(format!("app {}", app_id)));
        }

        let key = ResourceKey::new(app_id, domain_name);
        let associations = self.associations.read().await;
        let stored = associations
            .get(&key)
            .ok_or_else(|| ApiError::NotFound(format!("domain association {}", key)))?;

        let now = Instant::now();
        if now.saturating_duration_since(stored.created_at) < self.config.visibility_delay {
            debug!(%key, "memory: not yet visible");
            return Err(ApiError::NotFound(format!("domain association {}", key)));
        }

        Ok(self.render(stored, self.status_at(stored, now)))
    }

    async fn delete_domain_association(
        &self,
        app_id: &str,
        domain_name: &str,
    ) -> Result<(), ApiError> {
        self.begin(Operation::Delete).await?;

        let key = ResourceKey::new(app_id, domain_name);
        match self.associations.write().await.remove(&key) {
            Some(_) => Ok(()),
            None => Err(ApiError::NotFound(format!("domain association {}", key))),
        }
    }
}
