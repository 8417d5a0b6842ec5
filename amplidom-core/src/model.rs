//! Declared and observed shapes of a domain association.

use serde::{Deserialize, Serialize};

use crate::id::ResourceKey;

/// Upper bound on sub-domains per association, as enforced by the service.
pub const MAX_SUB_DOMAINS: usize = 255;

/// One branch-to-prefix binding. An empty prefix maps the apex domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubDomain {
    pub branch_name: String,
    pub prefix: String,
}

impl SubDomain {
    pub fn new(branch_name: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            branch_name: branch_name.into(),
            prefix: prefix.into(),
        }
    }
}

/// Desired state as declared in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainAssociationSpec {
    pub app_id: String,
    pub domain_name: String,
    pub sub_domains: Vec<SubDomain>,
    #[serde(default)]
    pub enable_auto_sub_domain: bool,
    #[serde(default = "default_wait_for_verification")]
    pub wait_for_verification: bool,
}

fn default_wait_for_verification() -> bool {
    true
}

impl DomainAssociationSpec {
    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(&self.app_id, &self.domain_name)
    }

    /// Checks the declared spec before anything is sent to the service.
    pub fn validate(&self) -> Result<(), String> {
        if self.app_id.trim().is_empty() {
            return Err("app_id is required".to_string());
        }
        if self.domain_name.trim().is_empty() {
            return Err("domain_name is required".to_string());
        }
        if self.sub_domains.is_empty() {
            return Err("at least one sub_domain is required".to_string());
        }
        if self.sub_domains.len() > MAX_SUB_DOMAINS {
            return Err(format!(
                "at most {} sub_domains are allowed, got {}",
                MAX_SUB_DOMAINS,
                self.sub_domains.len()
            ));
        }

        let mut prefixes = std::collections::HashSet::new();
        for sub in &self.sub_domains {
            if sub.branch_name.trim().is_empty() {
                return Err(format!(
                    "sub_domain with prefix {:?} has no branch_name",
                    sub.prefix
                ));
            }
            if !prefixes.insert(sub.prefix.as_str()) {
                return Err(format!("duplicate sub_domain prefix {:?}", sub.prefix));
            }
        }

        Ok(())
    }
}

/// Status values reported by the service for a domain association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DomainStatus {
    PendingVerification,
    InProgress,
    Available,
    PendingDeployment,
    Failed,
    Creating,
    RequestingCertificate,
    Updating,
}

impl DomainStatus {
    pub fn verification(self) -> VerificationStatus {
        match self {
            DomainStatus::Available | DomainStatus::PendingDeployment => {
                VerificationStatus::Success
            }
            DomainStatus::Failed => VerificationStatus::Failed,
            DomainStatus::PendingVerification
            | DomainStatus::InProgress
            | DomainStatus::Creating
            | DomainStatus::RequestingCertificate
            | DomainStatus::Updating => VerificationStatus::Pending,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DomainStatus::PendingVerification => "PENDING_VERIFICATION",
            DomainStatus::InProgress => "IN_PROGRESS",
            DomainStatus::Available => "AVAILABLE",
            DomainStatus::PendingDeployment => "PENDING_DEPLOYMENT",
            DomainStatus::Failed => "FAILED",
            DomainStatus::Creating => "CREATING",
            DomainStatus::RequestingCertificate => "REQUESTING_CERTIFICATE",
            DomainStatus::Updating => "UPDATING",
        }
    }
}

/// Verification outcome collapsed from [`DomainStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Pending,
    Success,
    Failed,
}

impl VerificationStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, VerificationStatus::Pending)
    }
}

/// Observed state of one sub-domain binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubDomainState {
    pub settings: SubDomain,
    pub verified: bool,
    pub dns_record: String,
}

/// A domain association as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainAssociation {
    pub app_id: String,
    pub domain_name: String,
    pub arn: String,
    pub enable_auto_sub_domain: bool,
    pub status: DomainStatus,
    pub status_reason: Option<String>,
    pub certificate_verification_dns_record: Option<String>,
    pub sub_domains: Vec<SubDomainState>,
}

impl DomainAssociation {
    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(&self.app_id, &self.domain_name)
    }

    /// Whether this object is exactly the one addressed by `key`.
    pub fn matches(&self, key: &ResourceKey) -> bool {
        self.app_id == key.app_id() && self.domain_name == key.domain_name()
    }

    /// Declared settings of every sub-domain, sorted.
    pub fn sub_domain_settings(&self) -> Vec<SubDomain> {
        let mut settings: Vec<SubDomain> =
            self.sub_domains.iter().map(|s| s.settings.clone()).collect();
        settings.sort();
        settings
    }
}

/// Request body for creating a domain association.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDomainAssociationRequest {
    pub app_id: String,
    pub domain_name: String,
    pub sub_domains: Vec<SubDomain>,
    pub enable_auto_sub_domain: bool,
}

impl From<&DomainAssociationSpec> for CreateDomainAssociationRequest {
    fn from(spec: &DomainAssociationSpec) -> Self {
        Self {
            app_id: spec.app_id.clone(),
            domain_name: spec.domain_name.clone(),
            sub_domains: spec.sub_domains.clone(),
            enable_auto_sub_domain: spec.enable_auto_sub_domain,
        }
    }
}
