//! Conformance checks over persisted state.
//!
//! These back the acceptance harness: existence after apply, attribute shape,
//! import round-trips through the persisted id, and absence after destroy.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clients::AmplifyClient;
use crate::error::ConformanceError;
use crate::finder::{Finder, LookupOutcome};
use crate::id::{ExternalId, format_id};
use crate::model::{DomainAssociation, DomainAssociationSpec, SubDomain};
use crate::reconciler::DomainAssociationReconciler;

/// Attributes recorded in state for one domain association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainAssociationState {
    pub id: ExternalId,
    pub arn: String,
    pub app_id: String,
    pub domain_name: String,
    pub enable_auto_sub_domain: bool,
    /// Sorted sub-domain settings.
    pub sub_domains: Vec<SubDomain>,
}

impl DomainAssociationState {
    pub fn new(id: ExternalId, association: &DomainAssociation) -> Self {
        Self {
            id,
            arn: association.arn.clone(),
            app_id: association.app_id.clone(),
            domain_name: association.domain_name.clone(),
            enable_auto_sub_domain: association.enable_auto_sub_domain,
            sub_domains: association.sub_domain_settings(),
        }
    }
}

fn expect_eq<T: PartialEq + Debug>(
    attribute: &'static str,
    expected: &T,
    actual: &T,
) -> Result<(), ConformanceError> {
    if expected == actual {
        return Ok(());
    }
    Err(ConformanceError::AttributeMismatch {
        attribute,
        expected: format!("{:?}", expected),
        actual: format!("{:?}", actual),
    })
}

/// Checks that the association behind a persisted id exists.
pub async fn check_exists<C: AmplifyClient + ?Sized>(
    reconciler: &DomainAssociationReconciler<C>,
    id: &str,
) -> Result<DomainAssociation, ConformanceError> {
    if id.is_empty() {
        return Err(ConformanceError::MissingId);
    }
    let id = ExternalId::from_persisted(id);
    id.key()?;
    Ok(reconciler.read(&id).await?)
}

/// Checks an observed association against the spec it was created from.
pub fn check_shape(
    association: &DomainAssociation,
    spec: &DomainAssociationSpec,
) -> Result<(), ConformanceError> {
    let arn_suffix = format!(
        ":apps/{}/domains/{}",
        association.app_id, association.domain_name
    );
    if !association.arn.starts_with("arn:") || !association.arn.ends_with(&arn_suffix) {
        return Err(ConformanceError::AttributeMismatch {
            attribute: "arn",
            expected: format!("arn:...{}", arn_suffix),
            actual: association.arn.clone(),
        });
    }

    expect_eq("app_id", &spec.app_id, &association.app_id)?;
    expect_eq("domain_name", &spec.domain_name, &association.domain_name)?;
    expect_eq(
        "sub_domain.#",
        &spec.sub_domains.len(),
        &association.sub_domains.len(),
    )?;

    let mut declared = spec.sub_domains.clone();
    declared.sort();
    expect_eq("sub_domain", &declared, &association.sub_domain_settings())?;
    expect_eq(
        "enable_auto_sub_domain",
        &spec.enable_auto_sub_domain,
        &association.enable_auto_sub_domain,
    )
}

/// Re-reads an association from nothing but its persisted id and compares
/// it with the recorded state.
pub async fn verify_import<C: AmplifyClient + ?Sized>(
    reconciler: &DomainAssociationReconciler<C>,
    state: &DomainAssociationState,
) -> Result<(), ConformanceError> {
    let key = state.id.key()?;
    let id = format_id(&key);
    expect_eq("id", &state.id, &id)?;

    let imported = DomainAssociationState::new(id.clone(), &reconciler.read(&id).await?);
    expect_eq("arn", &state.arn, &imported.arn)?;
    expect_eq("app_id", &state.app_id, &imported.app_id)?;
    expect_eq("domain_name", &state.domain_name, &imported.domain_name)?;
    expect_eq(
        "enable_auto_sub_domain",
        &state.enable_auto_sub_domain,
        &imported.enable_auto_sub_domain,
    )?;
    expect_eq("sub_domain", &state.sub_domains, &imported.sub_domains)
}

/// Checks that none of the persisted ids still resolve to an association.
pub async fn check_destroyed<C: AmplifyClient + ?Sized>(
    finder: &Finder<C>,
    ids: &[ExternalId],
) -> Result<(), ConformanceError> {
    for id in ids {
        let key = id.key()?;
        match finder.find_by_key(&key).await {
            LookupOutcome::NotFound => debug!(%id, "Destroyed"),
            LookupOutcome::Error(e) => return Err(ConformanceError::Lookup(e)),
            LookupOutcome::Found(_) => {
                return Err(ConformanceError::StillExists { id: id.to_string() });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DomainStatus, SubDomainState};

    fn make_association() -> DomainAssociation {
        DomainAssociation {
            app_id: "app1".to_string(),
            domain_name: "example.com".to_string(),
            arn: "arn:aws:amplify:us-west-2:123456789012:apps/app1/domains/example.com"
                .to_string(),
            enable_auto_sub_domain: false,
            status: DomainStatus::PendingVerification,
            status_reason: None,
            certificate_verification_dns_record: None,
            sub_domains: vec![SubDomainState {
                settings: SubDomain::new("main", "www"),
                verified: false,
                dns_record: "www CNAME d123.cloudfront.net".to_string(),
            }],
        }
    }

    fn make_spec() -> DomainAssociationSpec {
        DomainAssociationSpec {
            app_id: "app1".to_string(),
            domain_name: "example.com".to_string(),
            sub_domains: vec![SubDomain::new("main", "www")],
            enable_auto_sub_domain: false,
            wait_for_verification: false,
        }
    }

    #[test]
    fn test_shape_matches_spec() {
        check_shape(&make_association(), &make_spec()).unwrap();
    }

    #[test]
    fn test_shape_rejects_extra_sub_domain() {
        let mut association = make_association();
        association.sub_domains.push(SubDomainState {
            settings: SubDomain::new("main", ""),
            verified: false,
            dns_record: String::new(),
        });
        let err = check_shape(&association, &make_spec()).unwrap_err();
        assert!(matches!(
            err,
            ConformanceError::AttributeMismatch {
                attribute: "sub_domain.#",
                ..
            }
        ));
    }

    #[test]
    fn test_shape_rejects_foreign_arn() {
        let mut association = make_association();
        association.arn = "arn:aws:amplify:us-west-2:123456789012:apps/app1/domains/other.com"
            .to_string();
        let err = check_shape(&association, &make_spec()).unwrap_err();
        assert!(matches!(
            err,
            ConformanceError::AttributeMismatch { attribute: "arn", .. }
        ));
    }
}
