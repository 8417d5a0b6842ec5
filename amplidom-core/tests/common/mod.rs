//! Test helpers for amplidom-core integration tests.

use std::sync::Arc;

use amplidom_core::{
    BackoffConfig, DomainAssociationReconciler, DomainAssociationSpec, MemoryAmplify,
    MemoryAmplifyConfig, ReconcilerConfig, SubDomain,
};

/// Simulated service plus a reconciler bound to it.
pub struct TestBackend {
    pub amplify: Arc<MemoryAmplify>,
    pub reconciler: DomainAssociationReconciler<MemoryAmplify>,
}

impl TestBackend {
    /// Start a backend with app `app1` holding branches `main` and `dev`.
    pub async fn start(config: MemoryAmplifyConfig) -> Self {
        let amplify = Arc::new(MemoryAmplify::new(config));
        amplify.add_app("app1", &["main", "dev"]).await;
        let reconciler = DomainAssociationReconciler::new(Arc::clone(&amplify), fast_config());
        Self {
            amplify,
            reconciler,
        }
    }
}

/// Short timeouts and small intervals so paused-clock tests stay cheap.
pub fn fast_config() -> ReconcilerConfig {
    ReconcilerConfig {
        verification_timeout_secs: 120,
        visibility_timeout_secs: 30,
        not_found_grace_secs: 10,
        backoff: BackoffConfig {
            initial_delay_ms: 200,
            max_delay_ms: 5000,
            multiplier: 2.0,
            jitter: 0.2,
        },
    }
}

/// The declared spec from the acceptance scenario.
pub fn example_spec(wait_for_verification: bool) -> DomainAssociationSpec {
    DomainAssociationSpec {
        app_id: "app1".to_string(),
        domain_name: "example.com".to_string(),
        sub_domains: vec![SubDomain::new("main", "www")],
        enable_auto_sub_domain: false,
        wait_for_verification,
    }
}
