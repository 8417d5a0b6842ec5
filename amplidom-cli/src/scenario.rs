//! The acceptance scenario: create, check, import, destroy.

use std::fmt::Display;
use std::sync::Arc;

use amplidom_core::conformance::{
    DomainAssociationState, check_destroyed, check_exists, check_shape, verify_import,
};
use amplidom_core::{
    DomainAssociationReconciler, DomainAssociationSpec, MemoryAmplify, ReadError,
    ReconcilerConfig,
};
use tabled::{Table, Tabled};
use tracing::{info, warn};

#[derive(Tabled)]
struct StepRow {
    #[tabled(rename = "STEP")]
    step: &'static str,
    #[tabled(rename = "RESULT")]
    result: &'static str,
    #[tabled(rename = "DETAIL")]
    detail: String,
}

/// Outcome of every step that ran.
#[derive(Default)]
pub struct Report {
    rows: Vec<StepRow>,
}

impl Report {
    fn record<T, E: Display>(
        &mut self,
        step: &'static str,
        result: Result<T, E>,
        detail: impl FnOnce(&T) -> String,
    ) -> Option<T> {
        match result {
            Ok(value) => {
                info!(step, "ok");
                self.rows.push(StepRow {
                    step,
                    result: "ok",
                    detail: detail(&value),
                });
                Some(value)
            }
            Err(e) => {
                warn!(step, error = %e, "failed");
                self.rows.push(StepRow {
                    step,
                    result: "FAILED",
                    detail: e.to_string(),
                });
                None
            }
        }
    }

    pub fn failed(&self) -> bool {
        self.rows.iter().any(|row| row.result != "ok")
    }

    pub fn table(&self) -> Table {
        Table::new(&self.rows)
    }
}

pub async fn run(
    amplify: Arc<MemoryAmplify>,
    config: ReconcilerConfig,
    spec: &DomainAssociationSpec,
) -> Report {
    let reconciler = DomainAssociationReconciler::new(amplify, config);
    let mut report = Report::default();

    let Some(id) = report.record("create", reconciler.create(spec).await, |id| id.to_string())
    else {
        return report;
    };

    let Some(association) = report.record(
        "exists",
        check_exists(&reconciler, id.as_str()).await,
        |a| format!("{} ({})", a.arn, a.status.as_str()),
    ) else {
        return report;
    };

    report.record("shape", check_shape(&association, spec), |_| {
        format!(
            "domain_name={} sub_domain.#={} wait_for_verification={}",
            association.domain_name,
            association.sub_domains.len(),
            spec.wait_for_verification
        )
    });

    let state = DomainAssociationState::new(id.clone(), &association);
    report.record("import", verify_import(&reconciler, &state).await, |_| {
        format!("re-read from {}", id)
    });

    report.record("delete", reconciler.delete(&id).await, |_| String::new());
    report.record("delete again", reconciler.delete(&id).await, |_| {
        "already gone".to_string()
    });

    let gone = match reconciler.read(&id).await {
        Err(ReadError::Gone(gone)) => Ok(gone),
        Err(e) => Err(e.to_string()),
        Ok(_) => Err(format!("{} can still be read", id)),
    };
    report.record("read after delete", gone, |gone| format!("{} is gone", gone));

    report.record(
        "destroyed",
        check_destroyed(reconciler.finder(), std::slice::from_ref(&id)).await,
        |_| String::new(),
    );

    report
}
