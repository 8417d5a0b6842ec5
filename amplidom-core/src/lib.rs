//! amplidom-core: reconciliation of Amplify domain associations.
//!
//! - [`id`]: persisted identifier codec
//! - [`finder`]: exact-key lookups that keep "not found" apart from errors
//! - [`reconciler`]: create / read / delete with idempotent teardown
//! - [`waiter`]: bounded polling for asynchronous verification
//! - [`conformance`]: checks used by the acceptance harness
//!
//! The API client is always passed in explicitly; nothing here reaches for
//! global state.

pub mod clients;
pub mod config;
pub mod conformance;
pub mod error;
pub mod finder;
pub mod id;
pub mod model;
pub mod reconciler;
pub mod waiter;

pub use clients::{AmplifyClient, MemoryAmplify, MemoryAmplifyConfig};
pub use config::{BackoffConfig, ReconcilerConfig};
pub use error::{
    ApiError, ConformanceError, CreateError, DecodeError, DeleteError, ReadError, WaitError,
};
pub use finder::{Finder, LookupOutcome};
pub use id::{ExternalId, ResourceKey, format_id, parse_id};
pub use model::{
    DomainAssociation, DomainAssociationSpec, DomainStatus, SubDomain, SubDomainState,
    VerificationStatus,
};
pub use reconciler::{
    DomainAssociationReconciler, DomainAssociationStatus, Reconciler, ResourcePhase,
};
pub use waiter::{Backoff, VerificationWaiter};
