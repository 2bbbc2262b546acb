//! Declarative resources for the SAP BTP account, entitlement and SaaS
//! provisioning APIs, reconciled through asynchronous remote jobs.

pub mod btp;
pub mod cli;
pub mod config;
pub mod error;
pub mod reconcile;
pub mod resources;
pub mod ui;

pub use config::{ProviderConfig, ServiceEndpoint};
pub use error::ProviderError;
pub use reconcile::{Operation, ReconciliationOutcome, Reconciler};
pub use resources::{ResourceDefinition, ResourceState};
