//! Resource operations: build a typed request from a definition and
//! reconcile it against the owning BTP service.

pub mod directory;
pub mod entitlements;
pub mod sub_account;
pub mod subscription;

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::btp::BtpClient;
use crate::config::{ProviderConfig, ReconcileSettings};
use crate::error::ProviderError;
use crate::reconcile::{
    Acceptance, JobHandle, JobState, JobStatusSource, MutationLabel, MutationSubmitter, Operation,
    ReconcileReport, ReconciliationOutcome, Reconciler,
};

pub use directory::{DirectoryEntitlementSpec, DirectoryEntitlements, DirectoryFeatures};
pub use entitlements::{
    EntitlementKind, ResourceSpec, ServiceEntitlement, SubaccountAssignment,
    SubaccountEntitlements,
};
pub use sub_account::{CustomProperty, SubAccount, SubAccountLifecycle, SubAccountReader};
pub use subscription::Subscription;

/// A resource definition as read from a JSON or TOML file, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResourceDefinition {
    SubaccountEntitlements(SubaccountEntitlements),
    DirectoryEntitlements(DirectoryEntitlements),
    DirectoryFeatures(DirectoryFeatures),
    Subscription(Subscription),
    SubAccount(SubAccount),
}

impl ResourceDefinition {
    pub fn kind(&self) -> &'static str {
        match self {
            ResourceDefinition::SubaccountEntitlements(_) => "subaccount_entitlements",
            ResourceDefinition::DirectoryEntitlements(_) => "directory_entitlements",
            ResourceDefinition::DirectoryFeatures(_) => "directory_features",
            ResourceDefinition::Subscription(_) => "subscription",
            ResourceDefinition::SubAccount(_) => "sub_account",
        }
    }
}

/// Reads a definition file; `.toml` files are TOML, everything else JSON.
pub fn load_definition(path: &Path) -> Result<ResourceDefinition, ProviderError> {
    let contents = std::fs::read_to_string(path)?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if is_toml {
        Ok(toml::from_str(&contents)?)
    } else {
        Ok(serde_json::from_str(&contents)?)
    }
}

/// What a successful resource operation hands back.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceState {
    pub id: String,
    pub report: ReconcileReport,
}

/// Runs `operation` for `definition` against the endpoints in `config`.
///
/// `id` is the identifier from a previous create; it is required for update
/// and delete of sub-account entitlements and sub-accounts, and ignored
/// elsewhere.
pub async fn apply(
    definition: &ResourceDefinition,
    operation: Operation,
    id: Option<&str>,
    config: &ProviderConfig,
) -> Result<ResourceState, ProviderError> {
    info!(resource = definition.kind(), operation = %operation, "Applying resource");
    let settings = &config.reconcile;

    match definition {
        ResourceDefinition::SubaccountEntitlements(def) => {
            let client = BtpClient::entitlements(&config.entitlements_endpoint()?)?;
            entitlements::apply(&client, def, operation, id, settings).await
        }
        ResourceDefinition::DirectoryEntitlements(def) => {
            let client = BtpClient::entitlements(&config.entitlements_endpoint()?)?;
            directory::apply_entitlements(&client, def, operation, settings).await
        }
        ResourceDefinition::DirectoryFeatures(def) => {
            let client = BtpClient::accounts(&config.accounts_endpoint()?)?;
            directory::apply_features(&client, def, operation, settings).await
        }
        ResourceDefinition::Subscription(def) => {
            let client = BtpClient::saas_manager(&def.endpoint)?;
            match operation {
                Operation::Create => subscription::subscribe(&client, def, settings).await,
                Operation::Update => subscription::update(&client, def, settings).await,
                Operation::Delete => subscription::unsubscribe(&client, def, settings).await,
            }
        }
        ResourceDefinition::SubAccount(def) => {
            let client = BtpClient::accounts(&config.accounts_endpoint()?)?;
            sub_account::apply(&client, def, operation, id, settings).await
        }
    }
}

/// Current state of an entitlements job.
pub async fn job_status(config: &ProviderConfig, job: &str) -> Result<JobState, ProviderError> {
    if job.trim().is_empty() {
        return Err(ProviderError::Validation("job id must not be blank".into()));
    }
    let client = BtpClient::entitlements(&config.entitlements_endpoint()?)?;
    Ok(client.job_status(&JobHandle::new(job)).await?)
}

/// Reconciles one request within the job timeout and turns the outcome into
/// a `Result`.
pub(crate) async fn run<C, R>(
    client: &C,
    acceptance: Acceptance,
    label: MutationLabel,
    request: &R,
    settings: &ReconcileSettings,
) -> Result<ReconcileReport, ProviderError>
where
    C: MutationSubmitter<R> + JobStatusSource,
{
    run_with_deadline(client, acceptance, label, request, settings, settings.job_timeout()).await
}

pub(crate) async fn run_with_deadline<C, R>(
    client: &C,
    acceptance: Acceptance,
    label: MutationLabel,
    request: &R,
    settings: &ReconcileSettings,
    deadline: Duration,
) -> Result<ReconcileReport, ProviderError>
where
    C: MutationSubmitter<R> + JobStatusSource,
{
    let (outcome, report) = Reconciler::new(client, acceptance)
        .with_poll_config(settings.poll_config())
        .reconcile_with_report(&label, request, deadline)
        .await;

    match outcome {
        ReconciliationOutcome::Success => Ok(report),
        ReconciliationOutcome::Failure { kind, message } => {
            debug!(
                operation = %label,
                polls = report.polls,
                duration_ms = report.duration_ms,
                "Reconciliation failed"
            );
            Err(ProviderError::Reconcile { kind, message })
        }
    }
}

pub(crate) fn require(field: &str, value: &str) -> Result<(), ProviderError> {
    if value.trim().is_empty() {
        return Err(ProviderError::Validation(format!("{field} must not be blank")));
    }
    Ok(())
}
