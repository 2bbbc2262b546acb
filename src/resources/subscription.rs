//! Tenant application subscriptions through the SaaS provisioning service.
//!
//! Each definition names its own endpoint and credentials; the resource id is
//! the tenant id.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::{ResourceState, require, run};
use crate::btp::{SubscribeTenantInput, UnsubscribeTenantInput, UpdateSubscriptionInput};
use crate::config::{ReconcileSettings, ServiceEndpoint};
use crate::error::ProviderError;
use crate::reconcile::{
    Acceptance, JobStatusSource, MutationLabel, MutationSubmitter, Operation, ReconcileReport,
};

const SUBJECT: &str = "BTP Subscription";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Subscription {
    pub tenant_id: String,
    pub endpoint: ServiceEndpoint,
    #[serde(default)]
    pub skip_unchanged_dependencies: bool,
    #[serde(default)]
    pub skip_updating_dependencies: bool,
    #[serde(default)]
    pub update_application_url: bool,
    #[serde(default)]
    pub subscription_params: BTreeMap<String, String>,
}

pub fn validate(def: &Subscription) -> Result<(), ProviderError> {
    require("tenant_id", &def.tenant_id)?;
    require("endpoint.host", &def.endpoint.host)
}

fn state(def: &Subscription, report: ReconcileReport) -> ResourceState {
    ResourceState {
        id: def.tenant_id.clone(),
        report,
    }
}

pub async fn subscribe<C>(
    client: &C,
    def: &Subscription,
    settings: &ReconcileSettings,
) -> Result<ResourceState, ProviderError>
where
    C: MutationSubmitter<SubscribeTenantInput> + JobStatusSource,
{
    validate(def)?;
    let request = SubscribeTenantInput {
        tenant_id: def.tenant_id.clone(),
    };
    let label = MutationLabel::new(SUBJECT, Operation::Create);
    let report = run(client, Acceptance::ACCEPTED, label, &request, settings).await?;
    Ok(state(def, report))
}

pub async fn update<C>(
    client: &C,
    def: &Subscription,
    settings: &ReconcileSettings,
) -> Result<ResourceState, ProviderError>
where
    C: MutationSubmitter<UpdateSubscriptionInput> + JobStatusSource,
{
    validate(def)?;
    let request = UpdateSubscriptionInput {
        tenant_id: def.tenant_id.clone(),
        skip_unchanged_dependencies: def.skip_unchanged_dependencies,
        skip_updating_dependencies: def.skip_updating_dependencies,
        update_application_url: def.update_application_url,
        subscription_params: def.subscription_params.clone(),
    };
    let label = MutationLabel::new(SUBJECT, Operation::Update);
    let report = run(client, Acceptance::ACCEPTED, label, &request, settings).await?;
    Ok(state(def, report))
}

pub async fn unsubscribe<C>(
    client: &C,
    def: &Subscription,
    settings: &ReconcileSettings,
) -> Result<ResourceState, ProviderError>
where
    C: MutationSubmitter<UnsubscribeTenantInput> + JobStatusSource,
{
    validate(def)?;
    let request = UnsubscribeTenantInput {
        tenant_id: def.tenant_id.clone(),
    };
    let label = MutationLabel::new(SUBJECT, Operation::Delete);
    let report = run(client, Acceptance::ACCEPTED, label, &request, settings).await?;
    Ok(state(def, report))
}
