//! Sub-accounts in the accounts service.
//!
//! Sub-account mutations hand back no job. The sub-account's own `state`
//! (`CREATING`, `UPDATING`, `DELETING`, `OK`, `*_FAILED`) is polled instead:
//! [`SubAccountLifecycle`] presents it to the reconciler as a job status, with
//! the sub-account guid as the job handle.

use std::fmt;

use serde::Deserialize;

use super::{ResourceState, require, run_with_deadline};
use crate::btp::{
    BtpClient, BtpError, CreateSubAccountInput, DeleteSubAccountInput, KeyValue, SubAccountInfo,
    UpdateCustomProperty, UpdateSubAccountInput,
};
use crate::config::ReconcileSettings;
use crate::error::ProviderError;
use crate::reconcile::{
    Acceptance, ImmediateResult, JobHandle, JobState, JobStatusSource, MutationLabel,
    MutationSubmitter, Operation,
};

const SUBJECT: &str = "BTP Sub Account";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubAccount {
    pub global_account_id: String,
    pub region: String,
    pub display_name: String,
    pub subdomain: String,
    /// `USED_FOR_PRODUCTION`, `NOT_USED_FOR_PRODUCTION` or `UNSET`.
    #[serde(default = "default_used_for_production")]
    pub used_for_production: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub beta_enabled: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub custom_properties: Vec<CustomProperty>,
    #[serde(default)]
    pub sub_account_admins: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CustomProperty {
    pub key: String,
    #[serde(default)]
    pub value: String,
    /// Removes the key on update; ignored on create.
    #[serde(default)]
    pub delete: bool,
}

fn default_used_for_production() -> String {
    "UNSET".to_string()
}

/// Remote capability that reads a sub-account back.
#[allow(async_fn_in_trait)]
pub trait SubAccountReader {
    type Error: fmt::Display;

    /// `Ok(None)` when the accounts service does not know the guid.
    async fn read_sub_account(&self, guid: &str) -> Result<Option<SubAccountInfo>, Self::Error>;
}

impl SubAccountReader for BtpClient {
    type Error = BtpError;

    async fn read_sub_account(&self, guid: &str) -> Result<Option<SubAccountInfo>, BtpError> {
        self.get_sub_account(guid).await
    }
}

/// Maps one read of the sub-account during `operation` onto a job state.
pub fn lifecycle_state(operation: Operation, account: Option<&SubAccountInfo>) -> JobState {
    let Some(account) = account else {
        return match operation {
            Operation::Delete => JobState::completed(),
            // Reads can lag behind the create for a moment.
            Operation::Create => JobState::in_progress("sub-account not visible yet"),
            Operation::Update => JobState::failed("sub-account no longer exists"),
        };
    };

    if account.state.ends_with("_FAILED") {
        return if account.state_message.is_empty() {
            JobState::failed(account.state.clone())
        } else {
            JobState::failed(format!("{}: {}", account.state, account.state_message))
        };
    }

    match (operation, account.state.as_str()) {
        (Operation::Create | Operation::Update, "OK") => JobState::completed(),
        (_, state) => JobState::in_progress(state),
    }
}

/// Presents a sub-account's `state` as the job status of one operation.
///
/// Submits go straight to the wrapped client.
pub struct SubAccountLifecycle<'a, C> {
    client: &'a C,
    operation: Operation,
}

impl<'a, C> SubAccountLifecycle<'a, C> {
    pub fn new(client: &'a C, operation: Operation) -> Self {
        Self { client, operation }
    }
}

impl<C, R> MutationSubmitter<R> for SubAccountLifecycle<'_, C>
where
    C: MutationSubmitter<R>,
{
    type Error = <C as MutationSubmitter<R>>::Error;

    async fn submit(&self, request: &R) -> Result<ImmediateResult, Self::Error> {
        self.client.submit(request).await
    }
}

impl<C> JobStatusSource for SubAccountLifecycle<'_, C>
where
    C: SubAccountReader,
{
    type Error = <C as SubAccountReader>::Error;

    async fn job_status(&self, job: &JobHandle) -> Result<JobState, Self::Error> {
        let account = self.client.read_sub_account(job.as_str()).await?;
        Ok(lifecycle_state(self.operation, account.as_ref()))
    }
}

pub fn validate(def: &SubAccount) -> Result<(), ProviderError> {
    require("global_account_id", &def.global_account_id)?;
    require("region", &def.region)?;
    require("display_name", &def.display_name)?;
    require("subdomain", &def.subdomain)?;
    for property in &def.custom_properties {
        require("custom_properties.key", &property.key)?;
    }
    Ok(())
}

pub fn build_create_request(def: &SubAccount) -> CreateSubAccountInput {
    CreateSubAccountInput {
        parent_guid: def.global_account_id.clone(),
        region: def.region.clone(),
        display_name: def.display_name.clone(),
        subdomain: def.subdomain.clone(),
        used_for_production: def.used_for_production.clone(),
        origin: def.origin.clone(),
        beta_enabled: def.beta_enabled,
        description: def.description.clone(),
        custom_properties: def
            .custom_properties
            .iter()
            .map(|p| KeyValue {
                key: p.key.clone(),
                value: p.value.clone(),
            })
            .collect(),
        subaccount_admins: def.sub_account_admins.clone(),
    }
}

pub fn build_update_request(def: &SubAccount, guid: &str) -> UpdateSubAccountInput {
    UpdateSubAccountInput {
        subaccount_guid: guid.to_string(),
        display_name: def.display_name.clone(),
        description: def.description.clone(),
        used_for_production: def.used_for_production.clone(),
        beta_enabled: def.beta_enabled,
        custom_properties: def
            .custom_properties
            .iter()
            .map(|p| UpdateCustomProperty {
                key: p.key.clone(),
                value: p.value.clone(),
                delete: p.delete,
            })
            .collect(),
    }
}

/// Creates, updates or deletes a sub-account and waits for its state to settle.
///
/// Create and update wait up to `job_timeout`; delete waits up to
/// `sub_account_delete_timeout`. The resource id is the sub-account guid.
pub async fn apply<C>(
    client: &C,
    def: &SubAccount,
    operation: Operation,
    id: Option<&str>,
    settings: &ReconcileSettings,
) -> Result<ResourceState, ProviderError>
where
    C: MutationSubmitter<CreateSubAccountInput>
        + MutationSubmitter<UpdateSubAccountInput>
        + MutationSubmitter<DeleteSubAccountInput>
        + SubAccountReader,
{
    validate(def)?;

    let lifecycle = SubAccountLifecycle::new(client, operation);
    let label = MutationLabel::new(SUBJECT, operation);

    if operation == Operation::Create {
        let request = build_create_request(def);
        let report = run_with_deadline(
            &lifecycle,
            Acceptance::CREATED,
            label,
            &request,
            settings,
            settings.job_timeout(),
        )
        .await?;
        let Some(guid) = report.job.as_ref().map(JobHandle::to_string) else {
            return Err(BtpError::InvalidResponse(
                "sub-account create answered without a guid".into(),
            )
            .into());
        };
        return Ok(ResourceState { id: guid, report });
    }

    let guid = match id {
        Some(id) if !id.trim().is_empty() => id.to_string(),
        _ => {
            return Err(ProviderError::Validation(format!(
                "id is required to {operation} a sub-account"
            )));
        }
    };

    let report = if operation == Operation::Update {
        let request = build_update_request(def, &guid);
        run_with_deadline(
            &lifecycle,
            Acceptance::OK,
            label,
            &request,
            settings,
            settings.job_timeout(),
        )
        .await?
    } else {
        let request = DeleteSubAccountInput {
            subaccount_guid: guid.clone(),
        };
        run_with_deadline(
            &lifecycle,
            Acceptance::OK,
            label,
            &request,
            settings,
            settings.sub_account_delete_timeout(),
        )
        .await?
    };

    Ok(ResourceState { id: guid, report })
}
