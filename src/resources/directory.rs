//! Directory entitlements and directory features.
//!
//! Both endpoints answer `200 OK`. Directory entitlements may still return a
//! `jobStatusId`; when they do, the job is waited for like any other.
//!
//! Fixed directory entitlements carry a quota. The dynamic kinds only switch
//! a plan on or off and leave the quota fields out of the request.

use serde::Deserialize;

use super::entitlements::EntitlementKind;
use super::{ResourceState, require, run};
use crate::btp::{
    DirectoryEntitlement, UpdateDirectoryEntitlementsInput, UpdateDirectoryFeaturesInput,
};
use crate::config::ReconcileSettings;
use crate::error::ProviderError;
use crate::reconcile::{Acceptance, JobStatusSource, MutationLabel, MutationSubmitter, Operation};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DirectoryEntitlements {
    pub directory_id: String,
    #[serde(default)]
    pub kind: EntitlementKind,
    pub entitlements: Vec<DirectoryEntitlementSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DirectoryEntitlementSpec {
    pub service_name: String,
    pub plan_name: String,
    /// Required, at least 1, for fixed entitlements. Ignored by dynamic kinds.
    #[serde(default)]
    pub amount: Option<u32>,
    /// Also assign the quota to sub-accounts already in the directory.
    #[serde(default)]
    pub distribute: bool,
    /// Quota given to each new sub-account.
    #[serde(default)]
    pub auto_distribute_amount: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DirectoryFeatures {
    pub directory_id: String,
    #[serde(default)]
    pub directory_admins: Vec<String>,
    #[serde(default)]
    pub directory_features: Vec<String>,
}

pub fn build_entitlements_request(
    def: &DirectoryEntitlements,
    operation: Operation,
) -> UpdateDirectoryEntitlementsInput {
    let dynamic = def.kind != EntitlementKind::Fixed;
    let entitlement_updates = def
        .entitlements
        .iter()
        .map(|spec| {
            let base = DirectoryEntitlement {
                service: spec.service_name.clone(),
                plan: spec.plan_name.clone(),
                amount: None,
                distribute: spec.distribute,
                auto_assign: true,
                auto_distribute_amount: None,
                enable: None,
            };
            match (dynamic, operation) {
                (false, Operation::Delete) => DirectoryEntitlement {
                    amount: Some(0),
                    distribute: false,
                    auto_distribute_amount: Some(0),
                    ..base
                },
                (false, Operation::Create | Operation::Update) => DirectoryEntitlement {
                    amount: spec.amount,
                    auto_distribute_amount: spec.auto_distribute_amount,
                    ..base
                },
                (true, Operation::Delete) => DirectoryEntitlement {
                    auto_assign: false,
                    enable: Some(false),
                    ..base
                },
                (true, Operation::Create | Operation::Update) => DirectoryEntitlement {
                    enable: Some(true),
                    ..base
                },
            }
        })
        .collect();

    UpdateDirectoryEntitlementsInput {
        directory_guid: def.directory_id.clone(),
        entitlement_updates,
    }
}

pub async fn apply_entitlements<C>(
    client: &C,
    def: &DirectoryEntitlements,
    operation: Operation,
    settings: &ReconcileSettings,
) -> Result<ResourceState, ProviderError>
where
    C: MutationSubmitter<UpdateDirectoryEntitlementsInput> + JobStatusSource,
{
    require("directory_id", &def.directory_id)?;
    if def.entitlements.is_empty() {
        return Err(ProviderError::Validation(
            "at least one directory entitlement is required".into(),
        ));
    }
    for spec in &def.entitlements {
        require("service_name", &spec.service_name)?;
        require("plan_name", &spec.plan_name)?;
        if def.kind == EntitlementKind::Fixed && spec.amount.unwrap_or(0) < 1 {
            return Err(ProviderError::Validation(format!(
                "amount must be at least 1 for {}/{}",
                spec.service_name, spec.plan_name
            )));
        }
    }

    let request = build_entitlements_request(def, operation);
    let report = run(
        client,
        Acceptance::OK,
        MutationLabel::new("BTP Directory Entitlements", operation),
        &request,
        settings,
    )
    .await?;

    Ok(ResourceState {
        id: def.directory_id.clone(),
        report,
    })
}

/// Deleting features means submitting the empty feature and admin sets.
pub fn build_features_request(
    def: &DirectoryFeatures,
    operation: Operation,
) -> UpdateDirectoryFeaturesInput {
    let (directory_admins, directory_features) = match operation {
        Operation::Delete => (Vec::new(), Vec::new()),
        Operation::Create | Operation::Update => {
            (def.directory_admins.clone(), def.directory_features.clone())
        }
    };
    UpdateDirectoryFeaturesInput {
        directory_guid: def.directory_id.clone(),
        directory_admins,
        directory_features,
    }
}

pub async fn apply_features<C>(
    client: &C,
    def: &DirectoryFeatures,
    operation: Operation,
    settings: &ReconcileSettings,
) -> Result<ResourceState, ProviderError>
where
    C: MutationSubmitter<UpdateDirectoryFeaturesInput> + JobStatusSource,
{
    require("directory_id", &def.directory_id)?;

    let request = build_features_request(def, operation);
    let report = run(
        client,
        Acceptance::OK,
        MutationLabel::new("BTP Directory Features", operation),
        &request,
        settings,
    )
    .await?;

    Ok(ResourceState {
        id: def.directory_id.clone(),
        report,
    })
}
