//! Sub-account entitlements.
//!
//! Every kind goes through the same endpoint. A fixed entitlement assigns a
//! numeric quota; the dynamic kinds (SaaS, elastic, unlimited) only enable
//! or disable a plan whose name is dictated by the kind.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ResourceState, require, run};
use crate::btp::{
    AssignmentInfo, EntitlementResource, SubAccountServicePlan, UpdateSubAccountServicePlanInput,
};
use crate::config::ReconcileSettings;
use crate::error::ProviderError;
use crate::reconcile::{Acceptance, JobStatusSource, MutationLabel, MutationSubmitter, Operation};

const SUBJECT: &str = "BTP Sub Account Entitlements";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitlementKind {
    #[default]
    Fixed,
    Saas,
    Elastic,
    Unlimited,
}

impl EntitlementKind {
    /// Plan name forced by a dynamic kind; `None` for fixed quotas.
    pub fn plan_name(self) -> Option<&'static str> {
        match self {
            EntitlementKind::Fixed => None,
            EntitlementKind::Saas => Some("saas"),
            EntitlementKind::Elastic => Some("elastic"),
            EntitlementKind::Unlimited => Some("unlimited"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubaccountEntitlements {
    #[serde(default)]
    pub kind: EntitlementKind,
    pub entitlements: Vec<ServiceEntitlement>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceEntitlement {
    pub service_name: String,
    /// Ignored for dynamic kinds.
    #[serde(default)]
    pub service_plan_name: String,
    #[serde(default)]
    pub assignments: Vec<SubaccountAssignment>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubaccountAssignment {
    pub subaccount_id: String,
    #[serde(default)]
    pub amount: Option<u32>,
    #[serde(default)]
    pub resources: Vec<ResourceSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResourceSpec {
    pub name: String,
    pub provider: String,
    pub technical_name: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub data: Option<String>,
}

impl From<&ResourceSpec> for EntitlementResource {
    fn from(spec: &ResourceSpec) -> Self {
        EntitlementResource {
            resource_name: spec.name.clone(),
            resource_provider: spec.provider.clone(),
            resource_technical_name: spec.technical_name.clone(),
            resource_type: spec.resource_type.clone(),
            resource_data: spec.data.clone(),
        }
    }
}

pub fn validate(def: &SubaccountEntitlements) -> Result<(), ProviderError> {
    if def.entitlements.is_empty() {
        return Err(ProviderError::Validation(
            "at least one entitlement is required".into(),
        ));
    }
    for service in &def.entitlements {
        require("service_name", &service.service_name)?;
        if def.kind == EntitlementKind::Fixed {
            require("service_plan_name", &service.service_plan_name)?;
        }
        if service.assignments.is_empty() {
            return Err(ProviderError::Validation(format!(
                "{} needs at least one sub-account assignment",
                service.service_name
            )));
        }
        for assignment in &service.assignments {
            require("subaccount_id", &assignment.subaccount_id)?;
            if def.kind == EntitlementKind::Fixed && assignment.amount.unwrap_or(0) < 1 {
                return Err(ProviderError::Validation(format!(
                    "amount for {} in sub-account {} must be at least 1",
                    service.service_name, assignment.subaccount_id
                )));
            }
        }
    }
    Ok(())
}

/// Builds the request for `operation`. Deletion is the zeroed or disabled
/// assignment, not a separate verb.
pub fn build_request(
    def: &SubaccountEntitlements,
    operation: Operation,
) -> UpdateSubAccountServicePlanInput {
    let deleting = operation == Operation::Delete;

    let subaccount_service_plans = def
        .entitlements
        .iter()
        .map(|service| SubAccountServicePlan {
            service_name: service.service_name.clone(),
            service_plan_name: def
                .kind
                .plan_name()
                .map_or_else(|| service.service_plan_name.clone(), str::to_string),
            assignment_info: service
                .assignments
                .iter()
                .map(|assignment| {
                    let (amount, enable) = match def.kind {
                        EntitlementKind::Fixed if deleting => (Some(0.0), None),
                        EntitlementKind::Fixed => (assignment.amount.map(f64::from), None),
                        _ => (None, Some(!deleting)),
                    };
                    AssignmentInfo {
                        subaccount_guid: assignment.subaccount_id.clone(),
                        amount,
                        enable,
                        resources: assignment.resources.iter().map(Into::into).collect(),
                    }
                })
                .collect(),
        })
        .collect();

    UpdateSubAccountServicePlanInput {
        subaccount_service_plans,
    }
}

pub async fn apply<C>(
    client: &C,
    def: &SubaccountEntitlements,
    operation: Operation,
    id: Option<&str>,
    settings: &ReconcileSettings,
) -> Result<ResourceState, ProviderError>
where
    C: MutationSubmitter<UpdateSubAccountServicePlanInput> + JobStatusSource,
{
    validate(def)?;

    let id = match (operation, id) {
        (Operation::Create, _) => Uuid::new_v4().to_string(),
        (_, Some(id)) if !id.trim().is_empty() => id.to_string(),
        _ => {
            return Err(ProviderError::Validation(format!(
                "id is required to {operation} sub-account entitlements"
            )));
        }
    };

    let request = build_request(def, operation);
    let report = run(
        client,
        Acceptance::ACCEPTED,
        MutationLabel::new(SUBJECT, operation),
        &request,
        settings,
    )
    .await?;

    Ok(ResourceState { id, report })
}
