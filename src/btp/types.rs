//! Request and response bodies for the BTP entitlements, accounts and SaaS
//! provisioning APIs.
//!
//! Field names follow the remote JSON (camelCase, `GUID` suffixes). Path
//! parameters live on the input structs too but are never serialized.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Body of `PUT /entitlements/v1/subaccountServicePlans`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubAccountServicePlanInput {
    pub subaccount_service_plans: Vec<SubAccountServicePlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubAccountServicePlan {
    pub service_name: String,
    pub service_plan_name: String,
    pub assignment_info: Vec<AssignmentInfo>,
}

/// Quota or enablement of one plan in one sub-account.
///
/// Numeric plans carry `amount`; enablement-only plans carry `enable`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentInfo {
    #[serde(rename = "subaccountGUID")]
    pub subaccount_guid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<EntitlementResource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementResource {
    pub resource_name: String,
    pub resource_provider: String,
    pub resource_technical_name: String,
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_data: Option<String>,
}

/// Body of `PUT /entitlements/v1/directories/{directoryGUID}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDirectoryEntitlementsInput {
    #[serde(skip)]
    pub directory_guid: String,
    pub entitlement_updates: Vec<DirectoryEntitlement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntitlement {
    pub service: String,
    pub plan: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<u32>,
    pub distribute: bool,
    pub auto_assign: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_distribute_amount: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable: Option<bool>,
}

/// Body of `PUT /accounts/v1/directories/{directoryGUID}/changeDirectoryFeatures`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDirectoryFeaturesInput {
    #[serde(skip)]
    pub directory_guid: String,
    pub directory_admins: Vec<String>,
    pub directory_features: Vec<String>,
}

/// `POST /saas-manager/v1/application/tenants/{tenantId}/subscriptions`, no body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeTenantInput {
    pub tenant_id: String,
}

/// `DELETE /saas-manager/v1/application/tenants/{tenantId}/subscriptions`, no body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsubscribeTenantInput {
    pub tenant_id: String,
}

/// Body of `PATCH /saas-manager/v1/application/tenants/{tenantId}/subscriptions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubscriptionInput {
    #[serde(skip)]
    pub tenant_id: String,
    pub skip_unchanged_dependencies: bool,
    pub skip_updating_dependencies: bool,
    #[serde(rename = "updateApplicationURL")]
    pub update_application_url: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub subscription_params: BTreeMap<String, String>,
}

/// Body of `POST /accounts/v1/subaccounts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubAccountInput {
    #[serde(rename = "parentGUID")]
    pub parent_guid: String,
    pub region: String,
    pub display_name: String,
    pub subdomain: String,
    pub used_for_production: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub origin: String,
    pub beta_enabled: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_properties: Vec<KeyValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subaccount_admins: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

/// Body of `PATCH /accounts/v1/subaccounts/{subaccountGUID}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubAccountInput {
    #[serde(skip)]
    pub subaccount_guid: String,
    pub display_name: String,
    pub description: String,
    pub used_for_production: String,
    pub beta_enabled: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_properties: Vec<UpdateCustomProperty>,
}

/// A custom property change; `delete` removes the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCustomProperty {
    pub key: String,
    pub value: String,
    pub delete: bool,
}

/// `DELETE /accounts/v1/subaccounts/{subaccountGUID}`, no body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteSubAccountInput {
    pub subaccount_guid: String,
}

/// A sub-account as read back from `GET /accounts/v1/subaccounts/{subaccountGUID}`.
///
/// `state` is `CREATING`, `UPDATING`, `DELETING`, `OK` or one of the
/// `*_FAILED` states.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubAccountInfo {
    #[serde(default)]
    pub guid: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub subdomain: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub state_message: String,
}

/// Optional body of an accepted mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AcceptedBody {
    #[serde(default)]
    pub job_status_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_account_plan_uses_remote_field_names() {
        let input = UpdateSubAccountServicePlanInput {
            subaccount_service_plans: vec![SubAccountServicePlan {
                service_name: "hana-cloud".into(),
                service_plan_name: "hana".into(),
                assignment_info: vec![AssignmentInfo {
                    subaccount_guid: "sa-1".into(),
                    amount: Some(2.0),
                    enable: None,
                    resources: Vec::new(),
                }],
            }],
        };
        let json = serde_json::to_value(&input).unwrap();
        let info = &json["subaccountServicePlans"][0]["assignmentInfo"][0];
        assert_eq!(info["subaccountGUID"], "sa-1");
        assert_eq!(info["amount"], 2.0);
        assert!(info.get("enable").is_none());
        assert!(info.get("resources").is_none());
        assert_eq!(json["subaccountServicePlans"][0]["servicePlanName"], "hana");
    }

    #[test]
    fn path_parameters_are_not_serialized() {
        let input = UpdateDirectoryFeaturesInput {
            directory_guid: "dir-1".into(),
            directory_admins: vec!["admin@example.com".into()],
            directory_features: vec!["ENTITLEMENTS".into()],
        };
        let json = serde_json::to_value(&input).unwrap();
        assert!(json.get("directoryGuid").is_none());
        assert_eq!(json["directoryFeatures"][0], "ENTITLEMENTS");
    }

    #[test]
    fn subscription_update_url_flag_name() {
        let input = UpdateSubscriptionInput {
            tenant_id: "t-1".into(),
            skip_unchanged_dependencies: true,
            skip_updating_dependencies: false,
            update_application_url: true,
            subscription_params: BTreeMap::new(),
        };
        let json = serde_json::to_string(&input).unwrap();
        assert!(json.contains(r#""updateApplicationURL":true"#));
        assert!(!json.contains("subscriptionParams"));
        assert!(!json.contains("t-1"));
    }

    #[test]
    fn create_sub_account_body() {
        let input = CreateSubAccountInput {
            parent_guid: "ga-1".into(),
            region: "eu10".into(),
            display_name: "dev".into(),
            subdomain: "acme-dev".into(),
            used_for_production: "UNSET".into(),
            origin: String::new(),
            beta_enabled: false,
            description: String::new(),
            custom_properties: vec![KeyValue {
                key: "team".into(),
                value: "core".into(),
            }],
            subaccount_admins: Vec::new(),
        };
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["parentGUID"], "ga-1");
        assert_eq!(json["usedForProduction"], "UNSET");
        assert_eq!(json["customProperties"][0]["key"], "team");
        assert!(json.get("origin").is_none());
        assert!(json.get("subaccountAdmins").is_none());
    }

    #[test]
    fn sub_account_info_tolerates_partial_body() {
        let info: SubAccountInfo =
            serde_json::from_str(r#"{"guid":"sa-1","state":"CREATING","region":"eu10"}"#)
                .unwrap();
        assert_eq!(info.guid, "sa-1");
        assert_eq!(info.state, "CREATING");
        assert!(info.state_message.is_empty());
    }

    #[test]
    fn accepted_body_tolerates_missing_job() {
        let body: AcceptedBody = serde_json::from_str("{}").unwrap();
        assert_eq!(body.job_status_id, None);

        let body: AcceptedBody = serde_json::from_str(r#"{"jobStatusId":"job-9"}"#).unwrap();
        assert_eq!(body.job_status_id.as_deref(), Some("job-9"));
    }
}
