pub mod auth;
pub mod client;
pub mod error;
pub mod types;

pub use client::{BtpClient, JobsApi};
pub use error::BtpError;
pub use types::{
    AssignmentInfo, CreateSubAccountInput, DeleteSubAccountInput, DirectoryEntitlement,
    EntitlementResource, KeyValue, SubAccountInfo, SubAccountServicePlan, SubscribeTenantInput,
    UnsubscribeTenantInput, UpdateCustomProperty, UpdateDirectoryEntitlementsInput,
    UpdateDirectoryFeaturesInput, UpdateSubAccountInput, UpdateSubAccountServicePlanInput,
    UpdateSubscriptionInput,
};
