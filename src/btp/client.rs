use std::time::Duration;

use reqwest::header::LOCATION;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use tracing::debug;

use super::auth::TokenSource;
use super::error::BtpError;
use super::types::{
    AcceptedBody, CreateSubAccountInput, DeleteSubAccountInput, SubAccountInfo,
    SubscribeTenantInput, UnsubscribeTenantInput, UpdateDirectoryEntitlementsInput,
    UpdateDirectoryFeaturesInput, UpdateSubAccountInput, UpdateSubAccountServicePlanInput,
    UpdateSubscriptionInput,
};
use crate::config::ServiceEndpoint;
use crate::reconcile::{
    ImmediateResult, JobHandle, JobState, JobStatusSource, MutationSubmitter, RemoteError,
};

/// Which job-status endpoint a service exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobsApi {
    /// `GET /jobs-management/v1/jobs/{id}/status` (entitlements, accounts).
    JobsManagement,
    /// `GET /api/v2.0/jobs/{id}` (SaaS provisioning).
    SaasManager,
}

impl JobsApi {
    fn status_path(self, job: &JobHandle) -> String {
        match self {
            JobsApi::JobsManagement => format!("/jobs-management/v1/jobs/{job}/status"),
            JobsApi::SaasManager => format!("/api/v2.0/jobs/{job}"),
        }
    }
}

/// HTTP client bound to one explicit service endpoint.
pub struct BtpClient {
    http: Client,
    base_url: String,
    auth: TokenSource,
    jobs: JobsApi,
}

impl BtpClient {
    pub fn entitlements(endpoint: &ServiceEndpoint) -> Result<Self, BtpError> {
        Self::new(endpoint, JobsApi::JobsManagement)
    }

    pub fn accounts(endpoint: &ServiceEndpoint) -> Result<Self, BtpError> {
        Self::new(endpoint, JobsApi::JobsManagement)
    }

    pub fn saas_manager(endpoint: &ServiceEndpoint) -> Result<Self, BtpError> {
        Self::new(endpoint, JobsApi::SaasManager)
    }

    pub fn new(endpoint: &ServiceEndpoint, jobs: JobsApi) -> Result<Self, BtpError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(endpoint.oauth2.timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: endpoint.host.trim_end_matches('/').to_string(),
            auth: TokenSource::new(endpoint.oauth2.clone()),
            jobs,
        })
    }

    async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, BtpError> {
        let url = format!("{}{path}", self.base_url);
        debug!(method = %method, url = %url, "BTP request");
        let mut builder = self.http.request(method, url);
        if let Some(token) = self.auth.bearer(&self.http).await? {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    async fn submit_mutation(&self, builder: RequestBuilder) -> Result<ImmediateResult, BtpError> {
        let response = builder.send().await?;
        immediate_result(response).await
    }

    /// Reads one sub-account; `None` once the accounts service answers 404.
    pub async fn get_sub_account(&self, guid: &str) -> Result<Option<SubAccountInfo>, BtpError> {
        let response = self
            .request(Method::GET, &sub_account_path(guid))
            .await?
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(api_error(status, &text));
        }

        serde_json::from_str::<SubAccountInfo>(&text)
            .map(Some)
            .map_err(|e| BtpError::InvalidResponse(format!("sub-account body: {e}")))
    }
}

fn api_error(status: StatusCode, text: &str) -> BtpError {
    BtpError::ApiError {
        status: status.as_u16(),
        message: remote_error(text)
            .map(|e| e.message)
            .unwrap_or_else(|| "unknown error".to_string()),
    }
}

/// Non-2xx answers become rejected results, not errors.
async fn immediate_result(response: Response) -> Result<ImmediateResult, BtpError> {
    let status = response.status();
    let location_job = response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .and_then(job_from_location);
    let text = response.text().await?;

    if !status.is_success() {
        return Ok(ImmediateResult::rejected(status.as_u16(), remote_error(&text)));
    }

    let body_job = if text.trim().is_empty() {
        None
    } else {
        serde_json::from_str::<AcceptedBody>(&text)
            .ok()
            .and_then(|body| body.job_status_id)
    };

    let job = location_job
        .or(body_job)
        .filter(|id| !id.trim().is_empty())
        .map(JobHandle::new);
    Ok(ImmediateResult {
        status_code: status.as_u16(),
        job,
        error: None,
    })
}

/// Sub-account mutations have no job: the sub-account guid stands in for it
/// and its `state` is polled instead. Update and delete fall back to the
/// guid of the request when the body does not repeat it.
async fn sub_account_result(
    response: Response,
    request_guid: Option<&str>,
) -> Result<ImmediateResult, BtpError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Ok(ImmediateResult::rejected(status.as_u16(), remote_error(&text)));
    }

    let body_guid = serde_json::from_str::<SubAccountInfo>(&text)
        .ok()
        .map(|account| account.guid);
    let job = body_guid
        .filter(|guid| !guid.trim().is_empty())
        .or_else(|| request_guid.map(str::to_string))
        .map(JobHandle::new);
    Ok(ImmediateResult {
        status_code: status.as_u16(),
        job,
        error: None,
    })
}

/// Last path segment of a `Location` header, e.g. `/api/v2.0/jobs/abc` → `abc`.
fn job_from_location(location: &str) -> Option<String> {
    let path = location.split(['?', '#']).next().unwrap_or("");
    path.rsplit('/')
        .find(|segment| !segment.is_empty())
        .map(str::to_string)
}

/// Extracts the remote error detail from a failure body.
///
/// Accepts `{"error":{"code":..,"message":..}}`, `{"error":"..."}`,
/// `{"message":"..."}` or plain text.
fn remote_error(text: &str) -> Option<RemoteError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) else {
        return Some(RemoteError {
            code: None,
            message: trimmed.to_string(),
        });
    };

    let code_of = |v: &serde_json::Value| match v {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    };

    match value.get("error") {
        Some(serde_json::Value::Object(error)) => Some(RemoteError {
            code: error.get("code").and_then(code_of),
            message: error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or_default()
                .to_string(),
        }),
        Some(serde_json::Value::String(message)) => Some(RemoteError {
            code: None,
            message: message.clone(),
        }),
        _ => Some(RemoteError {
            code: value.get("code").and_then(code_of),
            message: value
                .get("message")
                .and_then(|m| m.as_str())
                .map_or_else(|| trimmed.to_string(), str::to_string),
        }),
    }
}

impl MutationSubmitter<UpdateSubAccountServicePlanInput> for BtpClient {
    type Error = BtpError;

    async fn submit(
        &self,
        request: &UpdateSubAccountServicePlanInput,
    ) -> Result<ImmediateResult, BtpError> {
        let builder = self
            .request(Method::PUT, "/entitlements/v1/subaccountServicePlans")
            .await?;
        self.submit_mutation(builder.json(request)).await
    }
}

impl MutationSubmitter<UpdateDirectoryEntitlementsInput> for BtpClient {
    type Error = BtpError;

    async fn submit(
        &self,
        request: &UpdateDirectoryEntitlementsInput,
    ) -> Result<ImmediateResult, BtpError> {
        let path = format!("/entitlements/v1/directories/{}", request.directory_guid);
        let builder = self.request(Method::PUT, &path).await?;
        self.submit_mutation(builder.json(request)).await
    }
}

impl MutationSubmitter<UpdateDirectoryFeaturesInput> for BtpClient {
    type Error = BtpError;

    async fn submit(
        &self,
        request: &UpdateDirectoryFeaturesInput,
    ) -> Result<ImmediateResult, BtpError> {
        let path = format!(
            "/accounts/v1/directories/{}/changeDirectoryFeatures",
            request.directory_guid
        );
        let builder = self.request(Method::PUT, &path).await?;
        self.submit_mutation(builder.json(request)).await
    }
}

fn subscriptions_path(tenant_id: &str) -> String {
    format!("/saas-manager/v1/application/tenants/{tenant_id}/subscriptions")
}

impl MutationSubmitter<SubscribeTenantInput> for BtpClient {
    type Error = BtpError;

    async fn submit(&self, request: &SubscribeTenantInput) -> Result<ImmediateResult, BtpError> {
        let builder = self
            .request(Method::POST, &subscriptions_path(&request.tenant_id))
            .await?;
        self.submit_mutation(builder).await
    }
}

impl MutationSubmitter<UpdateSubscriptionInput> for BtpClient {
    type Error = BtpError;

    async fn submit(&self, request: &UpdateSubscriptionInput) -> Result<ImmediateResult, BtpError> {
        let builder = self
            .request(Method::PATCH, &subscriptions_path(&request.tenant_id))
            .await?;
        self.submit_mutation(builder.json(request)).await
    }
}

impl MutationSubmitter<UnsubscribeTenantInput> for BtpClient {
    type Error = BtpError;

    async fn submit(&self, request: &UnsubscribeTenantInput) -> Result<ImmediateResult, BtpError> {
        let builder = self
            .request(Method::DELETE, &subscriptions_path(&request.tenant_id))
            .await?;
        self.submit_mutation(builder).await
    }
}

fn sub_account_path(guid: &str) -> String {
    format!("/accounts/v1/subaccounts/{guid}")
}

impl MutationSubmitter<CreateSubAccountInput> for BtpClient {
    type Error = BtpError;

    async fn submit(&self, request: &CreateSubAccountInput) -> Result<ImmediateResult, BtpError> {
        let response = self
            .request(Method::POST, "/accounts/v1/subaccounts")
            .await?
            .json(request)
            .send()
            .await?;
        sub_account_result(response, None).await
    }
}

impl MutationSubmitter<UpdateSubAccountInput> for BtpClient {
    type Error = BtpError;

    async fn submit(&self, request: &UpdateSubAccountInput) -> Result<ImmediateResult, BtpError> {
        let response = self
            .request(Method::PATCH, &sub_account_path(&request.subaccount_guid))
            .await?
            .json(request)
            .send()
            .await?;
        sub_account_result(response, Some(&request.subaccount_guid)).await
    }
}

impl MutationSubmitter<DeleteSubAccountInput> for BtpClient {
    type Error = BtpError;

    async fn submit(&self, request: &DeleteSubAccountInput) -> Result<ImmediateResult, BtpError> {
        let response = self
            .request(Method::DELETE, &sub_account_path(&request.subaccount_guid))
            .await?
            .send()
            .await?;
        sub_account_result(response, Some(&request.subaccount_guid)).await
    }
}

impl JobStatusSource for BtpClient {
    type Error = BtpError;

    async fn job_status(&self, job: &JobHandle) -> Result<JobState, BtpError> {
        let response = self
            .request(Method::GET, &self.jobs.status_path(job))
            .await?
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(api_error(status, &text));
        }

        serde_json::from_str::<JobState>(&text)
            .map_err(|e| BtpError::InvalidResponse(format!("job status body: {e}")))
    }
}
