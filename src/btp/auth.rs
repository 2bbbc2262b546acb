//! OAuth2 access-token acquisition for the BTP APIs.
//!
//! The token is fetched on first use and kept for the lifetime of the client.
//! There is no refresh: clients are built per resource operation.

use reqwest::Client;
use tokio::sync::OnceCell;
use tracing::debug;

use super::error::BtpError;
use super::types::TokenResponse;
use crate::config::OAuth2Config;

pub struct TokenSource {
    oauth2: OAuth2Config,
    token: OnceCell<String>,
}

impl TokenSource {
    pub fn new(oauth2: OAuth2Config) -> Self {
        Self {
            oauth2,
            token: OnceCell::new(),
        }
    }

    /// Bearer token for the next request, or `None` when no token URL is set.
    pub async fn bearer(&self, http: &Client) -> Result<Option<&str>, BtpError> {
        if self.oauth2.token_url.trim().is_empty() {
            return Ok(None);
        }
        let token = self.token.get_or_try_init(|| self.fetch(http)).await?;
        Ok(Some(token.as_str()))
    }

    async fn fetch(&self, http: &Client) -> Result<String, BtpError> {
        debug!(
            token_url = %self.oauth2.token_url,
            grant_type = %self.oauth2.grant_type,
            "Requesting OAuth2 token"
        );

        let mut form = vec![("grant_type", self.oauth2.grant_type.as_str())];
        if self.oauth2.grant_type == "password" {
            form.push(("username", self.oauth2.username.as_str()));
            form.push(("password", self.oauth2.password.as_str()));
        }

        let response = http
            .post(&self.oauth2.token_url)
            .basic_auth(&self.oauth2.client_id, Some(&self.oauth2.client_secret))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BtpError::Auth(format!(
                "token endpoint returned status {}",
                status.as_u16()
            )));
        }

        let body = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| BtpError::Auth(format!("unreadable token response: {e}")))?;
        if body.access_token.is_empty() {
            return Err(BtpError::Auth("token endpoint returned an empty token".into()));
        }
        Ok(body.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn oauth2(token_url: String, grant_type: &str) -> OAuth2Config {
        OAuth2Config {
            grant_type: grant_type.into(),
            client_id: "sb-client".into(),
            client_secret: "secret".into(),
            token_url,
            username: "user@example.com".into(),
            password: "pw".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn no_token_url_means_no_auth() {
        let source = TokenSource::new(OAuth2Config::default());
        let token = source.bearer(&Client::new()).await.unwrap();
        assert!(token.is_none());
    }

    #[tokio::test]
    async fn client_credentials_token_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(header_exists("authorization"))
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "access_token": "tok-1",
                    "expires_in": 3600
                })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let http = Client::new();
        let source = TokenSource::new(oauth2(
            format!("{}/oauth/token", server.uri()),
            "client_credentials",
        ));
        assert_eq!(source.bearer(&http).await.unwrap(), Some("tok-1"));
        assert_eq!(source.bearer(&http).await.unwrap(), Some("tok-1"));
    }

    #[tokio::test]
    async fn password_grant_sends_user_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("grant_type=password"))
            .and(body_string_contains("username=user%40example.com"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"access_token": "tok-2"})),
            )
            .mount(&server)
            .await;

        let source = TokenSource::new(oauth2(format!("{}/oauth/token", server.uri()), "password"));
        assert_eq!(source.bearer(&Client::new()).await.unwrap(), Some("tok-2"));
    }

    #[tokio::test]
    async fn rejected_credentials_are_auth_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let source = TokenSource::new(oauth2(
            format!("{}/oauth/token", server.uri()),
            "client_credentials",
        ));
        let err = source.bearer(&Client::new()).await.unwrap_err();
        assert!(matches!(err, BtpError::Auth(ref m) if m.contains("401")));
    }
}
