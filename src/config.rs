//! Configuração do provider carregada a partir de `btp.toml`.
//!
//! A struct [`ProviderConfig`] contém credenciais OAuth2, os hosts das APIs
//! BTP e os parâmetros de reconciliação. Valores ausentes no arquivo usam
//! defaults sensíveis. As variáveis `BTP_CLIENT_ID` e `BTP_CLIENT_SECRET`
//! têm precedência sobre o arquivo.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::ProviderError;
use crate::reconcile::PollConfig;

/// Configuração de nível superior carregada de `btp.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub oauth2: OAuth2Config,

    #[serde(default)]
    pub endpoints: Endpoints,

    #[serde(default)]
    pub reconcile: ReconcileSettings,
}

/// Credenciais OAuth2 usadas para obter o token de acesso.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct OAuth2Config {
    /// `client_credentials` ou `password`.
    #[serde(default = "default_grant_type")]
    pub grant_type: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    /// Vazio desativa a autenticação (útil contra servidores locais).
    #[serde(default)]
    pub token_url: String,
    /// Usado apenas quando `grant_type = "password"`.
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Timeout do cliente HTTP, em segundos.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

// Nunca imprime segredos.
impl fmt::Debug for OAuth2Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Config")
            .field("grant_type", &self.grant_type)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("token_url", &self.token_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl Default for OAuth2Config {
    fn default() -> Self {
        Self {
            grant_type: default_grant_type(),
            client_id: String::new(),
            client_secret: String::new(),
            token_url: String::new(),
            username: String::new(),
            password: String::new(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl OAuth2Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Hosts das APIs REST do BTP.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Endpoints {
    #[serde(default)]
    pub accounts: String,
    #[serde(default)]
    pub entitlements: String,
}

/// Um host de serviço com suas próprias credenciais.
///
/// Cada cliente é construído a partir de um `ServiceEndpoint` explícito;
/// não existe registro global de endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceEndpoint {
    pub host: String,
    #[serde(default)]
    pub oauth2: OAuth2Config,
}

/// Parâmetros do laço de reconciliação.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconcileSettings {
    /// Tempo máximo de espera por um job assíncrono.
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,

    /// Atraso base entre consultas de status, em milissegundos.
    #[serde(default = "default_poll_base_delay_ms")]
    pub poll_base_delay_ms: u64,

    /// Atraso máximo entre consultas de status, em milissegundos.
    #[serde(default = "default_poll_max_delay_ms")]
    pub poll_max_delay_ms: u64,

    /// Tempo máximo de espera pela remoção de uma sub account.
    #[serde(default = "default_sub_account_delete_timeout_secs")]
    pub sub_account_delete_timeout_secs: u64,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            job_timeout_secs: default_job_timeout_secs(),
            poll_base_delay_ms: default_poll_base_delay_ms(),
            poll_max_delay_ms: default_poll_max_delay_ms(),
            sub_account_delete_timeout_secs: default_sub_account_delete_timeout_secs(),
        }
    }
}

impl ReconcileSettings {
    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    pub fn sub_account_delete_timeout(&self) -> Duration {
        Duration::from_secs(self.sub_account_delete_timeout_secs)
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            base_delay_ms: self.poll_base_delay_ms,
            max_delay_ms: self.poll_max_delay_ms,
        }
    }

    /// Rejeita prazos e atrasos nulos e um atraso máximo menor que o base.
    pub fn validate(&self) -> Result<(), ProviderError> {
        let positive = [
            ("job_timeout_secs", self.job_timeout_secs),
            ("poll_base_delay_ms", self.poll_base_delay_ms),
            ("poll_max_delay_ms", self.poll_max_delay_ms),
            ("sub_account_delete_timeout_secs", self.sub_account_delete_timeout_secs),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ProviderError::Config(format!(
                "reconcile.{name} must be greater than zero"
            )));
        }
        if self.poll_max_delay_ms < self.poll_base_delay_ms {
            return Err(ProviderError::Config(format!(
                "reconcile.poll_max_delay_ms ({}) is below poll_base_delay_ms ({})",
                self.poll_max_delay_ms, self.poll_base_delay_ms
            )));
        }
        Ok(())
    }
}

fn default_grant_type() -> String {
    "client_credentials".to_string()
}

fn default_timeout_seconds() -> u64 {
    60
}

// Dois minutos, como os jobs de entitlement e subscription.
fn default_job_timeout_secs() -> u64 {
    120
}

fn default_poll_base_delay_ms() -> u64 {
    500
}

fn default_poll_max_delay_ms() -> u64 {
    5000
}

fn default_sub_account_delete_timeout_secs() -> u64 {
    300
}

impl ProviderConfig {
    /// Carrega `btp.toml` do diretório atual, ou os defaults se não existir.
    pub fn load() -> Result<Self> {
        let path = Path::new("btp.toml");
        let config = if path.exists() {
            Self::parse_file(path)?
        } else {
            Self::default()
        };
        config.reconcile.validate()?;
        Ok(config.with_env_overrides())
    }

    /// Carrega um arquivo explícito; o arquivo precisa existir.
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = Self::parse_file(path)?;
        config.reconcile.validate()?;
        Ok(config.with_env_overrides())
    }

    fn parse_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = toml::from_str::<ProviderConfig>(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    // Variáveis de ambiente têm precedência sobre o arquivo para as credenciais.
    fn with_env_overrides(mut self) -> Self {
        if let Ok(id) = std::env::var("BTP_CLIENT_ID")
            && !id.is_empty()
        {
            self.oauth2.client_id = id;
        }
        if let Ok(secret) = std::env::var("BTP_CLIENT_SECRET")
            && !secret.is_empty()
        {
            self.oauth2.client_secret = secret;
        }
        self
    }

    pub fn entitlements_endpoint(&self) -> Result<ServiceEndpoint, ProviderError> {
        self.endpoint("entitlements", &self.endpoints.entitlements)
    }

    pub fn accounts_endpoint(&self) -> Result<ServiceEndpoint, ProviderError> {
        self.endpoint("accounts", &self.endpoints.accounts)
    }

    fn endpoint(&self, name: &str, host: &str) -> Result<ServiceEndpoint, ProviderError> {
        if host.trim().is_empty() {
            return Err(ProviderError::Config(format!(
                "endpoints.{name} is not configured"
            )));
        }
        Ok(ServiceEndpoint {
            host: host.to_string(),
            oauth2: self.oauth2.clone(),
        })
    }
}
