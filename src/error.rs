use thiserror::Error;

use crate::btp::BtpError;
use crate::reconcile::FailureKind;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid resource definition: {0}")]
    Validation(String),

    /// A reconciliation that did not succeed; displays its diagnostic verbatim.
    #[error("{message}")]
    Reconcile { kind: FailureKind, message: String },

    #[error("BTP API error: {0}")]
    Btp(#[from] BtpError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ProviderError {
    /// `true` when the remote operation may still complete on its own.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ProviderError::Reconcile {
                kind: FailureKind::TimedOut { .. },
                ..
            }
        )
    }
}
