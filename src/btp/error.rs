//! Tipos de erro para o cliente das APIs REST do SAP BTP.
//!
//! Define [`BtpError`] com variantes para erros da API, falhas de
//! autenticação, respostas inválidas e erros de rede. Usa `thiserror` para
//! derivar `Display` e `Error` a partir dos atributos `#[error(...)]`.

use thiserror::Error;

/// Erros que podem ocorrer ao interagir com as APIs do BTP.
///
/// Um status HTTP inesperado numa submissão de mutação **não** é um
/// `BtpError`: ele volta como [`ImmediateResult`](crate::reconcile::ImmediateResult)
/// para que o reconciliador classifique a rejeição.
#[derive(Debug, Error)]
pub enum BtpError {
    /// Erro HTTP retornado por uma consulta (ex.: 404 job desconhecido, 503).
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// O endpoint de token recusou as credenciais ou respondeu sem token.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Corpo de resposta que não corresponde ao formato esperado.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Falha de rede subjacente (DNS, conexão recusada, timeout).
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display() {
        let err = BtpError::ApiError {
            status: 404,
            message: "job not found".into(),
        };
        assert_eq!(err.to_string(), "API error (status 404): job not found");
    }

    #[test]
    fn auth_error_display() {
        let err = BtpError::Auth("token endpoint returned 401".into());
        assert_eq!(
            err.to_string(),
            "authentication failed: token endpoint returned 401"
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BtpError>();
    }
}
