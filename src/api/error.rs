use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use super::json_response;
use crate::core::LedgerError;
use crate::store::StoreError;

pub(crate) const MISSING_FIELDS: &str = "Campos obrigatórios faltando";
pub(crate) const NON_FINITE: &str = "Valores numéricos devem ser finitos";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub(crate) fn missing_fields() -> Self {
        ApiError::BadRequest(MISSING_FIELDS.to_string())
    }

    pub(crate) fn non_finite() -> Self {
        ApiError::BadRequest(NON_FINITE.to_string())
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::ExpenseNotFound(_) => ApiError::NotFound(err.to_string()),
            LedgerError::AmountOutOfRange(_) => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Corpo JSON inválido: {}", rejection.body_text()))
    }
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    mensagem: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "data store failure");
        } else {
            tracing::warn!(status = status.as_u16(), reason = %self, "request rejected");
        }
        json_response(
            status,
            ErrorBody {
                status: "erro",
                mensagem: self.to_string(),
            },
        )
    }
}
