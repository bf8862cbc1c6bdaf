use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_i18n::t;
use serde::Serialize;
use thiserror::Error;

use super::i18n::current_locale;

/// API Error with rich context and automatic error trait implementations
///
/// Messages are localized when the error is turned into a response, using
/// the locale of the request being served.
#[derive(Error, Debug)]
pub enum ApiError {
    // Resource errors 3xxx
    #[error("Locale {locale} not supported")]
    LocaleNotFound { locale: String },

    // System errors 5xxx
    #[error("Internal error: {0}")]
    InternalError(String),

    // Generic wrapper for other errors - auto-convert from anyhow::Error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// Helper to create locale not found error
    pub fn locale_not_found(locale: impl Into<String>) -> Self {
        Self::LocaleNotFound { locale: locale.into() }
    }

    /// Helper to create internal error
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }

    pub fn error_code(&self) -> i32 {
        match self {
            Self::LocaleNotFound { .. } => 3001,
            Self::InternalError(_) => 5001,
            Self::Other(_) => 5001,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ApiErrorResponse {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Get localized error message based on the current request locale
    pub fn localized_message(&self) -> String {
        let locale = current_locale().unwrap_or_else(|| (*rust_i18n::locale()).to_string());
        match self {
            Self::LocaleNotFound { locale: requested } => {
                t!("locale.not_found", locale = &locale, requested = requested).to_string()
            },
            Self::InternalError(msg) => {
                t!("internal.error", locale = &locale, message = msg).to_string()
            },
            Self::Other(err) => {
                t!("internal.error", locale = &locale, message = err.to_string()).to_string()
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.error_code();
        let message = self.localized_message();

        let status = match code {
            3000..=3999 => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let response = ApiErrorResponse { code, message, details: None };

        (status, Json(response)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
