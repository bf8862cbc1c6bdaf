use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{Json, extract::State};
use serde::Serialize;
use utoipa::ToSchema;

use crate::AppState;
use crate::middleware::RequestLocale;
use crate::utils::ApiResult;
use crate::utils::catalog;
use crate::utils::i18n::LocaleSource;

#[derive(Debug, Serialize, ToSchema)]
pub struct LocaleInfo {
    pub code: String,
    /// Name of the locale in its own language
    pub name: String,
    pub has_catalog: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LocalesResponse {
    pub locales: Vec<LocaleInfo>,
    pub default_locale: String,
    pub current: String,
    pub source: LocaleSource,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessagesResponse {
    pub locale: String,
    pub messages: BTreeMap<String, String>,
}

/// List supported locales and the locale resolved for this request
#[utoipa::path(
    get,
    path = "/api/locales",
    responses(
        (status = 200, description = "Supported locales", body = LocalesResponse)
    ),
    tag = "I18n"
)]
pub async fn list_locales(
    State(state): State<Arc<AppState>>,
    locale: RequestLocale,
) -> ApiResult<Json<LocalesResponse>> {
    let supported = &state.locale_settings.supported;
    let locales = supported
        .iter()
        .map(|code| LocaleInfo {
            code: code.to_string(),
            name: catalog::message(code, "locale.name"),
            has_catalog: catalog::has_catalog(code),
        })
        .collect();

    Ok(Json(LocalesResponse {
        locales,
        default_locale: supported.default_locale().to_string(),
        current: locale.as_str().to_string(),
        source: locale.0.source(),
    }))
}

/// Translated message bundle for the request locale
#[utoipa::path(
    get,
    path = "/api/messages",
    responses(
        (status = 200, description = "Message bundle", body = MessagesResponse)
    ),
    tag = "I18n"
)]
pub async fn get_messages(locale: RequestLocale) -> ApiResult<Json<MessagesResponse>> {
    tracing::debug!("Loading message bundle for locale {}", locale.as_str());
    Ok(Json(MessagesResponse {
        locale: locale.as_str().to_string(),
        messages: catalog::bundle(locale.as_str()),
    }))
}
