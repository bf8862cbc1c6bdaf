use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use rust_i18n::t;
use serde::Serialize;
use utoipa::ToSchema;

use crate::AppState;
use crate::middleware::RequestLocale;
use crate::utils::{ApiError, ApiResult};

#[derive(Debug, Serialize, ToSchema)]
pub struct PageResponse {
    pub locale: String,
    pub path: String,
    pub title: String,
    pub description: String,
}

/// Localized landing page
#[utoipa::path(
    get,
    path = "/{locale}",
    params(("locale" = String, Path, description = "Locale code")),
    responses(
        (status = 200, description = "Localized page", body = PageResponse),
        (status = 404, description = "Locale not supported"),
    ),
    tag = "Pages"
)]
pub async fn locale_root(
    State(state): State<Arc<AppState>>,
    request_locale: RequestLocale,
    Path(locale): Path<String>,
) -> ApiResult<Json<PageResponse>> {
    render_page(&state, &request_locale, &locale, "")
}

/// Localized page at an arbitrary path
#[utoipa::path(
    get,
    path = "/{locale}/{path}",
    params(
        ("locale" = String, Path, description = "Locale code"),
        ("path" = String, Path, description = "Page path"),
    ),
    responses(
        (status = 200, description = "Localized page", body = PageResponse),
        (status = 404, description = "Locale not supported"),
    ),
    tag = "Pages"
)]
pub async fn locale_page(
    State(state): State<Arc<AppState>>,
    request_locale: RequestLocale,
    Path((locale, path)): Path<(String, String)>,
) -> ApiResult<Json<PageResponse>> {
    render_page(&state, &request_locale, &locale, &path)
}

fn render_page(
    state: &AppState,
    request_locale: &RequestLocale,
    locale: &str,
    path: &str,
) -> ApiResult<Json<PageResponse>> {
    // Behind the locale middleware an unsupported first segment never gets
    // here: it is redirected or rewritten under the resolved locale. This
    // guards direct use of the router.
    if !state.locale_settings.supported.contains(locale) {
        return Err(ApiError::locale_not_found(locale));
    }
    if locale != request_locale.as_str() {
        tracing::warn!(
            "Path locale {} differs from resolved locale {}",
            locale,
            request_locale.as_str()
        );
    }

    let path = format!("/{}", path.trim_start_matches('/'));
    Ok(Json(PageResponse {
        locale: locale.to_string(),
        title: t!("page.title", locale = locale).to_string(),
        description: t!("page.description", locale = locale, path = &path).to_string(),
        path,
    }))
}
