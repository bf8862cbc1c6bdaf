//! Locale negotiation gateway
//!
//! Resolves one supported locale per request from the URL prefix, the
//! locale cookie and the Accept-Language header, keeps URLs and the locale
//! cookie consistent with that choice, and serves translated message
//! bundles for it.

rust_i18n::i18n!("locales", fallback = "en");

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod utils;

#[cfg(test)]
mod tests;

use std::convert::Infallible;
use std::sync::Arc;

use axum::{Router, extract::Request, response::Response, routing::get};
use tower::{Layer, Service};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::utils::LocaleSettings;
use crate::utils::catalog;

pub struct AppState {
    pub config: Config,
    pub locale_settings: LocaleSettings,
}

impl AppState {
    /// Build the shared state. Fails when the locale configuration is
    /// invalid, so the process refuses to start.
    pub fn new(config: Config) -> Result<Self, anyhow::Error> {
        let locale_settings = config.locale_settings()?;

        for code in locale_settings.supported.iter() {
            if !catalog::has_catalog(code) {
                tracing::warn!("No message catalog for locale {}, falling back to en", code);
            }
        }
        rust_i18n::set_locale(locale_settings.supported.default_locale());

        Ok(Self { config, locale_settings })
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health_check,
        handlers::locale::list_locales,
        handlers::locale::get_messages,
        handlers::page::locale_root,
        handlers::page::locale_page,
    ),
    components(schemas(
        handlers::health::HealthResponse,
        handlers::locale::LocaleInfo,
        handlers::locale::LocalesResponse,
        handlers::locale::MessagesResponse,
        handlers::page::PageResponse,
        utils::i18n::LocaleSource,
        utils::ApiErrorResponse,
    )),
    tags(
        (name = "System", description = "Service health"),
        (name = "I18n", description = "Locale negotiation and message catalogs"),
        (name = "Pages", description = "Localized pages"),
    )
)]
pub struct ApiDoc;

/// Application routes, without locale negotiation
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/api/locales", get(handlers::locale::list_locales))
        .route("/api/messages", get(handlers::locale::get_messages))
        .route("/:locale", get(handlers::page::locale_root))
        .route("/:locale/*path", get(handlers::page::locale_page))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Full application: the router wrapped in the locale middleware
pub fn app(
    state: Arc<AppState>,
) -> impl Service<Request, Response = Response, Error = Infallible, Future: Send> + Clone + Send + 'static
{
    axum::middleware::from_fn_with_state(state.clone(), middleware::locale_middleware)
        .layer(router(state))
}
