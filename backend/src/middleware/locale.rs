//! Locale negotiation middleware
//!
//! Resolves the request locale from the path prefix, locale cookie and
//! Accept-Language header, redirects or rewrites the URL when the locale
//! prefix is missing or redundant, and persists the choice in a cookie on
//! the response path.
//!
//! This layer must wrap the whole router (not be added with
//! `Router::layer`) so that URI rewrites take part in routing.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{
        HeaderMap, HeaderValue, Uri,
        header::{ACCEPT_LANGUAGE, CONTENT_LANGUAGE, COOKIE, LINK, SET_COOKIE},
        request::Parts,
    },
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::AppState;
use crate::utils::i18n::{LocaleAction, NegotiationInput, ResolvedLocale, negotiate, scope_locale};
use crate::utils::ApiError;

/// Locale resolved for the current request, available to handlers as an
/// extractor.
#[derive(Debug, Clone)]
pub struct RequestLocale(pub ResolvedLocale);

impl RequestLocale {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestLocale
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestLocale>()
            .cloned()
            .ok_or_else(|| ApiError::internal_error("Request locale missing: locale middleware not installed"))
    }
}

pub async fn locale_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let settings = &state.locale_settings;
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let negotiation = {
        let input = NegotiationInput {
            path: req.uri().path(),
            query: req.uri().query(),
            cookie: cookie_value(req.headers(), &settings.cookie.name),
            accept_language: req.headers().get(ACCEPT_LANGUAGE).and_then(|v| v.to_str().ok()),
        };
        negotiate(&input, settings)
    };

    tracing::debug!(
        "Resolved locale {} (source: {}) for {} {}",
        negotiation.locale,
        negotiation.locale.source(),
        method,
        path
    );

    let mut response = match &negotiation.action {
        LocaleAction::Redirect(location) => {
            tracing::debug!("Redirecting {} {} -> {}", method, path, location);
            Redirect::temporary(location).into_response()
        },
        action => {
            if let LocaleAction::Rewrite(target) = action {
                match target.parse::<Uri>() {
                    Ok(uri) => {
                        tracing::debug!("Rewriting {} {} -> {}", method, path, target);
                        *req.uri_mut() = uri;
                    },
                    Err(e) => tracing::warn!("Invalid rewrite target '{}': {}", target, e),
                }
            }

            req.extensions_mut().insert(RequestLocale(negotiation.locale.clone()));
            scope_locale(negotiation.locale.to_string(), next.run(req)).await
        },
    };

    let headers = response.headers_mut();

    if let Some(cookie) = &negotiation.cookie {
        match HeaderValue::from_str(&cookie.to_header_value()) {
            Ok(value) => {
                headers.append(SET_COOKIE, value);
            },
            Err(e) => tracing::warn!("Failed to encode locale cookie: {}", e),
        }
    }

    if !headers.contains_key(CONTENT_LANGUAGE)
        && let Ok(value) = HeaderValue::from_str(negotiation.locale.as_str())
    {
        headers.insert(CONTENT_LANGUAGE, value);
    }

    if let Some(link) = negotiation.link_header()
        && let Ok(value) = HeaderValue::from_str(&link)
    {
        headers.append(LINK, value);
    }

    response
}

/// Value of the cookie named `name`, searching every Cookie header
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().trim_matches('"'))
}
