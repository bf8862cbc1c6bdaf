// Common test utilities and helpers

use std::sync::Arc;

use axum::{
    body::{Body, to_bytes},
    http::{HeaderMap, Request, header},
    response::Response,
};
use tower::ServiceExt;

use crate::AppState;
use crate::config::Config;
use crate::utils::i18n::LocalePrefix;

/// Default configuration: en/zh, default en, no log file
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.logging.file = None;
    config
}

pub fn test_state(config: Config) -> Arc<AppState> {
    Arc::new(AppState::new(config).expect("Failed to build app state"))
}

pub fn as_needed_config() -> Config {
    let mut config = test_config();
    config.i18n.locale_prefix = LocalePrefix::AsNeeded;
    config
}

/// Build a GET request with optional cookie and Accept-Language headers
pub fn get(uri: &str, cookie: Option<&str>, accept_language: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    if let Some(accept_language) = accept_language {
        builder = builder.header(header::ACCEPT_LANGUAGE, accept_language);
    }
    builder.body(Body::empty()).expect("Failed to build request")
}

/// Send one request through the full application
pub async fn send(config: Config, request: Request<Body>) -> Response {
    crate::app(test_state(config))
        .oneshot(request)
        .await
        .expect("Service is infallible")
}

pub async fn json_body(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

pub fn header_str<'a>(headers: &'a HeaderMap, name: header::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
