use axum::http::{StatusCode, header};
use tower::ServiceExt;

use crate::middleware::RequestLocale;
use crate::tests::common::{
    as_needed_config,
    get,
    header_str,
    json_body,
    send,
    test_config,
    test_state,
};
use crate::utils::i18n::{LocaleHint, resolve};

#[tokio::test]
async fn test_missing_prefix_redirects_with_cookie() {
    let response = send(test_config(), get("/docs?tab=api", None, Some("zh-CN,zh;q=0.9"))).await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let headers = response.headers();
    assert_eq!(header_str(headers, header::LOCATION), Some("/zh/docs?tab=api"));
    assert_eq!(
        header_str(headers, header::SET_COOKIE),
        Some("LOCALE=zh; Path=/; Max-Age=31536000; SameSite=Lax")
    );
}

#[tokio::test]
async fn test_root_redirects_to_default_locale() {
    let response = send(test_config(), get("/", None, None)).await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(header_str(response.headers(), header::LOCATION), Some("/en"));
}

#[tokio::test]
async fn test_path_wins_over_cookie_and_header() {
    let response = send(test_config(), get("/zh/docs", Some("LOCALE=en"), Some("en"))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(header_str(headers, header::CONTENT_LANGUAGE), Some("zh"));
    assert_eq!(
        header_str(headers, header::SET_COOKIE),
        Some("LOCALE=zh; Path=/; Max-Age=31536000; SameSite=Lax")
    );
    assert!(header_str(headers, header::LINK).is_some_and(|link| link.contains("hreflang=\"x-default\"")));

    let body = json_body(response).await;
    assert_eq!(body["locale"], "zh");
    assert_eq!(body["path"], "/docs");
    assert_eq!(body["title"], "欢迎");
}

#[tokio::test]
async fn test_cookie_wins_over_header() {
    let response = send(test_config(), get("/docs", Some("theme=dark; LOCALE=zh"), Some("en"))).await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(header_str(response.headers(), header::LOCATION), Some("/zh/docs"));
    assert!(response.headers().get(header::SET_COOKIE).is_none(), "cookie already holds zh");
}

#[tokio::test]
async fn test_unsupported_header_falls_back_to_default() {
    let response = send(test_config(), get("/docs", None, Some("fr,de;q=0.9"))).await;

    assert_eq!(header_str(response.headers(), header::LOCATION), Some("/en/docs"));
}

#[tokio::test]
async fn test_unchanged_cookie_is_not_rewritten() {
    let response = send(test_config(), get("/en", Some("LOCALE=en"), None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_secure_cookie_in_production() {
    let mut config = test_config();
    config.server.environment = "production".to_string();

    let response = send(config, get("/zh", None, None)).await;

    let cookie = header_str(response.headers(), header::SET_COOKIE).unwrap_or_default();
    assert!(cookie.ends_with("; Secure"), "unexpected cookie: {}", cookie);
}

#[tokio::test]
async fn test_as_needed_rewrites_default_locale() {
    let response = send(as_needed_config(), get("/docs", None, None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["locale"], "en");
    assert_eq!(body["path"], "/docs");
}

#[tokio::test]
async fn test_as_needed_redirects_redundant_default_prefix() {
    let response = send(as_needed_config(), get("/en/docs", Some("LOCALE=zh"), None)).await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let headers = response.headers();
    assert_eq!(header_str(headers, header::LOCATION), Some("/docs"));
    assert!(header_str(headers, header::SET_COOKIE).is_some_and(|c| c.starts_with("LOCALE=en;")));
}

#[tokio::test]
async fn test_as_needed_redirects_non_default_locale() {
    let response = send(as_needed_config(), get("/docs", None, Some("zh"))).await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(header_str(response.headers(), header::LOCATION), Some("/zh/docs"));
}

#[tokio::test]
async fn test_excluded_paths_are_not_redirected() {
    let response = send(test_config(), get("/api/messages", None, Some("zh"))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert!(response.headers().get(header::LINK).is_none());

    let body = json_body(response).await;
    assert_eq!(body["locale"], "zh");
    assert_eq!(body["messages"]["nav.docs"], "文档");
}

#[tokio::test]
async fn test_list_locales_reports_current_locale() {
    let response = send(test_config(), get("/api/locales", Some("LOCALE=zh"), None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["default_locale"], "en");
    assert_eq!(body["current"], "zh");
    assert_eq!(body["source"], "cookie");
    assert_eq!(body["locales"][0]["code"], "en");
    assert_eq!(body["locales"][0]["name"], "English");
    assert_eq!(body["locales"][1]["name"], "中文");
    assert_eq!(body["locales"][1]["has_catalog"], true);
}

#[tokio::test]
async fn test_health_check() {
    let response = send(test_config(), get("/health", None, None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn test_detection_disabled_uses_default() {
    let mut config = test_config();
    config.i18n.locale_detection = false;

    let response = send(config, get("/docs", Some("LOCALE=zh"), Some("zh"))).await;

    assert_eq!(header_str(response.headers(), header::LOCATION), Some("/en/docs"));
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_unsupported_locale_segment_is_localized_not_found() {
    let state = test_state(test_config());
    let supported = &state.locale_settings.supported;
    let locale = resolve(&LocaleHint { path: Some("/zh"), ..Default::default() }, supported);

    let mut request = get("/fr/docs", None, None);
    request.extensions_mut().insert(RequestLocale(locale.clone()));

    let response = crate::utils::scope_locale(locale.to_string(), async {
        crate::router(state.clone()).oneshot(request).await.expect("Service is infallible")
    })
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["code"], 3001);
    assert_eq!(body["message"], "不支持的语言：fr");
}

#[tokio::test]
async fn test_missing_middleware_is_internal_error() {
    let state = test_state(test_config());
    let response = crate::router(state)
        .oneshot(get("/api/messages", None, None))
        .await
        .expect("Service is infallible");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_as_needed_redirect_stays_on_site() {
    let response = send(as_needed_config(), get("/en//x", None, None)).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(header_str(response.headers(), header::LOCATION), Some("/x"));

    let response = send(as_needed_config(), get("/en//evil.example/phish", None, None)).await;
    assert_eq!(header_str(response.headers(), header::LOCATION), Some("/evil.example/phish"));
}

#[tokio::test]
async fn test_unsupported_locale_segment_is_nested_under_resolved_locale() {
    let response = send(test_config(), get("/fr/docs", None, Some("zh"))).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(header_str(response.headers(), header::LOCATION), Some("/zh/fr/docs"));

    let response = send(as_needed_config(), get("/fr/docs", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["locale"], "en");
    assert_eq!(body["path"], "/fr/docs");
}
