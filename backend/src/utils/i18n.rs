//! Locale resolution and request negotiation
//!
//! This module turns the locale hints carried by a request (path prefix,
//! persisted cookie, Accept-Language header) into exactly one supported
//! locale, and decides what the middleware has to do with the URL and the
//! locale cookie. Everything here is pure: no I/O, no shared state.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cookie name used when the configuration does not name one
pub const DEFAULT_LOCALE_COOKIE: &str = "LOCALE";

/// One year, in seconds
pub const DEFAULT_COOKIE_MAX_AGE: u64 = 60 * 60 * 24 * 365;

static LOCALE_CODE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]{2,3}(-[A-Za-z0-9]{2,8})*$").unwrap());

tokio::task_local! {
    static REQUEST_LOCALE: String;
}

/// Run `fut` with `locale` as the locale of the current request task
pub async fn scope_locale<F: std::future::Future>(locale: String, fut: F) -> F::Output {
    REQUEST_LOCALE.scope(locale, fut).await
}

/// Locale of the request being served by the current task, if any
pub fn current_locale() -> Option<String> {
    REQUEST_LOCALE.try_with(Clone::clone).ok()
}

/// Startup-time locale configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocaleConfigError {
    #[error("Supported locale list cannot be empty")]
    Empty,

    #[error("Default locale '{0}' is not in the supported locale list")]
    DefaultNotSupported(String),

    #[error("Duplicate locale '{0}' in supported locale list")]
    Duplicate(String),

    #[error("Invalid locale code '{0}'")]
    InvalidCode(String),
}

/// Ordered set of supported locale codes with a designated default
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedLocales {
    locales: Vec<String>,
    default_index: usize,
}

impl SupportedLocales {
    /// Build the supported locale set, rejecting any configuration that
    /// could make resolution return something outside the set.
    pub fn new<I, S>(locales: I, default_locale: &str) -> Result<Self, LocaleConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut codes: Vec<String> = Vec::new();
        for code in locales {
            let code = code.into().trim().to_string();
            if !LOCALE_CODE_REGEX.is_match(&code) {
                return Err(LocaleConfigError::InvalidCode(code));
            }
            if codes.contains(&code) {
                return Err(LocaleConfigError::Duplicate(code));
            }
            codes.push(code);
        }

        if codes.is_empty() {
            return Err(LocaleConfigError::Empty);
        }

        let default_locale = default_locale.trim();
        let default_index = codes
            .iter()
            .position(|code| code == default_locale)
            .ok_or_else(|| LocaleConfigError::DefaultNotSupported(default_locale.to_string()))?;

        Ok(Self { locales: codes, default_index })
    }

    pub fn default_locale(&self) -> &str {
        &self.locales[self.default_index]
    }

    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    /// Exact, case-sensitive lookup returning the canonical code
    pub fn get(&self, code: &str) -> Option<&str> {
        self.locales.iter().find(|l| l.as_str() == code).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.locales.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.locales
    }

    /// Match a language tag from a header against the supported set.
    /// An exact (case-insensitive) match wins over a primary-subtag match,
    /// so "zh-CN" selects "zh" only when "zh-CN" itself is not supported.
    fn match_language_tag(&self, tag: &str) -> Option<&str> {
        if let Some(exact) = self.locales.iter().find(|l| l.eq_ignore_ascii_case(tag)) {
            return Some(exact);
        }
        let primary = tag.split('-').next()?;
        self.locales
            .iter()
            .find(|l| l.eq_ignore_ascii_case(primary))
            .map(String::as_str)
    }
}

/// Where the resolved locale came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LocaleSource {
    Path,
    Cookie,
    Header,
    Default,
}

impl fmt::Display for LocaleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Path => "path",
            Self::Cookie => "cookie",
            Self::Header => "header",
            Self::Default => "default",
        };
        f.write_str(name)
    }
}

/// The single locale chosen for a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLocale {
    code: String,
    source: LocaleSource,
}

impl ResolvedLocale {
    fn new(code: &str, source: LocaleSource) -> Self {
        Self { code: code.to_string(), source }
    }

    pub fn as_str(&self) -> &str {
        &self.code
    }

    pub fn source(&self) -> LocaleSource {
        self.source
    }
}

impl fmt::Display for ResolvedLocale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

/// Locale hints read from one request
#[derive(Debug, Clone, Copy, Default)]
pub struct LocaleHint<'a> {
    pub path: Option<&'a str>,
    pub cookie: Option<&'a str>,
    pub accept_language: Option<&'a str>,
}

/// Resolve the request locale. First match wins: path prefix, cookie,
/// Accept-Language preference order, default locale.
pub fn resolve(hints: &LocaleHint<'_>, supported: &SupportedLocales) -> ResolvedLocale {
    if let Some(code) = hints.path.and_then(|path| locale_from_path(path, supported)) {
        return ResolvedLocale::new(code, LocaleSource::Path);
    }

    if let Some(code) = hints.cookie.and_then(|value| locale_from_cookie(value, supported)) {
        return ResolvedLocale::new(code, LocaleSource::Cookie);
    }

    if let Some(header) = hints.accept_language {
        let matched = parse_accept_language(header)
            .iter()
            .find_map(|pref| supported.match_language_tag(&pref.tag));
        if let Some(code) = matched {
            return ResolvedLocale::new(code, LocaleSource::Header);
        }
    }

    ResolvedLocale::new(supported.default_locale(), LocaleSource::Default)
}

/// Supported locale named by the first path segment, if any
pub fn locale_from_path<'s>(path: &str, supported: &'s SupportedLocales) -> Option<&'s str> {
    let segment = path.trim_start_matches('/').split('/').next()?;
    supported.get(segment)
}

fn locale_from_cookie<'s>(value: &str, supported: &'s SupportedLocales) -> Option<&'s str> {
    let decoded = urlencoding::decode(value).ok()?;
    supported.get(decoded.trim())
}

/// One entry of an Accept-Language header
#[derive(Debug, Clone, PartialEq)]
pub struct LanguagePreference {
    pub tag: String,
    pub quality: f32,
}

/// Parse an Accept-Language value into preferences ordered by descending
/// quality; ties keep header order. Wildcards, `q=0` entries and malformed
/// entries are dropped.
pub fn parse_accept_language(value: &str) -> Vec<LanguagePreference> {
    let mut preferences: Vec<LanguagePreference> =
        value.split(',').filter_map(parse_language_preference).collect();
    preferences.sort_by(|a, b| b.quality.total_cmp(&a.quality));
    preferences
}

fn parse_language_preference(entry: &str) -> Option<LanguagePreference> {
    let mut parts = entry.split(';');
    let tag = parts.next()?.trim().replace('_', "-");
    if !is_language_range(&tag) {
        return None;
    }

    let mut quality = 1.0_f32;
    for param in parts {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("q") {
            quality = value
                .trim()
                .parse::<f32>()
                .ok()
                .filter(|q| (0.0..=1.0).contains(q))?;
        }
    }

    (quality > 0.0).then_some(LanguagePreference { tag, quality })
}

fn is_language_range(tag: &str) -> bool {
    !tag.is_empty()
        && tag
            .split('-')
            .all(|part| !part.is_empty() && part.len() <= 8 && part.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// How locale prefixes appear in URLs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocalePrefix {
    /// Every localized URL carries a locale prefix
    #[default]
    Always,
    /// The default locale is served without a prefix
    AsNeeded,
}

impl FromStr for LocalePrefix {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "as-needed" | "as_needed" => Ok(Self::AsNeeded),
            other => Err(format!("unsupported locale prefix mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    #[default]
    Lax,
    Strict,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Lax => "Lax",
            SameSite::Strict => "Strict",
            SameSite::None => "None",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSettings {
    pub name: String,
    pub max_age: u64,
    pub same_site: SameSite,
    pub secure: bool,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_LOCALE_COOKIE.to_string(),
            max_age: DEFAULT_COOKIE_MAX_AGE,
            same_site: SameSite::Lax,
            secure: false,
        }
    }
}

/// Validated locale routing settings, built once at startup
#[derive(Debug, Clone)]
pub struct LocaleSettings {
    pub supported: SupportedLocales,
    pub prefix: LocalePrefix,
    /// When false, cookie and header hints are ignored and no cookie is written
    pub detection: bool,
    pub alternate_links: bool,
    pub exclude_paths: Vec<String>,
    pub cookie: CookieSettings,
}

impl LocaleSettings {
    pub fn new(supported: SupportedLocales) -> Self {
        Self {
            supported,
            prefix: LocalePrefix::default(),
            detection: true,
            alternate_links: true,
            exclude_paths: Vec::new(),
            cookie: CookieSettings::default(),
        }
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude_paths.iter().any(|prefix| {
            let prefix = prefix.trim_end_matches('/');
            path == prefix
                || path
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

/// Request data the negotiation looks at
#[derive(Debug, Clone, Copy)]
pub struct NegotiationInput<'a> {
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub cookie: Option<&'a str>,
    pub accept_language: Option<&'a str>,
}

/// What the middleware must do with the request URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocaleAction {
    Continue,
    /// Answer with a temporary redirect to this location
    Redirect(String),
    /// Route the request internally as if it had this path and query
    Rewrite(String),
}

/// Locale cookie to write on the response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleCookie {
    pub name: String,
    pub value: String,
    pub max_age: u64,
    pub same_site: SameSite,
    pub secure: bool,
}

impl LocaleCookie {
    pub fn to_header_value(&self) -> String {
        let mut value = format!(
            "{}={}; Path=/; Max-Age={}; SameSite={}",
            self.name,
            urlencoding::encode(&self.value),
            self.max_age,
            self.same_site.as_str()
        );
        if self.secure {
            value.push_str("; Secure");
        }
        value
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlternateLink {
    pub hreflang: String,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Negotiation {
    pub locale: ResolvedLocale,
    pub action: LocaleAction,
    pub cookie: Option<LocaleCookie>,
    pub alternates: Vec<AlternateLink>,
}

impl Negotiation {
    /// Render the alternates as a `Link` header value
    pub fn link_header(&self) -> Option<String> {
        if self.alternates.is_empty() {
            return None;
        }
        let links: Vec<String> = self
            .alternates
            .iter()
            .map(|alt| format!("<{}>; rel=\"alternate\"; hreflang=\"{}\"", alt.href, alt.hreflang))
            .collect();
        Some(links.join(", "))
    }
}

/// Resolve the locale for a request and decide the redirect, rewrite and
/// cookie handling that goes with it.
pub fn negotiate(input: &NegotiationInput<'_>, settings: &LocaleSettings) -> Negotiation {
    let supported = &settings.supported;
    let excluded = settings.is_excluded(input.path);

    let hints = LocaleHint {
        path: (!excluded).then_some(input.path),
        cookie: input.cookie.filter(|_| settings.detection),
        accept_language: input.accept_language.filter(|_| settings.detection),
    };
    let locale = resolve(&hints, supported);

    if excluded {
        return Negotiation { locale, action: LocaleAction::Continue, cookie: None, alternates: Vec::new() };
    }

    let path_locale = locale_from_path(input.path, supported);
    let unprefixed = match path_locale {
        Some(code) => strip_locale_prefix(input.path, code),
        None => normalize_path(input.path),
    };
    let default_locale = supported.default_locale();

    let action = match (settings.prefix, path_locale) {
        (LocalePrefix::Always, Some(_)) => LocaleAction::Continue,
        (LocalePrefix::Always, None) => {
            LocaleAction::Redirect(with_query(&with_prefix(locale.as_str(), &unprefixed), input.query))
        },
        (LocalePrefix::AsNeeded, Some(code)) if code == default_locale => {
            LocaleAction::Redirect(with_query(&unprefixed, input.query))
        },
        (LocalePrefix::AsNeeded, Some(_)) => LocaleAction::Continue,
        (LocalePrefix::AsNeeded, None) if locale.as_str() == default_locale => {
            LocaleAction::Rewrite(with_query(&with_prefix(default_locale, &unprefixed), input.query))
        },
        (LocalePrefix::AsNeeded, None) => {
            LocaleAction::Redirect(with_query(&with_prefix(locale.as_str(), &unprefixed), input.query))
        },
    };

    let persisted = input
        .cookie
        .and_then(|value| urlencoding::decode(value).ok())
        .map(|value| value.trim().to_string());
    let cookie = (settings.detection && persisted.as_deref() != Some(locale.as_str())).then(|| {
        LocaleCookie {
            name: settings.cookie.name.clone(),
            value: locale.as_str().to_string(),
            max_age: settings.cookie.max_age,
            same_site: settings.cookie.same_site,
            secure: settings.cookie.secure,
        }
    });

    let alternates = if settings.alternate_links {
        alternate_links(&unprefixed, settings)
    } else {
        Vec::new()
    };

    Negotiation { locale, action, cookie, alternates }
}

fn alternate_links(unprefixed: &str, settings: &LocaleSettings) -> Vec<AlternateLink> {
    let supported = &settings.supported;
    let mut links: Vec<AlternateLink> = supported
        .iter()
        .map(|code| {
            let href = match settings.prefix {
                LocalePrefix::AsNeeded if code == supported.default_locale() => unprefixed.to_string(),
                _ => with_prefix(code, unprefixed),
            };
            AlternateLink { hreflang: code.to_string(), href }
        })
        .collect();
    links.push(AlternateLink { hreflang: "x-default".to_string(), href: unprefixed.to_string() });
    links
}

/// Collapse any run of leading '/' or '\\' into one '/', so a redirect
/// target can never become a protocol-relative URL.
fn normalize_path(path: &str) -> String {
    format!("/{}", path.trim_start_matches(['/', '\\']))
}

fn strip_locale_prefix(path: &str, code: &str) -> String {
    let rest = path.trim_start_matches('/').strip_prefix(code).unwrap_or_default();
    normalize_path(rest)
}

fn with_prefix(code: &str, path: &str) -> String {
    if path == "/" { format!("/{}", code) } else { format!("/{}{}", code, path) }
}

fn with_query(path: &str, query: Option<&str>) -> String {
    match query {
        Some(query) if !query.is_empty() => format!("{}?{}", path, query),
        _ => path.to_string(),
    }
}
