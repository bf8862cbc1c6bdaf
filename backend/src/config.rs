use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing_subscriber::EnvFilter;
use validator::Validate;

use crate::utils::i18n::{
    CookieSettings, DEFAULT_COOKIE_MAX_AGE, DEFAULT_LOCALE_COOKIE, LocalePrefix, LocaleSettings,
    SameSite, SupportedLocales,
};

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub i18n: I18nConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Deployment environment; "production" turns on secure cookies by default
    pub environment: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct I18nConfig {
    #[validate(length(min = 1, message = "i18n.locales cannot be empty"))]
    pub locales: Vec<String>,
    #[validate(length(min = 1, message = "i18n.default_locale cannot be empty"))]
    pub default_locale: String,
    pub locale_prefix: LocalePrefix,
    pub locale_detection: bool,
    pub alternate_links: bool,
    /// Path prefixes that are never locale-prefixed (API, health, docs)
    pub exclude_paths: Vec<String>,
    #[validate(nested)]
    pub cookie: LocaleCookieConfig,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct LocaleCookieConfig {
    #[validate(length(min = 1, max = 64, message = "i18n.cookie.name must be 1-64 characters"))]
    pub name: String,
    /// Cookie lifetime in seconds (accepts "3600", "30d", "12h")
    #[serde(deserialize_with = "deserialize_duration_secs")]
    pub max_age: u64,
    pub same_site: SameSite,
    /// Defaults to true in production when unset
    pub secure: Option<bool>,
}

impl Config {
    /// Load configuration with environment variable override support
    ///
    /// Loading order:
    /// 1. Load from the given path, or the first config.toml found
    /// 2. Override with environment variables (prefixed with APP_)
    /// 3. Validate the final configuration
    pub fn load(config_path: Option<&Path>) -> Result<Self, anyhow::Error> {
        let mut config = match config_path {
            Some(path) => Self::from_toml(path)?,
            None => match Self::find_config_file() {
                Some(path) => Self::from_toml(Path::new(&path))?,
                None => {
                    tracing::warn!("Configuration file not found, using defaults");
                    Config::default()
                },
            },
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Same as [`Config::load`], but logs through a temporary stdout
    /// subscriber, since the configured one can only be installed once the
    /// logging section is known.
    pub fn load_with_startup_logging(config_path: Option<&Path>) -> Result<Self, anyhow::Error> {
        let bootstrap = tracing_subscriber::fmt().with_env_filter(EnvFilter::new("info")).finish();
        tracing::subscriber::with_default(bootstrap, || Self::load(config_path))
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - APP_SERVER_HOST: Server host (default: 0.0.0.0)
    /// - APP_SERVER_PORT: Server port (default: 8080)
    /// - APP_ENV: Deployment environment (default: development)
    /// - APP_LOG_LEVEL: Logging level (e.g., "info,locale_gateway=debug")
    /// - APP_LOCALES: Comma separated supported locales (e.g., "en,zh")
    /// - APP_DEFAULT_LOCALE: Default locale
    /// - APP_LOCALE_PREFIX: "always" or "as-needed"
    /// - APP_LOCALE_DETECTION: Use cookie/header hints (true/false)
    /// - APP_LOCALE_COOKIE_NAME: Locale cookie name
    /// - APP_LOCALE_COOKIE_MAX_AGE: Cookie lifetime (accepts "3600", "30d")
    /// - APP_LOCALE_COOKIE_SECURE: Force the Secure attribute (true/false)
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(host) = var("APP_SERVER_HOST") {
            self.server.host = host;
            tracing::info!("Override server.host from env: {}", self.server.host);
        }

        if let Some(port) = var("APP_SERVER_PORT")
            && let Ok(port) = port.parse()
        {
            self.server.port = port;
            tracing::info!("Override server.port from env: {}", self.server.port);
        }

        if let Some(env) = var("APP_ENV") {
            self.server.environment = env;
            tracing::info!("Override server.environment from env: {}", self.server.environment);
        }

        if let Some(level) = var("APP_LOG_LEVEL") {
            self.logging.level = level;
            tracing::info!("Override logging.level from env: {}", self.logging.level);
        }

        if let Some(locales) = var("APP_LOCALES") {
            self.i18n.locales = locales
                .split(',')
                .map(|code| code.trim().to_string())
                .filter(|code| !code.is_empty())
                .collect();
            tracing::info!("Override i18n.locales from env: {:?}", self.i18n.locales);
        }

        if let Some(default_locale) = var("APP_DEFAULT_LOCALE") {
            self.i18n.default_locale = default_locale.trim().to_string();
            tracing::info!("Override i18n.default_locale from env: {}", self.i18n.default_locale);
        }

        if let Some(prefix) = var("APP_LOCALE_PREFIX") {
            match prefix.parse() {
                Ok(val) => {
                    self.i18n.locale_prefix = val;
                    tracing::info!("Override i18n.locale_prefix from env: {:?}", val);
                },
                Err(e) => tracing::warn!(
                    "Invalid APP_LOCALE_PREFIX '{}': {} (keep {:?})",
                    prefix,
                    e,
                    self.i18n.locale_prefix
                ),
            }
        }

        if let Some(detection) = var("APP_LOCALE_DETECTION")
            && let Ok(val) = detection.parse()
        {
            self.i18n.locale_detection = val;
            tracing::info!("Override i18n.locale_detection from env: {}", val);
        }

        if let Some(name) = var("APP_LOCALE_COOKIE_NAME") {
            self.i18n.cookie.name = name;
            tracing::info!("Override i18n.cookie.name from env: {}", self.i18n.cookie.name);
        }

        if let Some(max_age) = var("APP_LOCALE_COOKIE_MAX_AGE") {
            match parse_duration_to_secs(&max_age) {
                Ok(val) => {
                    self.i18n.cookie.max_age = val;
                    tracing::info!("Override i18n.cookie.max_age from env: {}", val);
                },
                Err(e) => tracing::warn!(
                    "Invalid APP_LOCALE_COOKIE_MAX_AGE '{}': {} (keep {})",
                    max_age,
                    e,
                    self.i18n.cookie.max_age
                ),
            }
        }

        if let Some(secure) = var("APP_LOCALE_COOKIE_SECURE")
            && let Ok(val) = secure.parse()
        {
            self.i18n.cookie.secure = Some(val);
            tracing::info!("Override i18n.cookie.secure from env: {}", val);
        }
    }

    /// Validate configuration. Locale misconfiguration refuses startup.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }

        self.i18n.validate()?;

        if let Some(path) = self.i18n.exclude_paths.iter().find(|p| !p.starts_with('/')) {
            anyhow::bail!("i18n.exclude_paths entries must start with '/': {}", path);
        }

        let cookie_name = &self.i18n.cookie.name;
        if !cookie_name.chars().all(|c| c.is_ascii_alphanumeric() || "_-.".contains(c)) {
            anyhow::bail!("i18n.cookie.name contains invalid characters: {}", cookie_name);
        }

        if self.i18n.cookie.same_site == SameSite::None && !self.cookie_secure() {
            anyhow::bail!("i18n.cookie.same_site = \"none\" requires a secure cookie");
        }

        self.supported_locales()?;

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.environment.eq_ignore_ascii_case("production")
    }

    fn cookie_secure(&self) -> bool {
        self.i18n.cookie.secure.unwrap_or_else(|| self.is_production())
    }

    pub fn supported_locales(&self) -> Result<SupportedLocales, anyhow::Error> {
        Ok(SupportedLocales::new(self.i18n.locales.iter().cloned(), &self.i18n.default_locale)?)
    }

    /// Build the runtime locale settings shared by every request
    pub fn locale_settings(&self) -> Result<LocaleSettings, anyhow::Error> {
        Ok(LocaleSettings {
            supported: self.supported_locales()?,
            prefix: self.i18n.locale_prefix,
            detection: self.i18n.locale_detection,
            alternate_links: self.i18n.alternate_links,
            exclude_paths: self.i18n.exclude_paths.clone(),
            cookie: CookieSettings {
                name: self.i18n.cookie.name.clone(),
                max_age: self.i18n.cookie.max_age,
                same_site: self.i18n.cookie.same_site,
                secure: self.cookie_secure(),
            },
        })
    }

    fn find_config_file() -> Option<String> {
        let possible_paths =
            ["conf/config.toml", "config.toml", "./conf/config.toml", "./config.toml"];

        for path in &possible_paths {
            if Path::new(path).exists() {
                return Some(path.to_string());
            }
        }
        None
    }

    fn from_toml(path: &Path) -> Result<Self, anyhow::Error> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 8080, environment: "development".to_string() }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info,locale_gateway=debug".to_string(),
            file: Some("logs/locale-gateway.log".to_string()),
        }
    }
}

impl Default for I18nConfig {
    fn default() -> Self {
        Self {
            locales: vec!["en".to_string(), "zh".to_string()],
            default_locale: "en".to_string(),
            locale_prefix: LocalePrefix::Always,
            locale_detection: true,
            alternate_links: true,
            exclude_paths: ["/api", "/health", "/swagger-ui", "/api-docs"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
            cookie: LocaleCookieConfig::default(),
        }
    }
}

impl Default for LocaleCookieConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_LOCALE_COOKIE.to_string(),
            max_age: DEFAULT_COOKIE_MAX_AGE,
            same_site: SameSite::Lax,
            secure: None,
        }
    }
}

// =========================
// Helpers for parsing values
// =========================

fn parse_duration_to_secs(input: &str) -> Result<u64, String> {
    // Accept plain numbers (treated as seconds)
    if let Ok(val) = input.parse::<u64>() {
        return Ok(val);
    }

    let s = input.trim().to_lowercase();
    let (num_str, unit) = s.split_at(s.chars().take_while(|c| c.is_ascii_digit()).count());
    if num_str.is_empty() || unit.is_empty() {
        return Err("missing number or unit".into());
    }
    let n: u64 = num_str.parse().map_err(|_| "invalid number".to_string())?;
    let multiplier: u64 = match unit {
        "s" | "sec" | "secs" | "second" | "seconds" => 1,
        "m" | "min" | "mins" | "minute" | "minutes" => 60,
        "h" | "hr" | "hour" | "hours" => 60 * 60,
        "d" | "day" | "days" => 60 * 60 * 24,
        "w" | "week" | "weeks" => 60 * 60 * 24 * 7,
        _ => return Err(format!("unsupported unit: {}", unit)),
    };
    n.checked_mul(multiplier).ok_or_else(|| "duration too large".to_string())
}

// Accepts numeric seconds or human-friendly strings like "365d"
fn deserialize_duration_secs<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct Visitor;
    impl<'de> serde::de::Visitor<'de> for Visitor {
        type Value = u64;
        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "a number of seconds or a string like '30s', '12h', '365d'")
        }
        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v)
        }
        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            if v >= 0 { Ok(v as u64) } else { Err(E::custom("negative not allowed")) }
        }
        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            parse_duration_to_secs(v).map_err(E::custom)
        }
    }
    deserializer.deserialize_any(Visitor)
}
