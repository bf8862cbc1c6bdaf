//! Message catalog lookups
//!
//! Maps a resolved locale to its translated-string bundle. Translations are
//! compiled in from `locales/*.yml` by rust-i18n.

use std::collections::BTreeMap;

use rust_i18n::t;

/// Keys exposed to clients through the messages endpoint
pub const CATALOG_KEYS: &[&str] = &[
    "locale.name",
    "nav.home",
    "nav.dashboard",
    "nav.docs",
    "nav.settings",
    "page.title",
    "common.welcome",
    "common.language",
];

/// Whether a compiled catalog exists for `locale`
pub fn has_catalog(locale: &str) -> bool {
    rust_i18n::available_locales!().iter().any(|available| *available == locale)
}

/// Translate one key for `locale`
pub fn message(locale: &str, key: &str) -> String {
    t!(key, locale = locale).to_string()
}

/// All catalog keys translated for `locale`
pub fn bundle(locale: &str) -> BTreeMap<String, String> {
    CATALOG_KEYS
        .iter()
        .map(|key| (key.to_string(), message(locale, key)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogs_are_compiled_in() {
        assert!(has_catalog("en"));
        assert!(has_catalog("zh"));
        assert!(!has_catalog("xx"));
    }

    #[test]
    fn test_bundle_contains_every_key() {
        let en = bundle("en");
        assert_eq!(en.len(), CATALOG_KEYS.len());
        assert_eq!(en.get("locale.name").map(String::as_str), Some("English"));
        assert_eq!(bundle("zh").get("locale.name").map(String::as_str), Some("中文"));
    }
}
