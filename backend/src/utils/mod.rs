pub mod catalog;
pub mod error;
pub mod i18n;

pub use error::{ApiError, ApiErrorResponse, ApiResult};
pub use i18n::{
    LocaleConfigError, LocaleSettings, Negotiation, ResolvedLocale, SupportedLocales, current_locale,
    negotiate, resolve, scope_locale,
};
