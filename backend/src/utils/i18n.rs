//! Internationalization utilities for the backend
//!
//! The locale is chosen per request from `Accept-Language` and carried in a
//! tokio task-local, so it follows the request across `.await` points and
//! worker threads.

use std::future::Future;

tokio::task_local! {
    static CURRENT_LOCALE: String;
}

/// Supported locales
pub const SUPPORTED_LOCALES: &[&str] = &["en", "es"];
pub const DEFAULT_LOCALE: &str = "en";

/// Locale of the current request, or the default outside one.
pub fn get_locale() -> String {
    CURRENT_LOCALE.try_with(|l| l.clone()).unwrap_or_else(|_| DEFAULT_LOCALE.to_string())
}

/// Run `fut` with `locale` as the current locale.
pub async fn with_locale<F: Future>(locale: &str, fut: F) -> F::Output {
    CURRENT_LOCALE.scope(normalize_locale(locale), fut).await
}

/// Synchronous variant of [`with_locale`].
pub fn with_locale_sync<R>(locale: &str, f: impl FnOnce() -> R) -> R {
    CURRENT_LOCALE.sync_scope(normalize_locale(locale), f)
}

/// Normalize locale string to a supported locale.
/// Accepts: "en", "en-US", "es_MX", "es-419,en;q=0.8", etc.
fn normalize_locale(locale: &str) -> String {
    let locale = locale.trim().to_lowercase();

    let primary = locale
        .split(['-', '_', ',', ';'])
        .next()
        .unwrap_or(DEFAULT_LOCALE);

    SUPPORTED_LOCALES
        .iter()
        .find(|supported| primary == **supported)
        .map(|s| s.to_string())
        .unwrap_or_else(|| DEFAULT_LOCALE.to_string())
}

/// Extract locale from Accept-Language header value
pub fn extract_locale_from_header(header_value: Option<&str>) -> String {
    match header_value {
        Some(value) => normalize_locale(value),
        None => DEFAULT_LOCALE.to_string(),
    }
}
