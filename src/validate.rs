//! Request validation done at the HTTP edge, before the engine is called.

use url::Url;

pub const ALIAS_MIN_LEN: usize = 2;
pub const ALIAS_MAX_LEN: usize = 50;

/// Absolute `http`/`https` URL with a host.
pub fn is_valid_url(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some_and(|h| !h.is_empty())
        }
        Err(_) => false,
    }
}

/// Only ASCII letters, digits, `-` and `_`.
pub fn is_valid_alias_charset(alias: &str) -> bool {
    !alias.is_empty()
        && alias
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

pub fn is_valid_alias_length(alias: &str) -> bool {
    (ALIAS_MIN_LEN..=ALIAS_MAX_LEN).contains(&alias.len())
}
