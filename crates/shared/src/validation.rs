//! Input checks applied before anything is sent to the admin API.

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    // Pattern is a compile-time constant.
    Regex::new(r"^[\w.!#$%&'*+\-/=?^`{|}~]+@[a-z0-9-]+(\.[a-z0-9-]+)+$").unwrap()
});

/// Lower-cases `email` and returns it if it looks like an address.
pub fn normalize_email(email: &str) -> Option<String> {
    let encoded = email.trim().to_lowercase();
    EMAIL_REGEX.is_match(&encoded).then_some(encoded)
}

pub fn is_email_valid(email: &str) -> bool {
    normalize_email(email).is_some()
}

/// Absolute, normalized path without fragment, query or parameters.
pub fn is_canonical_path(path: &str) -> bool {
    if !path.starts_with('/') || path.contains("//") {
        return false;
    }
    if path.contains(['#', '?', ';']) {
        return false;
    }
    !path.split('/').any(|segment| segment == "." || segment == "..")
}
