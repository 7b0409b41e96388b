use regex::Regex;
use std::sync::LazyLock;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .unwrap()
});

/// Check that `email` is a syntactically valid address.
///
/// Length is measured in bytes. No DNS lookup and no normalization.
pub fn is_email_valid(email: &str) -> bool {
    if email.len() < 3 || email.len() > 254 {
        return false;
    }
    EMAIL_REGEX.is_match(email)
}
