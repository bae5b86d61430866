use devtime_core::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Names of applications, modules and services become folder names and URI
/// segments.
static NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_-]{0,63}$").expect("resource name pattern is valid")
});

pub fn validate_name(name: &str) -> Result<()> {
    if NAME_REGEX.is_match(name) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "invalid name {:?}: use a letter followed by letters, digits, '-' or '_'",
            name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(validate_name("orders").is_ok());
        assert!(validate_name("list_v2-beta").is_ok());
    }

    #[test]
    fn test_invalid_names() {
        for name in ["", "2fast", "a/b", "..", "with space", ".hidden"] {
            assert!(validate_name(name).is_err(), "{name} should be rejected");
        }
    }
}
