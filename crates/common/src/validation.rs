//! Input validation for caller-supplied tunnel options
//!
//! Subdomain requests are validated locally before the handshake so that an
//! obviously invalid request fails with a clear message instead of a broker
//! round trip.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Regex for requested subdomains: lowercase alphanumeric with interior
/// hyphens, 4-63 characters (the tunnel server enforces the same rule)
static SUBDOMAIN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[a-z0-9][a-z0-9-]{2,61}[a-z0-9])$").unwrap());

/// Validation errors
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error(
        "Invalid subdomain '{0}': must be 4-63 lowercase alphanumeric characters, hyphens allowed inside"
    )]
    InvalidSubdomain(String),
}

/// Validate a requested subdomain
///
/// # Examples
///
/// ```
/// use local_tunnel_common::validation::validate_subdomain;
///
/// assert!(validate_subdomain("my-app").is_ok());
/// assert!(validate_subdomain("My-App").is_err());
/// ```
pub fn validate_subdomain(subdomain: &str) -> Result<(), ValidationError> {
    if SUBDOMAIN_REGEX.is_match(subdomain) {
        Ok(())
    } else {
        Err(ValidationError::InvalidSubdomain(subdomain.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_subdomains() {
        assert!(validate_subdomain("myapp").is_ok());
        assert!(validate_subdomain("my-app").is_ok());
        assert!(validate_subdomain("app0").is_ok());
        assert!(validate_subdomain(&"a".repeat(63)).is_ok());
    }

    #[test]
    fn test_rejects_bad_characters() {
        assert!(validate_subdomain("My-App").is_err());
        assert!(validate_subdomain("my_app").is_err());
        assert!(validate_subdomain("my.app").is_err());
        assert!(validate_subdomain("my app").is_err());
        assert!(validate_subdomain("").is_err());
    }

    #[test]
    fn test_rejects_bad_lengths() {
        assert!(validate_subdomain("abc").is_err());
        assert!(validate_subdomain(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_rejects_edge_hyphens() {
        assert!(validate_subdomain("-myapp").is_err());
        assert!(validate_subdomain("myapp-").is_err());
    }

    #[test]
    fn test_error_message_names_the_input() {
        let err = validate_subdomain("BAD").unwrap_err();
        assert!(err.to_string().contains("BAD"));
    }
}
