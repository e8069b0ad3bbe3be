use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Only catches obvious typos. The identity provider remains the
    // authority on what counts as a valid address.
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

/// Lower-cases and trims an email for allow-list and account matching.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email.trim())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(normalize_email("  Ana@Example.COM "), "ana@example.com");
    }

    #[test]
    fn validates_email_shape() {
        assert!(is_valid_email("ana@example.com"));
        assert!(is_valid_email(" ana@example.com "));

        assert!(!is_valid_email("ana"));
        assert!(!is_valid_email("ana@example"));
        assert!(!is_valid_email("ana@exa mple.com"));
        assert!(!is_valid_email("@example.com"));
    }
}
