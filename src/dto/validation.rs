//! Validation helpers for DTOs.

use validator::ValidationError;

/// Validates that a display name is non-blank and uses a safe character set
/// (letters, digits, spaces, underscores, hyphens).
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.trim().is_empty() {
        let mut err = ValidationError::new("username_blank");
        err.message = Some("Username must not be blank".into());
        return Err(err);
    }

    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || c == ' ' || c == '_' || c == '-')
    {
        let mut err = ValidationError::new("username_charset");
        err.message =
            Some("Username may only contain letters, digits, spaces, underscores, hyphens".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username_valid() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("Player One").is_ok());
        assert!(validate_username("math_fan-42").is_ok());
    }

    #[test]
    fn test_validate_username_blank() {
        assert!(validate_username("").is_err());
        assert!(validate_username("   ").is_err());
    }

    #[test]
    fn test_validate_username_charset() {
        assert!(validate_username("alice!").is_err());
        assert!(validate_username("a<script>").is_err());
        assert!(validate_username("semi;colon").is_err());
    }
}
