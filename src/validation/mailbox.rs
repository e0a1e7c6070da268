use crate::error::{AppError, Result};

/// Validates and normalizes the user-chosen local part of a disposable
/// address.
///
/// # Arguments
///
/// * `local_part` - The raw user input, before trimming.
///
/// # Returns
///
/// A `Result` containing the trimmed local part.
pub fn validate_local_part(local_part: &str) -> Result<String> {
    let trimmed = local_part.trim();

    if trimmed.is_empty() {
        return Err(AppError::Validation(
            "Mailbox name cannot be empty".to_string(),
        ));
    }

    if trimmed.len() > 64 {
        return Err(AppError::Validation(
            "Mailbox name must be at most 64 characters".to_string(),
        ));
    }

    if trimmed.contains('@') || trimmed.chars().any(char::is_whitespace) {
        return Err(AppError::Validation(
            "Mailbox name cannot contain '@' or whitespace".to_string(),
        ));
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_and_trims_plain_names() {
        assert_eq!(validate_local_part("  test ").unwrap(), "test");
        assert_eq!(validate_local_part("foo-bar.baz").unwrap(), "foo-bar.baz");
    }

    #[test]
    fn rejects_empty_and_blank_input() {
        assert!(validate_local_part("").is_err());
        assert!(validate_local_part("   ").is_err());
    }

    #[test]
    fn rejects_embedded_at_and_whitespace() {
        assert!(validate_local_part("a@b").is_err());
        assert!(validate_local_part("a b").is_err());
    }

    #[test]
    fn rejects_overlong_names() {
        assert!(validate_local_part(&"x".repeat(65)).is_err());
    }
}
