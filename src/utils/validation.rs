// Form validation, run before anything reaches the network.

use crate::error::{ClientError, Result};

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Fails unless every field has non-whitespace content.
pub fn require_filled(fields: &[&str]) -> Result<()> {
    if fields.iter().any(|f| f.trim().is_empty()) {
        return Err(ClientError::Validation(
            "Please fill in all fields.".to_string(),
        ));
    }
    Ok(())
}

/// Checks a registration password.
///
/// Length is counted in characters, not bytes.
pub fn check_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ClientError::Validation(format!(
            "Password must be at least {} characters long.",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}
