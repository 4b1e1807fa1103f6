//! Password hashing and strength validation.
//!
//! One-way adaptive hashing via bcrypt; verification is construct-and-compare,
//! never decryption.

use bcrypt::{DEFAULT_COST, hash, verify};

use crate::errors::{AuthError, AuthResult};

const MIN_PASSWORD_LENGTH: usize = 8;

/// Hash a password before storing it.
pub fn hash_password(password: &str) -> AuthResult<String> {
    hash(password, DEFAULT_COST)
        .map_err(|e| AuthError::internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against the stored hash.
pub fn verify_password(password: &str, hash: &str) -> AuthResult<bool> {
    verify(password, hash)
        .map_err(|e| AuthError::internal(format!("Password verification failed: {}", e)))
}

/// Reject passwords that are too short or missing a character class.
pub fn validate_strength(password: &str) -> AuthResult<()> {
    let long_enough = password.len() >= MIN_PASSWORD_LENGTH;
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_symbol = password.chars().any(|c| !c.is_ascii_alphanumeric());

    if long_enough && has_upper && has_lower && has_digit && has_symbol {
        Ok(())
    } else {
        Err(AuthError::WeakPassword)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() {
        let hashed = hash_password("P@ssw0rd123!").unwrap();
        assert!(verify_password("P@ssw0rd123!", &hashed).unwrap());
        assert!(!verify_password("wrong-password", &hashed).unwrap());
    }

    #[test]
    fn strength_rules() {
        assert!(validate_strength("P@ssw0rd123!").is_ok());
        assert!(matches!(
            validate_strength("short1!"),
            Err(AuthError::WeakPassword)
        ));
        assert!(matches!(
            validate_strength("alllowercase1!"),
            Err(AuthError::WeakPassword)
        ));
        assert!(matches!(
            validate_strength("NoSymbols123"),
            Err(AuthError::WeakPassword)
        ));
    }
}
