//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest display name accepted from a client.
const MAX_PLAYER_NAME_CHARS: usize = 32;

/// Validates that a player display name is non-empty, at most 32 characters,
/// and free of control characters.
pub fn validate_player_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("player_name_empty");
        err.message = Some("Player name must not be empty".into());
        return Err(err);
    }

    if name.chars().count() > MAX_PLAYER_NAME_CHARS {
        let mut err = ValidationError::new("player_name_length");
        err.message = Some(
            format!("Player name must be at most {MAX_PLAYER_NAME_CHARS} characters").into(),
        );
        return Err(err);
    }

    if name.chars().any(char::is_control) {
        let mut err = ValidationError::new("player_name_format");
        err.message = Some("Player name must not contain control characters".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_player_name_valid() {
        assert!(validate_player_name("Aakshat").is_ok());
        assert!(validate_player_name("player 42").is_ok());
        assert!(validate_player_name("名前").is_ok());
    }

    #[test]
    fn test_validate_player_name_empty() {
        assert!(validate_player_name("").is_err());
        assert!(validate_player_name("   ").is_err());
    }

    #[test]
    fn test_validate_player_name_too_long() {
        let name = "x".repeat(33);
        assert!(validate_player_name(&name).is_err());
        let name = "x".repeat(32);
        assert!(validate_player_name(&name).is_ok());
    }

    #[test]
    fn test_validate_player_name_control_characters() {
        assert!(validate_player_name("evil\nname").is_err());
        assert!(validate_player_name("tab\tname").is_err());
    }
}
