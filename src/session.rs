//! Session identity.
//!
//! User resolution order:
//! 1) CLI --user (explicit, or GENBOARD_USER via clap)
//! 2) USER / USERNAME environment variable
//! 3) "local"

use serde::Serialize;

/// The signed-in user and the board they work on. Passed explicitly to
/// whatever needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub user_id: String,
    pub board_id: String,
}

impl Session {
    pub fn new(user_id: impl Into<String>, board_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            board_id: board_id.into(),
        }
    }
}

/// Resolve the current user id.
pub fn resolve_user(cli_user: Option<&str>) -> String {
    if let Some(user) = non_empty(cli_user) {
        return user.to_string();
    }

    for key in ["USER", "USERNAME"] {
        if let Ok(value) = std::env::var(key) {
            if let Some(user) = non_empty(Some(value.as_str())) {
                return user.to_string();
            }
        }
    }

    "local".to_string()
}

fn non_empty(input: Option<&str>) -> Option<&str> {
    input.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_user_wins() {
        assert_eq!(resolve_user(Some(" alice ")), "alice");
    }

    #[test]
    fn blank_user_falls_back() {
        assert!(!resolve_user(Some("   ")).is_empty());
    }
}
