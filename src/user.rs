//! Caller identity.
//!
//! Every operation runs on behalf of one user. Resolution order:
//! 1) CLI --user (explicit)
//! 2) CREW_USER environment variable
//! 3) Persisted session in `<store>/session`
//! 4) Config default (`user.default`)
//!
//! With none of these set the request is rejected as unauthorized.

use std::path::Path;

use crate::error::{Error, Result};
use crate::storage::Storage;

pub const USER_ENV: &str = "CREW_USER";

/// Resolve the calling user.
pub fn resolve_user(storage: &Storage, cli_user: Option<&str>) -> Result<String> {
    if let Some(user) = non_empty(cli_user) {
        return Ok(user.to_string());
    }

    if let Ok(env_user) = std::env::var(USER_ENV) {
        if let Some(user) = non_empty(Some(env_user.as_str())) {
            return Ok(user.to_string());
        }
    }

    if let Some(user) = load_session(storage.session_file().as_path())? {
        return Ok(user);
    }

    if let Some(user) = storage.config().user.default {
        if let Some(user) = non_empty(Some(user.as_str())) {
            return Ok(user.to_string());
        }
    }

    Err(Error::Unauthorized(
        "no user identity; pass --user, set CREW_USER, or run `crew user set <name>`".to_string(),
    ))
}

/// Persist the user identity in the store's session file.
pub fn persist_user(storage: &Storage, user: &str) -> Result<String> {
    let user = non_empty(Some(user))
        .ok_or_else(|| Error::Validation("user name cannot be empty".to_string()))?;
    if user.chars().any(char::is_whitespace) {
        return Err(Error::Validation(format!(
            "user name '{user}' cannot contain whitespace"
        )));
    }

    std::fs::create_dir_all(storage.root())?;
    std::fs::write(storage.session_file(), format!("{user}\n"))?;
    tracing::debug!(user, "session saved");
    Ok(user.to_string())
}

/// Remove the persisted session; returns whether one existed
pub fn clear_session(storage: &Storage) -> Result<bool> {
    let path = storage.session_file();
    if !path.exists() {
        return Ok(false);
    }
    std::fs::remove_file(path)?;
    Ok(true)
}

/// Load the persisted identity, if present.
pub fn load_session(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = std::fs::read_to_string(path)?;
    Ok(non_empty(Some(raw.as_str())).map(str::to_string))
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
    use crate::config::Config;
    use tempfile::TempDir;

    fn storage() -> (TempDir, Storage) {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path().to_path_buf(), 1000);
        (temp, storage)
    }

    #[test]
    fn explicit_user_wins() {
        let (_temp, storage) = storage();
        persist_user(&storage, "bob").unwrap();
        assert_eq!(resolve_user(&storage, Some("  alice ")).unwrap(), "alice");
    }

    #[test]
    fn session_then_config_default() {
        let (_temp, storage) = storage();
        if std::env::var(USER_ENV).is_ok() {
            return;
        }

        let mut config = Config::default();
        config.user.default = Some("carol".to_string());
        config.save(&storage.config_file()).unwrap();
        assert_eq!(resolve_user(&storage, None).unwrap(), "carol");

        persist_user(&storage, "bob").unwrap();
        assert_eq!(resolve_user(&storage, Some("")).unwrap(), "bob");

        assert!(clear_session(&storage).unwrap());
        assert!(!clear_session(&storage).unwrap());
        assert_eq!(resolve_user(&storage, None).unwrap(), "carol");
    }

    #[test]
    fn missing_identity_is_unauthorized() {
        let (_temp, storage) = storage();
        if std::env::var(USER_ENV).is_ok() {
            return;
        }
        let err = resolve_user(&storage, None).unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
        assert_eq!(err.exit_code(), crate::error::exit_codes::USER_ERROR);
    }

    #[test]
    fn persist_rejects_blank_and_spaced_names() {
        let (_temp, storage) = storage();
        assert!(persist_user(&storage, "   ").is_err());
        assert!(persist_user(&storage, "two words").is_err());
        assert_eq!(persist_user(&storage, " dana ").unwrap(), "dana");
        assert_eq!(
            load_session(&storage.session_file()).unwrap().as_deref(),
            Some("dana")
        );
    }
}
