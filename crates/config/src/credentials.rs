// Ledger access token lookup
//
// Tokens are read from:
// 1. System keychain (preferred)
// 2. Environment variable (fallback for CI/headless)
//
// Tokens are NEVER stored in config.toml

use std::env;

/// Service name for keychain storage
const KEYCHAIN_SERVICE: &str = "walletsync";

/// Keychain account holding the ledger token
const KEYCHAIN_ACCOUNT: &str = "ledger/access-token";

/// Environment variable consulted when the keychain has no token
pub const ACCESS_TOKEN_ENV: &str = "WALLETSYNC_ACCESS_TOKEN";

/// Where a token came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Flag,
    Keychain,
    Environment,
    None,
}

impl KeySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeySource::Flag => "flag",
            KeySource::Keychain => "keychain",
            KeySource::Environment => "environment",
            KeySource::None => "none",
        }
    }
}

#[derive(Debug, Clone)]
pub struct KeyLookup {
    pub key: Option<String>,
    pub source: KeySource,
}

/// Resolve the ledger access token.
///
/// An explicit value (command-line flag) wins, then the keychain, then
/// `WALLETSYNC_ACCESS_TOKEN`.
pub fn get_access_token(explicit: Option<&str>) -> KeyLookup {
    lookup(explicit, ACCESS_TOKEN_ENV)
}

fn lookup(explicit: Option<&str>, env_name: &str) -> KeyLookup {
    if let Some(key) = explicit.filter(|k| !k.is_empty()) {
        return KeyLookup { key: Some(key.to_string()), source: KeySource::Flag };
    }

    #[cfg(feature = "keychain")]
    {
        if let Ok(entry) = keyring::Entry::new(KEYCHAIN_SERVICE, KEYCHAIN_ACCOUNT) {
            if let Ok(key) = entry.get_password() {
                return KeyLookup { key: Some(key), source: KeySource::Keychain };
            }
        }
    }

    if let Ok(key) = env::var(env_name) {
        if !key.is_empty() {
            return KeyLookup { key: Some(key), source: KeySource::Environment };
        }
    }

    KeyLookup { key: None, source: KeySource::None }
}

/// Store the ledger token in the system keychain
#[cfg(feature = "keychain")]
pub fn set_access_token(key: &str) -> Result<(), String> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, KEYCHAIN_ACCOUNT)
        .map_err(|e| format!("Failed to create keychain entry: {}", e))?;

    entry
        .set_password(key)
        .map_err(|e| format!("Failed to store token in keychain: {}", e))
}

#[cfg(not(feature = "keychain"))]
pub fn set_access_token(_key: &str) -> Result<(), String> {
    Err(format!(
        "Keychain support not enabled. Set {ACCESS_TOKEN_ENV} environment variable instead."
    ))
}

/// Remove the ledger token from the system keychain
#[cfg(feature = "keychain")]
pub fn delete_access_token() -> Result<(), String> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, KEYCHAIN_ACCOUNT)
        .map_err(|e| format!("Failed to access keychain entry: {}", e))?;

    entry
        .delete_credential()
        .map_err(|e| format!("Failed to delete token from keychain: {}", e))
}

#[cfg(not(feature = "keychain"))]
pub fn delete_access_token() -> Result<(), String> {
    Err("Keychain support not enabled.".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_token_wins() {
        let lookup = lookup(Some("from-flag"), "WALLETSYNC_TEST_UNUSED_TOKEN");
        assert_eq!(lookup.source, KeySource::Flag);
        assert_eq!(lookup.key.as_deref(), Some("from-flag"));
    }

    #[test]
    fn empty_explicit_token_is_ignored() {
        let lookup = lookup(Some(""), "WALLETSYNC_TEST_MISSING_TOKEN_XYZ");
        assert_ne!(lookup.source, KeySource::Flag);
    }

    #[test]
    fn test_key_lookup_from_env() {
        env::set_var("WALLETSYNC_TEST_ENV_TOKEN", "token-123");

        let lookup = lookup(None, "WALLETSYNC_TEST_ENV_TOKEN");
        // A developer keychain entry may shadow the variable.
        if lookup.source == KeySource::Environment {
            assert_eq!(lookup.key.as_deref(), Some("token-123"));
        }

        env::remove_var("WALLETSYNC_TEST_ENV_TOKEN");
    }

    #[test]
    fn source_names() {
        assert_eq!(KeySource::Keychain.as_str(), "keychain");
        assert_eq!(KeySource::None.as_str(), "none");
    }
}
