use anyhow::{Context, Result};
use keyring::Entry;

use super::store::{CredentialKey, CredentialStore};

const SERVICE_NAME: &str = "fizanakara";

/// Credentials kept in the OS keychain, one entry per key.
///
/// Entries are created once and reused so every read goes through the same
/// credential handle as the write before it.
pub struct KeyringStore {
    access_token: Entry,
    refresh_token: Entry,
    user: Entry,
}

impl KeyringStore {
    pub fn new() -> Result<Self> {
        Ok(Self {
            access_token: Self::open(CredentialKey::AccessToken)?,
            refresh_token: Self::open(CredentialKey::RefreshToken)?,
            user: Self::open(CredentialKey::User)?,
        })
    }

    fn open(key: CredentialKey) -> Result<Entry> {
        Entry::new(SERVICE_NAME, key.as_str())
            .with_context(|| format!("Failed to create keyring entry for {}", key))
    }

    fn entry(&self, key: CredentialKey) -> &Entry {
        match key {
            CredentialKey::AccessToken => &self.access_token,
            CredentialKey::RefreshToken => &self.refresh_token,
            CredentialKey::User => &self.user,
        }
    }
}

impl CredentialStore for KeyringStore {
    fn get(&self, key: CredentialKey) -> Result<Option<String>> {
        match self.entry(key).get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve credential from keychain"),
        }
    }

    fn set(&self, key: CredentialKey, value: &str) -> Result<()> {
        self.entry(key)
            .set_password(value)
            .context("Failed to store credential in keychain")
    }

    fn remove(&self, key: CredentialKey) -> Result<()> {
        match self.entry(key).delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete credential from keychain"),
        }
    }
}
