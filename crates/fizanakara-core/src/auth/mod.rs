//! Authentication module for managing sessions and stored credentials.
//!
//! This module provides:
//! - `CredentialStore`: key-value storage for the access token, refresh token
//!   and cached user, with in-memory, file and OS keychain backends
//! - `Session`: the explicit session object shared by the API client, which
//!   also signals when the user must log in again

pub mod keychain;
pub mod session;
pub mod store;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

pub use keychain::KeyringStore;
pub use session::{Session, SessionStatus, DEFAULT_LOGIN_PATH};
pub use store::{CredentialKey, CredentialStore, FileStore, MemoryStore};

use crate::config::CredentialBackend;

/// Open the credential store selected in the configuration
pub fn open_store(backend: CredentialBackend, cache_dir: &Path) -> Result<Arc<dyn CredentialStore>> {
    let store: Arc<dyn CredentialStore> = match backend {
        CredentialBackend::Keyring => Arc::new(KeyringStore::new()?),
        CredentialBackend::File => Arc::new(FileStore::new(cache_dir)),
        CredentialBackend::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(store)
}
