use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::store::{CredentialKey, CredentialStore, MemoryStore};
use crate::models::{LoginResponse, Role, SessionUser};

/// Where the console sends the user when the session cannot be recovered
pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// Observable session state. Front ends watch for `LoginRequired` and show
/// their login screen when it appears.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// No credentials stored
    Anonymous,
    /// An access token is stored
    Active,
    /// Credentials were wiped (logout or failed refresh); the user must log in again
    LoginRequired { redirect_to: String },
}

/// Explicit session shared by the API client and the front end.
///
/// Clone is cheap: all clones share the same credential store and status
/// channel.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    store: Arc<dyn CredentialStore>,
    login_path: String,
    status: watch::Sender<SessionStatus>,
}

impl Session {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self::with_login_path(store, DEFAULT_LOGIN_PATH)
    }

    pub fn with_login_path(store: Arc<dyn CredentialStore>, login_path: impl Into<String>) -> Self {
        let initial = match store.get(CredentialKey::AccessToken) {
            Ok(Some(_)) => SessionStatus::Active,
            Ok(None) => SessionStatus::Anonymous,
            Err(e) => {
                warn!(error = %e, "Could not read stored credentials");
                SessionStatus::Anonymous
            }
        };
        let (status, _) = watch::channel(initial);
        Self {
            inner: Arc::new(SessionInner {
                store,
                login_path: login_path.into(),
                status,
            }),
        }
    }

    /// Session backed by a fresh `MemoryStore`
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.inner.store
    }

    pub fn login_path(&self) -> &str {
        &self.inner.login_path
    }

    pub fn access_token(&self) -> Result<Option<String>> {
        self.inner.store.get(CredentialKey::AccessToken)
    }

    pub fn refresh_token(&self) -> Result<Option<String>> {
        self.inner.store.get(CredentialKey::RefreshToken)
    }

    /// The cached user record, if one was stored at login
    pub fn user(&self) -> Result<Option<SessionUser>> {
        match self.inner.store.get(CredentialKey::User)? {
            Some(json) => {
                let user = serde_json::from_str(&json).context("Failed to parse cached user")?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    /// Persist both tokens and the user record from a successful login
    pub fn store_login(&self, login: &LoginResponse) -> Result<()> {
        let mut user = login.user.clone();
        user.role = Some(login.role);

        let store = &self.inner.store;
        store.set(CredentialKey::AccessToken, &login.access_token)?;
        store.set(CredentialKey::RefreshToken, &login.refresh_token)?;
        store.set(CredentialKey::User, &serde_json::to_string(&user)?)?;

        info!(user_id = %user.id, role = ?login.role, "Session started");
        self.inner.status.send_replace(SessionStatus::Active);
        Ok(())
    }

    /// Replace the access token after a successful refresh
    pub fn set_access_token(&self, token: &str) -> Result<()> {
        self.inner.store.set(CredentialKey::AccessToken, token)?;
        debug!("Access token updated");
        self.inner.status.send_replace(SessionStatus::Active);
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.access_token(), Ok(Some(_)))
    }

    pub fn is_super_admin(&self) -> bool {
        matches!(self.user(), Ok(Some(SessionUser { role: Some(Role::Superadmin), .. })))
    }

    /// Wipe all credentials without asking for a new login (silent logout)
    pub fn clear(&self) -> Result<()> {
        self.inner.store.clear()?;
        self.inner.status.send_replace(SessionStatus::Anonymous);
        Ok(())
    }

    /// Wipe all credentials and send the user to the login boundary.
    ///
    /// The status is signalled even if the store fails to clear, so front
    /// ends never keep showing authenticated screens.
    pub fn require_login(&self) -> Result<()> {
        let cleared = self.inner.store.clear();
        self.inner.status.send_replace(SessionStatus::LoginRequired {
            redirect_to: self.inner.login_path.clone(),
        });
        info!(redirect_to = %self.inner.login_path, "Session ended, login required");
        cleared
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.inner.status.subscribe()
    }
}
