//! Session and administrator account endpoints.

use anyhow::{Context, Result};
use tracing::{debug, info};
use validator::Validate;

use super::client::{path_id, REFRESH_PATH};
use super::{ApiClient, ApiError};
use crate::models::{
    Admin, ForgotPasswordRequest, GenericResponse, LoginRequest, LoginResponse, RefreshRequest,
    RefreshResponse, RegisterRequest, ResetPasswordRequest, UpdateAdminRequest,
    UpdateProfileResponse,
};

impl ApiClient {
    // ===== Session =====

    /// Authenticate and persist both tokens and the user in the session.
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        request.validate().map_err(ApiError::from)?;

        let login: LoginResponse = self
            .post_public("/login", request)
            .await
            .context("Login failed")?;
        self.session().store_login(&login)?;

        info!(email = %request.email, role = ?login.role, "Logged in");
        Ok(login)
    }

    /// Exchange a refresh token for a new access token without touching the session.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse> {
        self.post_public(
            REFRESH_PATH,
            &RefreshRequest {
                refresh_token: refresh_token.to_string(),
            },
        )
        .await
    }

    /// Refresh using the stored refresh token and persist the result
    pub async fn refresh_session(&self) -> Result<String> {
        self.refresh_access_token().await
    }

    /// Wipe stored credentials and send the user back to the login screen.
    pub fn logout(&self) -> Result<()> {
        info!("Logging out");
        self.session().require_login()
    }

    /// Check a stored session at startup. Any failure clears the session
    /// silently and returns `None`.
    pub async fn restore_session(&self) -> Result<Option<Admin>> {
        if !self.session().is_authenticated() {
            return Ok(None);
        }

        match self.me().await {
            Ok(admin) => {
                debug!(admin_id = %admin.id, "Session restored");
                Ok(Some(admin))
            }
            Err(e) => {
                debug!(error = %e, "Stored session is no longer valid");
                self.session().clear()?;
                Ok(None)
            }
        }
    }

    pub async fn health(&self) -> Result<String> {
        self.get_text("/health", true).await
    }

    // ===== Password reset =====

    pub async fn forgot_password(&self, email: &str) -> Result<String> {
        let request = ForgotPasswordRequest {
            email: email.trim().to_string(),
        };
        request.validate().map_err(ApiError::from)?;
        self.post_public_text("/forgot-password", &request).await
    }

    pub async fn reset_password(&self, request: &ResetPasswordRequest) -> Result<String> {
        request.validate().map_err(ApiError::from)?;
        self.post_public_text("/reset-password", request).await
    }

    // ===== Administrators =====

    /// Create an administrator account. Only a SUPERADMIN session is accepted by the server.
    pub async fn register(&self, request: &RegisterRequest) -> Result<Admin> {
        request.validate().map_err(ApiError::from)?;
        self.post("/register", request)
            .await
            .context("Failed to register administrator")
    }

    pub async fn me(&self) -> Result<Admin> {
        self.get("/admins/me").await
    }

    pub async fn update_me(&self, request: &UpdateAdminRequest) -> Result<UpdateProfileResponse> {
        request.validate().map_err(ApiError::from)?;
        self.patch("/admins/me", request)
            .await
            .context("Failed to update profile")
    }

    /// Delete the current account; the session ends with it.
    pub async fn delete_me(&self) -> Result<GenericResponse> {
        let response: GenericResponse = self.delete("/admins/me").await?;
        self.session().clear()?;
        Ok(response)
    }

    pub async fn list_admins(&self) -> Result<Vec<Admin>> {
        self.get("/admins/all").await
    }

    /// The backend mounts admin deletion at the API root.
    pub async fn delete_admin(&self, id: &str) -> Result<GenericResponse> {
        let id = path_id(id)?;
        self.delete(&format!("/{}", id))
            .await
            .with_context(|| format!("Failed to delete administrator {}", id))
    }
}
