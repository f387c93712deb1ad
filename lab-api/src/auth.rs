//! Login, token refresh and logout as explicit session operations.

use crate::error::{LabApiError, LabApiResult};
use crate::validate_required;
use api_client::{ApiClient, AuthSession, SessionUser};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    #[serde(alias = "accessToken")]
    token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    user: SessionUser,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    #[serde(alias = "accessToken")]
    token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AuthService {
    client: ApiClient,
}

impl AuthService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Authenticate and establish the shared session.
    ///
    /// # Errors
    ///
    /// Validation failure for blank credentials, otherwise any backend failure.
    pub async fn login(&self, email: &str, password: &SecretString) -> LabApiResult<SessionUser> {
        validate_required!(email, "Email is required");
        validate_required!(password.expose_secret(), "Password is required");

        let response: LoginResponse = self
            .client
            .post(
                "/auth/login",
                &LoginRequest {
                    email: email.trim(),
                    password: password.expose_secret(),
                },
            )
            .await?;

        let user = response.user.clone();
        self.client
            .session()
            .establish(AuthSession::new(response.token, response.refresh_token, response.user));
        info!(user_id = %user.id, role = ?user.role, "Logged in");
        Ok(user)
    }

    /// Swap the refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// [`api_client::ApiError::NotAuthenticated`] without a refresh token,
    /// otherwise any backend failure.
    pub async fn refresh(&self) -> LabApiResult<()> {
        let refresh_token = self
            .client
            .session()
            .current()
            .and_then(|auth| auth.refresh_token().map(str::to_string))
            .ok_or(LabApiError::Api(api_client::ApiError::NotAuthenticated))?;

        let response: RefreshResponse = self
            .client
            .post(
                "/auth/refresh",
                &RefreshRequest {
                    refresh_token: &refresh_token,
                },
            )
            .await?;

        self.client
            .session()
            .refresh(response.token, response.refresh_token.or(Some(refresh_token)));
        info!("Session refreshed");
        Ok(())
    }

    /// Server logout is best effort; the local session is always cleared.
    pub async fn logout(&self) {
        if self.client.session().is_authenticated() {
            if let Err(e) = self.client.post_unit("/auth/logout", &serde_json::json!({})).await {
                warn!(error = %e, "Server logout failed, clearing local session anyway");
            }
        }
        self.client.session().logout();
        info!("Logged out");
    }
}
