use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    api::{
        client::{endpoint, normalize_base_url},
        provider::TokenProvider,
        types::{
            ApiErrorResponse, AuthResponse, LoginRequest, RefreshRequest, SocialLoginRequest,
            UserProfile,
        },
    },
    config::ServiceAccount,
    error::ApiError,
    state::{Credential, CredentialStore, TemporarySessionStore},
};

/// Owns the signed-in user's session and the service-account identity.
pub struct AuthGateway {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    service_account: Option<ServiceAccount>,
    credentials: CredentialStore,
    pub(crate) temporary_sessions: Arc<TemporarySessionStore>,
    logged_in: AtomicBool,
}

impl AuthGateway {
    pub fn new(
        client: Client,
        base_url: impl AsRef<str>,
        service_account: Option<ServiceAccount>,
        credentials: CredentialStore,
        temporary_sessions: Arc<TemporarySessionStore>,
    ) -> Self {
        Self {
            client,
            base_url: normalize_base_url(base_url.as_ref()),
            service_account,
            credentials,
            temporary_sessions,
            logged_in: AtomicBool::new(false),
        }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn temporary_sessions(&self) -> &Arc<TemporarySessionStore> {
        &self.temporary_sessions
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::SeqCst)
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        match self.credentials.load() {
            Ok(credential) => credential.and_then(|c| c.profile),
            Err(err) => {
                tracing::warn!(error = %err, "Failed to read stored credential");
                None
            }
        }
    }

    /// Picks up a stored credential on start-up and tries one refresh. A
    /// failed refresh keeps the session; the executor deals with a dead
    /// token on the next call.
    pub async fn restore(&self) -> bool {
        let restored = matches!(self.credentials.load(), Ok(Some(_)));
        self.logged_in.store(restored, Ordering::SeqCst);
        if !restored {
            return false;
        }
        tracing::info!("Restored stored session");
        if !self.refresh().await {
            tracing::debug!("Start-up refresh failed, keeping stored tokens");
        }
        self.is_logged_in()
    }

    /// Signs in and stores the session. The profile is `None` when the
    /// response omits it and `auth/me` cannot supply it either.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<UserProfile>, ApiError> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let (status, body) = self.post_json("auth/login", &request).await?;
        if status != StatusCode::OK {
            tracing::info!(status = status.as_u16(), "Login rejected");
            return Err(rejection(status, &body));
        }

        let auth: AuthResponse = decode(&body)?;
        let profile = self.establish_session(auth).await?;
        tracing::info!(user_id = profile.as_ref().map(|p| p.id), "User logged in");
        Ok(profile)
    }

    pub async fn social_login(
        &self,
        provider: &str,
        token: &str,
    ) -> Result<Option<UserProfile>, ApiError> {
        let request = SocialLoginRequest {
            provider: provider.to_string(),
            token: token.to_string(),
        };
        let (status, body) = self.post_json("auth/social-login", &request).await?;
        if status != StatusCode::OK {
            tracing::info!(provider, status = status.as_u16(), "Social login rejected");
            return Err(ApiError::Server {
                status: status.as_u16(),
            });
        }

        let auth: AuthResponse = decode(&body)?;
        let profile = self.establish_session(auth).await?;
        tracing::info!(
            user_id = profile.as_ref().map(|p| p.id),
            provider,
            "User logged in with social provider"
        );
        Ok(profile)
    }

    /// Exchanges the stored refresh token for a new pair and re-fetches the
    /// profile. Any failure yields `false` and leaves the store untouched.
    pub async fn refresh(&self) -> bool {
        let refresh_token = match self.credentials.refresh_token() {
            Ok(Some(token)) => token,
            Ok(None) => {
                tracing::debug!("No refresh token stored");
                return false;
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to read refresh token");
                return false;
            }
        };

        let (status, body) = match self
            .post_json("auth/refresh", &RefreshRequest { refresh_token })
            .await
        {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(error = %err, "Token refresh request failed");
                return false;
            }
        };
        if status != StatusCode::OK {
            tracing::warn!(status = status.as_u16(), "Token refresh rejected");
            return false;
        }
        let auth: AuthResponse = match decode(&body) {
            Ok(auth) => auth,
            Err(err) => {
                tracing::warn!(error = %err, "Token refresh response undecodable");
                return false;
            }
        };

        let previous_profile = self.current_user();
        let credential = Credential {
            access_token: auth.token,
            refresh_token: auth.refresh_token,
            profile: auth.user.or(previous_profile),
        };
        if let Err(err) = self.credentials.save(&credential) {
            tracing::error!(error = %err, "Failed to persist refreshed tokens");
            return false;
        }
        self.logged_in.store(true, Ordering::SeqCst);
        tracing::info!("Access token refreshed");

        self.fetch_profile().await;
        true
    }

    /// Loads `auth/me` with the stored token and caches the result.
    pub async fn fetch_profile(&self) -> Option<UserProfile> {
        let token = match self.credentials.access_token() {
            Ok(Some(token)) => token,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to read access token");
                return None;
            }
        };

        let response = match self
            .client
            .get(endpoint(&self.base_url, "auth/me"))
            .bearer_auth(token)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, "Profile request failed");
                return None;
            }
        };
        if response.status() != StatusCode::OK {
            tracing::warn!(status = response.status().as_u16(), "Profile request rejected");
            return None;
        }
        let profile: UserProfile = match response.json().await {
            Ok(profile) => profile,
            Err(err) => {
                tracing::warn!(error = %err, "Profile response undecodable");
                return None;
            }
        };

        if let Err(err) = self.credentials.save_profile(&profile) {
            tracing::warn!(error = %err, "Failed to cache user profile");
        }
        Some(profile)
    }

    /// Signs in with the provisioned service identity and returns its token.
    /// The token is never persisted and the user's session is left alone.
    pub async fn login_as_service_account(&self) -> Result<String, ApiError> {
        let account = self.service_account.as_ref().ok_or_else(|| {
            ApiError::ServiceAccount("credenciales de servicio no configuradas".into())
        })?;
        let request = LoginRequest {
            email: account.email.clone(),
            password: account.password.clone(),
        };

        let (status, body) = self.post_json("auth/login", &request).await?;
        if status != StatusCode::OK {
            tracing::warn!(status = status.as_u16(), "Service account login rejected");
            return Err(ApiError::ServiceAccount(format!("HTTP {}", status.as_u16())));
        }
        let auth: AuthResponse = decode(&body)?;
        tracing::debug!("Service account authenticated");
        Ok(auth.token)
    }

    /// Clears the stored credential. Temporary sessions are unaffected.
    pub fn logout(&self) {
        if let Err(err) = self.credentials.clear() {
            tracing::error!(error = %err, "Failed to clear stored credential");
        }
        self.logged_in.store(false, Ordering::SeqCst);
        tracing::info!("User logged out");
    }

    async fn establish_session(&self, auth: AuthResponse) -> Result<Option<UserProfile>, ApiError> {
        let credential = Credential {
            access_token: auth.token,
            refresh_token: auth.refresh_token,
            profile: auth.user.clone(),
        };
        self.credentials.save(&credential)?;
        self.logged_in.store(true, Ordering::SeqCst);

        match auth.user {
            Some(profile) => Ok(Some(profile)),
            None => {
                let profile = self.fetch_profile().await;
                if profile.is_none() {
                    tracing::warn!("Signed in but the user profile is unavailable");
                }
                Ok(profile)
            }
        }
    }

    async fn post_json<T: Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<(StatusCode, String), ApiError> {
        let response = self
            .client
            .post(endpoint(&self.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok((status, body))
    }
}

#[async_trait]
impl TokenProvider for AuthGateway {
    async fn access_token(&self) -> Option<String> {
        match self.credentials.access_token() {
            Ok(token) => token,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to read access token");
                None
            }
        }
    }

    async fn refresh_token(&self) -> bool {
        self.refresh().await
    }

    async fn on_auth_failure(&self) {
        tracing::warn!("Session could not be recovered");
        self.logout();
    }
}

pub(crate) fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body)
        .map_err(|e| ApiError::Decode(format!("Failed to parse response: {}", e)))
}

/// Maps a non-200 auth response to a validation error when the body
/// carries one, otherwise to a plain server error.
fn rejection(status: StatusCode, body: &str) -> ApiError {
    if status == StatusCode::UNAUTHORIZED && body.trim().is_empty() {
        return ApiError::Unauthorized;
    }
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(error) if error.message.is_some() || error.errors.is_some() => ApiError::Validation {
            field_errors: error.field_errors(),
            message: error.message,
        },
        _ => ApiError::Server {
            status: status.as_u16(),
        },
    }
}
