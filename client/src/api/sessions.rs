//! Session-code flows: validating a code into a temporary grant and keeping
//! that grant's session data fresh.

use std::collections::BTreeMap;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::StatusCode;

use crate::{
    api::{
        auth::{decode, AuthGateway},
        client::endpoint,
        types::{SessionLookup, TemporarySessionGrant},
    },
    error::ApiError,
};

/// Characters escaped when a code is placed in a single path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

pub(crate) fn session_lookup_path(code: &str) -> String {
    format!(
        "event-sessions/{}",
        utf8_percent_encode(code, PATH_SEGMENT)
    )
}

impl AuthGateway {
    /// Resolves `code` with the service account and stores the resulting
    /// grant, which replaces any previous one.
    pub async fn validate_session_code(&self, code: &str) -> Result<TemporarySessionGrant, ApiError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ApiError::Validation {
                message: Some("Ingresa un código de sesión".into()),
                field_errors: BTreeMap::from([(
                    "code".to_string(),
                    "El código es obligatorio".to_string(),
                )]),
            });
        }

        let token = self.login_as_service_account().await?;
        let lookup = self.lookup_session(code, &token).await?;
        let grant = TemporarySessionGrant::issue(&lookup, code, self.temporary_sessions.now());
        self.temporary_sessions.save(&grant)?;
        Ok(grant)
    }

    /// Re-reads the active grant's session and updates it without
    /// announcing anything. Errors are logged and yield `None`.
    pub async fn refresh_temporary_session(&self) -> Option<TemporarySessionGrant> {
        let grant = match self.temporary_sessions.load() {
            Ok(Some(grant)) => grant,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to read temporary session");
                return None;
            }
        };

        let lookup = match self.login_as_service_account().await {
            Ok(token) => self.lookup_session(&grant.session_code, &token).await,
            Err(err) => Err(err),
        };
        let lookup = match lookup {
            Ok(lookup) => lookup,
            Err(err) => {
                tracing::warn!(session_id = grant.session_id, error = %err, "Temporary session refresh failed");
                return None;
            }
        };

        match self.temporary_sessions.update_silently(&lookup) {
            Ok(updated) => updated,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to store refreshed temporary session");
                None
            }
        }
    }

    pub fn temporary_session(&self) -> Result<Option<TemporarySessionGrant>, ApiError> {
        Ok(self.temporary_sessions.load()?)
    }

    pub fn end_temporary_session(&self) -> Result<(), ApiError> {
        Ok(self.temporary_sessions.clear()?)
    }

    async fn lookup_session(&self, code: &str, token: &str) -> Result<SessionLookup, ApiError> {
        let response = self
            .client
            .get(endpoint(&self.base_url, &session_lookup_path(code)))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        match status {
            StatusCode::OK => decode(&body),
            StatusCode::NOT_FOUND => {
                tracing::info!("Session code not found");
                Err(ApiError::SessionCodeNotFound)
            }
            other => Err(ApiError::Server {
                status: other.as_u16(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_is_escaped_as_a_single_segment() {
        assert_eq!(session_lookup_path("ABC123"), "event-sessions/ABC123");
        assert_eq!(session_lookup_path("a/b?c"), "event-sessions/a%2Fb%3Fc");
        assert_eq!(session_lookup_path("a b#1"), "event-sessions/a%20b%231");
    }
}
