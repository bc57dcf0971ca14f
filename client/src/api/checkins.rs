use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::json;

use crate::{
    api::{
        auth::AuthGateway,
        client::{ApiClient, ApiRequest, ApiResponse},
        types::{
            CheckinErrorResponse, CheckinRecord, CheckinRegistration, CheckinsPage, EventsPage,
            TemporarySessionGrant,
        },
    },
    error::{ApiError, CheckinError},
    state::{CategoryFilter, RosterCache},
    translations::{PhraseTable, Translation},
};

const ROSTER_PAGE_SIZE: &str = "100";
const EVENTS_PAGE_SIZE: &str = "10";

/// Which identity registers and lists check-ins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckinAuth {
    User,
    ServiceAccount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckinContext {
    pub event_id: i64,
    pub session_id: i64,
    pub auth: CheckinAuth,
}

impl CheckinContext {
    pub fn user(event_id: i64, session_id: i64) -> Self {
        Self {
            event_id,
            session_id,
            auth: CheckinAuth::User,
        }
    }

    pub fn temporary(grant: &TemporarySessionGrant) -> Self {
        Self {
            event_id: grant.event_id,
            session_id: grant.session_id,
            auth: CheckinAuth::ServiceAccount,
        }
    }
}

pub struct CheckinRegistrar {
    api: Arc<ApiClient>,
    auth: Arc<AuthGateway>,
    phrases: Arc<PhraseTable>,
    roster: RosterCache,
}

impl CheckinRegistrar {
    pub fn new(
        api: Arc<ApiClient>,
        auth: Arc<AuthGateway>,
        phrases: Arc<PhraseTable>,
        roster: RosterCache,
    ) -> Self {
        Self {
            api,
            auth,
            phrases,
            roster,
        }
    }

    /// Submits one scanned guest. 201 is the only success.
    pub async fn register_checkin(
        &self,
        context: &CheckinContext,
        guest_payload: &str,
        filter: &CategoryFilter,
    ) -> Result<CheckinRecord, CheckinError> {
        let registration = CheckinRegistration {
            event: context.event_id,
            event_session: context.session_id,
            guest: guest_payload.to_string(),
            registrant_type_ids: filter.registrant_type_ids(),
        };
        let request = ApiRequest::post("checkins/register").json(&registration)?;
        let request = self.authorize(request, context.auth).await?;
        let response = self.api.execute(request).await?;

        if response.status != StatusCode::CREATED {
            let err = self.rejection(&response);
            tracing::info!(
                event_id = context.event_id,
                session_id = context.session_id,
                status = response.status.as_u16(),
                error = %err,
                "Check-in rejected"
            );
            return Err(err);
        }

        let record: CheckinRecord = response.json()?;
        if let Err(err) = self
            .roster
            .prepend(context.event_id, context.session_id, &record)
        {
            tracing::warn!(error = %err, "Failed to update roster cache");
        }
        tracing::info!(
            event_id = context.event_id,
            session_id = context.session_id,
            checkin_id = record.id,
            "Check-in registered"
        );
        Ok(record)
    }

    pub async fn register_for_temporary_session(
        &self,
        grant: &TemporarySessionGrant,
        guest_payload: &str,
        filter: &CategoryFilter,
    ) -> Result<CheckinRecord, CheckinError> {
        self.register_checkin(&CheckinContext::temporary(grant), guest_payload, filter)
            .await
    }

    /// Latest check-ins for the session, newest first. Failures are logged
    /// and yield an empty list.
    pub async fn list_checkins(&self, context: &CheckinContext) -> Vec<CheckinRecord> {
        let filter = json!([{
            "field": "e.session",
            "operator": "=",
            "value": context.session_id,
        }]);
        let request = ApiRequest::get("checkins")
            .query("page", "1")
            .query("query", "")
            .query("limit", ROSTER_PAGE_SIZE)
            .query("order", "id:DESC")
            .query("filter", filter.to_string());

        let request = match self.authorize(request, context.auth).await {
            Ok(request) => request,
            Err(err) => {
                tracing::warn!(error = %err, "Cannot authorize check-in listing");
                return Vec::new();
            }
        };
        let response = match self.api.execute(request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(session_id = context.session_id, error = %err, "Check-in listing failed");
                return Vec::new();
            }
        };
        if response.status != StatusCode::OK {
            tracing::warn!(
                session_id = context.session_id,
                status = response.status.as_u16(),
                "Check-in listing rejected"
            );
            return Vec::new();
        }

        match response.json::<CheckinsPage>() {
            Ok(page) => {
                if let Err(err) =
                    self.roster
                        .replace(context.event_id, context.session_id, &page.data)
                {
                    tracing::warn!(error = %err, "Failed to update roster cache");
                }
                page.data
            }
            Err(err) => {
                tracing::warn!(error = %err, "Check-in listing undecodable");
                Vec::new()
            }
        }
    }

    pub fn cached_checkins(&self, context: &CheckinContext) -> Vec<CheckinRecord> {
        self.roster
            .load(context.event_id, context.session_id)
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, "Failed to read roster cache");
                Vec::new()
            })
    }

    pub async fn list_events(&self, page: u32) -> Result<EventsPage, ApiError> {
        let request = ApiRequest::get("events")
            .query("page", page.max(1).to_string())
            .query("query", "")
            .query("limit", EVENTS_PAGE_SIZE)
            .query("order", "id:DESC")
            .query("filter", "[]");
        let response = self.api.execute(request).await?;
        if response.status != StatusCode::OK {
            return Err(ApiError::Server {
                status: response.status.as_u16(),
            });
        }
        response.json()
    }

    async fn authorize(&self, request: ApiRequest, auth: CheckinAuth) -> Result<ApiRequest, ApiError> {
        match auth {
            CheckinAuth::User => Ok(request),
            CheckinAuth::ServiceAccount => {
                let token = self.auth.login_as_service_account().await?;
                Ok(request.bearer(token))
            }
        }
    }

    fn rejection(&self, response: &ApiResponse) -> CheckinError {
        let status = response.status.as_u16();
        if response.status == StatusCode::UNAUTHORIZED {
            return CheckinError::Request(ApiError::Unauthorized);
        }

        let body: CheckinErrorResponse = serde_json::from_str(&response.body).unwrap_or_default();
        let raw = body
            .message
            .filter(|m| !m.trim().is_empty())
            .or(body.error.filter(|e| !e.trim().is_empty()))
            .unwrap_or_else(|| format!("HTTP {}", status));

        match self.phrases.translate(&raw) {
            Translation::Known(message) => CheckinError::Rejected { status, message },
            Translation::Unrecognized(raw) => CheckinError::Unrecognized { status, raw },
        }
    }
}
