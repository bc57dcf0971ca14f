use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fixed lifetime of a temporary session grant.
pub const TEMPORARY_SESSION_TTL_HOURS: i64 = 6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialLoginRequest {
    pub provider: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

/// Error body returned by the auth endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
}

impl ApiErrorResponse {
    /// First message per field.
    pub fn field_errors(&self) -> BTreeMap<String, String> {
        self.errors
            .as_ref()
            .map(|errors| {
                errors
                    .iter()
                    .map(|(field, messages)| {
                        (field.clone(), messages.first().cloned().unwrap_or_default())
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl UserProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrantTypeRef {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub price: f64,
}

/// Per-session counters for one ticket category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrantTypeStat {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub stock: Option<i64>,
    #[serde(default)]
    pub used: Option<i64>,
    #[serde(default)]
    pub available: Option<i64>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub registered: Option<i64>,
    #[serde(default)]
    pub checkins: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registrant_type: Option<RegistrantTypeRef>,
}

fn default_active() -> bool {
    true
}

impl RegistrantTypeStat {
    /// Id used by the category filter.
    pub fn category_id(&self) -> i64 {
        self.registrant_type
            .as_ref()
            .map(|registrant| registrant.id)
            .unwrap_or(self.id)
    }

    pub fn display_name(&self) -> &str {
        match &self.registrant_type {
            Some(registrant) if self.name.is_empty() => &registrant.name,
            _ => &self.name,
        }
    }

    pub fn attendance_percentage(&self) -> Option<f64> {
        let registered = self.registered.filter(|count| *count > 0)?;
        let checkins = self.checkins.unwrap_or(0);
        Some(checkins as f64 / registered as f64 * 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEvent {
    pub id: i64,
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// Body of `GET event-sessions/{code}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionLookup {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub code: String,
    pub start_date: String,
    pub end_date: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub is_default: bool,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
    pub event: SessionEvent,
    #[serde(default)]
    pub registrant_types: Vec<RegistrantTypeStat>,
}

impl SessionLookup {
    pub fn total_registered(&self) -> i64 {
        self.registrant_types
            .iter()
            .map(|registrant| registrant.registered.unwrap_or(0))
            .sum()
    }
}

/// Credential-free check-in grant obtained from a session code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporarySessionGrant {
    pub session_id: i64,
    pub session_name: String,
    pub session_code: String,
    pub event_id: i64,
    pub event_name: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub start_date: String,
    pub end_date: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub registrant_types: Vec<RegistrantTypeStat>,
    #[serde(default)]
    pub total_registered: i64,
}

impl TemporarySessionGrant {
    pub fn issue(lookup: &SessionLookup, code: &str, issued_at: DateTime<Utc>) -> Self {
        Self {
            session_id: lookup.id,
            session_name: lookup.name.clone(),
            session_code: code.to_string(),
            event_id: lookup.event.id,
            event_name: lookup.event.name.clone(),
            issued_at,
            expires_at: issued_at + Duration::hours(TEMPORARY_SESSION_TTL_HOURS),
            start_date: lookup.start_date.clone(),
            end_date: lookup.end_date.clone(),
            start_time: lookup.start_time.clone(),
            end_time: lookup.end_time.clone(),
            registrant_types: lookup.registrant_types.clone(),
            total_registered: lookup.total_registered(),
        }
    }

    /// Copy with fresh session data. Code, issue and expiry times are kept.
    pub fn refreshed_from(&self, lookup: &SessionLookup) -> Self {
        Self {
            session_id: lookup.id,
            session_name: lookup.name.clone(),
            session_code: self.session_code.clone(),
            event_id: lookup.event.id,
            event_name: lookup.event.name.clone(),
            issued_at: self.issued_at,
            expires_at: self.expires_at,
            start_date: lookup.start_date.clone(),
            end_date: lookup.end_date.clone(),
            start_time: lookup.start_time.clone(),
            end_time: lookup.end_time.clone(),
            registrant_types: lookup.registrant_types.clone(),
            total_registered: lookup.total_registered(),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn time_remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).max(Duration::zero())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinGuest {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registrant_type: Option<RegistrantTypeRef>,
}

impl CheckinGuest {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSessionRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinRecord {
    pub id: i64,
    pub guest: CheckinGuest,
    pub event_session: EventSessionRef,
    pub method: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinRegistration {
    pub event: i64,
    pub event_session: i64,
    pub guest: String,
    pub registrant_type_ids: Vec<i64>,
}

/// Error body returned by `checkins/register`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckinErrorResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: i64,
    pub per_page: i64,
    pub total_items: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckinsPage {
    pub data: Vec<CheckinRecord>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub access_type: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsPage {
    pub data: Vec<Event>,
    pub pagination: Pagination,
}
