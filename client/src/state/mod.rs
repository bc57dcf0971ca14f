//! Persisted client state, one store per concern over a shared key-value
//! backend.

pub mod category_filter;
pub mod credentials;
pub mod roster;
pub mod temporary_session;

pub use category_filter::{CategoryFilter, CategoryFilterStore};
pub use credentials::{Credential, CredentialStore};
pub use roster::RosterCache;
pub use temporary_session::{TemporarySessionEvent, TemporarySessionStore};

pub const ACCESS_TOKEN_KEY: &str = "token";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const USER_PROFILE_KEY: &str = "userProfile";
pub const TEMPORARY_SESSION_KEY: &str = "temporarySessionData";
pub const CHECKINS_CACHE_PREFIX: &str = "checkins_cache_";
pub const CATEGORY_FILTER_PREFIX: &str = "categoryFilter_";

pub fn checkins_cache_key(event_id: i64, session_id: i64) -> String {
    format!("{}{}_{}", CHECKINS_CACHE_PREFIX, event_id, session_id)
}

pub fn category_filter_key(session_id: i64) -> String {
    format!("{}{}", CATEGORY_FILTER_PREFIX, session_id)
}
