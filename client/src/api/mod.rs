pub mod auth;
pub mod checkins;
pub mod client;
pub mod provider;
mod sessions;
pub mod types;

pub use auth::AuthGateway;
pub use checkins::{CheckinAuth, CheckinContext, CheckinRegistrar};
pub use client::{ApiClient, ApiRequest, ApiResponse, Authorization};
pub use provider::TokenProvider;
pub use types::*;
