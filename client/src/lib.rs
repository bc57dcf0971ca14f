//! Session and request gateway for the Tikit check-in client.
//!
//! Stores credentials and temporary session grants, authorizes API calls with
//! a single refresh-and-retry on 401, and registers guest check-ins.

pub mod api;
pub mod config;
pub mod error;
pub mod scan;
pub mod services;
pub mod state;
pub mod translations;
pub mod utils;

pub use api::{
    ApiClient, ApiRequest, ApiResponse, AuthGateway, Authorization, CheckinAuth, CheckinContext,
    CheckinRegistrar, TokenProvider,
};
pub use config::{ClientConfig, ServiceAccount};
pub use error::{ApiError, CheckinError, StorageError};
pub use scan::{ScanOutcome, ScanReceiver, ScanSession};
pub use services::Services;
pub use translations::{PhraseTable, Translation};
