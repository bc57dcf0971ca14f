use anyhow::anyhow;
use std::{env, fmt, path::PathBuf, time::Duration};

use crate::{api::client::normalize_base_url, utils::secret::mask_secret};

pub const DEFAULT_API_BASE_URL: &str = "https://tikit.cl/api/";
pub const DEFAULT_STORAGE_PATH: &str = "tikit-state.json";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Provisioned identity used for session-code flows.
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceAccount {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("email", &self.email)
            .field("password", &mask_secret(&self.password))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub service_account: Option<ServiceAccount>,
    pub storage_path: PathBuf,
    pub request_timeout: Duration,
    pub phrases_path: Option<PathBuf>,
}

impl ClientConfig {
    pub fn new(api_base_url: impl AsRef<str>) -> Self {
        Self {
            api_base_url: normalize_base_url(api_base_url.as_ref()),
            service_account: None,
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            phrases_path: None,
        }
    }

    pub fn with_service_account(
        mut self,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.service_account = Some(ServiceAccount {
            email: email.into(),
            password: password.into(),
        });
        self
    }

    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = path.into();
        self
    }

    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `load` passes the process
    /// environment. Service credentials fall back to build-time values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let raw_base_url =
            lookup("TIKIT_API_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let api_base_url = normalize_base_url(&raw_base_url);
        reqwest::Url::parse(&api_base_url)
            .map_err(|_| anyhow!("Invalid TIKIT_API_BASE_URL value: {}", raw_base_url))?;

        let email = lookup("TIKIT_SERVICE_EMAIL")
            .or_else(|| option_env!("TIKIT_SERVICE_EMAIL").map(str::to_string))
            .filter(|v| !v.trim().is_empty());
        let password = lookup("TIKIT_SERVICE_PASSWORD")
            .or_else(|| option_env!("TIKIT_SERVICE_PASSWORD").map(str::to_string))
            .filter(|v| !v.is_empty());
        let service_account = match (email, password) {
            (Some(email), Some(password)) => Some(ServiceAccount { email, password }),
            (None, None) => None,
            _ => {
                tracing::warn!("Service account is partially configured; ignoring it");
                None
            }
        };

        let storage_path = lookup("TIKIT_STORAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_PATH));

        let request_timeout_secs = match lookup("TIKIT_REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| anyhow!("Invalid TIKIT_REQUEST_TIMEOUT_SECS value: {}", raw))?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        let phrases_path = lookup("TIKIT_PHRASES_PATH").map(PathBuf::from);

        Ok(ClientConfig {
            api_base_url,
            service_account,
            storage_path,
            request_timeout: Duration::from_secs(request_timeout_secs),
            phrases_path,
        })
    }
}
