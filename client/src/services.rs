use std::sync::Arc;

use anyhow::Context;

use crate::{
    api::{
        client::build_http_client, ApiClient, AuthGateway, CheckinRegistrar, TokenProvider,
    },
    config::ClientConfig,
    state::{CategoryFilterStore, CredentialStore, RosterCache, TemporarySessionStore},
    translations::PhraseTable,
    utils::{
        storage::{FileStore, KeyValueStore},
        time::{Clock, SystemClock},
    },
};

/// Every store and gateway, wired once and shared through `Arc`.
pub struct Services {
    pub config: ClientConfig,
    pub storage: Arc<dyn KeyValueStore>,
    pub credentials: CredentialStore,
    pub temporary_sessions: Arc<TemporarySessionStore>,
    pub category_filters: CategoryFilterStore,
    pub auth: Arc<AuthGateway>,
    pub api: Arc<ApiClient>,
    pub checkins: CheckinRegistrar,
}

impl Services {
    pub fn from_config(config: ClientConfig) -> anyhow::Result<Self> {
        let storage = FileStore::open(&config.storage_path).with_context(|| {
            format!("Failed to open state file {}", config.storage_path.display())
        })?;
        Self::new(config, Arc::new(storage), Arc::new(SystemClock))
    }

    pub fn new(
        config: ClientConfig,
        storage: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let phrases = match &config.phrases_path {
            Some(path) => PhraseTable::from_path(path)?,
            None => PhraseTable::default(),
        };
        let http = build_http_client(config.request_timeout)?;

        let credentials = CredentialStore::new(storage.clone());
        let temporary_sessions = Arc::new(TemporarySessionStore::new(storage.clone(), clock));
        let auth = Arc::new(AuthGateway::new(
            http.clone(),
            &config.api_base_url,
            config.service_account.clone(),
            credentials.clone(),
            temporary_sessions.clone(),
        ));
        let tokens: Arc<dyn TokenProvider> = auth.clone();
        let api = Arc::new(ApiClient::new(http, &config.api_base_url, tokens));
        let checkins = CheckinRegistrar::new(
            api.clone(),
            auth.clone(),
            Arc::new(phrases),
            RosterCache::new(storage.clone()),
        );

        tracing::debug!(
            api_base_url = %config.api_base_url,
            service_account = config.service_account.is_some(),
            "Client services initialized"
        );

        Ok(Self {
            category_filters: CategoryFilterStore::new(storage.clone()),
            config,
            storage,
            credentials,
            temporary_sessions,
            auth,
            api,
            checkins,
        })
    }
}
