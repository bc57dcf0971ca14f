use std::sync::Arc;

use crate::{
    api::types::UserProfile,
    error::StorageError,
    utils::storage::{KeyValueStore, StorageOp},
};

use super::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_PROFILE_KEY};

#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
    pub profile: Option<UserProfile>,
}

/// Durable home of the signed-in user's tokens and cached profile.
#[derive(Clone)]
pub struct CredentialStore {
    storage: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Returns `None` unless both tokens are stored. All three keys are read
    /// in one snapshot so a concurrent `save` is seen whole or not at all.
    pub fn load(&self) -> Result<Option<Credential>, StorageError> {
        let mut values = self
            .storage
            .get_many(&[ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_PROFILE_KEY])?
            .into_iter();
        let (access, refresh, stored_profile) = (
            values.next().flatten(),
            values.next().flatten(),
            values.next().flatten(),
        );
        let (access_token, refresh_token) = match (access, refresh) {
            (Some(access), Some(refresh)) => (access, refresh),
            (None, None) => return Ok(None),
            _ => {
                tracing::warn!("Ignoring stored credential with a single token");
                return Ok(None);
            }
        };

        let profile = match stored_profile {
            Some(raw) => match serde_json::from_str::<UserProfile>(&raw) {
                Ok(profile) => Some(profile),
                Err(err) => {
                    tracing::warn!(error = %err, "Discarding undecodable user profile");
                    None
                }
            },
            None => None,
        };

        Ok(Some(Credential {
            access_token,
            refresh_token,
            profile,
        }))
    }

    pub fn access_token(&self) -> Result<Option<String>, StorageError> {
        Ok(self.load()?.map(|credential| credential.access_token))
    }

    pub fn refresh_token(&self) -> Result<Option<String>, StorageError> {
        Ok(self.load()?.map(|credential| credential.refresh_token))
    }

    pub fn save(&self, credential: &Credential) -> Result<(), StorageError> {
        let mut ops = vec![
            StorageOp::set(ACCESS_TOKEN_KEY, credential.access_token.as_str()),
            StorageOp::set(REFRESH_TOKEN_KEY, credential.refresh_token.as_str()),
        ];
        match &credential.profile {
            Some(profile) => ops.push(StorageOp::set(
                USER_PROFILE_KEY,
                serde_json::to_string(profile)?,
            )),
            None => ops.push(StorageOp::remove(USER_PROFILE_KEY)),
        }
        self.storage.write_batch(ops)
    }

    /// Replaces the cached profile. Tokens are left untouched.
    pub fn save_profile(&self, profile: &UserProfile) -> Result<(), StorageError> {
        self.storage
            .set(USER_PROFILE_KEY, &serde_json::to_string(profile)?)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.write_batch(vec![
            StorageOp::remove(ACCESS_TOKEN_KEY),
            StorageOp::remove(REFRESH_TOKEN_KEY),
            StorageOp::remove(USER_PROFILE_KEY),
        ])
    }
}
