//! Token capability the request executor depends on.
//!
//! The executor never talks to the auth gateway directly; it only needs a
//! current token, a way to refresh it once, and a hook for when the session
//! is beyond repair.

use async_trait::async_trait;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Current bearer token, if any.
    async fn access_token(&self) -> Option<String>;

    /// Rotates the stored tokens. Returns `false` on any failure.
    async fn refresh_token(&self) -> bool;

    /// Called once the session cannot be recovered.
    async fn on_auth_failure(&self);
}
