//! Authentication context trait.

use async_trait::async_trait;

use crate::result::AppResult;

/// Identity of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UserIdentity {
    /// Stable user identifier, used as the scoping key for queries and
    /// subscriptions.
    pub id: String,
    /// Email address, if the backend exposes it.
    #[serde(default)]
    pub email: Option<String>,
}

/// Trait for the backend's authentication context.
#[async_trait]
pub trait AuthProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Resolve the current user, or `None` if nobody is signed in.
    async fn current_user(&self) -> AppResult<Option<UserIdentity>>;

    /// End the current session on the backend.
    async fn sign_out(&self) -> AppResult<()>;
}
