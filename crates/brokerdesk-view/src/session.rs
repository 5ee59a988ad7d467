//! Explicit session handle.
//!
//! A session is resolved once at start from the backend's auth context and
//! passed into every store, dispatcher, and realtime adapter that needs the
//! user identity. Teardown cancels every token derived from it.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use brokerdesk_core::error::AppError;
use brokerdesk_core::result::AppResult;
use brokerdesk_core::traits::auth::{AuthProvider, UserIdentity};

#[derive(Debug)]
struct SessionInner {
    user: UserIdentity,
    token: CancellationToken,
}

/// The signed-in user's session. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Resolve the current session.
    ///
    /// Fails with an authentication error when nobody is signed in.
    pub async fn resolve(auth: &dyn AuthProvider) -> AppResult<Self> {
        let user = auth
            .current_user()
            .await?
            .ok_or_else(|| AppError::authentication("No user is signed in"))?;

        info!(user_id = %user.id, "Session resolved");
        Ok(Self::for_user(user))
    }

    /// Build a session for a known identity.
    pub fn for_user(user: UserIdentity) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                user,
                token: CancellationToken::new(),
            }),
        }
    }

    /// The signed-in user's id.
    pub fn user_id(&self) -> &str {
        &self.inner.user.id
    }

    /// The signed-in user.
    pub fn user(&self) -> &UserIdentity {
        &self.inner.user
    }

    /// A token cancelled when the session is torn down.
    pub fn child_token(&self) -> CancellationToken {
        self.inner.token.child_token()
    }

    /// Whether the session is still live.
    pub fn is_active(&self) -> bool {
        !self.inner.token.is_cancelled()
    }

    /// Wait until the session is torn down.
    pub async fn ended(&self) {
        self.inner.token.cancelled().await;
    }

    /// End the session: stop everything derived from it, then sign out.
    ///
    /// Derived tokens are cancelled even when signing out fails.
    pub async fn teardown(&self, auth: &dyn AuthProvider) -> AppResult<()> {
        self.inner.token.cancel();
        info!(user_id = %self.user_id(), "Session torn down");
        auth.sign_out().await
    }
}
