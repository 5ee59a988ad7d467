//! Shared test helpers for integration tests.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};

use brokerdesk_core::config::{RealtimeConfig, ViewConfig};
use brokerdesk_gateway::MemoryBackend;
use brokerdesk_view::{ActionDispatcher, NoticeBoard, Session};

/// Signed-in user used by every scenario.
pub const USER: &str = "agent-1";

/// Test application context
pub struct TestApp {
    /// In-memory backend standing in for the hosted service
    pub backend: Arc<MemoryBackend>,
    /// Resolved session for [`USER`]
    pub session: Session,
    /// Notice board shared by stores and dispatchers
    pub notices: Arc<NoticeBoard>,
    /// View settings as loaded from `config/default.toml`
    pub views: ViewConfig,
}

impl TestApp {
    /// Create a backend with [`USER`] signed in and resolve the session.
    pub async fn new() -> Self {
        let backend = Arc::new(MemoryBackend::default());
        backend.sign_in(USER);
        let session = Session::resolve(backend.as_ref())
            .await
            .expect("Failed to resolve session");

        Self {
            backend,
            session,
            notices: Arc::new(NoticeBoard::default()),
            views: ViewConfig::default(),
        }
    }

    /// Dispatcher tied to the session lifetime.
    pub fn dispatcher(&self) -> ActionDispatcher {
        ActionDispatcher::new(
            self.backend.clone(),
            self.notices.clone(),
            self.session.child_token(),
        )
    }

    /// Realtime settings with short, deterministic reconnect delays.
    pub fn realtime_config(&self) -> RealtimeConfig {
        RealtimeConfig {
            reconnect_initial_ms: 10,
            reconnect_max_ms: 50,
            reconnect_jitter: 0.0,
            ..RealtimeConfig::default()
        }
    }
}

/// A lead row owned by [`USER`].
pub fn lead_row(id: &str, name: &str, status: &str, value: f64, created_at: &str) -> Value {
    json!({
        "id": id,
        "user_id": USER,
        "name": name,
        "status": status,
        "estimated_value": value,
        "created_at": created_at,
    })
}

/// A notification row for `user_id`.
pub fn notification_row(id: &str, user_id: &str, priority: &str, created_at: &str) -> Value {
    json!({
        "id": id,
        "user_id": user_id,
        "type": "info",
        "priority": priority,
        "title": format!("Notification {id}"),
        "message": "Something happened",
        "is_read": false,
        "created_at": created_at,
    })
}

/// Poll `check` until it holds, failing after about a second.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}
