//! WebSocket client for the hosted realtime channel.
//!
//! Each subscription opens its own socket, joins a channel configured for
//! row changes on one collection, keeps it alive with heartbeats, and
//! forwards the change payloads. A closed socket closes the subscription's
//! event channel; reconnecting is the caller's job.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use reqwest::Url;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use brokerdesk_core::config::{GatewayConfig, RealtimeConfig};
use brokerdesk_core::error::{AppError, ErrorKind};
use brokerdesk_core::result::AppResult;
use brokerdesk_core::traits::realtime::{RealtimeSource, Subscription, SubscriptionHandle};

/// Protocol version requested from the realtime server.
const PROTOCOL_VSN: &str = "1.0.0";

/// Realtime source speaking the phoenix-channel websocket protocol.
#[derive(Debug)]
pub struct WsRealtimeSource {
    /// Socket endpoint.
    socket_url: Url,
    /// Exposed schema.
    schema: String,
    /// Token sent on join.
    access_token: Option<String>,
    /// Heartbeat period.
    heartbeat: Duration,
    /// Event channel buffer.
    buffer_size: usize,
    /// Next subscription handle.
    next_handle: AtomicU64,
    /// Handle → cancellation of the socket task.
    tasks: Arc<DashMap<u64, CancellationToken>>,
}

impl WsRealtimeSource {
    /// Create a source from configuration.
    pub fn new(gateway: &GatewayConfig, realtime: &RealtimeConfig) -> AppResult<Self> {
        Ok(Self {
            socket_url: socket_url(&gateway.url, &gateway.api_key)?,
            schema: gateway.schema.clone(),
            access_token: gateway.access_token.clone(),
            heartbeat: Duration::from_secs(realtime.heartbeat_interval_seconds.max(1)),
            buffer_size: realtime.channel_buffer_size.max(1),
            next_handle: AtomicU64::new(1),
            tasks: Arc::new(DashMap::new()),
        })
    }

    /// The websocket endpoint this source connects to.
    pub fn socket_url(&self) -> &Url {
        &self.socket_url
    }
}

/// Derive the websocket endpoint from the project URL.
pub fn socket_url(base: &str, api_key: &str) -> AppResult<Url> {
    let mut url = Url::parse(base.trim_end_matches('/'))
        .map_err(|e| AppError::configuration(format!("Invalid gateway url '{base}': {e}")))?;

    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(AppError::configuration(format!(
                "Unsupported realtime scheme '{other}'"
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| AppError::configuration("Failed to derive websocket scheme"))?;
    url.set_path("realtime/v1/websocket");
    url.query_pairs_mut()
        .clear()
        .append_pair("apikey", api_key)
        .append_pair("vsn", PROTOCOL_VSN);
    Ok(url)
}

/// Build the channel join frame.
pub fn join_frame(
    schema: &str,
    collection: &str,
    filter: &str,
    access_token: Option<&str>,
    join_ref: u64,
) -> String {
    let mut change = json!({
        "event": "*",
        "schema": schema,
        "table": collection,
    });
    if !filter.is_empty() {
        change["filter"] = json!(filter);
    }

    json!({
        "topic": channel_topic(schema, collection, filter),
        "event": "phx_join",
        "payload": {
            "config": {
                "broadcast": { "self": false },
                "presence": { "key": "" },
                "postgres_changes": [change],
            },
            "access_token": access_token,
        },
        "ref": join_ref.to_string(),
        "join_ref": join_ref.to_string(),
    })
    .to_string()
}

fn channel_topic(schema: &str, collection: &str, filter: &str) -> String {
    if filter.is_empty() {
        format!("realtime:{schema}:{collection}")
    } else {
        format!("realtime:{schema}:{collection}:{filter}")
    }
}

fn heartbeat_frame(seq: u64) -> String {
    json!({
        "topic": "phoenix",
        "event": "heartbeat",
        "payload": {},
        "ref": format!("hb-{seq}"),
    })
    .to_string()
}

/// Extract a row-change payload from an inbound frame.
///
/// Control frames (replies, presence, system) yield `None`. Frames that are
/// not valid JSON are forwarded untouched so the consumer can log the
/// decode failure.
pub fn extract_change(frame: &str) -> Option<String> {
    let envelope: serde_json::Value = match serde_json::from_str(frame) {
        Ok(v) => v,
        Err(_) => return Some(frame.to_string()),
    };

    match envelope.get("event").and_then(|e| e.as_str()) {
        Some("postgres_changes") => envelope
            .get("payload")
            .and_then(|p| p.get("data"))
            .map(|data| data.to_string()),
        Some("phx_error") => {
            warn!(frame, "Realtime channel reported an error");
            None
        }
        _ => None,
    }
}

#[async_trait]
impl RealtimeSource for WsRealtimeSource {
    async fn subscribe(&self, collection: &str, filter: &str) -> AppResult<Subscription> {
        let (socket, _) = connect_async(self.socket_url.as_str()).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::ServiceUnavailable,
                format!("Realtime connection failed: {e}"),
                e,
            )
        })?;
        let (mut sink, mut stream) = socket.split();

        let handle = SubscriptionHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        let join = join_frame(
            &self.schema,
            collection,
            filter,
            self.access_token.as_deref(),
            handle.0,
        );
        sink.send(Message::Text(join.into())).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::ServiceUnavailable,
                format!("Realtime join failed: {e}"),
                e,
            )
        })?;

        let (tx, rx) = mpsc::channel(self.buffer_size);
        let cancel = CancellationToken::new();
        self.tasks.insert(handle.0, cancel.clone());

        let tasks = self.tasks.clone();
        let heartbeat = self.heartbeat;
        let topic = channel_topic(&self.schema, collection, filter);
        info!(%handle, topic = %topic, "Realtime channel joined");

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(heartbeat);
            ticker.tick().await;
            let mut seq = 0u64;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        let leave = json!({
                            "topic": topic,
                            "event": "phx_leave",
                            "payload": {},
                            "ref": "leave",
                        });
                        let _ = sink.send(Message::Text(leave.to_string().into())).await;
                        let _ = sink.close().await;
                        break;
                    }
                    _ = ticker.tick() => {
                        seq += 1;
                        if let Err(e) = sink.send(Message::Text(heartbeat_frame(seq).into())).await {
                            warn!(%handle, error = %e, "Realtime heartbeat failed");
                            break;
                        }
                    }
                    frame = stream.next() => match frame {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(payload) = extract_change(text.as_str()) {
                                if tx.send(payload).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            debug!(%handle, "Realtime socket closed by server");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!(%handle, error = %e, "Realtime socket error");
                            break;
                        }
                    },
                }
            }

            tasks.remove(&handle.0);
            debug!(%handle, "Realtime socket task ended");
        });

        Ok(Subscription { handle, events: rx })
    }

    async fn unsubscribe(&self, handle: SubscriptionHandle) {
        if let Some((_, cancel)) = self.tasks.remove(&handle.0) {
            cancel.cancel();
        }
    }
}
