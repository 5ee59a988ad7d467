//! BrokerDesk console runner.
//!
//! Resolves the signed-in session against the hosted backend, loads the
//! notification inbox, and follows realtime deliveries until interrupted.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{EnvFilter, fmt};

use brokerdesk_core::config::AppConfig;
use brokerdesk_core::error::AppError;
use brokerdesk_core::types::pagination::PageRequest;
use brokerdesk_core::types::query::Query;
use brokerdesk_entity::Notification;
use brokerdesk_gateway::{RestGateway, WsRealtimeSource};
use brokerdesk_realtime::DeliveryAdapter;
use brokerdesk_view::notice::NoticeEvent;
use brokerdesk_view::{CollectionStore, NoticeBoard, Session};

#[tokio::main]
async fn main() {
    let env = std::env::var("BROKERDESK_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "BrokerDesk stopped with an error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting BrokerDesk v{}", env!("CARGO_PKG_VERSION"));

    let gateway = Arc::new(RestGateway::new(&config.gateway)?);
    let session = Session::resolve(gateway.as_ref()).await?;

    let notices = Arc::new(NoticeBoard::new(config.views.notice_capacity));
    let inbox = Arc::new(
        CollectionStore::<Notification>::scoped(gateway.clone(), &session, "user_id")
            .with_notices(notices.clone()),
    );

    let first_page = Query::new().paginate(PageRequest::first(config.views.page_size));
    match inbox.load(Some(&first_page)).await {
        Ok(items) => {
            let unread = items.iter().filter(|n| n.is_unread()).count();
            tracing::info!(total = items.len(), unread, "Inbox loaded");
        }
        Err(e) => tracing::warn!(error = %e, "Inbox unavailable, continuing with live deliveries"),
    }

    let adapter = if config.realtime.enabled {
        let source = Arc::new(WsRealtimeSource::new(&config.gateway, &config.realtime)?);
        Some(DeliveryAdapter::spawn(
            source,
            &session,
            inbox.clone(),
            &config.realtime,
        ))
    } else {
        tracing::info!("Realtime delivery disabled");
        None
    };

    follow(adapter.as_ref(), &notices).await;

    if let Some(adapter) = &adapter {
        adapter.shutdown().await;
    }
    session.teardown(gateway.as_ref()).await?;
    tracing::info!("BrokerDesk stopped");
    Ok(())
}

/// Log alerts and notices until a shutdown signal arrives.
async fn follow(adapter: Option<&DeliveryAdapter>, notices: &NoticeBoard) {
    let mut alerts = adapter.map(|a| a.alerts());
    let mut notice_rx = notices.subscribe();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received");
                break;
            }
            alert = next_alert(&mut alerts) => match alert {
                Ok(alert) => tracing::info!(
                    id = %alert.id,
                    priority = alert.priority.as_str(),
                    title = alert.title.as_deref().unwrap_or_default(),
                    "New notification"
                ),
                Err(RecvError::Lagged(skipped)) => tracing::warn!(skipped, "Alert listener lagged"),
                Err(RecvError::Closed) => alerts = None,
            },
            event = notice_rx.recv() => match event {
                Ok(NoticeEvent::Posted(notice)) => {
                    tracing::warn!(kind = %notice.kind, message = %notice.message, "Notice");
                }
                Ok(NoticeEvent::Dismissed(_)) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
        }
    }
}

async fn next_alert(
    alerts: &mut Option<tokio::sync::broadcast::Receiver<brokerdesk_realtime::Alert>>,
) -> Result<brokerdesk_realtime::Alert, RecvError> {
    match alerts {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
