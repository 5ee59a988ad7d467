//! Integration tests for realtime notification delivery and read state.

use std::sync::Arc;

use brokerdesk_core::traits::gateway::DataGateway;
use brokerdesk_entity::{Notification, NotificationPriority};
use brokerdesk_gateway::MemoryBackend;
use brokerdesk_realtime::DeliveryAdapter;
use brokerdesk_view::CollectionStore;

use crate::helpers::{self, TestApp};

fn inbox(app: &TestApp) -> Arc<CollectionStore<Notification>> {
    Arc::new(
        CollectionStore::<Notification>::scoped(app.backend.clone(), &app.session, "user_id")
            .with_notices(app.notices.clone()),
    )
}

async fn wait_subscribed(backend: &MemoryBackend) {
    helpers::eventually(|| backend.subscriber_count() == 1).await;
}

#[tokio::test]
async fn test_urgent_push_lands_at_head_alerts_and_marks_read() {
    let app = TestApp::new().await;
    app.backend.seed(
        "notifications",
        [helpers::notification_row("n0", helpers::USER, "normal", "2026-03-02T08:00:00Z")],
    );
    let store = inbox(&app);
    store.load(None).await.expect("load inbox");

    let adapter = DeliveryAdapter::spawn(
        app.backend.clone(),
        &app.session,
        store.clone(),
        &app.realtime_config(),
    );
    let mut alerts = adapter.alerts();
    wait_subscribed(&app.backend).await;

    // Older timestamp than n0: a live insert still goes to the head.
    app.backend
        .insert(
            "notifications",
            helpers::notification_row("n1", helpers::USER, "urgent", "2026-03-01T08:00:00Z"),
        )
        .await
        .unwrap();

    helpers::eventually(|| store.contains("n1")).await;
    assert_eq!(store.items()[0].id, "n1");
    let alert = alerts.recv().await.unwrap();
    assert_eq!(alert.id, "n1");
    assert_eq!(alert.priority, NotificationPriority::Urgent);

    app.dispatcher().mark_read(&store, "n1").await.unwrap();

    let n1 = store.get("n1").unwrap();
    assert!(n1.is_read);
    assert_eq!(store.len(), 2);
    adapter.shutdown().await;
}

#[tokio::test]
async fn test_update_push_does_not_duplicate() {
    let app = TestApp::new().await;
    app.backend.seed(
        "notifications",
        [helpers::notification_row("n1", helpers::USER, "low", "2026-03-01T08:00:00Z")],
    );
    let store = inbox(&app);
    store.load(None).await.expect("load inbox");
    let adapter = DeliveryAdapter::spawn(
        app.backend.clone(),
        &app.session,
        store.clone(),
        &app.realtime_config(),
    );
    let mut alerts = adapter.alerts();
    wait_subscribed(&app.backend).await;

    app.backend
        .update("notifications", "n1", serde_json::json!({"title": "Edited"}))
        .await
        .unwrap();

    helpers::eventually(|| store.get("n1").is_some_and(|n| n.title == "Edited")).await;
    assert_eq!(store.len(), 1);
    assert!(alerts.try_recv().is_err());

    let reloaded = store.load(None).await.unwrap();
    assert_eq!(reloaded.len(), 1);
    adapter.shutdown().await;
}

#[tokio::test]
async fn test_other_users_pushes_are_ignored() {
    let app = TestApp::new().await;
    let store = inbox(&app);
    let adapter = DeliveryAdapter::spawn(
        app.backend.clone(),
        &app.session,
        store.clone(),
        &app.realtime_config(),
    );
    wait_subscribed(&app.backend).await;

    app.backend
        .insert(
            "notifications",
            helpers::notification_row("x", "agent-2", "urgent", "2026-03-01T08:00:00Z"),
        )
        .await
        .unwrap();
    app.backend
        .insert(
            "notifications",
            helpers::notification_row("mine", helpers::USER, "low", "2026-03-01T08:00:00Z"),
        )
        .await
        .unwrap();

    helpers::eventually(|| store.contains("mine")).await;
    assert!(!store.contains("x"));
    adapter.shutdown().await;
}

#[tokio::test]
async fn test_sign_out_stops_delivery_and_clears_inbox() {
    let app = TestApp::new().await;
    app.backend.seed(
        "notifications",
        [helpers::notification_row("n1", helpers::USER, "low", "2026-03-01T08:00:00Z")],
    );
    let store = inbox(&app);
    store.load(None).await.expect("load inbox");
    let adapter = DeliveryAdapter::spawn(
        app.backend.clone(),
        &app.session,
        store.clone(),
        &app.realtime_config(),
    );
    wait_subscribed(&app.backend).await;

    app.session.teardown(app.backend.as_ref()).await.unwrap();

    helpers::eventually(|| !adapter.is_running()).await;
    assert!(store.is_empty());
    assert_eq!(app.backend.subscriber_count(), 0);
}

#[tokio::test]
async fn test_push_during_slow_reload_survives_the_reload() {
    let app = TestApp::new().await;
    app.backend.seed(
        "notifications",
        [helpers::notification_row("n0", helpers::USER, "normal", "2026-03-02T08:00:00Z")],
    );
    let store = inbox(&app);
    let adapter = DeliveryAdapter::spawn(
        app.backend.clone(),
        &app.session,
        store.clone(),
        &app.realtime_config(),
    );
    wait_subscribed(&app.backend).await;

    app.backend.set_read_latency(std::time::Duration::from_millis(100));
    let reload = tokio::spawn({
        let store = store.clone();
        async move { store.load(None).await }
    });
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    app.backend
        .insert(
            "notifications",
            helpers::notification_row("n9", helpers::USER, "normal", "2026-03-03T08:00:00Z"),
        )
        .await
        .unwrap();
    helpers::eventually(|| store.contains("n9")).await;

    let items = reload.await.unwrap().expect("reload inbox");
    let ids: Vec<&str> = items.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["n9", "n0"]);
    assert!(store.contains("n9"));

    adapter.shutdown().await;
}
