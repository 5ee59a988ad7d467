//! Integration tests for loading and filtering collections.

use std::sync::Arc;

use brokerdesk_core::error::ErrorKind;
use brokerdesk_entity::Lead;
use brokerdesk_view::{CollectionStore, FilterCriteria, apply};

use crate::helpers::{self, TestApp};

fn seed_pipeline(app: &TestApp) {
    app.backend.seed(
        "leads",
        [
            helpers::lead_row("1", "Maria Rodriguez", "new", 250_000.0, "2026-02-01T09:00:00Z"),
            helpers::lead_row("2", "John Chen", "closed", 900_000.0, "2026-02-02T09:00:00Z"),
            helpers::lead_row("3", "Mariam Okafor", "qualified", 40_000.0, "2026-02-03T09:00:00Z"),
        ],
    );
}

#[tokio::test]
async fn test_status_and_text_filter_over_loaded_leads() {
    let app = TestApp::new().await;
    seed_pipeline(&app);
    let store = CollectionStore::<Lead>::scoped(app.backend.clone(), &app.session, "user_id");

    let leads = store.load(None).await.expect("load leads");
    let criteria = FilterCriteria::new()
        .equals("status", "new")
        .search("maria", ["name"]);
    let result = apply(&leads, &criteria);

    let ids: Vec<&str> = result.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, vec!["1"]);
}

#[tokio::test]
async fn test_configured_search_fields_drive_the_text_box() {
    let app = TestApp::new().await;
    seed_pipeline(&app);
    let store = CollectionStore::<Lead>::scoped(app.backend.clone(), &app.session, "user_id");
    let leads = store.load(None).await.expect("load leads");

    let criteria = FilterCriteria::new().search_in::<Lead>("mari", &app.views);
    let result = apply(&leads, &criteria);

    let ids: Vec<&str> = result.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, vec!["3", "1"]);
}

#[tokio::test]
async fn test_empty_criteria_returns_everything_newest_first() {
    let app = TestApp::new().await;
    seed_pipeline(&app);
    let store = CollectionStore::<Lead>::scoped(app.backend.clone(), &app.session, "user_id");

    let leads = store.load(None).await.expect("load leads");
    let result = apply(&leads, &FilterCriteria::new());

    let ids: Vec<&str> = result.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, vec!["3", "2", "1"]);
}

#[tokio::test]
async fn test_range_filter_keeps_only_matching_values() {
    let app = TestApp::new().await;
    seed_pipeline(&app);
    let store = CollectionStore::<Lead>::scoped(app.backend.clone(), &app.session, "user_id");
    let leads = store.load(None).await.expect("load leads");

    let criteria = FilterCriteria::new().range("estimated_value", Some(100_000.0), None);
    let result = apply(&leads, &criteria);

    assert_eq!(result.len(), 2);
    assert!(result.iter().all(|l| l.estimated_value >= 100_000.0));
}

#[tokio::test]
async fn test_load_scopes_to_session_user() {
    let app = TestApp::new().await;
    seed_pipeline(&app);
    let mut foreign = helpers::lead_row("9", "Someone Else", "new", 1.0, "2026-02-04T09:00:00Z");
    foreign["user_id"] = "agent-2".into();
    app.backend.seed("leads", [foreign]);

    let store = CollectionStore::<Lead>::scoped(app.backend.clone(), &app.session, "user_id");
    let leads = store.load(None).await.expect("load leads");

    assert_eq!(leads.len(), 3);
    assert!(!store.contains("9"));
}

#[tokio::test]
async fn test_failed_refresh_keeps_last_good_items() {
    let app = TestApp::new().await;
    seed_pipeline(&app);
    let store = Arc::new(
        CollectionStore::<Lead>::scoped(app.backend.clone(), &app.session, "user_id")
            .with_notices(app.notices.clone()),
    );
    store.load(None).await.expect("first load");

    app.backend.set_fail_reads(true);
    let err = store.load(None).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Fetch);
    assert_eq!(store.len(), 3);
    assert!(store.status().last_error.is_some());
    assert_eq!(app.notices.active().len(), 1);
}
