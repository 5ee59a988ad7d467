//! Integration tests for selection, scoring and the pipeline summary.

use std::sync::Arc;

use brokerdesk_core::traits::gateway::DataGateway;
use brokerdesk_entity::Lead;
use brokerdesk_realtime::DeliveryAdapter;
use brokerdesk_view::{
    CollectionStore, LeadScoring, PipelineSummary, SelectionController, SelectionState,
};

use crate::helpers::{self, TestApp};

async fn loaded_leads(app: &TestApp) -> Arc<CollectionStore<Lead>> {
    app.backend.seed(
        "leads",
        [
            helpers::lead_row("1", "Maria Rodriguez", "new", 250_000.0, "2026-02-01T09:00:00Z"),
            helpers::lead_row("2", "John Chen", "closed", 900_000.0, "2026-02-02T09:00:00Z"),
        ],
    );
    let store = Arc::new(
        CollectionStore::<Lead>::scoped(app.backend.clone(), &app.session, "user_id")
            .with_notices(app.notices.clone()),
    );
    store.load(None).await.expect("load leads");
    store
}

#[tokio::test]
async fn test_deleting_selected_lead_clears_selection() {
    let app = TestApp::new().await;
    let store = loaded_leads(&app).await;
    let selection = SelectionController::new(store.clone(), Arc::new(LeadScoring::default()));

    selection.select(Some("2"));
    assert_eq!(selection.current().map(|l| l.name), Some("John Chen".to_string()));

    app.dispatcher().delete(&store, "2").await.unwrap();

    assert!(selection.current().is_none());
    assert_eq!(selection.state(), SelectionState::Unselected);
}

#[tokio::test]
async fn test_realtime_delete_clears_selection() {
    let app = TestApp::new().await;
    let store = loaded_leads(&app).await;
    let selection = SelectionController::new(store.clone(), Arc::new(LeadScoring::default()));
    let adapter = DeliveryAdapter::spawn(
        app.backend.clone(),
        &app.session,
        store.clone(),
        &app.realtime_config(),
    );
    helpers::eventually(|| app.backend.subscriber_count() == 1).await;

    selection.select(Some("1"));
    app.backend.delete("leads", "1").await.unwrap();

    helpers::eventually(|| !store.contains("1")).await;
    assert!(selection.current().is_none());
    adapter.shutdown().await;
}

#[tokio::test]
async fn test_scores_and_summary_stay_in_bounds() {
    let app = TestApp::new().await;
    let store = loaded_leads(&app).await;
    let scoring = LeadScoring::default();
    let selection = SelectionController::new(store.clone(), Arc::new(scoring.clone()));

    selection.select(Some("1"));
    let score = selection.current_score().expect("score for selected lead");
    assert!(score.score <= 100);
    assert!(score.breakdown.values().all(|v| *v <= 100));

    let summary = PipelineSummary::from_leads(&store.items(), &scoring);
    assert_eq!(summary.total, 2);
    assert_eq!(summary.by_status["closed"], 1);
    assert_eq!(summary.by_status["qualified"], 0);
    assert!((summary.conversion_rate - 0.5).abs() < f64::EPSILON);
    let average = summary.average_score.expect("average score");
    assert!((0.0..=100.0).contains(&average));
}
