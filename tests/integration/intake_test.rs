//! Integration tests for lead intake, listing submission and inquiries.

use std::sync::Arc;

use serde_json::json;

use brokerdesk_core::error::{AppError, ErrorKind};
use brokerdesk_entity::form::{BusinessListingForm, InquiryForm, LeadForm};
use brokerdesk_entity::{Business, Industry, Lead, LeadStatus, ListingStatus};
use brokerdesk_view::{CollectionStore, InquiryService, LeadIntake, ListingIntake};

use crate::helpers::{self, TestApp};

fn lead_form(name: &str, email: Option<&str>) -> LeadForm {
    LeadForm {
        name: name.to_string(),
        email: email.map(str::to_string),
        phone: None,
        company: Some("Rodriguez Bakery".to_string()),
        source: Some("website".to_string()),
        estimated_value: 180_000.0,
        notes: None,
    }
}

fn lead_intake(app: &TestApp) -> (LeadIntake, Arc<CollectionStore<Lead>>) {
    let store = Arc::new(
        CollectionStore::<Lead>::scoped(app.backend.clone(), &app.session, "user_id")
            .with_notices(app.notices.clone()),
    );
    let intake = LeadIntake::new(
        app.backend.clone(),
        app.session.clone(),
        store.clone(),
        app.notices.clone(),
    );
    (intake, store)
}

#[tokio::test]
async fn test_created_lead_is_stored_and_shown_first() {
    let app = TestApp::new().await;
    app.backend.seed(
        "leads",
        [helpers::lead_row("old", "Earlier Lead", "contacted", 1.0, "2030-01-01T00:00:00Z")],
    );
    let (intake, store) = lead_intake(&app);
    store.load(None).await.expect("load leads");

    let lead = intake
        .create(lead_form("Maria Rodriguez", Some("maria@example.com")))
        .await
        .unwrap();

    assert_eq!(lead.user_id, helpers::USER);
    assert_eq!(lead.status, LeadStatus::New);
    assert_eq!(store.items()[0].id, lead.id);
    assert_eq!(app.backend.rows("leads").len(), 2);
}

#[tokio::test]
async fn test_invalid_lead_never_reaches_backend() {
    let app = TestApp::new().await;
    let (intake, store) = lead_intake(&app);

    let err = intake
        .create(lead_form("", Some("not-an-email")))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Validation);
    assert!(app.backend.rows("leads").is_empty());
    assert!(store.is_empty());
    assert!(app.notices.active().is_empty());
}

#[tokio::test]
async fn test_listing_submission_is_active_and_owned_by_seller() {
    let app = TestApp::new().await;
    let store = Arc::new(CollectionStore::<Business>::new(app.backend.clone()));
    let intake = ListingIntake::new(
        app.backend.clone(),
        app.session.clone(),
        store.clone(),
        app.notices.clone(),
    );

    let listing = intake
        .submit(BusinessListingForm {
            name: "Harbor Cafe".to_string(),
            description: Some("Waterfront cafe with loyal regulars".to_string()),
            industry: Industry::Restaurant,
            asking_price: 350_000.0,
            annual_revenue: Some(420_000.0),
            location: Some("Portland, ME".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(listing.seller_id, helpers::USER);
    assert_eq!(listing.status, ListingStatus::Active);
    assert!(store.contains(&listing.id));
}

#[tokio::test]
async fn test_inquiry_invokes_function_and_surfaces_failures() {
    let app = TestApp::new().await;
    app.backend
        .register_function("send-inquiry-email", |_| Ok(json!({"delivered": true})));
    let service = InquiryService::from_config(app.backend.clone(), &app.views, app.notices.clone());
    let form = InquiryForm {
        business_id: "b1".to_string(),
        name: "Dana Buyer".to_string(),
        email: "dana@example.com".to_string(),
        phone: None,
        message: "Is the lease transferable to a new owner?".to_string(),
    };

    let response = service.send(form.clone()).await.unwrap();
    assert_eq!(response["delivered"], true);
    assert_eq!(app.backend.invocations().len(), 1);

    app.backend.register_function("send-inquiry-email", |_| {
        Err(AppError::service_unavailable("mail relay down"))
    });
    let err = service.send(form).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Write);
    assert_eq!(app.notices.active().len(), 1);
}
