//! Integration tests for optimistic favorite toggling.

use std::time::Duration;

use brokerdesk_core::error::ErrorKind;
use brokerdesk_entity::FavoriteRelation;
use brokerdesk_view::{FavoriteSet, MutationState};

use crate::helpers::TestApp;

#[tokio::test]
async fn test_toggle_twice_restores_original_state() {
    let app = TestApp::new().await;
    let dispatcher = app.dispatcher();
    let favorites = FavoriteSet::new(&app.session, "businesses");

    assert!(dispatcher.toggle_favorite(&favorites, "2").await.unwrap());
    assert_eq!(app.backend.rows(FavoriteRelation::COLLECTION).len(), 1);
    assert!(!dispatcher.toggle_favorite(&favorites, "2").await.unwrap());

    assert!(!favorites.is_favorite("2"));
    assert!(app.backend.rows(FavoriteRelation::COLLECTION).is_empty());
}

#[tokio::test]
async fn test_failed_write_leaves_favorite_unset_and_surfaces_error() {
    let app = TestApp::new().await;
    let dispatcher = app.dispatcher();
    let favorites = FavoriteSet::new(&app.session, "businesses");
    app.backend.set_fail_writes(true);

    let err = dispatcher.toggle_favorite(&favorites, "2").await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Write);
    assert!(!favorites.is_favorite("2"));
    let key = brokerdesk_view::ActionDispatcher::favorite_key("businesses", "2");
    assert_eq!(dispatcher.state_of(&key), MutationState::RolledBack);
    let notices = app.notices.active();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, ErrorKind::Write);
}

#[tokio::test]
async fn test_favorites_reload_from_backend() {
    let app = TestApp::new().await;
    let dispatcher = app.dispatcher();
    let favorites = FavoriteSet::new(&app.session, "businesses");
    dispatcher.toggle_favorite(&favorites, "b1").await.unwrap();
    dispatcher.toggle_favorite(&favorites, "b2").await.unwrap();

    let reloaded = FavoriteSet::new(&app.session, "businesses");
    assert_eq!(reloaded.load(app.backend.as_ref()).await.unwrap(), 2);
    assert_eq!(reloaded.ids(), vec!["b1".to_string(), "b2".to_string()]);

    let agents = FavoriteSet::new(&app.session, "agents");
    assert_eq!(agents.load(app.backend.as_ref()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_concurrent_toggles_on_one_entity_serialize() {
    let app = TestApp::new().await;
    app.backend.set_write_latency(Duration::from_millis(20));
    let dispatcher = app.dispatcher();
    let favorites = FavoriteSet::new(&app.session, "businesses");

    let (first, second) = tokio::join!(
        dispatcher.toggle_favorite(&favorites, "b7"),
        dispatcher.toggle_favorite(&favorites, "b7"),
    );

    assert!(first.unwrap());
    assert!(!second.unwrap());
    assert!(!favorites.is_favorite("b7"));
    assert!(app.backend.rows(FavoriteRelation::COLLECTION).is_empty());
}
