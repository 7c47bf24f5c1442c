//! Annotated request queries over the in-memory store.

mod helpers;

use satchel_core::types::ContentNodeId;
use satchel_database::store::{ContentRequestStore, DownloadQuery, RemovalQuery};
use satchel_entity::request::{RequestKind, RequestReason, RequestStatus};

use helpers::{TestApp, local_file};

#[tokio::test]
async fn test_download_size_counts_missing_files_and_parent_thumbnails() {
    let app = TestApp::new(10_000).await;
    let parent = ContentNodeId::new();
    let child = ContentNodeId::new();
    app.db.add_node(app.node(parent, None, false)).await;
    app.db.add_node(app.node(child, Some(parent), false)).await;

    app.db
        .add_node_file(child, local_file(Some(400), false), false)
        .await;
    app.db
        .add_node_file(child, local_file(Some(250), true), false)
        .await;
    app.db
        .add_node_file(child, local_file(None, false), false)
        .await;
    app.db
        .add_node_file(parent, local_file(Some(30), false), true)
        .await;
    app.db
        .add_node_file(parent, local_file(Some(5000), false), false)
        .await;

    app.request_download(child, None).await;

    let rows = app
        .db
        .incomplete_downloads(&DownloadQuery::default())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].has_metadata);
    assert_eq!(rows[0].total_size, 430);
}

#[tokio::test]
async fn test_download_without_metadata_is_flagged() {
    let app = TestApp::new(10_000).await;
    app.request_download(ContentNodeId::new(), None).await;

    let rows = app
        .db
        .incomplete_downloads(&DownloadQuery::default())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert!(!rows[0].has_metadata);
    assert_eq!(rows[0].size_bytes(), 0);
}

#[tokio::test]
async fn test_downloads_oldest_first_and_only_incomplete() {
    let app = TestApp::new(10_000).await;
    let first = app.add_node(Some(10), false).await;
    let second = app.add_node(Some(10), false).await;
    let done = app.add_node(Some(10), false).await;

    let a = app.request_download(first, None).await;
    let b = app.request_download(second, None).await;
    let c = app.request_download(done, None).await;
    app.db.set_status(&[a.id], RequestStatus::Failed).await.unwrap();
    app.db
        .set_status(&[c.id], RequestStatus::Completed)
        .await
        .unwrap();

    let ids: Vec<_> = app
        .db
        .incomplete_downloads(&DownloadQuery::default())
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.request.id)
        .collect();
    assert_eq!(ids, vec![a.id, b.id]);
}

#[tokio::test]
async fn test_learner_downloads_follow_roles_and_settings() {
    let mut app = TestApp::new(10_000).await;
    let node = app.add_node(Some(10), false).await;
    let learner = app
        .request(RequestKind::Download, RequestReason::UserInitiated, node, None)
        .await;

    let annotated = app
        .db
        .incomplete_downloads(&DownloadQuery::default())
        .await
        .unwrap();
    assert!(annotated[0].is_learner_download);

    app.settings.allow_learner_download_resources = false;
    let excluded = app
        .db
        .incomplete_downloads(&app.context().download_query())
        .await
        .unwrap();
    assert!(excluded.is_empty());

    app.settings.subset_of_users_device = true;
    let kept = app
        .db
        .incomplete_downloads(&app.context().download_query())
        .await
        .unwrap();
    assert_eq!(kept.len(), 1);

    app.settings.subset_of_users_device = false;
    app.db.add_role(app.facility.id, &learner.source_id).await;
    let coach = app
        .db
        .incomplete_downloads(&app.context().download_query())
        .await
        .unwrap();
    assert_eq!(coach.len(), 1);
    assert!(!coach[0].is_learner_download);
}

#[tokio::test]
async fn test_automatic_download_disabled_hides_sync_downloads() {
    let mut app = TestApp::new(10_000).await;
    let node = app.add_node(Some(10), false).await;
    app.request_download(node, None).await;
    app.settings.enable_automatic_download = false;

    let rows = app
        .db
        .incomplete_downloads(&app.context().download_query())
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_removal_sizes_count_available_files() {
    let app = TestApp::new(10_000).await;
    let node = ContentNodeId::new();
    app.db.add_node(app.node(node, None, true)).await;
    app.db
        .add_node_file(node, local_file(Some(700), true), false)
        .await;
    app.db
        .add_node_file(node, local_file(Some(300), false), false)
        .await;
    app.request_removal(node).await;

    let rows = app
        .db
        .incomplete_removals(&RemovalQuery::reclaimable(RequestReason::SyncInitiated))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].total_size, 700);

    let user = app
        .db
        .incomplete_removals(&RemovalQuery::reclaimable(RequestReason::UserInitiated))
        .await
        .unwrap();
    assert!(user.is_empty());
}

#[tokio::test]
async fn test_removal_excluded_while_another_source_downloads() {
    let app = TestApp::new(10_000).await;
    let node = app.add_node(Some(100), true).await;
    app.request_removal(node).await;
    app.request(RequestKind::Download, RequestReason::UserInitiated, node, None)
        .await;

    let rows = app
        .db
        .incomplete_removals(&RemovalQuery::processable(RequestReason::SyncInitiated))
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_admin_imported_removal_only_when_processable() {
    let app = TestApp::new(10_000).await;
    let node = ContentNodeId::new();
    let mut row = app.node(node, None, true);
    row.admin_imported = true;
    app.db.add_node(row).await;
    app.db
        .add_node_file(node, local_file(Some(100), true), false)
        .await;
    app.request_removal(node).await;

    let reclaimable = app
        .db
        .incomplete_removals(&RemovalQuery::reclaimable(RequestReason::SyncInitiated))
        .await
        .unwrap();
    assert!(reclaimable.is_empty());

    let processable = app
        .db
        .incomplete_removals(&RemovalQuery::processable(RequestReason::SyncInitiated))
        .await
        .unwrap();
    assert_eq!(processable.len(), 1);
}

#[tokio::test]
async fn test_completed_downloads_filter_by_reason() {
    let app = TestApp::new(10_000).await;
    let synced = app.add_node(Some(100), true).await;
    let chosen = app.add_node(Some(200), true).await;
    let sync_request = app.request_download(synced, None).await;
    let user_request = app
        .request(RequestKind::Download, RequestReason::UserInitiated, chosen, None)
        .await;
    app.db
        .set_status(&[sync_request.id, user_request.id], RequestStatus::Completed)
        .await
        .unwrap();

    let all = app.db.completed_downloads(None).await.unwrap();
    assert_eq!(all.len(), 2);

    let user = app
        .db
        .completed_downloads(Some(RequestReason::UserInitiated))
        .await
        .unwrap();
    assert_eq!(user.len(), 1);
    assert_eq!(user[0].total_size, 200);
}
