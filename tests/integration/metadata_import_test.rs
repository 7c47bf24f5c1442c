//! Missing metadata resolution against fake peers.

mod helpers;

use tokio_util::sync::CancellationToken;

use satchel_core::types::ContentNodeId;
use satchel_database::store::ContentStore;
use satchel_service::{MetadataImporter, PassOutcome};

use helpers::{TestApp, metadata_for};

#[tokio::test]
async fn test_preferred_peer_then_capable_fallback() {
    let app = TestApp::new(10_000).await;
    let old_peer = app.add_peer("0.15.0").await;
    let new_peer = app.add_peer("0.16.1").await;
    app.add_sync_partner(new_peer.instance_id, 1).await;

    let (a, b) = (ContentNodeId::new(), ContentNodeId::new());
    app.connector
        .serve(old_peer.instance_id, a, metadata_for(app.node(a, None, true), 300));
    app.connector
        .serve(new_peer.instance_id, b, metadata_for(app.node(b, None, true), 400));
    app.request_download(a, Some(old_peer.instance_id)).await;
    app.request_download(b, None).await;

    let summary = MetadataImporter::new(app.context())
        .unwrap()
        .import_missing(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.requested, 2);
    assert_eq!(summary.imported, 2);
    assert_eq!(summary.unresolved, 0);
    assert_eq!(summary.network_calls, 2);
    assert_eq!(
        app.connector.fetches(),
        vec![(old_peer.instance_id, a), (new_peer.instance_id, b)]
    );

    // Imported nodes are known but not yet on the device.
    assert!(!app.is_available(a).await);
    assert!(!app.is_available(b).await);
}

#[tokio::test]
async fn test_nothing_missing_makes_no_calls() {
    let app = TestApp::new(10_000).await;
    let peer = app.add_peer("0.16.1").await;
    app.add_sync_partner(peer.instance_id, 1).await;
    let node = app.add_node(Some(100), false).await;
    app.request_download(node, None).await;

    let summary = MetadataImporter::new(app.context())
        .unwrap()
        .import_missing(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.requested, 0);
    assert!(app.connector.fetches().is_empty());
}

#[tokio::test]
async fn test_node_no_peer_knows_stays_unresolved() {
    let app = TestApp::new(10_000).await;
    let peer = app.add_peer("0.16.1").await;
    app.add_sync_partner(peer.instance_id, 1).await;
    let node = ContentNodeId::new();
    app.request_download(node, None).await;

    let summary = MetadataImporter::new(app.context())
        .unwrap()
        .import_missing(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.requested, 1);
    assert_eq!(summary.unresolved, 1);
    assert_eq!(summary.network_calls, 1);
    assert!(app.db.get_node(node).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unreachable_preferred_peer_is_skipped() {
    let app = TestApp::new(10_000).await;
    let preferred = app.add_peer("0.16.1").await;
    let partner = app.add_peer("0.16.1").await;
    app.add_sync_partner(partner.instance_id, 1).await;
    app.connector.refuse(preferred.instance_id);

    let node = ContentNodeId::new();
    app.connector
        .serve(partner.instance_id, node, metadata_for(app.node(node, None, true), 100));
    app.request_download(node, Some(preferred.instance_id)).await;

    let summary = MetadataImporter::new(app.context())
        .unwrap()
        .import_missing(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.imported, 1);
    assert_eq!(app.connector.fetches(), vec![(partner.instance_id, node)]);
}

#[tokio::test]
async fn test_fallback_stops_connecting_once_resolved() {
    let app = TestApp::new(10_000).await;
    let recent = app.add_peer("0.16.1").await;
    let older = app.add_peer("0.16.1").await;
    app.add_sync_partner(recent.instance_id, 1).await;
    app.add_sync_partner(older.instance_id, 30).await;

    let node = ContentNodeId::new();
    app.connector
        .serve(recent.instance_id, node, metadata_for(app.node(node, None, true), 100));
    app.request_download(node, None).await;

    let summary = MetadataImporter::new(app.context())
        .unwrap()
        .import_missing(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.imported, 1);
    assert_eq!(summary.network_calls, 1);
    assert_eq!(app.connector.connects(), vec![recent.instance_id]);
}

#[tokio::test]
async fn test_pass_imports_metadata_then_downloads() {
    let app = TestApp::new(10_000).await;
    let peer = app.add_peer("0.16.1").await;
    app.add_sync_partner(peer.instance_id, 1).await;
    let node = ContentNodeId::new();
    app.connector
        .serve(peer.instance_id, node, metadata_for(app.node(node, None, true), 700));
    let request = app.request_download(node, None).await;

    let outcome = satchel_service::ReconciliationPass::new(app.context())
        .unwrap()
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert!(matches!(outcome, PassOutcome::Completed(_)));
    let summary = outcome.summary();
    assert_eq!(summary.metadata.map(|m| m.imported), Some(1));
    assert_eq!(summary.downloads_completed, 1);
    assert_eq!(
        app.status_of(request.id).await,
        Some(satchel_entity::request::RequestStatus::Completed)
    );
    assert!(app.is_available(node).await);
    assert_eq!(app.storage.used_bytes().await, 700);
}

#[tokio::test]
async fn test_download_without_metadata_is_left_pending() {
    let app = TestApp::new(10_000).await;
    let node = ContentNodeId::new();
    let request = app.request_download(node, None).await;

    let outcome = satchel_service::ReconciliationPass::new(app.context())
        .unwrap()
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert!(matches!(outcome, PassOutcome::Completed(_)));
    assert_eq!(outcome.summary().metadata.map(|m| m.unresolved), Some(1));
    assert_eq!(
        app.status_of(request.id).await,
        Some(satchel_entity::request::RequestStatus::Pending)
    );
}
