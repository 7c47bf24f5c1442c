//! End-to-end reconciliation passes over in-memory stores and fake peers.

mod helpers;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use satchel_core::traits::storage::StorageProvider;
use satchel_database::store::{ContentRequestStore, DeviceStatusStore};
use satchel_entity::device::DeviceStatus;
use satchel_entity::network::ConnectionStatus;
use satchel_entity::request::{RequestKind, RequestReason, RequestStatus};
use satchel_service::{PassOutcome, PassSummary};

use helpers::TestApp;

#[tokio::test]
async fn test_download_that_fits_is_imported() {
    let app = TestApp::new(2000).await;
    let peer = app.add_peer("0.16.2").await;
    app.add_sync_partner(peer.instance_id, 1).await;
    let node = app.add_node(Some(500), false).await;
    let request = app.request_download(node, None).await;

    let outcome = app.run_pass().await;

    assert!(matches!(outcome, PassOutcome::Completed(_)));
    assert_eq!(outcome.summary().downloads_completed, 1);
    assert_eq!(app.transfers.call_count(), 1);
    assert_eq!(app.status_of(request.id).await, Some(RequestStatus::Completed));
    assert!(app.is_available(node).await);
    assert_eq!(app.storage.used_bytes().await, 500);
}

#[tokio::test]
async fn test_nothing_to_do() {
    let app = TestApp::new(2000).await;
    let outcome = app.run_pass().await;
    assert_eq!(outcome, PassOutcome::Completed(PassSummary::default()));
}

#[tokio::test]
async fn test_insufficient_storage_raises_device_status() {
    let app = TestApp::new(100).await;
    let peer = app.add_peer("0.16.2").await;
    app.add_sync_partner(peer.instance_id, 1).await;
    let node = app.add_node(Some(5000), false).await;
    let request = app.request_download(node, None).await;

    let outcome = app.run_pass().await;

    let PassOutcome::InsufficientStorage {
        required,
        shortfall,
        message,
        ..
    } = outcome.clone()
    else {
        panic!("expected insufficient storage, got {outcome:?}");
    };
    assert_eq!(required, 5000);
    assert_eq!(shortfall, 4900);
    assert!(message.contains("5.00KB"));
    assert_eq!(app.transfers.call_count(), 0);
    assert_eq!(app.status_of(request.id).await, Some(RequestStatus::Pending));

    let statuses = app.db.current_statuses().await.unwrap();
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].status, DeviceStatus::InsufficientStorage);
    assert_eq!(statuses[0].detail, message);
}

#[tokio::test]
async fn test_successful_pass_clears_insufficient_storage() {
    let app = TestApp::new(2000).await;
    app.db
        .raise_status(DeviceStatus::InsufficientStorage, "stale")
        .await
        .unwrap();

    app.run_pass().await;

    assert!(app.db.current_statuses().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sync_removal_makes_room_first() {
    let app = TestApp::new(1200).await;
    let peer = app.add_peer("0.16.2").await;
    app.add_sync_partner(peer.instance_id, 1).await;

    let stale = app.add_node(Some(1200), true).await;
    let removal = app.request_removal(stale).await;
    let wanted = app.add_node(Some(1000), false).await;
    let download = app.request_download(wanted, None).await;

    let outcome = app.run_pass().await;

    assert!(matches!(outcome, PassOutcome::Completed(_)));
    assert_eq!(outcome.summary().removals_completed, 1);
    assert_eq!(outcome.summary().downloads_completed, 1);
    assert_eq!(app.status_of(removal.id).await, Some(RequestStatus::Completed));
    assert_eq!(app.status_of(download.id).await, Some(RequestStatus::Completed));
    assert!(!app.is_available(stale).await);
    assert!(app.is_available(wanted).await);
    assert_eq!(app.storage.used_bytes().await, 1000);
}

#[tokio::test]
async fn test_falls_back_to_sync_partner_when_preferred_peer_lacks_content() {
    let app = TestApp::new(5000).await;
    let preferred = app.add_peer("0.16.2").await;
    let partner = app.add_peer("0.16.2").await;
    app.add_sync_partner(partner.instance_id, 1).await;
    app.transfers.lacks_content(preferred.instance_id);

    let node = app.add_node(Some(100), false).await;
    let request = app
        .request_download(node, Some(preferred.instance_id))
        .await;

    app.run_pass().await;

    assert_eq!(
        app.transfers.peers_called(),
        vec![preferred.instance_id, partner.instance_id]
    );
    assert_eq!(app.status_of(request.id).await, Some(RequestStatus::Completed));
}

#[tokio::test]
async fn test_download_fails_when_no_peer_has_content() {
    let app = TestApp::new(5000).await;
    let partner = app.add_peer("0.16.2").await;
    app.add_sync_partner(partner.instance_id, 1).await;
    app.transfers.lacks_content(partner.instance_id);

    let missing = app.add_node(Some(100), false).await;
    let failing = app.request_download(missing, None).await;
    let other = app.add_node(Some(100), false).await;
    let blocked = app.request_download(other, None).await;

    let outcome = app.run_pass().await;

    assert!(matches!(outcome, PassOutcome::Completed(_)));
    assert_eq!(outcome.summary().downloads_failed, 2);
    assert_eq!(app.status_of(failing.id).await, Some(RequestStatus::Failed));
    assert_eq!(app.status_of(blocked.id).await, Some(RequestStatus::Failed));
    // Each request is tried once per pass.
    assert_eq!(app.transfers.call_count(), 2);
}

#[tokio::test]
async fn test_unreachable_peers_are_skipped() {
    let app = TestApp::new(5000).await;
    let offline = app
        .add_peer_with_status("0.16.2", ConnectionStatus::ConnectionFailure)
        .await;
    let partner = app.add_peer("0.16.2").await;
    app.add_sync_partner(offline.instance_id, 1).await;
    app.add_sync_partner(partner.instance_id, 5).await;

    let node = app.add_node(Some(100), false).await;
    app.request_download(node, None).await;

    app.run_pass().await;

    assert_eq!(app.transfers.peers_called(), vec![partner.instance_id]);
}

#[tokio::test]
async fn test_already_available_node_completes_without_transfer() {
    let app = TestApp::new(5000).await;
    let node = app.add_node(Some(100), true).await;
    let request = app.request_download(node, None).await;

    let outcome = app.run_pass().await;

    assert_eq!(outcome.summary().downloads_completed, 1);
    assert_eq!(app.transfers.call_count(), 0);
    assert_eq!(app.status_of(request.id).await, Some(RequestStatus::Completed));
}

#[tokio::test]
async fn test_completed_user_download_is_reclaimed() {
    let app = TestApp::new(1000).await;
    let peer = app.add_peer("0.16.2").await;
    app.add_sync_partner(peer.instance_id, 1).await;

    let chosen = app.add_node(Some(1000), true).await;
    let user_download = app
        .request(RequestKind::Download, RequestReason::UserInitiated, chosen, None)
        .await;
    app.db
        .set_status(&[user_download.id], RequestStatus::Completed)
        .await
        .unwrap();

    let assigned = app.add_node(Some(800), false).await;
    let sync_download = app.request_download(assigned, None).await;

    let outcome = app.run_pass().await;

    assert!(matches!(outcome, PassOutcome::Completed(_)));
    assert_eq!(outcome.summary().downloads_reclaimed, 1);
    assert_eq!(outcome.summary().downloads_completed, 1);
    assert_eq!(app.status_of(user_download.id).await, None);
    assert_eq!(
        app.status_of(sync_download.id).await,
        Some(RequestStatus::Completed)
    );
    assert!(!app.is_available(chosen).await);

    let removals: Vec<_> = app
        .db
        .all_requests()
        .await
        .into_iter()
        .filter(|r| r.kind == RequestKind::Removal)
        .collect();
    assert_eq!(removals.len(), 1);
    assert_eq!(removals[0].contentnode_id, chosen);
    assert_eq!(removals[0].reason, RequestReason::SyncInitiated);
    assert_eq!(removals[0].status, RequestStatus::Completed);
}

#[tokio::test]
async fn test_shared_user_download_is_not_reclaimed() {
    let app = TestApp::new(1000).await;
    let chosen = app.add_node(Some(1000), true).await;
    let user_download = app
        .request(RequestKind::Download, RequestReason::UserInitiated, chosen, None)
        .await;
    let sync_download = app.request_download(chosen, None).await;
    app.db
        .set_status(
            &[user_download.id, sync_download.id],
            RequestStatus::Completed,
        )
        .await
        .unwrap();

    let assigned = app.add_node(Some(800), false).await;
    app.request_download(assigned, None).await;

    let outcome = app.run_pass().await;

    assert!(matches!(outcome, PassOutcome::InsufficientStorage { .. }));
    assert_eq!(outcome.summary().downloads_reclaimed, 0);
    assert!(app.is_available(chosen).await);
}

#[tokio::test]
async fn test_staging_fragments_evicted_last() {
    let app = TestApp::new(1000).await;
    let peer = app.add_peer("0.16.2").await;
    app.add_sync_partner(peer.instance_id, 1).await;
    app.storage
        .write("_staging/abandoned.mp4.part", Bytes::from(vec![0u8; 600]))
        .await
        .unwrap();

    let node = app.add_node(Some(800), false).await;
    let request = app.request_download(node, None).await;

    let outcome = app.run_pass().await;

    assert!(matches!(outcome, PassOutcome::Completed(_)));
    assert_eq!(outcome.summary().bytes_evicted, 600);
    assert_eq!(app.status_of(request.id).await, Some(RequestStatus::Completed));
}

#[tokio::test]
async fn test_smaller_download_goes_first_when_oldest_does_not_fit() {
    let app = TestApp::new(1000).await;
    let peer = app.add_peer("0.16.2").await;
    app.add_sync_partner(peer.instance_id, 1).await;

    let big = app.add_node(Some(5000), false).await;
    let big_request = app.request_download(big, None).await;
    let small = app.add_node(Some(300), false).await;
    let small_request = app.request_download(small, None).await;

    let outcome = app.run_pass().await;

    assert!(matches!(outcome, PassOutcome::InsufficientStorage { .. }));
    assert_eq!(outcome.summary().downloads_completed, 1);
    assert_eq!(
        app.status_of(small_request.id).await,
        Some(RequestStatus::Completed)
    );
    assert_eq!(
        app.status_of(big_request.id).await,
        Some(RequestStatus::Pending)
    );
}

#[tokio::test]
async fn test_interrupted_requests_are_reset() {
    let app = TestApp::new(1000).await;
    let node = app.add_node(Some(100), true).await;
    let request = app.request_download(node, None).await;
    app.db
        .set_status(&[request.id], RequestStatus::InProgress)
        .await
        .unwrap();

    let outcome = app.run_pass().await;

    assert_eq!(outcome.summary().requests_reset, 1);
    assert_eq!(app.status_of(request.id).await, Some(RequestStatus::Completed));
}

#[tokio::test]
async fn test_cancelled_pass_leaves_requests_pending() {
    let app = TestApp::new(2000).await;
    let peer = app.add_peer("0.16.2").await;
    app.add_sync_partner(peer.instance_id, 1).await;
    let node = app.add_node(Some(500), false).await;
    let request = app.request_download(node, None).await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let outcome = app.pass().run(&cancel).await.unwrap();

    assert!(matches!(outcome, PassOutcome::Cancelled(_)));
    assert_eq!(app.transfers.call_count(), 0);
    assert_eq!(app.status_of(request.id).await, Some(RequestStatus::Pending));
}

#[tokio::test]
async fn test_failed_request_retried_on_next_pass() {
    let app = TestApp::new(2000).await;
    let partner = app.add_peer("0.16.2").await;
    app.add_sync_partner(partner.instance_id, 1).await;
    app.transfers.lacks_content(partner.instance_id);
    let node = app.add_node(Some(500), false).await;
    let request = app.request_download(node, None).await;

    app.run_pass().await;
    assert_eq!(app.status_of(request.id).await, Some(RequestStatus::Failed));

    let second = app.add_peer("0.16.2").await;
    app.add_sync_partner(second.instance_id, 0).await;
    app.run_pass().await;

    assert_eq!(app.status_of(request.id).await, Some(RequestStatus::Completed));
}
