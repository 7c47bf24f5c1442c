//! Storage accounting against requests and disk contents.

mod helpers;

use satchel_database::store::ContentRequestStore;
use satchel_entity::request::{RequestKind, RequestReason, RequestStatus};
use satchel_service::{RemovalExecutor, StorageCalculator};

use helpers::TestApp;

#[tokio::test]
async fn test_empty_device() {
    let app = TestApp::new(5000).await;
    let calc = StorageCalculator::calculate(&app.context()).await.unwrap();

    assert_eq!(calc.incomplete_downloads_size, 0);
    assert_eq!(calc.disk_free, 5000);
    assert_eq!(calc.available_disk_space, 5000);
    assert_eq!(calc.recoverable_space(), 0);
    assert!(calc.is_space_sufficient());
}

#[tokio::test]
async fn test_sizes_by_category() {
    let app = TestApp::new(5000).await;

    let wanted = app.add_node(Some(1500), false).await;
    app.request_download(wanted, None).await;

    let unassigned = app.add_node(Some(600), true).await;
    app.request_removal(unassigned).await;

    let unwanted = app.add_node(Some(300), true).await;
    app.request(RequestKind::Removal, RequestReason::UserInitiated, unwanted, None)
        .await;

    let chosen = app.add_node(Some(800), true).await;
    let download = app
        .request(RequestKind::Download, RequestReason::UserInitiated, chosen, None)
        .await;
    app.db
        .set_status(&[download.id], RequestStatus::Completed)
        .await
        .unwrap();

    let calc = StorageCalculator::calculate(&app.context()).await.unwrap();
    assert_eq!(calc.incomplete_downloads_size, 1500);
    assert_eq!(calc.completed_downloads_size, 800);
    assert_eq!(calc.disk_free, 5000 - 600 - 300 - 800);
    assert_eq!(calc.sync_removals_size, 600);
    assert_eq!(calc.user_removals_size, 300);
    assert_eq!(calc.user_downloads_size, 800);
    assert_eq!(calc.free_space(), 3300 + 1700);
    assert_eq!(calc.get_additional_free_space_needed(), 1500 - 5000);
}

#[tokio::test]
async fn test_autodownload_limit_caps_available_space() {
    let mut app = TestApp::new(10_000).await;
    app.settings.set_limit_for_autodownload = true;
    app.settings.limit_for_autodownload = 2000;

    let node = app.add_node(Some(1200), true).await;
    let done = app.request_download(node, None).await;
    app.db
        .set_status(&[done.id], RequestStatus::Completed)
        .await
        .unwrap();

    let calc = StorageCalculator::calculate(&app.context()).await.unwrap();
    assert_eq!(calc.disk_free, 8800);
    assert_eq!(calc.available_disk_space, 800);
}

#[tokio::test]
async fn test_shortfall_when_downloads_exceed_space() {
    let app = TestApp::new(1000).await;
    let node = app.add_node(Some(2500), false).await;
    app.request_download(node, None).await;

    let calc = StorageCalculator::calculate(&app.context()).await.unwrap();
    assert!(!calc.is_space_sufficient());
    assert_eq!(calc.get_additional_free_space_needed(), 1500);
}

#[tokio::test]
async fn test_removing_user_download_moves_space_back() {
    let app = TestApp::new(1000).await;
    let node = app.add_node(Some(1000), true).await;
    let download = app
        .request(RequestKind::Download, RequestReason::UserInitiated, node, None)
        .await;
    app.db
        .set_status(&[download.id], RequestStatus::Completed)
        .await
        .unwrap();

    let before = StorageCalculator::calculate(&app.context()).await.unwrap();
    assert_eq!(before.available_disk_space, 0);
    assert_eq!(before.user_downloads_size, 1000);

    let removal = app
        .request(RequestKind::Removal, RequestReason::UserInitiated, node, None)
        .await;
    let summary = RemovalExecutor::new(app.context())
        .process_content_removal_requests(&[removal])
        .await
        .unwrap();
    assert_eq!(summary.bytes_freed, 1000);

    let after = StorageCalculator::calculate(&app.context()).await.unwrap();
    assert_eq!(after.available_disk_space, 1000);
    assert_eq!(after.user_downloads_size, 0);
    assert_eq!(after.user_removals_size, 0);
}

#[tokio::test]
async fn test_shared_user_download_is_not_recoverable() {
    let app = TestApp::new(5000).await;
    let node = app.add_node(Some(700), true).await;
    let user_download = app
        .request(RequestKind::Download, RequestReason::UserInitiated, node, None)
        .await;
    let sync_download = app.request_download(node, None).await;
    app.db
        .set_status(&[user_download.id, sync_download.id], RequestStatus::Completed)
        .await
        .unwrap();

    let calc = StorageCalculator::calculate(&app.context()).await.unwrap();
    assert_eq!(calc.user_downloads_size, 0);
    assert_eq!(calc.recoverable_space(), 0);
    assert_eq!(calc.free_space(), calc.available_disk_space);
}
