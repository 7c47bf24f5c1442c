//! Assignment bridge integration tests.

mod helpers;

use chrono::Utc;

use satchel_core::types::{ContentNodeId, InstanceId, SyncSessionId, TransferSessionId};
use satchel_database::store::ContentRequestStore;
use satchel_entity::assignment::{Assignment, RemovableAssignment};
use satchel_entity::network::SyncSession;
use satchel_entity::request::{RequestKind, RequestReason, RequestStatus};
use satchel_service::SyncSummary;

use helpers::TestApp;

const LESSON: &str = "lessons.lesson";
const QUIZ: &str = "exams.exam";

fn assignment(model: &str, source_id: &str, node: ContentNodeId) -> Assignment {
    Assignment {
        source_model: model.to_string(),
        source_id: source_id.to_string(),
        contentnode_id: node,
    }
}

#[tokio::test]
async fn test_sync_creates_downloads_once() {
    let app = TestApp::new(10_000).await;
    let bridge = app.bridge();
    let dataset = app.facility.dataset_id;
    let (a, b) = (ContentNodeId::new(), ContentNodeId::new());
    app.db
        .add_assignment(dataset, None, assignment(LESSON, "lesson-1", a))
        .await;
    app.db
        .add_assignment(dataset, None, assignment(QUIZ, "quiz-1", b))
        .await;

    let first = bridge
        .synchronize_content_requests(dataset, None)
        .await
        .unwrap();
    assert_eq!(first.downloads_created, 2);

    let second = bridge
        .synchronize_content_requests(dataset, None)
        .await
        .unwrap();
    assert_eq!(second, SyncSummary::default());

    let rows = app.db.all_requests().await;
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.kind == RequestKind::Download
        && r.reason == RequestReason::SyncInitiated
        && r.status == RequestStatus::Pending
        && r.facility_id == app.facility.id));
}

#[tokio::test]
async fn test_unassigning_replaces_download_with_removal() {
    let app = TestApp::new(10_000).await;
    let bridge = app.bridge();
    let dataset = app.facility.dataset_id;
    let node = ContentNodeId::new();
    app.db
        .add_assignment(dataset, None, assignment(LESSON, "lesson-1", node))
        .await;
    bridge
        .synchronize_content_requests(dataset, None)
        .await
        .unwrap();

    app.db.clear_assignments().await;
    app.db
        .add_removal(
            dataset,
            None,
            RemovableAssignment::Removed(assignment(LESSON, "lesson-1", node)),
        )
        .await;
    let summary = bridge
        .synchronize_content_requests(dataset, None)
        .await
        .unwrap();

    assert_eq!(summary.removals_created, 1);
    assert_eq!(summary.requests_deleted, 1);
    let rows = app.db.all_requests().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].kind, RequestKind::Removal);
    assert_eq!(rows[0].contentnode_id, node);
}

#[tokio::test]
async fn test_other_source_download_survives_removal() {
    let app = TestApp::new(10_000).await;
    let bridge = app.bridge();
    let dataset = app.facility.dataset_id;
    let node = ContentNodeId::new();
    app.db
        .add_assignment(dataset, None, assignment(LESSON, "lesson-1", node))
        .await;
    app.db
        .add_assignment(dataset, None, assignment(QUIZ, "quiz-1", node))
        .await;
    bridge
        .synchronize_content_requests(dataset, None)
        .await
        .unwrap();

    app.db.clear_assignments().await;
    app.db
        .add_removal(
            dataset,
            None,
            RemovableAssignment::Removed(assignment(LESSON, "lesson-1", node)),
        )
        .await;
    bridge
        .synchronize_content_requests(dataset, None)
        .await
        .unwrap();

    let rows = app.db.all_requests().await;
    assert_eq!(rows.len(), 2);
    assert!(rows
        .iter()
        .any(|r| r.kind == RequestKind::Download && r.source_id == "quiz-1"));
    assert!(rows
        .iter()
        .any(|r| r.kind == RequestKind::Removal && r.source_id == "lesson-1"));
}

#[tokio::test]
async fn test_deleted_source_removes_every_requested_node() {
    let app = TestApp::new(10_000).await;
    let bridge = app.bridge();
    let dataset = app.facility.dataset_id;
    let nodes = [ContentNodeId::new(), ContentNodeId::new(), ContentNodeId::new()];
    for node in nodes {
        app.db
            .add_assignment(dataset, None, assignment(LESSON, "lesson-1", node))
            .await;
    }
    bridge
        .synchronize_content_requests(dataset, None)
        .await
        .unwrap();

    app.db.clear_assignments().await;
    app.db
        .add_removal(
            dataset,
            None,
            RemovableAssignment::Deleted {
                source_model: LESSON.to_string(),
                source_id: "lesson-1".to_string(),
            },
        )
        .await;
    let summary = bridge
        .synchronize_content_requests(dataset, None)
        .await
        .unwrap();

    assert_eq!(summary.removals_created, 3);
    assert_eq!(summary.requests_deleted, 3);
    let rows = app.db.all_requests().await;
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.kind == RequestKind::Removal));
}

#[tokio::test]
async fn test_transfer_session_names_preferred_peer() {
    let app = TestApp::new(10_000).await;
    let bridge = app.bridge();
    let dataset = app.facility.dataset_id;
    let (client, server) = (InstanceId::new(), InstanceId::new());
    let sync_id = SyncSessionId::new();
    app.db
        .add_sync_session(SyncSession {
            id: sync_id,
            client_instance_id: client,
            server_instance_id: server,
            last_activity_timestamp: Utc::now(),
        })
        .await;
    let (pushed, pulled) = (TransferSessionId::new(), TransferSessionId::new());
    app.db.add_transfer_session(pushed, sync_id, true).await;
    app.db.add_transfer_session(pulled, sync_id, false).await;

    let (a, b) = (ContentNodeId::new(), ContentNodeId::new());
    app.db
        .add_assignment(dataset, Some(pushed), assignment(LESSON, "lesson-1", a))
        .await;
    app.db
        .add_assignment(dataset, Some(pulled), assignment(LESSON, "lesson-2", b))
        .await;

    bridge
        .synchronize_content_requests(dataset, Some(pushed))
        .await
        .unwrap();
    bridge
        .synchronize_content_requests(dataset, Some(pulled))
        .await
        .unwrap();

    let rows = app.db.all_requests().await;
    let by_node = |node: ContentNodeId| rows.iter().find(|r| r.contentnode_id == node).unwrap();
    assert_eq!(by_node(a).source_instance_id, Some(client));
    assert_eq!(by_node(b).source_instance_id, Some(server));
}

#[tokio::test]
async fn test_user_requests_are_mutually_exclusive() {
    let app = TestApp::new(10_000).await;
    let bridge = app.bridge();
    let node = ContentNodeId::new();

    let download = bridge
        .request_user_download(app.facility.id, "learner-1", node, None, None)
        .await
        .unwrap();
    assert_eq!(download.reason, RequestReason::UserInitiated);

    let removal = bridge
        .request_user_removal(app.facility.id, "learner-1", node)
        .await
        .unwrap();
    let rows = app.db.all_requests().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, removal.id);

    bridge
        .request_user_download(app.facility.id, "learner-1", node, None, None)
        .await
        .unwrap();
    let rows = app.db.all_requests().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].kind, RequestKind::Download);
}

#[tokio::test]
async fn test_in_progress_download_is_not_superseded() {
    let app = TestApp::new(10_000).await;
    let bridge = app.bridge();
    let node = ContentNodeId::new();
    let download = bridge
        .request_user_download(app.facility.id, "learner-1", node, None, None)
        .await
        .unwrap();
    app.db
        .set_status(&[download.id], RequestStatus::InProgress)
        .await
        .unwrap();

    bridge
        .request_user_removal(app.facility.id, "learner-1", node)
        .await
        .unwrap();

    assert_eq!(app.db.all_requests().await.len(), 2);
    assert_eq!(
        app.status_of(download.id).await,
        Some(RequestStatus::InProgress)
    );
}
