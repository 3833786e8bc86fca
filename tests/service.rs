//! Catalog Service Integration Tests
//!
//! Several tasks sharing one catalog through the command queue.

use ipcs::core::{CatalogService, Payload, ServiceError};
use ipcs::{ContentKind, Query, Session, SortDirection, SortKey, SubmitOutcome, WorkflowEvent};

async fn create_text(handle: &ipcs::CatalogHandle, title: &str, body: &str) -> SubmitOutcome {
    handle.send(WorkflowEvent::Begin).await.unwrap();
    handle
        .send(WorkflowEvent::SetTitle(title.to_string()))
        .await
        .unwrap();
    handle
        .send(WorkflowEvent::SelectKind(ContentKind::Text))
        .await
        .unwrap();
    handle
        .send(WorkflowEvent::SubmitText(body.to_string()))
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn test_listing_follows_query() {
    let (handle, task) = CatalogService::spawn(Session::new());

    assert!(matches!(
        create_text(&handle, "Zebra", "z").await,
        SubmitOutcome::Committed(_)
    ));
    assert!(matches!(
        create_text(&handle, "apple", "a").await,
        SubmitOutcome::Committed(_)
    ));

    handle
        .set_query(Query::new().sort(SortKey::Title, SortDirection::Ascending))
        .await
        .unwrap();
    let titles: Vec<String> = handle
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.title)
        .collect();
    assert_eq!(titles, vec!["apple", "Zebra"]);

    handle.shutdown().await.unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn test_upload_through_handle() {
    let (handle, task) = CatalogService::spawn(Session::new());

    handle.send(WorkflowEvent::Begin).await.unwrap();
    handle
        .send(WorkflowEvent::SetTitle("Logo".to_string()))
        .await
        .unwrap();
    handle
        .send(WorkflowEvent::SelectKind(ContentKind::Image))
        .await
        .unwrap();

    let payload = Payload::new("logo.png", &b"png bytes"[..], Some(mime::IMAGE_PNG));
    let outcome = handle.submit_from(&payload).await.unwrap();
    let id = match outcome {
        SubmitOutcome::Committed(id) => id,
        other => panic!("Expected commit, got {:?}", other),
    };

    let observation = handle.observe().await.unwrap();
    assert_eq!(observation.entries, 1);
    assert_eq!(observation.handles.live, 1);

    let removed = handle.remove(id).await.unwrap();
    assert_eq!(removed.title, "Logo");
    let observation = handle.observe().await.unwrap();
    assert_eq!(observation.handles.live, 0);
    assert_eq!(observation.handles.released, 1);

    handle.shutdown().await.unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn test_shutdown_releases_everything() {
    let (handle, task) = CatalogService::spawn(Session::new());
    create_text(&handle, "Memo", "m").await;

    handle.shutdown().await.unwrap();
    let session = task.await.unwrap();
    assert!(session.is_empty());
    assert_eq!(session.resource_stats().live, 0);

    assert_eq!(handle.observe().await.err(), Some(ServiceError::Closed));
}
