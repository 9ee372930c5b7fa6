mod common;

use common::{MockBackend, MockFactory, TestContext, use_new_profile};
use std::time::Duration;
use xtview::CatalogError;
use xtview::events::{EventPayload, EventType};
use xtview::models::{ContentKind, DownloadProgress};

fn channels_10_15_7() -> MockBackend {
    MockBackend::new()
        .with_category(ContentKind::Channel, "1", 10)
        .with_category(ContentKind::Channel, "2", 15)
        .with_category(ContentKind::Channel, "3", 7)
}

fn three_movie_categories(size: usize) -> MockBackend {
    MockBackend::new()
        .with_category(ContentKind::Movie, "1", size)
        .with_category(ContentKind::Movie, "2", size)
        .with_category(ContentKind::Movie, "3", size)
}

#[tokio::test]
async fn test_channel_download_scenario() {
    let ctx = TestContext::new().await;
    let service = ctx.service(MockFactory::new().with_profile("A", channels_10_15_7()));
    let mut events = service
        .event_bus()
        .subscribe_to_types(vec![EventType::DownloadProgress, EventType::DownloadCompleted]);

    use_new_profile(&service, "A").await;
    assert!(!service.check_content_exists(ContentKind::Channel).await.unwrap());

    assert_eq!(service.download(ContentKind::Channel).await.unwrap(), 32);

    assert_eq!(service.content(ContentKind::Channel, None).await.unwrap().len(), 32);
    assert_eq!(service.categories(ContentKind::Channel).await.unwrap().len(), 3);
    assert!(service.check_content_exists(ContentKind::Channel).await.unwrap());
    assert!(service.content_downloaded().await.unwrap().channels);

    let progress: Vec<DownloadProgress> = events
        .drain()
        .into_iter()
        .filter_map(|event| match event.payload {
            EventPayload::Download { progress, .. } => Some(progress),
            _ => None,
        })
        .collect();
    assert!(progress.windows(2).all(|w| w[0].progress <= w[1].progress));
    assert_eq!(progress.last(), Some(&DownloadProgress::finished(32)));
}

#[tokio::test]
async fn test_failed_category_preserves_previous_download() {
    let ctx = TestContext::new().await;
    let first = ctx.service(MockFactory::new().with_profile("A", three_movie_categories(4)));
    let profile = use_new_profile(&first, "A").await;
    first.download(ContentKind::Movie).await.unwrap();
    let before = first.content(ContentKind::Movie, None).await.unwrap();

    // Same database, a server that now fails on the second category
    let second = ctx.service(
        MockFactory::new().with_profile("A", three_movie_categories(9).fail_on_item_request(2)),
    );
    second.switch_profile(&profile.id).await.unwrap();

    let err = second.download(ContentKind::Movie).await.unwrap_err();
    assert!(matches!(
        err,
        CatalogError::RemoteFetchFailed {
            kind: ContentKind::Movie,
            ..
        }
    ));
    assert_eq!(second.content(ContentKind::Movie, None).await.unwrap(), before);
    assert!(second.content_downloaded().await.unwrap().movies);
    assert_eq!(
        second.progress().await.unwrap().movies,
        DownloadProgress::default()
    );
}

#[tokio::test]
async fn test_profiles_never_see_each_other() {
    let ctx = TestContext::new().await;
    let service = ctx.service(
        MockFactory::new()
            .with_profile("A", channels_10_15_7())
            .with_profile("B", MockBackend::new().with_category(ContentKind::Channel, "9", 2)),
    );

    let a = use_new_profile(&service, "A").await;
    service.download(ContentKind::Channel).await.unwrap();

    use_new_profile(&service, "B").await;
    assert!(!service.check_content_exists(ContentKind::Channel).await.unwrap());
    assert!(service.content(ContentKind::Channel, None).await.unwrap().is_empty());
    service.download(ContentKind::Channel).await.unwrap();
    let b_items = service.content(ContentKind::Channel, None).await.unwrap();
    assert_eq!(b_items.len(), 2);

    service.switch_profile(&a.id).await.unwrap();
    let a_items = service.content(ContentKind::Channel, None).await.unwrap();
    assert_eq!(a_items.len(), 32);
    assert!(a_items.iter().all(|item| !b_items.contains(item)));

    let active: Vec<_> = service
        .list_profiles()
        .await
        .into_iter()
        .filter(|p| p.is_active)
        .map(|p| p.id)
        .collect();
    assert_eq!(active, vec![a.id]);
}

#[tokio::test]
async fn test_switching_profile_cancels_running_download() {
    let ctx = TestContext::new().await;
    let slow = channels_10_15_7().with_delay(Duration::from_millis(50));
    let service = ctx.service(MockFactory::new().with_profile("A", slow));

    let a = use_new_profile(&service, "A").await;
    let b = service
        .add_profile("B", common::credentials("http://other.example.com"))
        .await
        .unwrap();

    let (download, switched) = tokio::join!(service.download(ContentKind::Channel), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        service.switch_profile(&b.id).await
    });

    assert!(matches!(
        download,
        Err(CatalogError::Cancelled(ContentKind::Channel))
    ));
    assert_eq!(switched.unwrap().id, b.id);

    service.switch_profile(&a.id).await.unwrap();
    assert!(service.content(ContentKind::Channel, None).await.unwrap().is_empty());
    assert!(!service.content_downloaded().await.unwrap().channels);
}

#[tokio::test]
async fn test_read_after_write_through_the_cache() {
    let ctx = TestContext::new().await;
    let service = ctx.service(MockFactory::new().with_profile("A", channels_10_15_7()));
    let profile = use_new_profile(&service, "A").await;

    service.refresh(ContentKind::Channel).await.unwrap();
    let items = service.content(ContentKind::Channel, None).await.unwrap();
    assert!(service
        .cache()
        .set_content(ContentKind::Channel, &profile.id, items[..5].to_vec())
        .await);

    assert_eq!(
        service.content(ContentKind::Channel, None).await.unwrap(),
        items[..5].to_vec()
    );
    service.cache().invalidate_all().await;
    assert_eq!(
        service.content(ContentKind::Channel, None).await.unwrap(),
        items[..5].to_vec()
    );
}

#[tokio::test]
async fn test_session_survives_restart() {
    let ctx = TestContext::new().await;
    let service = ctx.service(MockFactory::new().with_profile("A", channels_10_15_7()));
    let profile = use_new_profile(&service, "A").await;
    service.download(ContentKind::Channel).await.unwrap();
    drop(service);

    let restarted = ctx.service(MockFactory::new());
    let restored = restarted.restore_session().await.unwrap().unwrap();
    assert_eq!(restored.id, profile.id);
    assert_eq!(
        restarted.content(ContentKind::Channel, None).await.unwrap().len(),
        32
    );
    assert!(restarted.content_downloaded().await.unwrap().channels);
}
