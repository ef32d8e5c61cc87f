//! Thumbnail store integration tests.
//!
//! Tests verify:
//! - Thumbnails are generated once and served from the store afterwards
//! - A failed write still serves the image
//! - Concurrent identical requests share one generation
//! - The filesystem store lays thumbnails out under their cache key

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, StatusCode};
use axum::Router;
use bytes::Bytes;

use super::test_utils::{
    create_test_jpeg, decoded_dimensions, get, header, router_for, TrackingStore,
};
use thumbs_server::{create_router, FsStore, MemoryStore, RouterConfig, ThumbnailService};

async fn get_concurrently(
    router: &Router,
    uri: &'static str,
    count: usize,
) -> Vec<(StatusCode, HeaderMap, Bytes)> {
    let handles: Vec<_> = (0..count)
        .map(|_| {
            let router = router.clone();
            tokio::spawn(async move { get(&router, uri).await })
        })
        .collect();

    let mut responses = Vec::with_capacity(count);
    for handle in handles {
        responses.push(handle.await.unwrap());
    }
    responses
}

#[tokio::test]
async fn test_second_request_is_cache_hit() {
    let images = Arc::new(
        TrackingStore::new()
            .with_object("photo.jpg", create_test_jpeg(400, 300))
            .await,
    );
    let thumbs = Arc::new(TrackingStore::new());
    let router = router_for(Arc::clone(&images), Arc::clone(&thumbs));

    let (status, headers, first) = get(&router, "/m100x100/photo.jpg").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(header(&headers, "x-thumbnail-cache-hit"), "false");
    assert_eq!(images.load_count(), 1);
    assert_eq!(thumbs.store_count(), 1);

    let (status, headers, second) = get(&router, "/m100x100/photo.jpg").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(header(&headers, "x-thumbnail-cache-hit"), "true");
    assert_eq!(header(&headers, "content-type"), "image/jpeg");
    assert_eq!(first, second);

    // The source was not read again.
    assert_eq!(images.load_count(), 1);
    assert_eq!(thumbs.store_count(), 1);
}

#[tokio::test]
async fn test_aliased_tokens_share_one_thumbnail() {
    let images = Arc::new(
        TrackingStore::new()
            .with_object("photo.jpg", create_test_jpeg(400, 300))
            .await,
    );
    let thumbs = Arc::new(TrackingStore::new());
    let router = router_for(Arc::clone(&images), Arc::clone(&thumbs));

    let (_, headers, _) = get(&router, "/w80x80/photo.jpg").await;
    assert_eq!(header(&headers, "x-thumbnail-cache-hit"), "false");

    let (_, headers, _) = get(&router, "/wcc80x80,ffffff,q85/photo.jpg").await;
    assert_eq!(header(&headers, "x-thumbnail-cache-hit"), "true");

    assert_eq!(thumbs.len().await, 1);
    assert_eq!(images.load_count(), 1);
}

#[tokio::test]
async fn test_distinct_tokens_are_distinct_thumbnails() {
    let images = Arc::new(
        TrackingStore::new()
            .with_object("photo.jpg", create_test_jpeg(400, 300))
            .await,
    );
    let thumbs = Arc::new(TrackingStore::new());
    let router = router_for(images, Arc::clone(&thumbs));

    for token in ["m80x80", "m80x80,q50", "cc80x80", "lt80x80", "w80x80,000000"] {
        let (status, headers, _) = get(&router, &format!("/{token}/photo.jpg")).await;
        assert_eq!(status, StatusCode::OK, "{token}");
        assert_eq!(header(&headers, "x-thumbnail-cache-hit"), "false", "{token}");
    }
    assert_eq!(thumbs.len().await, 5);
}

#[tokio::test]
async fn test_persist_failure_still_serves() {
    let images = Arc::new(
        TrackingStore::new()
            .with_object("photo.jpg", create_test_jpeg(400, 300))
            .await,
    );
    let thumbs = Arc::new(TrackingStore::new().failing_writes());
    let router = router_for(Arc::clone(&images), Arc::clone(&thumbs));

    let (status, headers, body) = get(&router, "/m100x100/photo.jpg").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(header(&headers, "x-thumbnail-persisted"), "false");
    assert_eq!(decoded_dimensions(&body), (100, 75));

    // Nothing was kept, so the next request generates again.
    let (status, headers, _) = get(&router, "/m100x100/photo.jpg").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(header(&headers, "x-thumbnail-cache-hit"), "false");
    assert_eq!(images.load_count(), 2);
    assert_eq!(thumbs.store_count(), 2);
}

#[tokio::test]
async fn test_thumbnail_too_large_for_memory_store_is_not_persisted() {
    let images = TrackingStore::new()
        .with_object("photo.jpg", create_test_jpeg(400, 300))
        .await;
    let service = ThumbnailService::new(images, MemoryStore::with_capacity(64));
    let router = create_router(service, RouterConfig::new().with_tracing(false));

    let (status, headers, body) = get(&router, "/m100x100/photo.jpg").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(header(&headers, "x-thumbnail-persisted"), "false");
    assert_eq!(decoded_dimensions(&body), (100, 75));

    let (_, headers, _) = get(&router, "/m100x100/photo.jpg").await;
    assert_eq!(header(&headers, "x-thumbnail-cache-hit"), "false");
}

#[tokio::test]
async fn test_concurrent_requests_generate_once() {
    let images = Arc::new(
        TrackingStore::new()
            .with_object("photo.jpg", create_test_jpeg(400, 300))
            .await
            .with_load_delay(Duration::from_millis(200)),
    );
    let thumbs = Arc::new(TrackingStore::new());
    let router = router_for(Arc::clone(&images), Arc::clone(&thumbs));

    let responses = get_concurrently(&router, "/m64x64/photo.jpg", 8).await;

    let first = &responses[0].2;
    for (status, _, body) in &responses {
        assert_eq!(*status, StatusCode::OK);
        assert_eq!(body, first);
    }
    assert_eq!(images.load_count(), 1);
    assert_eq!(thumbs.store_count(), 1);
}

#[tokio::test]
async fn test_uncoalesced_requests_still_succeed() {
    let images = TrackingStore::new()
        .with_object("photo.jpg", create_test_jpeg(200, 100))
        .await;
    let service = ThumbnailService::new(images, TrackingStore::new()).with_coalescing(false);
    assert!(!service.coalescing());
    let router = create_router(service, RouterConfig::new().with_tracing(false));

    let responses = get_concurrently(&router, "/m50x50/photo.jpg", 4).await;

    for (status, _, body) in responses {
        assert_eq!(status, StatusCode::OK);
        assert_eq!(decoded_dimensions(&body), (50, 25));
    }
}

#[tokio::test]
async fn test_filesystem_stores() {
    let images_dir = tempfile::tempdir().unwrap();
    let thumbs_dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(images_dir.path().join("photos")).unwrap();
    std::fs::write(
        images_dir.path().join("photos/cat.jpg"),
        create_test_jpeg(300, 200),
    )
    .unwrap();

    let service = ThumbnailService::new(
        FsStore::new(images_dir.path()),
        FsStore::new(thumbs_dir.path()),
    );
    let router = create_router(service, RouterConfig::new().with_tracing(false));

    let (status, headers, body) = get(&router, "/cc60x60,q70/photos/cat.jpg").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(header(&headers, "x-thumbnail-persisted"), "true");

    let stored = thumbs_dir
        .path()
        .join("cc60x60,ffffffff,q70,jpg/photos/cat.jpg");
    assert_eq!(std::fs::read(&stored).unwrap(), body.to_vec());

    // No temporary files are left next to the thumbnail.
    let entries: Vec<_> = std::fs::read_dir(stored.parent().unwrap())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(entries, vec![std::ffi::OsString::from("cat.jpg")]);

    let (_, headers, again) = get(&router, "/cc60x60,q70/photos/cat.jpg").await;
    assert_eq!(header(&headers, "x-thumbnail-cache-hit"), "true");
    assert_eq!(again, body);
}

#[tokio::test]
async fn test_filesystem_missing_source() {
    let images_dir = tempfile::tempdir().unwrap();
    let thumbs_dir = tempfile::tempdir().unwrap();
    let service = ThumbnailService::new(
        FsStore::new(images_dir.path()),
        FsStore::new(thumbs_dir.path()),
    );
    let router = create_router(service, RouterConfig::new().with_tracing(false));

    let (status, _, _) = get(&router, "/m10x10/nope.jpg").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(std::fs::read_dir(thumbs_dir.path()).unwrap().count(), 0);
}
