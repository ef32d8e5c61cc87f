//! API integration tests for thumbnail retrieval and error handling.
//!
//! Tests verify:
//! - Fit, pad and crop output through the HTTP layer
//! - Error cases and their status codes and JSON bodies
//! - Response headers

use std::sync::Arc;

use axum::http::StatusCode;
use image::Rgba;

use super::test_utils::{
    create_test_gif, create_test_jpeg, decoded_dimensions, error_type, get, header, is_valid_jpeg,
    router_for, solid_image, to_jpeg, to_png, to_webp, TrackingStore, UnreachableStore,
};
use thumbs_server::{create_router, MemoryStore, RouterConfig, ThumbnailService};

async fn stores_with(key: &str, data: Vec<u8>) -> (Arc<TrackingStore>, Arc<TrackingStore>) {
    let images = Arc::new(TrackingStore::new().with_object(key, data).await);
    (images, Arc::new(TrackingStore::new()))
}

// =============================================================================
// Modes
// =============================================================================

#[tokio::test]
async fn test_fit_preserves_aspect_ratio() {
    let (images, thumbs) = stores_with("photo.jpg", create_test_jpeg(800, 600)).await;
    let router = router_for(images, thumbs);

    let (status, headers, body) = get(&router, "/m100x100/photo.jpg").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(header(&headers, "content-type"), "image/jpeg");
    assert!(is_valid_jpeg(&body));
    assert_eq!(decoded_dimensions(&body), (100, 75));
}

#[tokio::test]
async fn test_fit_never_upscales() {
    let (images, thumbs) = stores_with("small.jpg", create_test_jpeg(40, 30)).await;
    let router = router_for(images, thumbs);

    let (status, _, body) = get(&router, "/m100x100/small.jpg").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decoded_dimensions(&body), (40, 30));
}

#[tokio::test]
async fn test_pad_fills_bands_with_background() {
    let source = to_png(&solid_image(800, 600, [0, 0, 255]));
    let (images, thumbs) = stores_with("photo.png", source).await;
    let router = router_for(images, thumbs);

    let (status, headers, body) = get(&router, "/wcc100x100,ff0000/photo.png").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(header(&headers, "content-type"), "image/png");

    let image = image::load_from_memory(&body).unwrap().to_rgba8();
    assert_eq!(image.dimensions(), (100, 100));
    // Scaled to 100x75 and centered: 12 rows above, 13 below.
    for x in [0, 50, 99] {
        assert_eq!(image.get_pixel(x, 0), &Rgba([255, 0, 0, 255]));
        assert_eq!(image.get_pixel(x, 11), &Rgba([255, 0, 0, 255]));
        assert_eq!(image.get_pixel(x, 87), &Rgba([255, 0, 0, 255]));
        assert_eq!(image.get_pixel(x, 99), &Rgba([255, 0, 0, 255]));
    }
    let center = image.get_pixel(50, 50);
    assert!(center[2] > 240 && center[0] < 15, "{center:?}");
}

#[tokio::test]
async fn test_pad_jpeg_bands_are_red() {
    let source = to_jpeg(&solid_image(800, 600, [0, 0, 255]), 95);
    let (images, thumbs) = stores_with("photo.jpg", source).await;
    let router = router_for(images, thumbs);

    let (status, _, body) = get(&router, "/wcc100x100,ff0000/photo.jpg").await;
    assert_eq!(status, StatusCode::OK);

    let image = image::load_from_memory(&body).unwrap().to_rgb8();
    assert_eq!(image.dimensions(), (100, 100));
    let band = image.get_pixel(50, 3);
    assert!(band[0] > 200 && band[1] < 60 && band[2] < 60, "{band:?}");
}

#[tokio::test]
async fn test_crop_fills_target() {
    let (images, thumbs) = stores_with("photo.jpg", create_test_jpeg(800, 600)).await;
    let router = router_for(images, thumbs);

    let (status, _, body) = get(&router, "/cc100x100/photo.jpg").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decoded_dimensions(&body), (100, 100));
}

#[tokio::test]
async fn test_crop_anchor_selects_region() {
    // Left half black, right half white.
    let source = image::DynamicImage::ImageRgb8(image::RgbImage::from_fn(400, 200, |x, _| {
        if x < 200 {
            image::Rgb([0, 0, 0])
        } else {
            image::Rgb([255, 255, 255])
        }
    }));
    let (images, thumbs) = stores_with("split.png", to_png(&source)).await;
    let router = router_for(images, thumbs);

    let (_, _, left) = get(&router, "/lc50x50/split.png").await;
    let (_, _, right) = get(&router, "/rc50x50/split.png").await;

    let left = image::load_from_memory(&left).unwrap().to_rgb8();
    let right = image::load_from_memory(&right).unwrap().to_rgb8();
    assert!(left.get_pixel(25, 25)[0] < 20);
    assert!(right.get_pixel(25, 25)[0] > 235);
}

#[tokio::test]
async fn test_webp_source_and_output() {
    let source = to_webp(&solid_image(64, 32, [10, 200, 30]));
    let (images, thumbs) = stores_with("leaf.webp", source).await;
    let router = router_for(images, thumbs);

    let (status, headers, body) = get(&router, "/m16x16/leaf.webp").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(header(&headers, "content-type"), "image/webp");
    assert_eq!(decoded_dimensions(&body), (16, 8));
}

#[tokio::test]
async fn test_source_in_nested_directory() {
    let (images, thumbs) = stores_with("a/b/c/photo.jpg", create_test_jpeg(200, 100)).await;
    let router = router_for(images, Arc::clone(&thumbs));

    let (status, _, _) = get(&router, "/m50x50/a/b/c/photo.jpg").await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        thumbs
            .contains("m50x50,ffffffff,q85,jpg/a/b/c/photo.jpg")
            .await
    );
}

#[tokio::test]
async fn test_out_of_range_quality_uses_default() {
    let (images, thumbs) = stores_with("photo.jpg", create_test_jpeg(100, 100)).await;
    let router = router_for(images, Arc::clone(&thumbs));

    let (status, _, _) = get(&router, "/m50x50,q150/photo.jpg").await;
    assert_eq!(status, StatusCode::OK);
    assert!(thumbs.contains("m50x50,ffffffff,q85,jpg/photo.jpg").await);
}

#[tokio::test]
async fn test_malformed_options_do_not_change_format() {
    let (images, thumbs) = stores_with("photo.jpg", create_test_jpeg(100, 100)).await;
    let router = router_for(images, Arc::clone(&thumbs));

    for token in ["m50x50,qabc", "m50x50,ff00zz"] {
        let (status, headers, _) = get(&router, &format!("/{token}/photo.jpg")).await;
        assert_eq!(status, StatusCode::OK, "{token}");
        assert_eq!(header(&headers, "content-type"), "image/jpeg", "{token}");
    }
    assert!(thumbs.contains("m50x50,ffffffff,q85,jpg/photo.jpg").await);
}

// =============================================================================
// Headers
// =============================================================================

#[tokio::test]
async fn test_cache_headers() {
    let (images, thumbs) = stores_with("photo.jpg", create_test_jpeg(100, 100)).await;
    let router = router_for(images, thumbs);

    let (_, headers, _) = get(&router, "/m10x10/photo.jpg").await;
    assert_eq!(
        header(&headers, "cache-control"),
        "public, max-age=31536000"
    );
    assert!(header(&headers, "expires").ends_with("GMT"));
    assert_eq!(header(&headers, "x-thumbnail-cache-hit"), "false");
    assert_eq!(header(&headers, "x-thumbnail-persisted"), "true");
}

#[tokio::test]
async fn test_custom_cache_control() {
    let images = TrackingStore::new()
        .with_object("photo.jpg", create_test_jpeg(100, 100))
        .await;
    let router = create_router(
        ThumbnailService::new(images, MemoryStore::new()),
        RouterConfig::new()
            .with_tracing(false)
            .with_cache_control("public, max-age=60".parse().unwrap()),
    );

    let (_, headers, _) = get(&router, "/m10x10/photo.jpg").await;
    assert_eq!(header(&headers, "cache-control"), "public, max-age=60");
}

// =============================================================================
// Errors
// =============================================================================

#[tokio::test]
async fn test_gif_source_is_unsupported() {
    let (images, thumbs) = stores_with("anim.gif", create_test_gif()).await;
    let router = router_for(images, Arc::clone(&thumbs));

    let (status, _, body) = get(&router, "/m100x100/anim.gif").await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(error_type(&body), "unsupported_source_format");
    assert_eq!(thumbs.len().await, 0);
}

#[tokio::test]
async fn test_extension_is_not_trusted_for_decoding() {
    // JPEG bytes under a .gif name decode fine; only the output format fails.
    let (images, thumbs) = stores_with("photo.gif", create_test_jpeg(50, 50)).await;
    let router = router_for(images, thumbs);

    let (status, _, body) = get(&router, "/m10x10/photo.gif").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_type(&body), "unsupported_output_format");
}

#[tokio::test]
async fn test_missing_source() {
    let router = router_for(Arc::new(TrackingStore::new()), Arc::new(TrackingStore::new()));

    let (status, _, body) = get(&router, "/m100x100/missing.jpg").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_type(&body), "not_found");

    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["status"], 404);
    assert!(value["message"].as_str().unwrap().contains("missing.jpg"));
}

#[tokio::test]
async fn test_bad_tokens() {
    let (images, thumbs) = stores_with("photo.jpg", create_test_jpeg(10, 10)).await;
    let router = router_for(Arc::clone(&images), thumbs);

    let cases = [
        ("/zz100x100/photo.jpg", "invalid_mode"),
        ("/mx100/photo.jpg", "invalid_mode"),
        ("/m100/photo.jpg", "invalid_dimensions"),
        ("/m0x100/photo.jpg", "invalid_dimensions"),
        ("/m100x/photo.jpg", "invalid_dimensions"),
        ("/m3000x100/photo.jpg", "dimensions_too_large"),
        ("/m100x100", "invalid_request"),
        ("/m10x10/..%2Fsecret.jpg", "invalid_request"),
    ];
    for (uri, expected) in cases {
        let (status, _, body) = get(&router, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(error_type(&body), expected, "{uri}");
    }

    // Nothing reached the image store.
    assert_eq!(images.exists_count(), 0);
    assert_eq!(images.load_count(), 0);
}

#[tokio::test]
async fn test_unreachable_store_is_bad_gateway() {
    let router = create_router(
        ThumbnailService::new(UnreachableStore, UnreachableStore),
        RouterConfig::new().with_tracing(false),
    );

    let (status, _, body) = get(&router, "/m10x10/photo.jpg").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(error_type(&body), "connection_error");
}

#[tokio::test]
async fn test_health() {
    let router = router_for(Arc::new(TrackingStore::new()), Arc::new(TrackingStore::new()));

    let (status, _, body) = get(&router, "/health").await;
    assert_eq!(status, StatusCode::OK);

    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["status"], "healthy");
    assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
}
