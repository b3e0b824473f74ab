//! End-to-end Tests for the Image Pipeline
//!
//! Drives the library components directly, without the HTTP layer.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use listing_images::cache::VariantSpec;
use listing_images::config::{Config, ImageCacheConfig, ProcessorConfig, StorageConfig};
use listing_images::processing::ProcessingOptions;
use listing_images::{spawn_cache_sweeper, ImageCache, ImageProcessor, ImageService, LruCache};

// == Helper Functions ==

fn jpeg(width: u32, height: u32, quality: u8) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x / 8 % 256) as u8, (y / 8 % 256) as u8, ((x + y) / 16 % 256) as u8])
    });
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut cursor, ImageOutputFormat::Jpeg(quality))
        .unwrap();
    cursor.into_inner()
}

// == Processor ==

#[test]
fn test_large_jpeg_is_downscaled_and_shrunk() {
    let input = jpeg(2000, 1500, 95);
    let processor = ImageProcessor::new(ProcessorConfig::default());
    let options = ProcessingOptions {
        max_width: 1000,
        max_height: 800,
        quality: 85,
        format: "jpg".to_string(),
        optimize_size: true,
        preserve_aspect: true,
    };

    let out = processor.process_image(&input, &options).unwrap();

    assert_eq!((out.width, out.height), (1000, 750));
    assert_eq!(out.stats.original_size, input.len() as u64);
    assert!(out.stats.optimized_size < out.stats.original_size);
    assert!(out.stats.compression_ratio > 0.0 && out.stats.compression_ratio < 1.0);

    let decoded = image::load_from_memory(&out.data).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (1000, 750));
}

// == LRU Core ==

#[test]
fn test_recently_read_entry_survives_eviction() {
    let cache: LruCache<&str, u32> = LruCache::new(2, u64::MAX, Duration::from_secs(60));
    cache.put("A", 1, 1);
    cache.put("B", 2, 1);
    assert_eq!(cache.get(&"A"), Some(1));

    cache.put("C", 3, 1);

    assert!(cache.contains(&"A"));
    assert!(!cache.contains(&"B"));
    assert!(cache.contains(&"C"));
    assert_eq!(cache.stats().evictions, 1);
}

// == Disabled Cache ==

#[test]
fn test_disabled_cache_is_inert() {
    let cache = ImageCache::new(ImageCacheConfig {
        enabled: false,
        ..ImageCacheConfig::default()
    });
    let spec = VariantSpec {
        width: 100,
        height: 100,
        quality: 80,
        format: "jpg".to_string(),
    };

    cache.set("k", vec![1u8, 2, 3], "image/jpeg");
    cache.set_thumbnail("img", 150, vec![1u8], "image/jpeg");
    cache.set_variant("img", &spec, vec![1u8], "image/jpeg");

    assert!(cache.get("k").is_none());
    assert!(cache.get_thumbnail("img", 150).is_none());
    assert!(cache.get_variant("img", &spec).is_none());
    assert!(!cache.delete("k"));
    assert_eq!(cache.invalidate_image("img"), 0);
    assert!(cache.popular_images(5).is_empty());
    assert_eq!(cache.stats(), Default::default());
}

// == Service ==

#[tokio::test]
async fn test_service_round_trip_with_sweeper() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        cache: ImageCacheConfig {
            ttl: Duration::from_millis(150),
            ..ImageCacheConfig::default()
        },
        storage: StorageConfig {
            base_path: dir.path().to_path_buf(),
            ..StorageConfig::default()
        },
        ..Config::default()
    };
    let service = Arc::new(ImageService::from_config(&config).unwrap());
    let sweeper = spawn_cache_sweeper(service.cache().clone(), Duration::from_millis(50));

    service.upload(jpeg(600, 400, 90), "lot.jpg").await.unwrap();
    let thumb = service.thumbnail("lot.jpg", 300).await.unwrap();
    assert_eq!(thumb.content_type, "image/jpeg");
    assert_eq!(service.cache().stats().entries, 1);

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(service.cache().stats().entries, 0);

    // Expired rendition is regenerated from the stored original.
    service.thumbnail("lot.jpg", 300).await.unwrap();
    assert_eq!(service.renditions_generated(), 2);

    sweeper.abort();
}
