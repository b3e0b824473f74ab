//! Image Service
//!
//! Wires storage, processor and cache together: uploads originals, serves
//! thumbnails and variants through the cache, and coalesces concurrent
//! misses for the same rendition onto a single processing call.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::cache::{thumbnail_key, CachedImage, ImageCache, VariantSpec};
use crate::config::Config;
use crate::error::{ImageError, Result};
use crate::processing::{ImageProcessor, OutputFormat, ProcessedImage, DEFAULT_THUMBNAIL_SIZE};
use crate::storage::paths::clean_relative;
use crate::storage::{ImageStorage, StorageInfo, TempCleanupReport, ORIGINALS_DIR};

/// Result of a successful upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadedImage {
    /// Path relative to the storage root
    pub path: String,
    /// Public URL, empty when none is configured
    pub url: String,
    pub size: u64,
    pub width: u32,
    pub height: u32,
    pub format: String,
}

type FlightLock = Arc<tokio::sync::Mutex<()>>;
type FlightMap = Mutex<HashMap<String, FlightLock>>;

/// Membership in the flight for one key.
///
/// Dropping the slot, whether the rendition finished or the waiting future
/// was cancelled, releases its share; the last one out removes the key.
/// Every clone and release of `lock` happens under the map mutex, so the
/// strong count seen there is exact.
struct FlightSlot<'a> {
    map: &'a FlightMap,
    key: String,
    lock: FlightLock,
}

impl<'a> FlightSlot<'a> {
    fn join(map: &'a FlightMap, key: &str) -> Self {
        let mut flights = map.lock().unwrap_or_else(PoisonError::into_inner);
        let lock = Arc::clone(flights.entry(key.to_string()).or_default());
        Self {
            map,
            key: key.to_string(),
            lock,
        }
    }
}

impl Drop for FlightSlot<'_> {
    fn drop(&mut self) {
        let mut flights = self.map.lock().unwrap_or_else(PoisonError::into_inner);
        drop(std::mem::take(&mut self.lock));
        if flights.get(&self.key).is_some_and(|f| Arc::strong_count(f) == 1) {
            flights.remove(&self.key);
        }
    }
}

// == Image Service ==
/// Owns the pipeline components. Constructed once and shared via `Arc`.
#[derive(Debug)]
pub struct ImageService {
    storage: Arc<ImageStorage>,
    processor: Arc<ImageProcessor>,
    cache: Arc<ImageCache>,
    /// One async lock per rendition key currently being produced
    in_flight: FlightMap,
    generated: AtomicU64,
}

impl ImageService {
    pub fn new(
        storage: Arc<ImageStorage>,
        processor: Arc<ImageProcessor>,
        cache: Arc<ImageCache>,
    ) -> Self {
        Self {
            storage,
            processor,
            cache,
            in_flight: Mutex::new(HashMap::new()),
            generated: AtomicU64::new(0),
        }
    }

    /// Builds every component from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let storage = ImageStorage::new(&config.storage)?;
        Ok(Self::new(
            Arc::new(storage),
            Arc::new(ImageProcessor::new(config.processor.clone())),
            Arc::new(ImageCache::new(config.cache.clone())),
        ))
    }

    pub fn storage(&self) -> &Arc<ImageStorage> {
        &self.storage
    }

    pub fn processor(&self) -> &Arc<ImageProcessor> {
        &self.processor
    }

    pub fn cache(&self) -> &Arc<ImageCache> {
        &self.cache
    }

    /// Number of thumbnails and variants actually rendered.
    pub fn renditions_generated(&self) -> u64 {
        self.generated.load(Ordering::Relaxed)
    }

    // == Upload ==
    /// Validates and stores an original under `originals/{file_name}`.
    pub async fn upload(&self, data: Vec<u8>, file_name: &str) -> Result<UploadedImage> {
        let storage = Arc::clone(&self.storage);
        let processor = Arc::clone(&self.processor);
        let name = file_name.to_string();

        let (path, info, size) = blocking(move || {
            let info = processor.validate_image_data(&data, storage.max_file_size())?;
            let path = storage.store(&data, &name)?;
            Ok((path, info, data.len() as u64))
        })
        .await?;

        info!(path = %path, size, "uploaded image");
        Ok(UploadedImage {
            url: self.storage.url(&path),
            path,
            size,
            width: info.width,
            height: info.height,
            format: info.format,
        })
    }

    // == Thumbnail ==
    /// Returns a cached or freshly generated thumbnail.
    ///
    /// `size` must be one of the configured thumbnail sizes; 0 picks the first.
    pub async fn thumbnail(&self, file_name: &str, size: u32) -> Result<CachedImage> {
        let sizes = &self.processor.config().thumbnail_sizes;
        let size = match size {
            0 => sizes.first().copied().unwrap_or(DEFAULT_THUMBNAIL_SIZE),
            s if sizes.contains(&s) => s,
            s => {
                return Err(ImageError::Validation(format!(
                    "thumbnail size {s} not in {sizes:?}"
                )))
            }
        };

        if let Some(hit) = self.cache.get_thumbnail(file_name, size) {
            return Ok(hit);
        }

        let key = thumbnail_key(file_name, size);
        let processor = Arc::clone(&self.processor);
        self.render(&key, file_name, move |original| {
            processor.generate_thumbnail(&original, size)
        })
        .await
    }

    // == Variant ==
    /// Returns a cached or freshly generated variant.
    ///
    /// Quality 0 and an empty format are normalized first so equivalent
    /// requests share one cache key.
    pub async fn variant(&self, file_name: &str, spec: VariantSpec) -> Result<CachedImage> {
        let spec = VariantSpec {
            quality: if spec.quality == 0 {
                self.processor.config().default_quality
            } else {
                spec.quality
            },
            format: if spec.format.is_empty() {
                OutputFormat::Jpeg.extension().to_string()
            } else {
                spec.format.to_ascii_lowercase()
            },
            ..spec
        };

        if let Some(hit) = self.cache.get_variant(file_name, &spec) {
            return Ok(hit);
        }

        let key = spec.key_for(file_name);
        let processor = Arc::clone(&self.processor);
        self.render(&key, file_name, move |original| {
            processor.generate_image_variant(
                &original,
                spec.width,
                spec.height,
                spec.quality,
                &spec.format,
            )
        })
        .await
    }

    /// Produces the rendition for `key` at most once per concurrent burst.
    async fn render<F>(&self, key: &str, file_name: &str, make: F) -> Result<CachedImage>
    where
        F: FnOnce(Vec<u8>) -> Result<ProcessedImage> + Send + 'static,
    {
        let slot = FlightSlot::join(&self.in_flight, key);
        let _guard = slot.lock.lock().await;

        // Another caller may have finished while we waited.
        match self.cache.get(key) {
            Some(hit) => {
                debug!(key, "coalesced onto completed rendition");
                Ok(hit)
            }
            None => self.produce(key, file_name, make).await,
        }
    }

    async fn produce<F>(&self, key: &str, file_name: &str, make: F) -> Result<CachedImage>
    where
        F: FnOnce(Vec<u8>) -> Result<ProcessedImage> + Send + 'static,
    {
        let storage = Arc::clone(&self.storage);
        let original_path = original_path(file_name)?;
        let processed = blocking(move || {
            let original = storage.retrieve(&original_path)?;
            make(original)
        })
        .await?;

        self.generated.fetch_add(1, Ordering::Relaxed);
        let image = CachedImage {
            content_type: processed.content_type().to_string(),
            data: processed.data.into(),
        };
        self.cache.set(key, image.data.clone(), &image.content_type);
        Ok(image)
    }

    // == Delete ==
    /// Removes the original and every cached rendition of it.
    ///
    /// Returns the number of cache entries invalidated.
    pub async fn delete(&self, file_name: &str) -> Result<usize> {
        let storage = Arc::clone(&self.storage);
        let path = original_path(file_name)?;
        blocking(move || storage.delete(&path)).await?;

        let removed = self.cache.invalidate_image(file_name);
        info!(file_name, invalidated = removed, "deleted image");
        Ok(removed)
    }

    // == Storage Maintenance ==
    pub async fn storage_info(&self) -> Result<StorageInfo> {
        let storage = Arc::clone(&self.storage);
        blocking(move || storage.storage_info()).await
    }

    /// Removes temp files older than `older_than`.
    pub async fn cleanup_temp(&self, older_than: Duration) -> Result<TempCleanupReport> {
        let storage = Arc::clone(&self.storage);
        blocking(move || storage.cleanup_temp_files(older_than)).await
    }
}

/// Storage path of an original. The name is cleaned on its own first, so
/// `..` segments cannot climb out of `originals/` into sibling areas.
fn original_path(file_name: &str) -> Result<String> {
    let name = clean_relative(file_name)?;
    Ok(Path::new(ORIGINALS_DIR)
        .join(name)
        .to_string_lossy()
        .into_owned())
}

/// Runs filesystem and CPU-bound work off the async executor.
async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ImageError::Processing(format!("worker task failed: {e}")))?
}
