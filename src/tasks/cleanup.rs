//! Periodic Cleanup Tasks
//!
//! Background tasks that sweep expired cache entries and stale temp files.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::ImageCache;
use crate::storage::ImageStorage;

/// Spawns a task that removes expired cache entries every `interval`.
///
/// Expired entries are otherwise only dropped when read, so this bounds
/// memory for keys that are never requested again. The sweep takes the
/// same lock as every other cache mutation.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(ImageCache::new(config.cache.clone()));
/// let handle = spawn_cache_sweeper(cache.clone(), config.cache.cleanup_interval);
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_cache_sweeper(cache: Arc<ImageCache>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting cache sweeper with interval of {} ms",
            interval.as_millis()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.purge_expired();
            if removed > 0 {
                info!("Cache sweep: removed {} expired entries", removed);
            } else {
                debug!("Cache sweep: no expired entries found");
            }
        }
    })
}

/// Spawns a task that deletes temp files older than `older_than`.
///
/// The directory walk runs on the blocking pool.
pub fn spawn_temp_cleanup(
    storage: Arc<ImageStorage>,
    interval: Duration,
    older_than: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting temp cleanup with interval of {} s",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let storage = Arc::clone(&storage);
            match tokio::task::spawn_blocking(move || storage.cleanup_temp_files(older_than)).await
            {
                Ok(Ok(report)) if !report.failures.is_empty() => {
                    warn!(
                        "Temp cleanup: removed {} files, {} could not be removed",
                        report.removed,
                        report.failures.len()
                    );
                }
                Ok(Ok(report)) => debug!("Temp cleanup: removed {} files", report.removed),
                Ok(Err(err)) => warn!("Temp cleanup failed: {}", err),
                Err(err) => warn!("Temp cleanup task panicked: {}", err),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ImageCacheConfig, StorageConfig};

    fn cache(ttl: Duration) -> Arc<ImageCache> {
        Arc::new(ImageCache::new(ImageCacheConfig {
            ttl,
            ..ImageCacheConfig::default()
        }))
    }

    #[tokio::test]
    async fn test_sweeper_removes_expired_entries() {
        let cache = cache(Duration::from_millis(100));
        cache.set("expire_soon", vec![1u8, 2, 3], "image/jpeg");

        let handle = spawn_cache_sweeper(cache.clone(), Duration::from_millis(150));
        tokio::time::sleep(Duration::from_millis(400)).await;

        let stats = cache.stats();
        assert_eq!(stats.entries, 0, "expired entry should have been swept");
        assert_eq!(stats.expirations, 1);

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweeper_preserves_valid_entries() {
        let cache = cache(Duration::from_secs(3600));
        cache.set("long_lived", vec![1u8], "image/jpeg");

        let handle = spawn_cache_sweeper(cache.clone(), Duration::from_millis(50));
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(cache.get("long_lived").is_some());
        handle.abort();
    }

    #[tokio::test]
    async fn test_temp_cleanup_task() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(
            ImageStorage::new(&StorageConfig {
                base_path: dir.path().to_path_buf(),
                ..StorageConfig::default()
            })
            .unwrap(),
        );
        storage.store_variant(b"scratch", "upload.part", "temp").unwrap();

        let handle = spawn_temp_cleanup(
            storage.clone(),
            Duration::from_millis(100),
            Duration::from_millis(10),
        );
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert!(!storage.exists("temp/upload.part").unwrap());
        handle.abort();
    }

    #[tokio::test]
    async fn test_tasks_can_be_aborted() {
        let handle = spawn_cache_sweeper(cache(Duration::from_secs(1)), Duration::from_secs(1));
        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
