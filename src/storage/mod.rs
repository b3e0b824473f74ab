//! Storage Module
//!
//! Path-safe filesystem persistence for originals, thumbnails, variants and
//! temp files.

mod local;
pub mod paths;

pub use local::{ImageStorage, StorageArea, StorageInfo, TempCleanupReport, ORIGINALS_DIR};
