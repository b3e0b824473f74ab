//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Cache sweep: Removes expired cache entries at the configured interval
//! - Temp cleanup: Removes stale files from the storage `temp/` area

mod cleanup;

pub use cleanup::{spawn_cache_sweeper, spawn_temp_cleanup};
