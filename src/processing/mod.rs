//! Processing Module
//!
//! Decode/resize/encode pipeline for thumbnails and variants, plus a
//! quality-ladder search towards a target byte size.

mod dimensions;
mod options;
mod processor;

pub use dimensions::calculate_dimensions;
pub use options::{ImageInfo, ImageStats, OutputFormat, ProcessedImage, ProcessingOptions};
pub use processor::{
    ImageProcessor, DEFAULT_THUMBNAIL_SIZE, LIGHT_PASS_QUALITY, QUALITY_LADDER, THUMBNAIL_QUALITY,
};
