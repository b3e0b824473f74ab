//! Processing parameters, output formats and per-call statistics.

use serde::Serialize;

use crate::error::{ImageError, Result};

// == Output Format ==
/// Encodings the processor can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Lossy, honours the quality setting
    Jpeg,
    /// Lossless, quality is ignored
    Png,
}

impl OutputFormat {
    /// Resolves a format name. Names without an encoder fail rather than
    /// falling back to another format.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            other => Err(ImageError::Processing(format!(
                "unsupported output format: {other}"
            ))),
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }
}

// == Processing Options ==
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingOptions {
    pub max_width: u32,
    pub max_height: u32,
    /// 1-100
    pub quality: u8,
    /// Target format name, e.g. `jpg` or `png`
    pub format: String,
    /// Bilinear resize when true, nearest-neighbour otherwise
    pub optimize_size: bool,
    pub preserve_aspect: bool,
}

impl ProcessingOptions {
    /// Checks bounds and that `format` is in the allowed list.
    pub fn validate(&self, allowed_formats: &[String]) -> Result<()> {
        if self.max_width == 0 || self.max_height == 0 {
            return Err(ImageError::Validation(format!(
                "dimensions must be positive, got {}x{}",
                self.max_width, self.max_height
            )));
        }
        if !(1..=100).contains(&self.quality) {
            return Err(ImageError::Validation(format!(
                "quality must be between 1 and 100, got {}",
                self.quality
            )));
        }
        let format = self.format.to_ascii_lowercase();
        if format.is_empty() || !allowed_formats.iter().any(|f| *f == format) {
            return Err(ImageError::Validation(format!(
                "format not allowed: {:?}",
                self.format
            )));
        }
        Ok(())
    }
}

// == Statistics ==
/// Produced fresh for every processing call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageStats {
    pub original_size: u64,
    pub optimized_size: u64,
    /// `optimized_size / original_size`
    pub compression_ratio: f64,
    pub processing_time_ms: u64,
}

impl ImageStats {
    pub fn new(original_size: u64, optimized_size: u64, processing_time_ms: u64) -> Self {
        let compression_ratio = if original_size == 0 {
            0.0
        } else {
            optimized_size as f64 / original_size as f64
        };
        Self {
            original_size,
            optimized_size,
            compression_ratio,
            processing_time_ms,
        }
    }
}

/// Encoded output of one processing call.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    pub stats: ImageStats,
}

impl ProcessedImage {
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }
}

/// Header information of an encoded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub format: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> Vec<String> {
        vec!["jpg".into(), "jpeg".into(), "png".into(), "webp".into()]
    }

    fn options() -> ProcessingOptions {
        ProcessingOptions {
            max_width: 100,
            max_height: 100,
            quality: 85,
            format: "jpg".to_string(),
            optimize_size: true,
            preserve_aspect: true,
        }
    }

    #[test]
    fn test_format_names() {
        assert_eq!(OutputFormat::from_name("JPG").unwrap(), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::from_name("jpeg").unwrap(), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::from_name("png").unwrap().content_type(), "image/png");
        assert!(matches!(
            OutputFormat::from_name("webp"),
            Err(ImageError::Processing(_))
        ));
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(options().validate(&allowed()).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut o = options();
        o.max_width = 0;
        assert!(matches!(o.validate(&allowed()), Err(ImageError::Validation(_))));

        let mut o = options();
        o.quality = 0;
        assert!(matches!(o.validate(&allowed()), Err(ImageError::Validation(_))));

        let mut o = options();
        o.quality = 101;
        assert!(matches!(o.validate(&allowed()), Err(ImageError::Validation(_))));

        let mut o = options();
        o.format = "bmp".to_string();
        assert!(matches!(o.validate(&allowed()), Err(ImageError::Validation(_))));
    }

    #[test]
    fn test_compression_ratio() {
        let stats = ImageStats::new(1000, 250, 3);
        assert_eq!(stats.compression_ratio, 0.25);
        assert_eq!(ImageStats::new(0, 10, 0).compression_ratio, 0.0);
    }
}
