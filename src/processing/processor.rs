//! Decode → resize → encode pipeline.

use std::io::Cursor;
use std::time::Instant;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageOutputFormat};
use tracing::{debug, warn};

use crate::config::ProcessorConfig;
use crate::error::{ImageError, Result};
use crate::processing::{
    calculate_dimensions, ImageInfo, ImageStats, OutputFormat, ProcessedImage, ProcessingOptions,
};

/// Edge length used when a thumbnail size of 0 is requested.
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 150;
/// Fixed JPEG quality for thumbnails.
pub const THUMBNAIL_QUALITY: u8 = 80;
/// Quality of the single pass applied to inputs already under budget.
pub const LIGHT_PASS_QUALITY: u8 = 95;
/// Qualities tried, in order, when shrinking towards a byte budget.
pub const QUALITY_LADDER: [u8; 5] = [85, 75, 65, 55, 45];

// == Image Processor ==
/// Synchronous, CPU-bound image processor.
///
/// Callers are expected to run it off the async executor.
#[derive(Debug, Clone)]
pub struct ImageProcessor {
    config: ProcessorConfig,
}

impl ImageProcessor {
    pub fn new(config: ProcessorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Options for the processor's own bounding box.
    fn bounded_options(&self, quality: u8) -> ProcessingOptions {
        ProcessingOptions {
            max_width: self.config.max_width,
            max_height: self.config.max_height,
            quality,
            format: OutputFormat::Jpeg.extension().to_string(),
            optimize_size: true,
            preserve_aspect: true,
        }
    }

    // == Process Image ==
    /// Validates options, decodes, resizes if needed and re-encodes.
    pub fn process_image(&self, input: &[u8], options: &ProcessingOptions) -> Result<ProcessedImage> {
        options.validate(&self.config.allowed_formats)?;
        let format = OutputFormat::from_name(&options.format)?;
        self.run(input, options, format)
    }

    fn run(
        &self,
        input: &[u8],
        options: &ProcessingOptions,
        format: OutputFormat,
    ) -> Result<ProcessedImage> {
        let started = Instant::now();
        if input.is_empty() {
            return Err(ImageError::Validation("input image is empty".to_string()));
        }

        let img = image::load_from_memory(input)?;
        let (src_w, src_h) = (img.width(), img.height());
        let (width, height) = calculate_dimensions(
            src_w,
            src_h,
            options.max_width,
            options.max_height,
            options.preserve_aspect,
        );

        let img = if (width, height) != (src_w, src_h) {
            let filter = if options.optimize_size {
                FilterType::Triangle
            } else {
                FilterType::Nearest
            };
            img.resize_exact(width, height, filter)
        } else {
            img
        };

        let data = encode(&img, format, options.quality)?;
        let elapsed = started.elapsed().as_millis() as u64;
        let stats = ImageStats::new(input.len() as u64, data.len() as u64, elapsed);

        debug!(
            src = %format_args!("{src_w}x{src_h}"),
            dst = %format_args!("{width}x{height}"),
            original_size = stats.original_size,
            optimized_size = stats.optimized_size,
            elapsed_ms = elapsed,
            "processed image"
        );

        Ok(ProcessedImage {
            data,
            width,
            height,
            format,
            stats,
        })
    }

    // == Optimize For Size ==
    /// Best-effort shrink of `input` below `target_kb` kilobytes.
    ///
    /// Walks `QUALITY_LADDER` at the processor's bounding box, then falls back
    /// to half the bounding box at the lowest ladder quality. The fallback
    /// result is returned even if it is still over budget.
    pub fn optimize_for_size(&self, input: &[u8], target_kb: u64) -> Result<ProcessedImage> {
        if target_kb == 0 {
            return Err(ImageError::Validation("target size must be positive".to_string()));
        }
        let target_bytes = target_kb * 1024;

        if input.len() as u64 <= target_bytes {
            return self.run(input, &self.bounded_options(LIGHT_PASS_QUALITY), OutputFormat::Jpeg);
        }

        for quality in QUALITY_LADDER {
            let result = self.run(input, &self.bounded_options(quality), OutputFormat::Jpeg)?;
            if result.data.len() as u64 <= target_bytes {
                debug!(quality, size = result.data.len(), "quality ladder hit target");
                return Ok(result);
            }
        }

        let lowest = QUALITY_LADDER[QUALITY_LADDER.len() - 1];
        let mut fallback = self.bounded_options(lowest);
        fallback.max_width = (fallback.max_width / 2).max(1);
        fallback.max_height = (fallback.max_height / 2).max(1);

        let result = self.run(input, &fallback, OutputFormat::Jpeg)?;
        if result.data.len() as u64 > target_bytes {
            warn!(
                target_bytes,
                size = result.data.len(),
                "could not reach target size, returning smallest attempt"
            );
        }
        Ok(result)
    }

    // == Thumbnails and Variants ==
    /// Square-bounded JPEG thumbnail with preserved aspect ratio.
    pub fn generate_thumbnail(&self, input: &[u8], size: u32) -> Result<ProcessedImage> {
        let size = if size == 0 { DEFAULT_THUMBNAIL_SIZE } else { size };
        let options = ProcessingOptions {
            max_width: size,
            max_height: size,
            quality: THUMBNAIL_QUALITY,
            format: OutputFormat::Jpeg.extension().to_string(),
            optimize_size: true,
            preserve_aspect: true,
        };
        self.run(input, &options, OutputFormat::Jpeg)
    }

    /// Rendition bounded by explicit dimensions.
    ///
    /// Quality 0 means the configured default; an empty format means JPEG.
    pub fn generate_image_variant(
        &self,
        input: &[u8],
        width: u32,
        height: u32,
        quality: u8,
        format: &str,
    ) -> Result<ProcessedImage> {
        if width == 0 || height == 0 {
            return Err(ImageError::Validation(format!(
                "variant dimensions must be positive, got {width}x{height}"
            )));
        }
        let options = ProcessingOptions {
            max_width: width,
            max_height: height,
            quality: if quality == 0 { self.config.default_quality } else { quality },
            format: if format.is_empty() {
                OutputFormat::Jpeg.extension().to_string()
            } else {
                format.to_ascii_lowercase()
            },
            optimize_size: true,
            preserve_aspect: true,
        };
        self.process_image(input, &options)
    }

    // == Inspection ==
    /// Rejects empty, oversized or undecodable data.
    pub fn validate_image_data(&self, data: &[u8], max_size: u64) -> Result<ImageInfo> {
        if data.is_empty() {
            return Err(ImageError::Validation("image data is empty".to_string()));
        }
        if data.len() as u64 > max_size {
            return Err(ImageError::Validation(format!(
                "image size {} exceeds maximum of {} bytes",
                data.len(),
                max_size
            )));
        }

        let format = image::guess_format(data)
            .map_err(|_| ImageError::Validation("unrecognized image format".to_string()))?;
        let img = image::load_from_memory_with_format(data, format)
            .map_err(|e| ImageError::Validation(format!("invalid image data: {e}")))?;

        Ok(ImageInfo {
            width: img.width(),
            height: img.height(),
            format: format_name(format).to_string(),
        })
    }

    /// Reads width, height and format from the header only.
    pub fn get_image_dimensions(&self, data: &[u8]) -> Result<ImageInfo> {
        let reader = image::io::Reader::new(Cursor::new(data)).with_guessed_format()?;
        let format = reader
            .format()
            .ok_or_else(|| ImageError::Processing("unrecognized image format".to_string()))?;
        let (width, height) = reader.into_dimensions()?;

        Ok(ImageInfo {
            width,
            height,
            format: format_name(format).to_string(),
        })
    }
}

fn encode(img: &DynamicImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    match format {
        // JPEG carries no alpha channel.
        OutputFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8())
            .write_to(&mut cursor, ImageOutputFormat::Jpeg(quality))?,
        OutputFormat::Png => img.write_to(&mut cursor, ImageOutputFormat::Png)?,
    }
    Ok(cursor.into_inner())
}

fn format_name(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "jpeg",
        ImageFormat::Png => "png",
        ImageFormat::Gif => "gif",
        ImageFormat::WebP => "webp",
        ImageFormat::Bmp => "bmp",
        ImageFormat::Tiff => "tiff",
        ImageFormat::Ico => "ico",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn processor() -> ImageProcessor {
        ImageProcessor::new(ProcessorConfig {
            max_width: 200,
            max_height: 200,
            ..ProcessorConfig::default()
        })
    }

    fn jpeg(width: u32, height: u32, quality: u8) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([
                ((x * 7 + y * 3) % 256) as u8,
                ((x * y) % 251) as u8,
                ((x ^ y) % 256) as u8,
            ])
        });
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut cursor, ImageOutputFormat::Jpeg(quality))
            .unwrap();
        cursor.into_inner()
    }

    fn png_with_alpha(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, _| Rgba([x as u8, 0, 0, 128]));
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut cursor, ImageOutputFormat::Png)
            .unwrap();
        cursor.into_inner()
    }

    fn options(max_w: u32, max_h: u32, format: &str) -> ProcessingOptions {
        ProcessingOptions {
            max_width: max_w,
            max_height: max_h,
            quality: 85,
            format: format.to_string(),
            optimize_size: true,
            preserve_aspect: true,
        }
    }

    #[test]
    fn test_process_large_jpeg_scenario() {
        let processor = ImageProcessor::new(ProcessorConfig::default());
        let input = jpeg(2000, 1500, 95);

        let out = processor
            .process_image(&input, &options(1000, 800, "jpg"))
            .unwrap();

        assert_eq!((out.width, out.height), (1000, 750));
        assert!(out.stats.optimized_size < out.stats.original_size);
        assert!(out.stats.compression_ratio > 0.0 && out.stats.compression_ratio < 1.0);
        assert_eq!(out.content_type(), "image/jpeg");

        let info = processor.get_image_dimensions(&out.data).unwrap();
        assert_eq!((info.width, info.height), (1000, 750));
        assert_eq!(info.format, "jpeg");
    }

    #[test]
    fn test_process_small_image_keeps_dimensions() {
        let out = processor()
            .process_image(&jpeg(40, 30, 90), &options(100, 100, "png"))
            .unwrap();

        assert_eq!((out.width, out.height), (40, 30));
        assert_eq!(out.format, OutputFormat::Png);
        assert_eq!(processor().get_image_dimensions(&out.data).unwrap().format, "png");
    }

    #[test]
    fn test_nearest_filter_path() {
        let mut opts = options(20, 20, "jpg");
        opts.optimize_size = false;
        let out = processor().process_image(&jpeg(80, 40, 90), &opts).unwrap();
        assert_eq!((out.width, out.height), (20, 10));
    }

    #[test]
    fn test_process_rejects_invalid_options() {
        let input = jpeg(10, 10, 90);
        let p = processor();

        assert!(matches!(
            p.process_image(&input, &options(0, 10, "jpg")),
            Err(ImageError::Validation(_))
        ));
        assert!(matches!(
            p.process_image(&input, &options(10, 10, "tiff")),
            Err(ImageError::Validation(_))
        ));
        // Allowed by configuration but there is no encoder for it.
        assert!(matches!(
            p.process_image(&input, &options(10, 10, "webp")),
            Err(ImageError::Processing(_))
        ));
    }

    #[test]
    fn test_process_rejects_garbage() {
        assert!(matches!(
            processor().process_image(b"not an image", &options(10, 10, "jpg")),
            Err(ImageError::Processing(_))
        ));
        assert!(matches!(
            processor().process_image(b"", &options(10, 10, "jpg")),
            Err(ImageError::Validation(_))
        ));
    }

    #[test]
    fn test_alpha_input_encodes_to_jpeg() {
        let out = processor()
            .process_image(&png_with_alpha(30, 30), &options(100, 100, "jpg"))
            .unwrap();
        assert_eq!(processor().get_image_dimensions(&out.data).unwrap().format, "jpeg");
    }

    #[test]
    fn test_generate_thumbnail() {
        let p = processor();
        let input = jpeg(400, 200, 90);

        let thumb = p.generate_thumbnail(&input, 100).unwrap();
        assert_eq!((thumb.width, thumb.height), (100, 50));
        assert_eq!(thumb.format, OutputFormat::Jpeg);

        let default = p.generate_thumbnail(&input, 0).unwrap();
        assert_eq!(default.width, DEFAULT_THUMBNAIL_SIZE);
    }

    #[test]
    fn test_generate_image_variant() {
        let p = processor();
        let input = jpeg(400, 300, 90);

        let v = p.generate_image_variant(&input, 200, 200, 0, "").unwrap();
        assert_eq!((v.width, v.height), (200, 150));
        assert_eq!(v.format, OutputFormat::Jpeg);

        let v = p.generate_image_variant(&input, 100, 100, 70, "PNG").unwrap();
        assert_eq!(v.format, OutputFormat::Png);

        assert!(matches!(
            p.generate_image_variant(&input, 0, 100, 80, "jpg"),
            Err(ImageError::Validation(_))
        ));
    }

    #[test]
    fn test_optimize_for_size_under_budget() {
        let input = jpeg(50, 50, 90);
        let out = processor().optimize_for_size(&input, 1024).unwrap();
        assert_eq!((out.width, out.height), (50, 50));
    }

    #[test]
    fn test_optimize_for_size_walks_ladder() {
        let input = jpeg(600, 600, 100);
        let target_kb = 40;
        assert!(input.len() as u64 > target_kb * 1024);

        let out = processor().optimize_for_size(&input, target_kb).unwrap();
        assert!(out.data.len() as u64 <= target_kb * 1024);
        assert!(out.width <= 200 && out.height <= 200);
    }

    #[test]
    fn test_optimize_for_size_falls_back() {
        let input = jpeg(600, 600, 100);
        let out = processor().optimize_for_size(&input, 1).unwrap();

        // Unreachable budget: the fallback pass at half the bounding box.
        assert!(out.width <= 100 && out.height <= 100);
        assert!(matches!(
            processor().optimize_for_size(&input, 0),
            Err(ImageError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_image_data() {
        let p = processor();
        let input = jpeg(20, 10, 90);

        let info = p.validate_image_data(&input, 1 << 20).unwrap();
        assert_eq!((info.width, info.height), (20, 10));

        assert!(matches!(p.validate_image_data(b"", 100), Err(ImageError::Validation(_))));
        assert!(matches!(p.validate_image_data(&input, 10), Err(ImageError::Validation(_))));
        assert!(matches!(
            p.validate_image_data(b"plain text, not pixels", 1 << 20),
            Err(ImageError::Validation(_))
        ));
    }

    #[test]
    fn test_get_image_dimensions_rejects_unknown() {
        assert!(processor().get_image_dimensions(b"garbage").is_err());
    }
}
