// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Aspect-preserving resize policy.

use renderwerk_core::config::PreviewConfig;
use renderwerk_core::error::{RenderwerkError, Result};
use renderwerk_core::types::EncodingFamily;
use tracing::debug;

use super::processor::ImageProcessor;

/// Compute preview dimensions. A bound of 0 leaves that axis unconstrained.
///
/// - both bounds set: exactly `(max_width, max_height)`, aspect ratio ignored
/// - one bound set: that axis is pinned, the other scales proportionally
/// - neither set: source dimensions
pub fn target_dimensions(
    source_width: u32,
    source_height: u32,
    max_width: u32,
    max_height: u32,
) -> (u32, u32) {
    match (max_width, max_height) {
        (0, 0) => (source_width, source_height),
        (width, 0) => (width, scale(source_height, width, source_width)),
        (0, height) => (scale(source_width, height, source_height), height),
        (width, height) => (width, height),
    }
}

/// `other * bound / axis`, rounded half away from zero, never below 1.
fn scale(other: u32, bound: u32, axis: u32) -> u32 {
    if axis == 0 {
        return other.max(1);
    }
    let scaled = (f64::from(other) * f64::from(bound) / f64::from(axis)).round();
    (scaled as u32).max(1)
}

/// An encoded preview raster.
#[derive(Debug, Clone)]
pub struct ResizedRaster {
    pub bytes: Vec<u8>,
    pub family: EncodingFamily,
    pub width: u32,
    pub height: u32,
}

/// Decode `data`, resample it to the policy's target and re-encode in the
/// same family. When the target equals the source the input bytes are
/// returned untouched.
///
/// Targets larger than `config.max_output_pixels` are refused before any
/// pixel buffer is allocated.
pub fn resize_raster(
    data: Vec<u8>,
    max_width: u32,
    max_height: u32,
    config: &PreviewConfig,
) -> Result<ResizedRaster> {
    let processor = ImageProcessor::from_bytes(&data)?;
    let family = processor.family();
    let (source_width, source_height) = (processor.width(), processor.height());
    let (width, height) = target_dimensions(source_width, source_height, max_width, max_height);

    if (width, height) == (source_width, source_height) {
        debug!(width, height, "Target matches source, passing raster through");
        return Ok(ResizedRaster {
            bytes: data,
            family,
            width,
            height,
        });
    }

    let limit = config.max_output_pixels;
    if limit > 0 && u64::from(width) * u64::from(height) > limit {
        return Err(RenderwerkError::PreviewTooLarge {
            width,
            height,
            limit,
        });
    }

    let bytes = processor.resize_exact(width, height).encode(config.jpeg_quality)?;
    Ok(ResizedRaster {
        bytes,
        family,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::processor::tests::sample;
    use image::ImageFormat;

    #[test]
    fn unbounded_keeps_source_dimensions() {
        for (w, h) in [(1, 1), (640, 360), (17, 4000)] {
            assert_eq!(target_dimensions(w, h, 0, 0), (w, h));
        }
    }

    #[test]
    fn height_bound_scales_width() {
        assert_eq!(target_dimensions(640, 360, 0, 150), (267, 150));
    }

    #[test]
    fn width_bound_preserves_ratio() {
        for (w, h, max_w) in [(640, 360, 320), (1000, 333, 100), (300, 900, 45)] {
            let (tw, th) = target_dimensions(w, h, max_w, 0);
            assert_eq!(tw, max_w);
            let expected = f64::from(h) * f64::from(max_w) / f64::from(w);
            assert!((f64::from(th) - expected).abs() <= 0.5);
        }
    }

    #[test]
    fn both_bounds_are_exact() {
        assert_eq!(target_dimensions(640, 360, 100, 100), (100, 100));
    }

    #[test]
    fn tiny_results_clamp_to_one_pixel() {
        assert_eq!(target_dimensions(4000, 1, 10, 0), (10, 1));
    }

    #[test]
    fn passthrough_returns_input_bytes() {
        let png = sample(30, 20, ImageFormat::Png);
        let out = resize_raster(png.clone(), 0, 0, &PreviewConfig::default()).unwrap();
        assert_eq!(out.bytes, png);
        assert_eq!((out.width, out.height), (30, 20));
        assert_eq!(out.family, EncodingFamily::Png);
    }

    #[test]
    fn jpeg_stays_jpeg() {
        let jpeg = sample(640, 360, ImageFormat::Jpeg);
        let out = resize_raster(jpeg, 0, 150, &PreviewConfig::default()).unwrap();
        assert_eq!(out.family, EncodingFamily::Jpeg);
        assert_eq!((out.width, out.height), (267, 150));
        let decoded = ImageProcessor::from_bytes(&out.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (267, 150));
    }

    #[test]
    fn oversized_target_is_refused_before_resampling() {
        let png = sample(4, 4, ImageFormat::Png);
        let err = resize_raster(png, 200_000, 200_000, &PreviewConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            RenderwerkError::PreviewTooLarge {
                width: 200_000,
                height: 200_000,
                limit: 40_000_000,
            }
        ));
    }

    #[test]
    fn proportional_target_counts_against_the_limit() {
        let config = PreviewConfig {
            max_output_pixels: 1_000,
            ..PreviewConfig::default()
        };
        let png = sample(10, 10, ImageFormat::Png);
        assert!(resize_raster(png.clone(), 30, 0, &config).is_ok());
        assert!(matches!(
            resize_raster(png, 0, 40, &config),
            Err(RenderwerkError::PreviewTooLarge { width: 40, height: 40, .. })
        ));
    }

    #[test]
    fn zero_limit_disables_the_check() {
        let config = PreviewConfig {
            max_output_pixels: 0,
            ..PreviewConfig::default()
        };
        let out = resize_raster(sample(8, 8, ImageFormat::Png), 64, 64, &config).unwrap();
        assert_eq!((out.width, out.height), (64, 64));
    }
}
