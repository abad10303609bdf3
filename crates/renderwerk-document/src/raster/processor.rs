// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor: decode a raster, resample it, and encode it back in the
// family it came from. Operates on in-memory images using the `image` crate.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use renderwerk_core::error::{RenderwerkError, Result};
use renderwerk_core::types::EncodingFamily;
use tracing::{debug, instrument};

/// A single decoded raster together with the encoding family it was read
/// from.
///
/// ```ignore
/// let bytes = ImageProcessor::from_bytes(&jpeg)?
///     .resize_exact(267, 150)
///     .encode(75)?;
/// ```
pub struct ImageProcessor {
    image: DynamicImage,
    family: EncodingFamily,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Decode raw encoded bytes.
    ///
    /// Bytes that are not a recognisable raster fail with a decode error.
    /// Recognisable rasters outside JPEG, PNG and GIF fail with an encode
    /// error, since no preview could be written back in their family.
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let format = image::guess_format(data).map_err(|err| {
            RenderwerkError::Decode(format!("unrecognised image encoding: {}", err))
        })?;
        let family = family_of(format).ok_or_else(|| {
            RenderwerkError::Encode(format!("{:?} is not a supported preview encoding", format))
        })?;
        let image = image::load_from_memory_with_format(data, format)
            .map_err(|err| RenderwerkError::Decode(err.to_string()))?;
        debug!(
            width = image.width(),
            height = image.height(),
            ?family,
            "Image decoded from bytes"
        );
        Ok(Self { image, family })
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn family(&self) -> EncodingFamily {
        self.family
    }

    // -- Transformations ------------------------------------------------------

    /// Resample to exactly `width` x `height` with a Lanczos3 filter.
    #[instrument(skip(self), fields(width, height))]
    pub fn resize_exact(self, width: u32, height: u32) -> Self {
        debug!(
            from_w = self.image.width(),
            from_h = self.image.height(),
            "Resizing image"
        );
        let resized = self.image.resize_exact(width, height, FilterType::Lanczos3);
        Self {
            image: resized,
            family: self.family,
        }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode in the source family. `jpeg_quality` (1-100) applies to JPEG
    /// only.
    pub fn encode(&self, jpeg_quality: u8) -> Result<Vec<u8>> {
        match self.family {
            EncodingFamily::Jpeg => self.to_jpeg_bytes(jpeg_quality),
            EncodingFamily::Png => encode_to_format(&self.image, ImageFormat::Png),
            EncodingFamily::Gif => encode_to_format(
                &DynamicImage::ImageRgba8(self.image.to_rgba8()),
                ImageFormat::Gif,
            ),
        }
    }

    fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let rgb = self.image.to_rgb8();
        let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
        rgb.write_with_encoder(encoder)
            .map_err(|err| RenderwerkError::Encode(format!("JPEG encoding failed: {}", err)))?;
        Ok(buffer)
    }
}

fn family_of(format: ImageFormat) -> Option<EncodingFamily> {
    match format {
        ImageFormat::Jpeg => Some(EncodingFamily::Jpeg),
        ImageFormat::Png => Some(EncodingFamily::Png),
        ImageFormat::Gif => Some(EncodingFamily::Gif),
        _ => None,
    }
}

/// Encode a `DynamicImage` into the specified format, returning the raw bytes.
fn encode_to_format(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, format)
        .map_err(|err| RenderwerkError::Encode(format!("{:?} encoding failed: {}", format, err)))?;
    Ok(buffer)
}
