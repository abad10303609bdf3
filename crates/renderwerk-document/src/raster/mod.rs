// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster module: decode, resample and re-encode preview images.

pub mod processor;
pub mod resize;

pub use processor::ImageProcessor;
pub use resize::{ResizedRaster, resize_raster, target_dimensions};
