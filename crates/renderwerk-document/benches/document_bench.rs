// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the in-process hot paths of renderwerk-document:
// preview resampling and OCR text cleaning.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use renderwerk_core::config::PreviewConfig;
use renderwerk_document::ocr::clean_text;
use renderwerk_document::raster::resize_raster;

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Resize a 640x360 JPEG (the size of a typical extracted video frame) to a
/// 150 px tall thumbnail, including decode and re-encode.
fn bench_video_frame_thumbnail(c: &mut Criterion) {
    let img = RgbImage::from_fn(640, 360, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
    let mut jpeg = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut jpeg), ImageFormat::Jpeg)
        .expect("encode bench fixture");

    let config = PreviewConfig::default();
    c.bench_function("resize_raster (640x360 jpeg -> h150)", |b| {
        b.iter(|| {
            let out = resize_raster(black_box(jpeg.clone()), 0, 150, &config).expect("resize");
            black_box(out.bytes);
        });
    });
}

/// Clean roughly 40 pages of OCR output with rulings and ragged spacing.
fn bench_clean_text(c: &mut Criterion) {
    let page = "INVOICE   No.  2024-0117\n\
                ------------------------------\n\
                Item        Qty     Price\n\
                ____________________________\n\
                Widget       4      12.00\n\
                \n\n\
                ***\n\
                Total                48.00\n";
    let text = page.repeat(40 * 6);

    c.bench_function("clean_text (~40 pages)", |b| {
        b.iter(|| black_box(clean_text(black_box(&text))));
    });
}

criterion_group!(benches, bench_video_frame_thumbnail, bench_clean_text);
criterion_main!(benches);
