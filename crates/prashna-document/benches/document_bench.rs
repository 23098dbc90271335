// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the image side of prashna-document: the full
// recognition preprocessing pipeline and the deskew measurement on a
// synthetic skewed page.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, GrayImage, Luma};

use prashna_document::ImagePreprocessor;
use prashna_document::scan::preprocess::skew_correction;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A 400x300 white page with dark "text lines" rotated 4 degrees.
fn skewed_page() -> GrayImage {
    let (width, height) = (400u32, 300u32);
    let (sin, cos) = 4.0f32.to_radians().sin_cos();
    let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);

    GrayImage::from_fn(width, height, |x, y| {
        let (dx, dy) = (x as f32 - cx, y as f32 - cy);
        let along = dx * cos + dy * sin;
        let across = -dx * sin + dy * cos + 120.0;
        let on_line = along.abs() < 150.0 && across >= 0.0 && across < 240.0 && (across as u32 % 24) < 6;
        Luma([if on_line { 20 } else { 235 }])
    })
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_preprocess(c: &mut Criterion) {
    let page = DynamicImage::ImageLuma8(skewed_page());

    c.bench_function("preprocess (400x300)", |b| {
        b.iter(|| {
            let out = ImagePreprocessor::from_dynamic(black_box(page.clone())).preprocess(false);
            black_box(out.into_gray());
        });
    });

    c.bench_function("preprocess enhanced (400x300)", |b| {
        b.iter(|| {
            let out = ImagePreprocessor::from_dynamic(black_box(page.clone())).preprocess(true);
            black_box(out.into_gray());
        });
    });
}

fn bench_skew_measurement(c: &mut Criterion) {
    let binary = ImagePreprocessor::from_gray(skewed_page()).binarize().into_gray();

    c.bench_function("skew_correction (400x300)", |b| {
        b.iter(|| black_box(skew_correction(black_box(&binary))));
    });
}

criterion_group!(benches, bench_preprocess, bench_skew_measurement);
criterion_main!(benches);
