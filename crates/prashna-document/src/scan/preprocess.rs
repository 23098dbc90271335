// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recognition preprocessing: grayscale, denoise, adaptive binarization,
// deskew, local contrast equalization, content crop and upscale for scanned
// quiz pages.

use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Luma};
use imageproc::contours::{BorderType, find_contours};
use imageproc::filter::{gaussian_blur_f32, median_filter};
use imageproc::geometry::min_area_rect;
use imageproc::point::Point;
use prashna_core::error::PrashnaError;
use tracing::{debug, info, instrument};

/// Sigma equivalent to a 5×5 Gaussian kernel.
const DENOISE_SIGMA: f32 = 1.1;
/// Sigma of the Gaussian window used as the local mean (11-pixel block).
const THRESHOLD_SIGMA: f32 = 2.0;
/// Subtracted from the local mean before comparing.
const THRESHOLD_OFFSET: i16 = 2;
const CLAHE_CLIP_LIMIT: f32 = 2.0;
const CLAHE_TILES: u32 = 8;
/// Background border added before contour search.
const CROP_PADDING: u32 = 5;
const UPSCALE_FACTOR: u32 = 2;

/// Prepares a page image for text recognition.
///
/// Each step consumes the preprocessor and returns a new one, so steps can be
/// chained or run individually. [`ImagePreprocessor::preprocess`] runs the
/// full sequence.
pub struct ImagePreprocessor {
    /// The working image; always single-channel.
    image: GrayImage,
}

impl ImagePreprocessor {
    // -- Construction ---------------------------------------------------------

    /// Wrap a decoded image, converting it to grayscale.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self {
            image: image.to_luma8(),
        }
    }

    pub fn from_gray(image: GrayImage) -> Self {
        Self { image }
    }

    /// Decode an image file from disk.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PrashnaError> {
        let image = image::open(path.as_ref()).map_err(|err| {
            PrashnaError::ImageError(format!(
                "failed to open page image {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        info!(
            width = image.width(),
            height = image.height(),
            "Page image loaded"
        );
        Ok(Self::from_dynamic(image))
    }

    // -- Accessors ------------------------------------------------------------

    pub fn as_gray(&self) -> &GrayImage {
        &self.image
    }

    pub fn into_gray(self) -> GrayImage {
        self.image
    }

    /// Write the working image as PNG.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PrashnaError> {
        self.image.save(path.as_ref()).map_err(|err| {
            PrashnaError::Preprocessing(format!(
                "failed to write {}: {}",
                path.as_ref().display(),
                err
            ))
        })
    }

    // -- Pipeline -------------------------------------------------------------

    /// Run the full sequence. `enhance` adds denoising before binarization
    /// and contrast equalization after deskew.
    #[instrument(skip(self), fields(width = self.image.width(), height = self.image.height()))]
    pub fn preprocess(self, enhance: bool) -> Self {
        let stage = if enhance { self.denoise() } else { self };
        let stage = stage.binarize().deskew();
        let stage = if enhance { stage.equalize() } else { stage };
        let done = stage.crop_to_content().upscale(UPSCALE_FACTOR);

        debug!(
            width = done.image.width(),
            height = done.image.height(),
            "Preprocessing complete"
        );
        done
    }

    /// Load `input`, preprocess it and write the result to `output` as PNG.
    pub fn process_file(input: &Path, output: &Path, enhance: bool) -> Result<PathBuf, PrashnaError> {
        Self::open(input)?.preprocess(enhance).save(output)?;
        Ok(output.to_path_buf())
    }

    // -- Steps ----------------------------------------------------------------

    /// 3×3 median filter followed by a light Gaussian blur.
    pub fn denoise(self) -> Self {
        let median = median_filter(&self.image, 1, 1);
        Self {
            image: gaussian_blur_f32(&median, DENOISE_SIGMA),
        }
    }

    /// Adaptive Gaussian thresholding, inverted so ink becomes 255 and paper 0.
    pub fn binarize(self) -> Self {
        let local_mean = gaussian_blur_f32(&self.image, THRESHOLD_SIGMA);
        let mut output = GrayImage::new(self.image.width(), self.image.height());

        for (x, y, pixel) in self.image.enumerate_pixels() {
            let threshold = local_mean.get_pixel(x, y).0[0] as i16 - THRESHOLD_OFFSET;
            let ink = (pixel.0[0] as i16) <= threshold;
            output.put_pixel(x, y, Luma([if ink { 255 } else { 0 }]));
        }

        Self { image: output }
    }

    /// Rotate so the dominant text block is level. No foreground, no rotation.
    pub fn deskew(self) -> Self {
        let correction = skew_correction(&self.image);
        debug!(correction, "Deskew angle measured");
        if correction == 0.0 {
            return self;
        }
        Self {
            image: rotate_replicate(&self.image, correction),
        }
    }

    /// Contrast-limited adaptive histogram equalization.
    pub fn equalize(self) -> Self {
        Self {
            image: clahe(&self.image, CLAHE_CLIP_LIMIT, CLAHE_TILES),
        }
    }

    /// Pad with background, then crop to the largest external foreground
    /// contour. Without contours only the padding is applied.
    pub fn crop_to_content(self) -> Self {
        let padded = pad(&self.image, CROP_PADDING);

        let Some((x, y, w, h)) = largest_outer_contour_bounds(&padded) else {
            debug!("No foreground contour; skipping crop");
            return Self { image: padded };
        };

        debug!(x, y, w, h, "Cropping to content");
        Self {
            image: image::imageops::crop_imm(&padded, x, y, w, h).to_image(),
        }
    }

    /// Bicubic upscale by an integer factor.
    pub fn upscale(self, factor: u32) -> Self {
        let (w, h) = self.image.dimensions();
        Self {
            image: image::imageops::resize(&self.image, w * factor, h * factor, FilterType::CatmullRom),
        }
    }
}

// -- Deskew -------------------------------------------------------------------

/// Measure the rotation (degrees, counter-clockwise positive) that levels the
/// foreground of a binary image.
pub fn skew_correction(binary: &GrayImage) -> f32 {
    let points = foreground_outline(binary);
    if points.len() < 3 {
        return 0.0;
    }

    match min_area_rect_angle(&points) {
        Some(alpha) => correction_from_rect_angle(alpha),
        None => 0.0,
    }
}

/// Convert a minimum-area-rectangle angle in [-90, 0) into a rotation.
pub fn correction_from_rect_angle(alpha: f32) -> f32 {
    if alpha < -45.0 { -(90.0 + alpha) } else { -alpha }
}

/// Leftmost and rightmost foreground pixel of every row. Their hull equals
/// the hull of the whole foreground.
fn foreground_outline(binary: &GrayImage) -> Vec<Point<i32>> {
    let mut points = Vec::new();
    for (y, row) in binary.rows().enumerate() {
        let mut first = None;
        let mut last = None;
        for (x, pixel) in row.enumerate() {
            if pixel.0[0] > 0 {
                first.get_or_insert(x);
                last = Some(x);
            }
        }
        if let (Some(first), Some(last)) = (first, last) {
            points.push(Point::new(first as i32, y as i32));
            if last != first {
                points.push(Point::new(last as i32, y as i32));
            }
        }
    }
    points
}

/// Orientation of the minimum-area enclosing rectangle of `outline`, as an
/// angle in [-90, 0).
///
/// The rectangle's long side is used: its integer corners make the short
/// side's angle unreliable on thin lines.
fn min_area_rect_angle(outline: &[Point<i32>]) -> Option<f32> {
    if outline.len() < 3 {
        return None;
    }

    let corners = min_area_rect(outline);
    let edge = |a: Point<i32>, b: Point<i32>| ((b.x - a.x) as f64, (b.y - a.y) as f64);
    let (top, side) = (edge(corners[0], corners[1]), edge(corners[1], corners[2]));
    let (dx, dy) = if top.0.hypot(top.1) >= side.0.hypot(side.1) { top } else { side };
    if dx == 0.0 && dy == 0.0 {
        return None;
    }

    let a = dy.atan2(dx).to_degrees().rem_euclid(90.0) as f32;
    Some(if a == 0.0 { -90.0 } else { -a })
}

/// Rotate counter-clockwise by `degrees` about the image centre, sampling
/// with Catmull-Rom bicubic interpolation and replicating edge pixels.
pub fn rotate_replicate(image: &GrayImage, degrees: f32) -> GrayImage {
    let (w, h) = image.dimensions();
    let (cx, cy) = ((w / 2) as f32, (h / 2) as f32);
    let (sin, cos) = degrees.to_radians().sin_cos();

    GrayImage::from_fn(w, h, |x, y| {
        let (dx, dy) = (x as f32 - cx, y as f32 - cy);
        let sx = cos * dx - sin * dy + cx;
        let sy = sin * dx + cos * dy + cy;
        Luma([sample_bicubic(image, sx, sy)])
    })
}

fn sample_bicubic(image: &GrayImage, x: f32, y: f32) -> u8 {
    let (w, h) = (image.width() as i64, image.height() as i64);
    let (x0, y0) = (x.floor(), y.floor());
    let wx = catmull_rom_weights(x - x0);
    let wy = catmull_rom_weights(y - y0);
    let (x0, y0) = (x0 as i64, y0 as i64);

    let mut acc = 0.0f32;
    for (j, wy) in wy.iter().enumerate() {
        let sy = (y0 - 1 + j as i64).clamp(0, h - 1) as u32;
        for (i, wx) in wx.iter().enumerate() {
            let sx = (x0 - 1 + i as i64).clamp(0, w - 1) as u32;
            acc += wx * wy * image.get_pixel(sx, sy).0[0] as f32;
        }
    }
    acc.round().clamp(0.0, 255.0) as u8
}

fn catmull_rom_weights(t: f32) -> [f32; 4] {
    let (t2, t3) = (t * t, t * t * t);
    [
        (-t3 + 2.0 * t2 - t) / 2.0,
        (3.0 * t3 - 5.0 * t2 + 2.0) / 2.0,
        (-3.0 * t3 + 4.0 * t2 + t) / 2.0,
        (t3 - t2) / 2.0,
    ]
}

// -- CLAHE ----------------------------------------------------------------------

/// Contrast-limited adaptive histogram equalization over a `tiles`×`tiles`
/// grid, with bilinear blending between neighbouring tile mappings.
pub fn clahe(image: &GrayImage, clip_limit: f32, tiles: u32) -> GrayImage {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return image.clone();
    }
    let tiles_x = tiles.min(w).max(1);
    let tiles_y = tiles.min(h).max(1);
    let tile_w = w / tiles_x;
    let tile_h = h / tiles_y;

    let span = |index: u32, size: u32, count: u32, total: u32| {
        let start = index * size;
        let end = if index + 1 == count { total } else { start + size };
        start..end
    };

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let mut histogram = [0u32; 256];
            let xs = span(tx, tile_w, tiles_x, w);
            let ys = span(ty, tile_h, tiles_y, h);
            let area = xs.len() as u32 * ys.len() as u32;
            for y in ys {
                for x in xs.clone() {
                    histogram[image.get_pixel(x, y).0[0] as usize] += 1;
                }
            }
            luts.push(tile_lut(&mut histogram, area, clip_limit));
        }
    }

    let lut = |tx: u32, ty: u32| &luts[(ty * tiles_x + tx) as usize];
    let locate = |coord: u32, size: u32, count: u32| {
        let f = (coord as f32 + 0.5) / size as f32 - 0.5;
        let lo = f.floor().clamp(0.0, (count - 1) as f32) as u32;
        let hi = (lo + 1).min(count - 1);
        let weight = (f - lo as f32).clamp(0.0, 1.0);
        (lo, hi, weight)
    };

    GrayImage::from_fn(w, h, |x, y| {
        let v = image.get_pixel(x, y).0[0] as usize;
        let (x0, x1, fx) = locate(x, tile_w, tiles_x);
        let (y0, y1, fy) = locate(y, tile_h, tiles_y);

        let top = lut(x0, y0)[v] as f32 * (1.0 - fx) + lut(x1, y0)[v] as f32 * fx;
        let bottom = lut(x0, y1)[v] as f32 * (1.0 - fx) + lut(x1, y1)[v] as f32 * fx;
        Luma([(top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8])
    })
}

/// Clip a tile histogram, redistribute the excess evenly, and build the
/// equalization lookup table from the resulting CDF.
fn tile_lut(histogram: &mut [u32; 256], area: u32, clip_limit: f32) -> [u8; 256] {
    let clip = ((clip_limit * area as f32 / 256.0) as u32).max(1);

    let mut excess = 0u32;
    for bin in histogram.iter_mut() {
        if *bin > clip {
            excess += *bin - clip;
            *bin = clip;
        }
    }

    let batch = excess / 256;
    let mut residual = excess % 256;
    for bin in histogram.iter_mut() {
        *bin += batch;
        if residual > 0 {
            *bin += 1;
            residual -= 1;
        }
    }

    let scale = 255.0 / area.max(1) as f32;
    let mut lut = [0u8; 256];
    let mut cdf = 0u32;
    for (value, bin) in histogram.iter().enumerate() {
        cdf += bin;
        lut[value] = (cdf as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

// -- Crop -----------------------------------------------------------------------

fn pad(image: &GrayImage, border: u32) -> GrayImage {
    let mut canvas = GrayImage::new(image.width() + 2 * border, image.height() + 2 * border);
    image::imageops::replace(&mut canvas, image, border as i64, border as i64);
    canvas
}

/// Bounding box `(x, y, width, height)` of the top-level outer contour with
/// the largest enclosed area.
fn largest_outer_contour_bounds(image: &GrayImage) -> Option<(u32, u32, u32, u32)> {
    let contours = find_contours::<i32>(image);

    let largest = contours
        .iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .filter(|c| !c.points.is_empty())
        .max_by(|a, b| {
            let key = |c: &imageproc::contours::Contour<i32>| {
                (polygon_area(&c.points), c.points.len())
            };
            let (area_a, len_a) = key(a);
            let (area_b, len_b) = key(b);
            area_a.total_cmp(&area_b).then(len_a.cmp(&len_b))
        })?;

    let min_x = largest.points.iter().map(|p| p.x).min()?;
    let max_x = largest.points.iter().map(|p| p.x).max()?;
    let min_y = largest.points.iter().map(|p| p.y).min()?;
    let max_y = largest.points.iter().map(|p| p.y).max()?;

    Some((
        min_x as u32,
        min_y as u32,
        (max_x - min_x + 1) as u32,
        (max_y - min_y + 1) as u32,
    ))
}

/// Shoelace formula over a closed polygon.
fn polygon_area(points: &[Point<i32>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let twice: i64 = (0..n)
        .map(|i| {
            let (a, b) = (points[i], points[(i + 1) % n]);
            a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64
        })
        .sum();
    (twice as f64 / 2.0).abs()
}
