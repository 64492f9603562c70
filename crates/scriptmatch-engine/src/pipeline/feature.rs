//! Derives per-specimen descriptors from a normalized image: macro geometry
//! (slant, letter proportions, line spacing), stroke-width distribution, and
//! curvature statistics along traced stroke centerlines.

use crate::pipeline::ops;
use crate::pipeline::preprocess::NormalizedSpecimen;

/// Fixed bucket count of the stroke-width histogram. Same length for every
/// specimen so histograms compare bucket-by-bucket.
pub const STROKE_BINS: usize = 20;

/// Stroke radii are binned over 0..STROKE_RANGE_PX pixels.
const STROKE_RANGE_PX: f32 = 20.0;

/// Minimum distance-transform samples before the histogram is trusted.
const MIN_STROKE_SAMPLES: usize = 10;

/// Blob filters, in canonical-scale pixels.
const MIN_BLOB_AREA: usize = 50;
const MIN_BLOB_WIDTH: usize = 5;
const MIN_BLOB_HEIGHT: usize = 10;

#[derive(Clone, Debug)]
pub struct FeatureVector {
    /// Dominant stroke lean from vertical, in degrees.
    pub slant_degrees: f32,
    /// Median blob width over median blob height.
    pub size_ratio: f32,
    /// Mean gap between text-line centers, as a fraction of image height.
    pub line_spacing: f32,
    /// Density-normalized stroke-radius histogram, STROKE_BINS buckets.
    pub stroke_widths: Vec<f32>,
    pub curvature_mean: f32,
    pub curvature_std: f32,
    pub ink_pixels: usize,
}

impl FeatureVector {
    /// Sentinel vector for a specimen with no detectable ink. Comparisons
    /// against it degrade toward zero instead of failing.
    pub fn empty() -> Self {
        Self {
            slant_degrees: 0.0,
            size_ratio: 0.0,
            line_spacing: 0.0,
            stroke_widths: vec![0.0; STROKE_BINS],
            curvature_mean: 0.0,
            curvature_std: 0.0,
            ink_pixels: 0,
        }
    }

    pub fn has_ink(&self) -> bool {
        self.ink_pixels > 0
    }
}

pub fn extract(specimen: &NormalizedSpecimen) -> FeatureVector {
    let ink_pixels = specimen.ink_pixels();
    if ink_pixels == 0 {
        return FeatureVector::empty();
    }
    let width = specimen.width();
    let height = specimen.height();

    let slant_degrees = slant_angle(&specimen.gray.pixels, &specimen.ink, width, height);
    let blobs = find_blobs(&specimen.ink, width, height);
    let (size_ratio, line_spacing) = blob_geometry(&blobs, height);
    let stroke_widths = stroke_width_histogram(&specimen.ink, &specimen.skeleton, width, height);
    let (curvature_mean, curvature_std) = curvature_stats(&specimen.skeleton, width, height);

    FeatureVector {
        slant_degrees,
        size_ratio,
        line_spacing,
        stroke_widths,
        curvature_mean,
        curvature_std,
        ink_pixels,
    }
}

/// Magnitude-weighted circular mean of stroke directions over ink pixels.
/// Directions are axial (a stroke at t and t+180 degrees is the same line),
/// so angles are doubled before averaging.
fn slant_angle(gray: &[f32], ink: &[u8], width: usize, height: usize) -> f32 {
    let (gx, gy) = ops::sobel_gradients(gray, width, height);
    let mut sum_cos = 0.0f64;
    let mut sum_sin = 0.0f64;
    for (idx, &is_ink) in ink.iter().enumerate() {
        if is_ink == 0 {
            continue;
        }
        let magnitude = gx[idx].abs() + gy[idx].abs();
        if magnitude <= 1e-4 {
            continue;
        }
        // Stroke tangent is perpendicular to the intensity gradient.
        let tangent = gy[idx].atan2(gx[idx]) + std::f32::consts::FRAC_PI_2;
        sum_cos += (magnitude * (2.0 * tangent).cos()) as f64;
        sum_sin += (magnitude * (2.0 * tangent).sin()) as f64;
    }
    if sum_cos.abs() < 1e-9 && sum_sin.abs() < 1e-9 {
        return 0.0;
    }
    let mean_tangent = 0.5 * (sum_sin.atan2(sum_cos) as f32);
    let mut from_vertical = mean_tangent.to_degrees() - 90.0;
    while from_vertical <= -90.0 {
        from_vertical += 180.0;
    }
    while from_vertical > 90.0 {
        from_vertical -= 180.0;
    }
    from_vertical
}

#[derive(Clone, Copy, Debug)]
struct Blob {
    min_x: usize,
    min_y: usize,
    max_x: usize,
    max_y: usize,
    area: usize,
    centroid_y: f32,
}

impl Blob {
    fn width(&self) -> usize {
        self.max_x - self.min_x + 1
    }

    fn height(&self) -> usize {
        self.max_y - self.min_y + 1
    }
}

/// 8-connected component labeling over the ink mask.
fn find_blobs(ink: &[u8], width: usize, height: usize) -> Vec<Blob> {
    let mut visited = vec![false; ink.len()];
    let mut blobs = Vec::new();
    let mut stack = Vec::new();
    for start in 0..ink.len() {
        if ink[start] == 0 || visited[start] {
            continue;
        }
        visited[start] = true;
        stack.push(start);
        let mut blob = Blob {
            min_x: usize::MAX,
            min_y: usize::MAX,
            max_x: 0,
            max_y: 0,
            area: 0,
            centroid_y: 0.0,
        };
        let mut sum_y = 0usize;
        while let Some(idx) = stack.pop() {
            let x = idx % width;
            let y = idx / width;
            blob.area += 1;
            sum_y += y;
            blob.min_x = blob.min_x.min(x);
            blob.max_x = blob.max_x.max(x);
            blob.min_y = blob.min_y.min(y);
            blob.max_y = blob.max_y.max(y);
            for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let nx = x as i32 + dx;
                    let ny = y as i32 + dy;
                    if nx < 0 || ny < 0 || nx >= width as i32 || ny >= height as i32 {
                        continue;
                    }
                    let n_idx = ny as usize * width + nx as usize;
                    if ink[n_idx] > 0 && !visited[n_idx] {
                        visited[n_idx] = true;
                        stack.push(n_idx);
                    }
                }
            }
        }
        blob.centroid_y = sum_y as f32 / blob.area as f32;
        blobs.push(blob);
    }
    blobs
}

/// Size ratio and line spacing from character-candidate blobs. Blobs that are
/// too small to be characters or tall enough to span the page are ignored.
fn blob_geometry(blobs: &[Blob], image_height: usize) -> (f32, f32) {
    let max_height = (image_height as f32 * 0.8) as usize;
    let candidates: Vec<&Blob> = blobs
        .iter()
        .filter(|b| {
            b.area > MIN_BLOB_AREA
                && b.width() > MIN_BLOB_WIDTH
                && b.height() > MIN_BLOB_HEIGHT
                && b.height() < max_height.max(MIN_BLOB_HEIGHT + 1)
        })
        .collect();
    if candidates.is_empty() {
        return (0.0, 0.0);
    }

    let mut widths: Vec<f32> = candidates.iter().map(|b| b.width() as f32).collect();
    let mut heights: Vec<f32> = candidates.iter().map(|b| b.height() as f32).collect();
    let median_width = median(&mut widths);
    let median_height = median(&mut heights);
    let size_ratio = if median_height > 0.0 {
        median_width / median_height
    } else {
        0.0
    };

    let mut centroids: Vec<f32> = candidates.iter().map(|b| b.centroid_y).collect();
    centroids.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let line_gap = (median_height * 0.7).max(1.0);
    let mut line_centers = Vec::new();
    let mut line_sum = centroids[0];
    let mut line_count = 1usize;
    let mut last = centroids[0];
    for &cy in centroids.iter().skip(1) {
        if cy - last > line_gap {
            line_centers.push(line_sum / line_count as f32);
            line_sum = 0.0;
            line_count = 0;
        }
        line_sum += cy;
        line_count += 1;
        last = cy;
    }
    line_centers.push(line_sum / line_count as f32);

    let line_spacing = if line_centers.len() > 1 {
        let gaps: f32 = line_centers.windows(2).map(|w| w[1] - w[0]).sum();
        gaps / (line_centers.len() - 1) as f32 / image_height.max(1) as f32
    } else {
        0.0
    };

    (size_ratio, line_spacing)
}

fn median(values: &mut [f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Stroke radius at each skeleton pixel is its chamfer distance to the
/// background; radii are binned into a fixed-length density histogram.
fn stroke_width_histogram(
    ink: &[u8],
    skeleton: &[u8],
    width: usize,
    height: usize,
) -> Vec<f32> {
    let background: Vec<u8> = ink.iter().map(|&v| if v == 0 { 1 } else { 0 }).collect();
    let dist = ops::distance_transform(&background, width, height);

    let mut histogram = vec![0.0f32; STROKE_BINS];
    let mut samples = 0usize;
    let bin_width = STROKE_RANGE_PX / STROKE_BINS as f32;
    for (idx, &on_skeleton) in skeleton.iter().enumerate() {
        if on_skeleton == 0 {
            continue;
        }
        let radius = dist[idx];
        if radius <= 0.0 {
            continue;
        }
        let bin = ((radius / bin_width) as usize).min(STROKE_BINS - 1);
        histogram[bin] += 1.0;
        samples += 1;
    }
    if samples < MIN_STROKE_SAMPLES {
        return vec![0.0; STROKE_BINS];
    }
    let total = samples as f32;
    for count in histogram.iter_mut() {
        *count /= total;
    }
    histogram
}

/// Mean and standard deviation of the turning angle along traced skeleton
/// paths, sampled over a two-pixel lookahead to damp pixel jitter.
fn curvature_stats(skeleton: &[u8], width: usize, height: usize) -> (f32, f32) {
    let paths = trace_paths(skeleton, width, height);
    let mut turns = Vec::new();
    for path in &paths {
        if path.len() < 5 {
            continue;
        }
        for i in 2..path.len() - 2 {
            let (x0, y0) = path[i - 2];
            let (x1, y1) = path[i];
            let (x2, y2) = path[i + 2];
            let v1 = ((x1 - x0) as f32, (y1 - y0) as f32);
            let v2 = ((x2 - x1) as f32, (y2 - y1) as f32);
            let mut angle = v2.1.atan2(v2.0) - v1.1.atan2(v1.0);
            while angle > std::f32::consts::PI {
                angle -= 2.0 * std::f32::consts::PI;
            }
            while angle < -std::f32::consts::PI {
                angle += 2.0 * std::f32::consts::PI;
            }
            turns.push(angle.abs());
        }
    }
    if turns.is_empty() {
        return (0.0, 0.0);
    }
    let mean = turns.iter().sum::<f32>() / turns.len() as f32;
    let variance = turns
        .iter()
        .map(|t| {
            let d = t - mean;
            d * d
        })
        .sum::<f32>()
        / turns.len() as f32;
    (mean, variance.sqrt())
}

/// Walks each skeleton component into ordered pixel paths, preferring
/// endpoints (single-neighbor pixels) as starting points so straight runs
/// trace end to end.
fn trace_paths(skeleton: &[u8], width: usize, height: usize) -> Vec<Vec<(i32, i32)>> {
    let neighbor_offsets: [(i32, i32); 8] = [
        (0, -1),
        (1, -1),
        (1, 0),
        (1, 1),
        (0, 1),
        (-1, 1),
        (-1, 0),
        (-1, -1),
    ];
    let at = |x: i32, y: i32| -> usize { y as usize * width + x as usize };
    let in_bounds =
        |x: i32, y: i32| -> bool { x >= 0 && y >= 0 && x < width as i32 && y < height as i32 };

    let neighbor_count = |x: i32, y: i32| -> usize {
        neighbor_offsets
            .iter()
            .filter(|(dx, dy)| {
                let nx = x + dx;
                let ny = y + dy;
                in_bounds(nx, ny) && skeleton[at(nx, ny)] > 0
            })
            .count()
    };

    let mut order: Vec<usize> = Vec::new();
    let mut interior: Vec<usize> = Vec::new();
    for idx in 0..skeleton.len() {
        if skeleton[idx] == 0 {
            continue;
        }
        let x = (idx % width) as i32;
        let y = (idx / width) as i32;
        if neighbor_count(x, y) == 1 {
            order.push(idx);
        } else {
            interior.push(idx);
        }
    }
    // Endpoints first, then whatever is left (loops have no endpoints).
    order.extend(interior);

    let mut visited = vec![false; skeleton.len()];
    let mut paths = Vec::new();
    for &start in &order {
        if visited[start] {
            continue;
        }
        let mut path = Vec::new();
        let mut x = (start % width) as i32;
        let mut y = (start / width) as i32;
        visited[start] = true;
        path.push((x, y));
        loop {
            let mut advanced = false;
            for (dx, dy) in neighbor_offsets {
                let nx = x + dx;
                let ny = y + dy;
                if !in_bounds(nx, ny) {
                    continue;
                }
                let n_idx = at(nx, ny);
                if skeleton[n_idx] > 0 && !visited[n_idx] {
                    visited[n_idx] = true;
                    path.push((nx, ny));
                    x = nx;
                    y = ny;
                    advanced = true;
                    break;
                }
            }
            if !advanced {
                break;
            }
        }
        paths.push(path);
    }
    paths
}
