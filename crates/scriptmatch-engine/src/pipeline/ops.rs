//! Low-level pixel kernels shared by the preprocessing, metric, and overlay
//! stages. All functions operate on row-major `f32` buffers in the 0..=1
//! range or on binary `u8` masks, and are free of side effects.

use std::cmp::Ordering;

/// Area-averaging downscale. Every output pixel is the mean of the source
/// pixels its footprint covers, which keeps thin strokes from aliasing away.
pub fn resize_average(
    pixels: &[f32],
    width: usize,
    height: usize,
    new_width: usize,
    new_height: usize,
) -> Vec<f32> {
    assert_eq!(pixels.len(), width * height);
    if width == 0 || height == 0 || new_width == 0 || new_height == 0 {
        return vec![0.0; new_width * new_height];
    }
    let scale_x = width as f32 / new_width as f32;
    let scale_y = height as f32 / new_height as f32;
    let mut output = vec![0.0f32; new_width * new_height];
    for ny in 0..new_height {
        let src_y0 = (ny as f32 * scale_y).floor() as isize;
        let src_y1 = (((ny + 1) as f32 * scale_y).ceil() as isize).min(height as isize);
        for nx in 0..new_width {
            let src_x0 = (nx as f32 * scale_x).floor() as isize;
            let src_x1 = (((nx + 1) as f32 * scale_x).ceil() as isize).min(width as isize);
            let mut sum = 0.0f32;
            let mut count = 0;
            for sy in src_y0.max(0)..src_y1.max(src_y0 + 1) {
                for sx in src_x0.max(0)..src_x1.max(src_x0 + 1) {
                    sum += pixels[sy as usize * width + sx as usize];
                    count += 1;
                }
            }
            output[ny * new_width + nx] = if count == 0 { 0.0 } else { sum / count as f32 };
        }
    }
    output
}

/// Bilinear resample, used when enlarging toward the canonical scale.
pub fn resize_bilinear(
    pixels: &[f32],
    width: usize,
    height: usize,
    new_width: usize,
    new_height: usize,
) -> Vec<f32> {
    assert_eq!(pixels.len(), width * height);
    if width == 0 || height == 0 || new_width == 0 || new_height == 0 {
        return vec![0.0; new_width * new_height];
    }
    let scale_x = width as f32 / new_width as f32;
    let scale_y = height as f32 / new_height as f32;
    let mut output = vec![0.0f32; new_width * new_height];
    for ny in 0..new_height {
        let sy = (ny as f32 + 0.5) * scale_y - 0.5;
        for nx in 0..new_width {
            let sx = (nx as f32 + 0.5) * scale_x - 0.5;
            output[ny * new_width + nx] = sample_bilinear_clamped(pixels, width, height, sx, sy);
        }
    }
    output
}

fn sample_bilinear_clamped(pixels: &[f32], width: usize, height: usize, x: f32, y: f32) -> f32 {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let ix0 = (x0 as isize).clamp(0, width as isize - 1) as usize;
    let iy0 = (y0 as isize).clamp(0, height as isize - 1) as usize;
    let ix1 = (ix0 + 1).min(width - 1);
    let iy1 = (iy0 + 1).min(height - 1);
    let top = pixels[iy0 * width + ix0] * (1.0 - fx) + pixels[iy0 * width + ix1] * fx;
    let bottom = pixels[iy1 * width + ix0] * (1.0 - fx) + pixels[iy1 * width + ix1] * fx;
    top * (1.0 - fy) + bottom * fy
}

/// Bilinear sample with a fill value outside the source bounds.
pub fn sample_bilinear(
    pixels: &[f32],
    width: usize,
    height: usize,
    x: f32,
    y: f32,
    fill: f32,
) -> f32 {
    if x < -0.5 || y < -0.5 || x > width as f32 - 0.5 || y > height as f32 - 0.5 {
        return fill;
    }
    sample_bilinear_clamped(pixels, width, height, x, y)
}

pub fn gaussian_blur_3x3(pixels: &[f32], width: usize, height: usize) -> Vec<f32> {
    assert_eq!(pixels.len(), width * height);
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let kernel = [[1.0f32, 2.0, 1.0], [2.0, 4.0, 2.0], [1.0, 2.0, 1.0]];
    let mut output = vec![0.0f32; pixels.len()];
    for y in 0..height {
        for x in 0..width {
            let mut sum = 0.0;
            let mut weight = 0.0;
            for ky in 0..3 {
                for kx in 0..3 {
                    let oy = y as isize + ky as isize - 1;
                    let ox = x as isize + kx as isize - 1;
                    if oy < 0 || ox < 0 || oy >= height as isize || ox >= width as isize {
                        continue;
                    }
                    let w = kernel[ky][kx];
                    sum += pixels[oy as usize * width + ox as usize] * w;
                    weight += w;
                }
            }
            output[y * width + x] = if weight == 0.0 { 0.0 } else { sum / weight };
        }
    }
    output
}

/// Box blur of radius `radius` backed by an integral image, so the cost does
/// not grow with the kernel size.
pub fn box_blur(pixels: &[f32], width: usize, height: usize, radius: usize) -> Vec<f32> {
    assert_eq!(pixels.len(), width * height);
    if width == 0 || height == 0 || radius == 0 {
        return pixels.to_vec();
    }
    let integral = integral_image(pixels, width, height);
    let mut output = vec![0.0f32; pixels.len()];
    for y in 0..height {
        let y0 = y.saturating_sub(radius);
        let y1 = (y + radius).min(height - 1);
        for x in 0..width {
            let x0 = x.saturating_sub(radius);
            let x1 = (x + radius).min(width - 1);
            let area = ((y1 - y0 + 1) * (x1 - x0 + 1)) as f64;
            output[y * width + x] = (window_sum(&integral, width, x0, y0, x1, y1) / area) as f32;
        }
    }
    output
}

/// Summed-area table with one extra row and column of zeros.
pub fn integral_image(pixels: &[f32], width: usize, height: usize) -> Vec<f64> {
    assert_eq!(pixels.len(), width * height);
    let stride = width + 1;
    let mut integral = vec![0.0f64; stride * (height + 1)];
    for y in 0..height {
        let mut row_sum = 0.0f64;
        for x in 0..width {
            row_sum += pixels[y * width + x] as f64;
            integral[(y + 1) * stride + (x + 1)] = integral[y * stride + (x + 1)] + row_sum;
        }
    }
    integral
}

/// Inclusive window sum over an integral image built by [`integral_image`].
pub fn window_sum(integral: &[f64], width: usize, x0: usize, y0: usize, x1: usize, y1: usize) -> f64 {
    let stride = width + 1;
    integral[(y1 + 1) * stride + (x1 + 1)] + integral[y0 * stride + x0]
        - integral[y0 * stride + (x1 + 1)]
        - integral[(y1 + 1) * stride + x0]
}

/// Local-mean threshold: a pixel is ink when it is darker than the mean of
/// its surrounding window by at least `offset`.
pub fn adaptive_threshold(
    pixels: &[f32],
    width: usize,
    height: usize,
    window: usize,
    offset: f32,
) -> Vec<u8> {
    assert_eq!(pixels.len(), width * height);
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let radius = (window / 2).max(1);
    let integral = integral_image(pixels, width, height);
    let mut mask = vec![0u8; pixels.len()];
    for y in 0..height {
        let y0 = y.saturating_sub(radius);
        let y1 = (y + radius).min(height - 1);
        for x in 0..width {
            let x0 = x.saturating_sub(radius);
            let x1 = (x + radius).min(width - 1);
            let area = ((y1 - y0 + 1) * (x1 - x0 + 1)) as f64;
            let mean = (window_sum(&integral, width, x0, y0, x1, y1) / area) as f32;
            if pixels[y * width + x] < mean - offset {
                mask[y * width + x] = 1;
            }
        }
    }
    mask
}

/// CDF-based histogram equalization over 256 levels, in place.
pub fn equalize_histogram(pixels: &mut [f32]) {
    if pixels.is_empty() {
        return;
    }
    const LEVELS: usize = 256;
    let mut histogram = [0u32; LEVELS];
    for &value in pixels.iter() {
        let bin = ((value.clamp(0.0, 1.0) * (LEVELS - 1) as f32).round()) as usize;
        histogram[bin] += 1;
    }
    let total = pixels.len() as f32;
    let mut cdf = [0.0f32; LEVELS];
    let mut cumulative = 0u32;
    for (bin, &count) in histogram.iter().enumerate() {
        cumulative += count;
        cdf[bin] = cumulative as f32 / total;
    }
    let cdf_min = cdf
        .iter()
        .copied()
        .find(|&v| v > 0.0)
        .unwrap_or(0.0);
    if cdf_min >= 1.0 {
        return;
    }
    for value in pixels.iter_mut() {
        let bin = ((value.clamp(0.0, 1.0) * (LEVELS - 1) as f32).round()) as usize;
        *value = ((cdf[bin] - cdf_min) / (1.0 - cdf_min)).clamp(0.0, 1.0);
    }
}

pub fn sobel_gradients(pixels: &[f32], width: usize, height: usize) -> (Vec<f32>, Vec<f32>) {
    assert_eq!(pixels.len(), width * height);
    let mut gx = vec![0.0f32; pixels.len()];
    let mut gy = vec![0.0f32; pixels.len()];
    if width < 3 || height < 3 {
        return (gx, gy);
    }
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let idx = y * width + x;
            gx[idx] = pixels[(y - 1) * width + (x + 1)]
                + 2.0 * pixels[y * width + (x + 1)]
                + pixels[(y + 1) * width + (x + 1)]
                - pixels[(y - 1) * width + (x - 1)]
                - 2.0 * pixels[y * width + (x - 1)]
                - pixels[(y + 1) * width + (x - 1)];
            gy[idx] = pixels[(y + 1) * width + (x - 1)]
                + 2.0 * pixels[(y + 1) * width + x]
                + pixels[(y + 1) * width + (x + 1)]
                - pixels[(y - 1) * width + (x - 1)]
                - 2.0 * pixels[(y - 1) * width + x]
                - pixels[(y - 1) * width + (x + 1)];
        }
    }
    (gx, gy)
}

pub fn sobel_magnitude(pixels: &[f32], width: usize, height: usize) -> Vec<f32> {
    let (gx, gy) = sobel_gradients(pixels, width, height);
    gx.iter()
        .zip(gy.iter())
        .map(|(a, b)| a.abs() + b.abs())
        .collect()
}

pub fn normalize(values: &mut [f32]) {
    if values.is_empty() {
        return;
    }
    let mut max_value = values[0];
    for &v in values.iter().skip(1) {
        if v > max_value {
            max_value = v;
        }
    }
    if max_value <= f32::EPSILON {
        return;
    }
    for value in values.iter_mut() {
        *value /= max_value;
    }
}

pub fn percentile(values: &[f32], pct: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut buf: Vec<f32> = values.to_vec();
    let target = ((buf.len() - 1) as f32 * pct.clamp(0.0, 1.0)).round() as usize;
    let (_, value, _) =
        buf.select_nth_unstable_by(target, |a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    *value
}

/// Two-pass chamfer distance transform: distance from each pixel to the
/// nearest set pixel of `mask`.
pub fn distance_transform(mask: &[u8], width: usize, height: usize) -> Vec<f32> {
    assert_eq!(mask.len(), width * height);
    const DIAG: f32 = 1.4142135;
    let mut dist = vec![f32::MAX; mask.len()];
    for (idx, &value) in mask.iter().enumerate() {
        if value > 0 {
            dist[idx] = 0.0;
        }
    }

    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            if dist[idx] == 0.0 {
                continue;
            }
            let mut best = dist[idx];
            if x > 0 {
                best = best.min(dist[idx - 1] + 1.0);
            }
            if y > 0 {
                best = best.min(dist[idx - width] + 1.0);
            }
            if x > 0 && y > 0 {
                best = best.min(dist[idx - width - 1] + DIAG);
            }
            if x + 1 < width && y > 0 {
                best = best.min(dist[idx - width + 1] + DIAG);
            }
            dist[idx] = best;
        }
    }

    for y in (0..height).rev() {
        for x in (0..width).rev() {
            let idx = y * width + x;
            let mut best = dist[idx];
            if x + 1 < width {
                best = best.min(dist[idx + 1] + 1.0);
            }
            if y + 1 < height {
                best = best.min(dist[idx + width] + 1.0);
            }
            if x + 1 < width && y + 1 < height {
                best = best.min(dist[idx + width + 1] + DIAG);
            }
            if x > 0 && y + 1 < height {
                best = best.min(dist[idx + width - 1] + DIAG);
            }
            dist[idx] = best;
        }
    }
    dist
}

/// Zhang-Suen thinning. Reduces the ink mask to one-pixel-wide stroke
/// centerlines while preserving connectivity.
pub fn skeletonize(mask: &[u8], width: usize, height: usize) -> Vec<u8> {
    assert_eq!(mask.len(), width * height);
    let mut current: Vec<u8> = mask.iter().map(|&v| if v > 0 { 1 } else { 0 }).collect();
    if width < 3 || height < 3 {
        return current;
    }
    let mut to_clear: Vec<usize> = Vec::new();
    loop {
        let mut changed = false;
        for phase in 0..2 {
            to_clear.clear();
            for y in 1..height - 1 {
                for x in 1..width - 1 {
                    let idx = y * width + x;
                    if current[idx] == 0 {
                        continue;
                    }
                    // Neighbors in clockwise order starting north.
                    let p2 = current[idx - width];
                    let p3 = current[idx - width + 1];
                    let p4 = current[idx + 1];
                    let p5 = current[idx + width + 1];
                    let p6 = current[idx + width];
                    let p7 = current[idx + width - 1];
                    let p8 = current[idx - 1];
                    let p9 = current[idx - width - 1];
                    let ring = [p2, p3, p4, p5, p6, p7, p8, p9];
                    let neighbors: u8 = ring.iter().sum();
                    if !(2..=6).contains(&neighbors) {
                        continue;
                    }
                    let mut transitions = 0;
                    for i in 0..8 {
                        if ring[i] == 0 && ring[(i + 1) % 8] == 1 {
                            transitions += 1;
                        }
                    }
                    if transitions != 1 {
                        continue;
                    }
                    let (a, b) = if phase == 0 {
                        (p2 * p4 * p6, p4 * p6 * p8)
                    } else {
                        (p2 * p4 * p8, p2 * p6 * p8)
                    };
                    if a == 0 && b == 0 {
                        to_clear.push(idx);
                    }
                }
            }
            if !to_clear.is_empty() {
                changed = true;
                for &idx in &to_clear {
                    current[idx] = 0;
                }
            }
        }
        if !changed {
            break;
        }
    }
    current
}
