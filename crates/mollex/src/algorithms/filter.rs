use image::{Luma, Rgb, RgbImage};
use imageproc::filter::separable_filter_equal;
use crate::{config::FilterConfig, traits::IntensityFilter, types::IntensityField};

/// Bilateral smoothing, optional Gaussian blur, mean-shift flattening, then grey.
#[derive(Debug, Clone, Default)]
pub struct EdgePreservingFilter {
    pub config: FilterConfig,
}

impl EdgePreservingFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }
}

impl IntensityFilter for EdgePreservingFilter {
    fn filter(&self, photo: &RgbImage) -> IntensityField {
        let config = &self.config;
        let mut smoothed = bilateral_filter(
            photo,
            config.bilateral_diameter,
            config.bilateral_sigma_color,
            config.bilateral_sigma_space,
        );
        if config.gaussian_prefilter {
            smoothed = separable_filter_equal(&smoothed, &gaussian_kernel_5(config.prefilter_sigma));
        }
        let flattened = mean_shift_filter(
            &smoothed,
            config.mean_shift_spatial_radius,
            config.mean_shift_color_radius,
            config.mean_shift_max_iterations,
        );
        to_intensity(&flattened)
    }
}

/// Normalised 5-tap Gaussian weights. Large sigmas approach a box filter.
pub fn gaussian_kernel_5(sigma: f32) -> [f32; 5] {
    let weights = [-2i32, -1, 0, 1, 2].map(|i| (-((i * i) as f32) / (2.0 * sigma * sigma)).exp());
    let total: f32 = weights.iter().sum();
    weights.map(|w| w / total)
}

/// Edge-preserving smoothing over a circular window of the given diameter.
///
/// Colour distance is the L1 distance between RGB triples. Samples outside the
/// image are replaced by the nearest edge sample.
pub fn bilateral_filter(
    photo: &RgbImage,
    diameter: u32,
    sigma_color: f32,
    sigma_space: f32,
) -> RgbImage {
    let (width, height) = photo.dimensions();
    if width == 0 || height == 0 {
        return photo.clone();
    }
    let radius = (diameter / 2) as i32;
    let space_coeff = -0.5 / (sigma_space * sigma_space);
    let color_coeff = -0.5 / (sigma_color * sigma_color);

    let offsets: Vec<(i32, i32, f32)> = (-radius..=radius)
        .flat_map(|dy| (-radius..=radius).map(move |dx| (dx, dy)))
        .filter(|(dx, dy)| dx * dx + dy * dy <= radius * radius)
        .map(|(dx, dy)| (dx, dy, (((dx * dx + dy * dy) as f32) * space_coeff).exp()))
        .collect();
    let color_weights: Vec<f32> = (0..=3 * 255)
        .map(|d: u32| (((d * d) as f32) * color_coeff).exp())
        .collect();

    let max_x = width as i32 - 1;
    let max_y = height as i32 - 1;
    let mut out = RgbImage::new(width, height);
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let center = photo.get_pixel(x, y).0;
        let mut sum = [0.0f32; 3];
        let mut weight_sum = 0.0f32;
        for &(dx, dy, space_weight) in &offsets {
            let nx = (x as i32 + dx).clamp(0, max_x) as u32;
            let ny = (y as i32 + dy).clamp(0, max_y) as u32;
            let sample = photo.get_pixel(nx, ny).0;
            let distance: u32 = center
                .iter()
                .zip(sample.iter())
                .map(|(a, b)| a.abs_diff(*b) as u32)
                .sum();
            let weight = space_weight * color_weights[distance as usize];
            for c in 0..3 {
                sum[c] += weight * sample[c] as f32;
            }
            weight_sum += weight;
        }
        *pixel = Rgb(sum.map(|s| (s / weight_sum).round().clamp(0.0, 255.0) as u8));
    }
    out
}

/// Mean-shift flattening in joint (x, y, colour) space.
///
/// Each pixel walks towards the mean of its spatial window, counting only
/// samples within `color_radius` (Euclidean RGB) of the current colour, and
/// takes the colour it converges to.
pub fn mean_shift_filter(
    image: &RgbImage,
    spatial_radius: u32,
    color_radius: f32,
    max_iterations: u32,
) -> RgbImage {
    const EPSILON: f32 = 1.0;

    let (width, height) = image.dimensions();
    let radius = spatial_radius as i32;
    let color_radius_sq = color_radius * color_radius;
    let mut out = RgbImage::new(width, height);

    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let mut x0 = x as i32;
        let mut y0 = y as i32;
        let mut c0 = image.get_pixel(x, y).0.map(f32::from);

        for _ in 0..max_iterations {
            let x_range = (x0 - radius).max(0)..=(x0 + radius).min(width as i32 - 1);
            let y_range = (y0 - radius).max(0)..=(y0 + radius).min(height as i32 - 1);

            let (mut sx, mut sy, mut count) = (0.0f32, 0.0f32, 0u32);
            let mut sc = [0.0f32; 3];
            for ny in y_range {
                for nx in x_range.clone() {
                    let c = image.get_pixel(nx as u32, ny as u32).0.map(f32::from);
                    let distance_sq: f32 = (0..3).map(|i| (c[i] - c0[i]).powi(2)).sum();
                    if distance_sq > color_radius_sq {
                        continue;
                    }
                    sx += nx as f32;
                    sy += ny as f32;
                    for i in 0..3 {
                        sc[i] += c[i];
                    }
                    count += 1;
                }
            }
            if count == 0 {
                break;
            }

            let n = count as f32;
            let x1 = (sx / n).round() as i32;
            let y1 = (sy / n).round() as i32;
            let c1 = sc.map(|s| s / n);
            let color_shift: f32 = (0..3).map(|i| (c1[i] - c0[i]).abs()).sum();
            let converged =
                (x1 == x0 && y1 == y0) || ((x1 - x0).abs() + (y1 - y0).abs()) as f32 + color_shift <= EPSILON;

            x0 = x1;
            y0 = y1;
            c0 = c1;
            if converged {
                break;
            }
        }

        *pixel = Rgb(c0.map(|c| c.round().clamp(0.0, 255.0) as u8));
    }
    out
}

/// Luma (BT.601 weights) scaled to `[0, 1]`.
pub fn to_intensity(image: &RgbImage) -> IntensityField {
    IntensityField::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        Luma([(luma / 255.0).clamp(0.0, 1.0)])
    })
}
