use image::Luma;
use imageproc::filter::separable_filter_equal;
use tracing::debug;
use crate::{
    algorithms::filter::gaussian_kernel_5,
    config::ThresholdConfig,
    traits::Binarizer,
    types::{BinaryMask, IntensityField},
};

/// Threshold derived from the dominant dark mode of the intensity histogram.
#[derive(Debug, Clone, Default)]
pub struct HistogramModeThreshold {
    pub config: ThresholdConfig,
}

impl HistogramModeThreshold {
    pub fn new(config: ThresholdConfig) -> Self {
        Self { config }
    }

    /// Cutoff in `[0, 1]` for the given field.
    pub fn cutoff(&self, field: &IntensityField) -> f32 {
        let smoothed = separable_filter_equal(field, &gaussian_kernel_5(self.config.smoothing_sigma));
        let reduced = pyramid_down(&smoothed);
        let histogram = histogram(&reduced, self.config.histogram_buckets);
        let mode = lower_half_mode(&histogram);
        let cutoff = (mode as f32 / histogram.len() as f32 + self.config.bias).clamp(0.0, 1.0);
        debug!(mode, cutoff, "histogram threshold");
        cutoff
    }
}

impl Binarizer for HistogramModeThreshold {
    fn binarize(&self, field: &IntensityField) -> BinaryMask {
        if !self.config.enabled {
            return binarize_above(field, |v| v > 0.0);
        }
        let cutoff = self.cutoff(field);
        binarize_above(field, |v| v >= cutoff)
    }
}

fn binarize_above(field: &IntensityField, foreground: impl Fn(f32) -> bool) -> BinaryMask {
    BinaryMask::from_fn(field.width(), field.height(), |x, y| {
        if foreground(field.get_pixel(x, y)[0]) {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Counts of samples falling in `buckets` equal bins over `[0, 1)`.
///
/// Panics unless `buckets` is a power of two no larger than 256.
pub fn histogram(field: &IntensityField, buckets: usize) -> Vec<u32> {
    assert!(
        buckets.is_power_of_two() && (2..=256).contains(&buckets),
        "histogram bucket count {buckets} must be a power of two in 2..=256"
    );
    let mut counts = vec![0u32; buckets];
    for pixel in field.pixels() {
        let value = pixel[0];
        if (0.0..1.0).contains(&value) {
            let bucket = ((value * buckets as f32) as usize).min(buckets - 1);
            counts[bucket] += 1;
        }
    }
    counts
}

/// Index of the fullest bucket in the lower half; ties and empty histograms go to the lowest index.
pub fn lower_half_mode(histogram: &[u32]) -> usize {
    let mut best = 0;
    let mut best_count = 0;
    for (i, &count) in histogram.iter().take(histogram.len() / 2).enumerate() {
        if count > best_count {
            best = i;
            best_count = count;
        }
    }
    best
}

/// Halve each dimension by averaging 2x2 blocks.
pub fn pyramid_down(field: &IntensityField) -> IntensityField {
    let (width, height) = field.dimensions();
    let half_w = width.div_ceil(2);
    let half_h = height.div_ceil(2);
    IntensityField::from_fn(half_w, half_h, |x, y| {
        let mut sum = 0.0;
        let mut n = 0.0;
        for sy in (2 * y)..(2 * y + 2).min(height) {
            for sx in (2 * x)..(2 * x + 2).min(width) {
                sum += field.get_pixel(sx, sy)[0];
                n += 1.0;
            }
        }
        Luma([sum / n])
    })
}
