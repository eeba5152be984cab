//! Tunables for the shape-extraction pipeline.
//!
//! Every stage reads its parameters from one [`PipelineConfig`]. All fields
//! carry defaults, so a config file only needs to name the values it changes:
//!
//! ```toml
//! [proposal]
//! min_area = 5000.0
//! boxiness_lo = 1.05
//!
//! [morphology]
//! multi_scale = true
//! ```

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Largest structuring element order used by the morphology stage.
pub const MAX_KERNEL_ORDER: u32 = 9;

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub filter: FilterConfig,
    pub threshold: ThresholdConfig,
    pub morphology: MorphologyConfig,
    pub proposal: ProposalConfig,
    pub extraction: ExtractionConfig,
}

/// Denoising and flattening applied to the photograph.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct FilterConfig {
    /// Diameter of the bilateral filter neighbourhood in pixels.
    #[schemars(range(min = 1))]
    pub bilateral_diameter: u32,
    /// Colour-distance falloff of the bilateral filter.
    pub bilateral_sigma_color: f32,
    /// Spatial falloff of the bilateral filter.
    pub bilateral_sigma_space: f32,
    /// Run a secondary Gaussian blur after the bilateral pass.
    pub gaussian_prefilter: bool,
    /// Sigma of the 5-tap secondary blur.
    pub prefilter_sigma: f32,
    /// Spatial window radius of the mean-shift flattening.
    pub mean_shift_spatial_radius: u32,
    /// Colour window radius of the mean-shift flattening.
    pub mean_shift_color_radius: f32,
    pub mean_shift_max_iterations: u32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            bilateral_diameter: 9,
            bilateral_sigma_color: 100.0,
            bilateral_sigma_space: 100.0,
            gaussian_prefilter: true,
            prefilter_sigma: 10.0,
            mean_shift_spatial_radius: 3,
            mean_shift_color_radius: 20.0,
            mean_shift_max_iterations: 5,
        }
    }
}

/// Histogram-mode threshold.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct ThresholdConfig {
    /// When false every nonzero pixel of the field is foreground.
    pub enabled: bool,
    /// Power of two, at most 256.
    pub histogram_buckets: usize,
    /// Added to the lower bucket edge of the dominant background mode.
    pub bias: f32,
    /// Sigma of the smoothing applied before the histogram is taken.
    pub smoothing_sigma: f32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            histogram_buckets: 64,
            bias: 0.1,
            smoothing_sigma: 20.0,
        }
    }
}

/// Opening/closing policies. Both may be enabled; the sweep runs first.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct MorphologyConfig {
    pub single: bool,
    /// Order `k` of the fixed elliptical kernel (diameter `2k + 1`).
    pub kernel_order: u32,
    pub open_iterations: u32,
    pub close_iterations: u32,
    /// One opening per order `0..=9`, then one closing per order `0..=9`.
    pub multi_scale: bool,
}

impl Default for MorphologyConfig {
    fn default() -> Self {
        Self {
            single: true,
            kernel_order: 5,
            open_iterations: 5,
            close_iterations: 0,
            multi_scale: false,
        }
    }
}

/// Accept/reject bounds for contour candidates.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct ProposalConfig {
    /// Contours with a smaller polygon area are speckle.
    pub min_area: f64,
    /// Closed interval of accepted bounding-rectangle area / polygon area.
    pub boxiness_lo: f64,
    pub boxiness_hi: f64,
    /// Largest accepted convex-hull area / polygon area.
    pub smoothness_cutoff: f64,
}

impl Default for ProposalConfig {
    fn default() -> Self {
        Self {
            min_area: 1e5,
            boxiness_lo: 1.18,
            boxiness_hi: 1.8,
            smoothness_cutoff: 1.25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Crops wider than this are scaled down to exactly this width.
    pub downsampling_width: u32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            downsampling_width: 256,
        }
    }
}

impl PipelineConfig {
    /// Get the JSON schema of the configuration file
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(PipelineConfig)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let filter = &self.filter;
        positive("filter.bilateral_diameter", filter.bilateral_diameter as f64)?;
        positive("filter.bilateral_sigma_color", filter.bilateral_sigma_color as f64)?;
        positive("filter.bilateral_sigma_space", filter.bilateral_sigma_space as f64)?;
        if filter.gaussian_prefilter {
            positive("filter.prefilter_sigma", filter.prefilter_sigma as f64)?;
        }
        positive("filter.mean_shift_color_radius", filter.mean_shift_color_radius as f64)?;

        let threshold = &self.threshold;
        let buckets = threshold.histogram_buckets;
        if !buckets.is_power_of_two() || !(2..=256).contains(&buckets) {
            return Err(ConfigError::HistogramBuckets(buckets));
        }
        if !threshold.bias.is_finite() {
            return Err(ConfigError::ThresholdBias(threshold.bias));
        }
        positive("threshold.smoothing_sigma", threshold.smoothing_sigma as f64)?;

        if self.morphology.kernel_order > MAX_KERNEL_ORDER {
            return Err(ConfigError::KernelOrder(self.morphology.kernel_order));
        }

        let proposal = &self.proposal;
        if !(proposal.min_area >= 0.0) || !proposal.min_area.is_finite() {
            return Err(ConfigError::MinimumArea(proposal.min_area));
        }
        if !(proposal.boxiness_lo <= proposal.boxiness_hi) {
            return Err(ConfigError::BoxinessInterval {
                lo: proposal.boxiness_lo,
                hi: proposal.boxiness_hi,
            });
        }
        positive("proposal.smoothness_cutoff", proposal.smoothness_cutoff)?;

        positive(
            "extraction.downsampling_width",
            self.extraction.downsampling_width as f64,
        )?;

        Ok(())
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        PipelineConfig::default()
            .validate()
            .expect("defaults should validate");
    }

    #[test]
    fn blur_defaults_match_shipped_tuning() {
        let config = PipelineConfig::default();
        assert_eq!(config.filter.prefilter_sigma, 10.0);
        assert_eq!(config.threshold.smoothing_sigma, 20.0);
    }

    #[test]
    fn rejects_bucket_counts_outside_range() {
        for buckets in [0, 1, 48, 512] {
            let mut config = PipelineConfig::default();
            config.threshold.histogram_buckets = buckets;
            assert_eq!(
                config.validate(),
                Err(ConfigError::HistogramBuckets(buckets))
            );
        }
    }

    #[test]
    fn rejects_inverted_boxiness_interval() {
        let mut config = PipelineConfig::default();
        config.proposal.boxiness_lo = 2.0;
        config.proposal.boxiness_hi = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BoxinessInterval { .. })
        ));
    }

    #[test]
    fn prefilter_sigma_only_checked_when_enabled() {
        let mut config = PipelineConfig::default();
        config.filter.gaussian_prefilter = false;
        config.filter.prefilter_sigma = 0.0;
        assert!(config.validate().is_ok());

        config.filter.gaussian_prefilter = true;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositive { name: "filter.prefilter_sigma", .. })
        ));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{ "proposal": { "min_area": 500.0 } }"#).unwrap();
        assert_eq!(config.proposal.min_area, 500.0);
        assert_eq!(config.proposal.boxiness_hi, 1.8);
        assert_eq!(config.threshold, ThresholdConfig::default());
    }
}
