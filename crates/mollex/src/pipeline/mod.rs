pub mod builder;

use image::RgbImage;
use tracing::debug;
use crate::{
    algorithms::SegmentExtractor,
    config::PipelineConfig,
    error::ConfigError,
    traits::{Binarizer, IntensityFilter, MaskCleaner, RegionProposer},
    types::{BinaryMask, Contour, Segment},
};

/// Photograph -> field -> mask -> cleaned mask -> contours -> segments.
///
/// Every stage is a pure function of its input, so one pipeline can be shared
/// by any number of workers.
pub struct Pipeline {
    filter: Box<dyn IntensityFilter>,
    binarizer: Box<dyn Binarizer>,
    cleaner: Box<dyn MaskCleaner>,
    proposer: Box<dyn RegionProposer>,
    extractor: SegmentExtractor,
}

/// Intermediate results of a detection run.
#[derive(Debug, Clone)]
pub struct Detection {
    pub mask: BinaryMask,
    pub contours: Vec<Contour>,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    pub fn new(
        filter: Box<dyn IntensityFilter>,
        binarizer: Box<dyn Binarizer>,
        cleaner: Box<dyn MaskCleaner>,
        proposer: Box<dyn RegionProposer>,
        extractor: SegmentExtractor,
    ) -> Self {
        Self {
            filter,
            binarizer,
            cleaner,
            proposer,
            extractor,
        }
    }

    /// Validate the configuration and assemble the stages it describes.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(builder::PipelineBuilder::from_config(config).build())
    }

    /// Run every stage up to and including contour proposal
    pub fn detect(&self, photo: &RgbImage) -> Detection {
        let field = self.filter.filter(photo);
        let mask = self.binarizer.binarize(&field);
        let mask = self.cleaner.clean(mask);
        let contours = self.proposer.propose(&mask);
        Detection { mask, contours }
    }

    pub fn propose(&self, photo: &RgbImage) -> Vec<Contour> {
        self.detect(photo).contours
    }

    /// Process a photograph through the entire pipeline
    pub fn process(&self, photo: &RgbImage, source: &str) -> Vec<Segment> {
        let contours = self.propose(photo);
        let segments = self.extractor.extract(photo, &contours, source);
        debug!(source, segments = segments.len(), "extracted segments");
        segments
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("extractor", &self.extractor)
            .finish_non_exhaustive()
    }
}
