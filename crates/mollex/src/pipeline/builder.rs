use crate::{
    algorithms::{
        EdgePreservingFilter, EllipticalMorphology, HistogramModeThreshold, PlausibilityProposer,
        SegmentExtractor,
    },
    config::{ExtractionConfig, PipelineConfig},
    pipeline::Pipeline,
    traits::{Binarizer, IntensityFilter, MaskCleaner, RegionProposer},
};

/// Builder for creating processing pipelines with a fluent API
pub struct PipelineBuilder {
    filter: Option<Box<dyn IntensityFilter>>,
    binarizer: Option<Box<dyn Binarizer>>,
    cleaner: Option<Box<dyn MaskCleaner>>,
    proposer: Option<Box<dyn RegionProposer>>,
    extraction: ExtractionConfig,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            filter: None,
            binarizer: None,
            cleaner: None,
            proposer: None,
            extraction: ExtractionConfig::default(),
        }
    }

    /// Builder with every stage taken from the configuration. Does not validate.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new()
            .set_filter(EdgePreservingFilter::new(config.filter.clone()))
            .set_binarizer(HistogramModeThreshold::new(config.threshold.clone()))
            .set_cleaner(EllipticalMorphology::new(config.morphology.clone()))
            .set_proposer(PlausibilityProposer::new(config.proposal.clone()))
            .with_extraction(config.extraction.clone())
    }

    /// Set the intensity filter (replaces any existing one)
    pub fn set_filter<F>(mut self, filter: F) -> Self
    where
        F: IntensityFilter + 'static,
    {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Set the binarizer (replaces any existing one)
    pub fn set_binarizer<B>(mut self, binarizer: B) -> Self
    where
        B: Binarizer + 'static,
    {
        self.binarizer = Some(Box::new(binarizer));
        self
    }

    /// Set the mask cleaner (replaces any existing one)
    pub fn set_cleaner<C>(mut self, cleaner: C) -> Self
    where
        C: MaskCleaner + 'static,
    {
        self.cleaner = Some(Box::new(cleaner));
        self
    }

    /// Set the region proposer (replaces any existing one)
    pub fn set_proposer<P>(mut self, proposer: P) -> Self
    where
        P: RegionProposer + 'static,
    {
        self.proposer = Some(Box::new(proposer));
        self
    }

    pub fn with_extraction(mut self, extraction: ExtractionConfig) -> Self {
        self.extraction = extraction;
        self
    }

    /// Build the pipeline with default components if not specified
    pub fn build(self) -> Pipeline {
        let filter = self
            .filter
            .unwrap_or_else(|| Box::new(EdgePreservingFilter::default()));
        let binarizer = self
            .binarizer
            .unwrap_or_else(|| Box::new(HistogramModeThreshold::default()));
        let cleaner = self
            .cleaner
            .unwrap_or_else(|| Box::new(EllipticalMorphology::default()));
        let proposer = self
            .proposer
            .unwrap_or_else(|| Box::new(PlausibilityProposer::default()));

        Pipeline::new(
            filter,
            binarizer,
            cleaner,
            proposer,
            SegmentExtractor::new(self.extraction),
        )
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
