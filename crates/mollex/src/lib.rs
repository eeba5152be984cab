//! # Mollusc Specimen Extraction Library
//!
//! Finds individual specimens in catalog photographs and cuts them out as
//! transparent PNG crops, one output catalog row per crop.
//!
//! ## Core Features
//!
//! - **Trait-based Stages**: filtering, binarization, mask cleaning and region
//!   proposal sit behind traits and can be swapped independently
//! - **Pipeline System**: stages composed by a [`PipelineBuilder`], configured
//!   from one serde-friendly [`PipelineConfig`]
//! - **Shape Plausibility**: contours are kept only when they are large, compact
//!   and nearly convex
//! - **Batch Driver**: a bounded worker pool over catalog jobs with a progress
//!   reporter and a single catalog writer
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mollex::{Pipeline, PipelineConfig};
//!
//! let pipeline = Pipeline::from_config(&PipelineConfig::default())?;
//! let photo = image::open("IMG_0001.jpg")?.to_rgb8();
//!
//! for segment in pipeline.process(&photo, "IMG_0001") {
//!     segment.image.save(segment.file_name())?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Batch Processing
//!
//! ```rust,no_run
//! use mollex::{batch::BatchDriver, io::{read_jobs, CatalogWriter}, Pipeline, PipelineConfig};
//!
//! # async fn run() -> mollex::Result<()> {
//! let jobs = read_jobs("catalog.csv")?;
//! let pipeline = Pipeline::from_config(&PipelineConfig::default())?;
//! let driver = BatchDriver::new(pipeline, "photos", "segments").with_workers(8);
//! let (summary, _) = driver.run(jobs, CatalogWriter::create("segments.csv")?).await?;
//! println!("{} segments", summary.segments);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod config;
pub mod types;
pub mod traits;
pub mod algorithms;
pub mod pipeline;
pub mod io;
pub mod batch;

pub use error::{ConfigError, MollexError, Result};
pub use config::PipelineConfig;
pub use types::{Contour, HexColor, RotatedRect, Segment};
pub use traits::*;
pub use pipeline::{builder::PipelineBuilder, Detection, Pipeline};
pub use batch::{BatchDriver, BatchSummary};
