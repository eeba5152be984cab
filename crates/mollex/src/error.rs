use thiserror::Error;

#[derive(Error, Debug)]
pub enum MollexError {
    #[error("Failed to load image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("Worker pool closed unexpectedly")]
    PoolClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejected tunables. These abort a run before any job is dispatched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("histogram bucket count {0} must be a power of two in 2..=256")]
    HistogramBuckets(usize),

    #[error("threshold bias must be finite, got {0}")]
    ThresholdBias(f32),

    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("boxiness interval is empty: [{lo}, {hi}]")]
    BoxinessInterval { lo: f64, hi: f64 },

    #[error("minimum area must be a non-negative number, got {0}")]
    MinimumArea(f64),

    #[error("structuring element order {0} exceeds the largest supported order 9")]
    KernelOrder(u32),
}

pub type Result<T> = std::result::Result<T, MollexError>;
