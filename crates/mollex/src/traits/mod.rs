use image::RgbImage;
use crate::types::{BinaryMask, Contour, IntensityField};

/// Trait for the photograph denoising/flattening stage
pub trait IntensityFilter: Send + Sync {
    /// Turn a colour photograph into a normalised intensity field
    fn filter(&self, photo: &RgbImage) -> IntensityField;
}

/// Trait for binarization algorithms
pub trait Binarizer: Send + Sync {
    /// Split the field into foreground (255) and background (0)
    fn binarize(&self, field: &IntensityField) -> BinaryMask;
}

/// Trait for mask cleanup algorithms
pub trait MaskCleaner: Send + Sync {
    /// Clean the mask. The buffer is owned by the caller's job and handed back.
    fn clean(&self, mask: BinaryMask) -> BinaryMask;
}

/// Trait for contour proposal algorithms
pub trait RegionProposer: Send + Sync {
    /// Extract contours from a binary mask and keep the plausible ones
    fn propose(&self, mask: &BinaryMask) -> Vec<Contour>;
}
