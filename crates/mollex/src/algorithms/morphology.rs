use image::Luma;
use crate::{
    config::{MorphologyConfig, MAX_KERNEL_ORDER},
    traits::MaskCleaner,
    types::BinaryMask,
};

/// Elliptical structuring element anchored at its centre, stored as
/// `(dy, half_width)` row spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    rows: Vec<(i32, i32)>,
}

impl StructuringElement {
    /// Ellipse of order `k`, i.e. diameter `2k + 1`.
    pub fn ellipse(order: u32) -> Self {
        let r = order as i32;
        let rows = (-r..=r)
            .map(|dy| {
                let half_width = if r == 0 {
                    0
                } else {
                    (((r * r - dy * dy) as f64).sqrt()).round() as i32
                };
                (dy, half_width)
            })
            .collect();
        Self { rows }
    }

    pub fn diameter(&self) -> usize {
        self.rows.len()
    }

    pub fn contains(&self, dx: i32, dy: i32) -> bool {
        self.rows
            .iter()
            .any(|&(row, half_width)| row == dy && dx.abs() <= half_width)
    }
}

/// Foreground counts per row; `prefix[y][x]` counts samples left of `x`.
fn row_prefix_sums(mask: &BinaryMask) -> Vec<Vec<u32>> {
    let width = mask.width() as usize;
    mask.rows()
        .map(|row| {
            let mut prefix = Vec::with_capacity(width + 1);
            prefix.push(0);
            let mut acc = 0;
            for pixel in row {
                acc += u32::from(pixel[0] != 0);
                prefix.push(acc);
            }
            prefix
        })
        .collect()
}

/// Apply the element as a min (erode) or max (dilate) filter.
/// Samples outside the image never influence the result.
fn morph(mask: &BinaryMask, element: &StructuringElement, erode: bool) -> BinaryMask {
    let (width, height) = mask.dimensions();
    let prefix = row_prefix_sums(mask);
    BinaryMask::from_fn(width, height, |x, y| {
        let mut hit = erode;
        for &(dy, half_width) in &element.rows {
            let sy = y as i32 + dy;
            if sy < 0 || sy >= height as i32 {
                continue;
            }
            let left = (x as i32 - half_width).max(0) as usize;
            let right = (x as i32 + half_width).min(width as i32 - 1) as usize;
            let row = &prefix[sy as usize];
            let count = row[right + 1] - row[left];
            if erode && count as usize != right + 1 - left {
                hit = false;
                break;
            }
            if !erode && count > 0 {
                hit = true;
                break;
            }
        }
        Luma([if hit { 255 } else { 0 }])
    })
}

pub fn erode(mask: &BinaryMask, element: &StructuringElement) -> BinaryMask {
    morph(mask, element, true)
}

pub fn dilate(mask: &BinaryMask, element: &StructuringElement) -> BinaryMask {
    morph(mask, element, false)
}

/// `iterations` erosions followed by as many dilations.
pub fn open(mut mask: BinaryMask, element: &StructuringElement, iterations: u32) -> BinaryMask {
    for _ in 0..iterations {
        mask = erode(&mask, element);
    }
    for _ in 0..iterations {
        mask = dilate(&mask, element);
    }
    mask
}

/// `iterations` dilations followed by as many erosions.
pub fn close(mut mask: BinaryMask, element: &StructuringElement, iterations: u32) -> BinaryMask {
    for _ in 0..iterations {
        mask = dilate(&mask, element);
    }
    for _ in 0..iterations {
        mask = erode(&mask, element);
    }
    mask
}

/// Opening/closing with elliptical elements, single-kernel and/or multi-scale.
#[derive(Debug, Clone, Default)]
pub struct EllipticalMorphology {
    pub config: MorphologyConfig,
}

impl EllipticalMorphology {
    pub fn new(config: MorphologyConfig) -> Self {
        Self { config }
    }
}

impl MaskCleaner for EllipticalMorphology {
    fn clean(&self, mut mask: BinaryMask) -> BinaryMask {
        if self.config.multi_scale {
            for order in 0..=MAX_KERNEL_ORDER {
                mask = open(mask, &StructuringElement::ellipse(order), 1);
            }
            for order in 0..=MAX_KERNEL_ORDER {
                mask = close(mask, &StructuringElement::ellipse(order), 1);
            }
        }

        if self.config.single {
            let element = StructuringElement::ellipse(self.config.kernel_order);
            mask = open(mask, &element, self.config.open_iterations);
            mask = close(mask, &element, self.config.close_iterations);
        }

        mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> bool) -> BinaryMask {
        BinaryMask::from_fn(width, height, |x, y| Luma([if f(x, y) { 255 } else { 0 }]))
    }

    fn foreground(mask: &BinaryMask) -> usize {
        mask.pixels().filter(|p| p[0] != 0).count()
    }

    #[test]
    fn ellipse_shapes() {
        let point = StructuringElement::ellipse(0);
        assert_eq!(point.diameter(), 1);
        assert!(point.contains(0, 0));
        assert!(!point.contains(1, 0));

        // Order 1 is a plus sign.
        let plus = StructuringElement::ellipse(1);
        assert_eq!(plus.diameter(), 3);
        assert!(plus.contains(-1, 0) && plus.contains(1, 0) && plus.contains(0, -1));
        assert!(!plus.contains(1, 1));

        let disk = StructuringElement::ellipse(5);
        assert_eq!(disk.diameter(), 11);
        assert!(disk.contains(5, 0) && disk.contains(0, 5) && disk.contains(3, 4));
        assert!(!disk.contains(5, 5));
    }

    #[test]
    fn order_zero_is_identity() {
        let mask = mask_from_fn(10, 10, |x, y| (x * y) % 3 == 0);
        let element = StructuringElement::ellipse(0);
        assert_eq!(open(mask.clone(), &element, 3), mask);
        assert_eq!(close(mask.clone(), &element, 3), mask);
    }

    #[test]
    fn erosion_ignores_image_border() {
        let full = mask_from_fn(8, 8, |_, _| true);
        assert_eq!(erode(&full, &StructuringElement::ellipse(2)), full);
    }

    #[test]
    fn opening_removes_speckle_and_keeps_blob() {
        let mask = mask_from_fn(60, 60, |x, y| {
            let blob = (10..40).contains(&x) && (10..40).contains(&y);
            let speckle = x == 50 && y == 50;
            blob || speckle
        });
        let opened = open(mask, &StructuringElement::ellipse(2), 1);
        assert_eq!(opened[(50, 50)][0], 0);
        assert_eq!(opened[(25, 25)][0], 255);
        assert_eq!(opened[(10, 25)][0], 255);
    }

    #[test]
    fn closing_fills_small_hole() {
        let mask = mask_from_fn(40, 40, |x, y| {
            let square = (5..35).contains(&x) && (5..35).contains(&y);
            square && !(x == 20 && y == 20)
        });
        let closed = close(mask, &StructuringElement::ellipse(1), 1);
        assert_eq!(closed[(20, 20)][0], 255);
        assert_eq!(closed[(2, 2)][0], 0);
    }

    #[test]
    fn cleaner_runs_configured_policies() {
        let mask = mask_from_fn(80, 80, |x, y| {
            ((20..60).contains(&x) && (20..60).contains(&y)) || (x == 5 && y == 5)
        });
        let both = EllipticalMorphology::new(MorphologyConfig {
            single: true,
            kernel_order: 2,
            open_iterations: 1,
            close_iterations: 1,
            multi_scale: true,
        });
        let cleaned = both.clean(mask.clone());
        assert_eq!(cleaned[(5, 5)][0], 0);
        assert_eq!(cleaned[(40, 40)][0], 255);

        let none = EllipticalMorphology::new(MorphologyConfig {
            single: false,
            multi_scale: false,
            ..MorphologyConfig::default()
        });
        assert_eq!(foreground(&none.clean(mask.clone())), foreground(&mask));
    }
}
