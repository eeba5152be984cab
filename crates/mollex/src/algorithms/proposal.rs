use imageproc::{contours::BorderType, point::Point};
use strum::Display;
use tracing::debug;
use crate::{
    config::ProposalConfig,
    traits::RegionProposer,
    types::{BinaryMask, Contour, RegionCandidate},
};

/// Why a contour was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum RejectReason {
    /// Polygon area below the minimum.
    TooSmall,
    /// No area or no enclosing rectangle.
    Degenerate,
    /// Rectangle/area ratio outside the accepted band.
    Boxiness,
    /// Hull/area ratio above the cutoff.
    Smoothness,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Accept,
    Reject(RejectReason),
}

/// Accept/reject a candidate against the configured bounds.
pub fn decide(candidate: &RegionCandidate, config: &ProposalConfig) -> Decision {
    if candidate.area < config.min_area {
        return Decision::Reject(RejectReason::TooSmall);
    }
    let (Some(boxiness), Some(smoothness)) = (candidate.boxiness(), candidate.smoothness()) else {
        return Decision::Reject(RejectReason::Degenerate);
    };
    debug!(area = candidate.area, boxiness, smoothness, "contour features");

    if !(config.boxiness_lo..=config.boxiness_hi).contains(&boxiness) {
        return Decision::Reject(RejectReason::Boxiness);
    }
    if smoothness > config.smoothness_cutoff {
        return Decision::Reject(RejectReason::Smoothness);
    }
    Decision::Accept
}

/// Drop interior points of straight horizontal, vertical and diagonal runs.
pub fn compress_chain(points: &[Point<i32>]) -> Vec<Point<i32>> {
    let mut chain: Vec<Point<i32>> = points.to_vec();
    chain.dedup();
    while chain.len() > 1 && chain.first() == chain.last() {
        chain.pop();
    }
    let n = chain.len();
    if n < 3 {
        return chain;
    }
    let direction = |a: Point<i32>, b: Point<i32>| ((b.x - a.x).signum(), (b.y - a.y).signum());
    (0..n)
        .filter(|&i| {
            let prev = chain[(i + n - 1) % n];
            let next = chain[(i + 1) % n];
            direction(prev, chain[i]) != direction(chain[i], next)
        })
        .map(|i| chain[i])
        .collect()
}

/// Outer borders of every foreground component, in trace order.
pub fn extract_contours(mask: &BinaryMask) -> Vec<Contour> {
    imageproc::contours::find_contours::<i32>(mask)
        .into_iter()
        .filter(|contour| contour.border_type == BorderType::Outer)
        .map(|contour| Contour::new(compress_chain(&contour.points)))
        .collect()
}

/// Contour extraction followed by the boxiness/smoothness decision.
#[derive(Debug, Clone, Default)]
pub struct PlausibilityProposer {
    pub config: ProposalConfig,
}

impl PlausibilityProposer {
    pub fn new(config: ProposalConfig) -> Self {
        Self { config }
    }
}

impl RegionProposer for PlausibilityProposer {
    fn propose(&self, mask: &BinaryMask) -> Vec<Contour> {
        let contours = extract_contours(mask);
        let total = contours.len();
        let accepted: Vec<Contour> = contours
            .into_iter()
            .filter_map(|contour| {
                let candidate = RegionCandidate::new(contour);
                match decide(&candidate, &self.config) {
                    Decision::Accept => Some(candidate.contour),
                    Decision::Reject(reason) => {
                        if reason != RejectReason::TooSmall {
                            debug!(%reason, area = candidate.area, "contour rejected");
                        }
                        None
                    }
                }
            })
            .collect();
        debug!(total, accepted = accepted.len(), "found potential molluscs");
        accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{algorithms::EllipticalMorphology, config::MorphologyConfig, traits::MaskCleaner};
    use image::Luma;
    use imageproc::region_labelling::{connected_components, Connectivity};

    fn mask_from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> bool) -> BinaryMask {
        BinaryMask::from_fn(width, height, |x, y| Luma([if f(x, y) { 255 } else { 0 }]))
    }

    fn lenient() -> ProposalConfig {
        ProposalConfig {
            min_area: 100.0,
            boxiness_lo: 0.95,
            boxiness_hi: 1.8,
            smoothness_cutoff: 1.25,
        }
    }

    fn component_count(mask: &BinaryMask) -> usize {
        let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));
        labels.pixels().map(|p| p[0]).max().unwrap_or(0) as usize
    }

    fn points(coords: &[(i32, i32)]) -> Vec<Point<i32>> {
        coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    #[test]
    fn compress_keeps_only_corners() {
        let square = points(&[(0, 0), (1, 0), (2, 0), (2, 1), (2, 2), (1, 2), (0, 2), (0, 1)]);
        assert_eq!(compress_chain(&square), points(&[(0, 0), (2, 0), (2, 2), (0, 2)]));

        let diamond = points(&[(2, 0), (3, 1), (4, 2), (3, 3), (2, 4), (1, 3), (0, 2), (1, 1)]);
        assert_eq!(compress_chain(&diamond), points(&[(2, 0), (4, 2), (2, 4), (0, 2)]));
    }

    #[test]
    fn compress_handles_tiny_chains() {
        assert_eq!(compress_chain(&points(&[(3, 3)])), points(&[(3, 3)]));
        assert_eq!(compress_chain(&points(&[(3, 3), (3, 3)])), points(&[(3, 3)]));
    }

    #[test]
    fn rectangle_is_accepted() {
        let mask = mask_from_fn(100, 80, |x, y| (10..70).contains(&x) && (20..60).contains(&y));
        let contours = PlausibilityProposer::new(lenient()).propose(&mask);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].bounding_box(), Some((10, 20, 69, 59)));
        assert_eq!(contours[0].len(), 4);
    }

    #[test]
    fn default_bounds_reject_perfect_rectangles() {
        let mask = mask_from_fn(100, 80, |x, y| (10..70).contains(&x) && (20..60).contains(&y));
        let config = ProposalConfig {
            min_area: 100.0,
            ..ProposalConfig::default()
        };
        assert!(PlausibilityProposer::new(config).propose(&mask).is_empty());
    }

    #[test]
    fn small_area_rejected_regardless_of_shape() {
        let candidate = RegionCandidate::new(Contour::new(points(&[(0, 0), (5, 0), (5, 5), (0, 5)])));
        assert_eq!(
            decide(&candidate, &lenient()),
            Decision::Reject(RejectReason::TooSmall)
        );
    }

    #[test]
    fn concave_shape_rejected_by_smoothness() {
        // A thin "U": hull area far exceeds polygon area.
        let u = points(&[(0, 0), (10, 0), (10, 90), (90, 90), (90, 0), (100, 0), (100, 100), (0, 100)]);
        let candidate = RegionCandidate::new(Contour::new(u));
        let config = ProposalConfig {
            boxiness_hi: 10.0,
            ..lenient()
        };
        assert_eq!(
            decide(&candidate, &config),
            Decision::Reject(RejectReason::Smoothness)
        );
    }

    #[test]
    fn irregular_shape_rejected_by_boxiness() {
        // A four-pointed star: its enclosing rectangle is five times its area.
        let star = points(&[
            (50, 0), (55, 45), (100, 50), (55, 55), (50, 100), (45, 55), (0, 50), (45, 45),
        ]);
        let candidate = RegionCandidate::new(Contour::new(star));
        assert_eq!(
            decide(&candidate, &lenient()),
            Decision::Reject(RejectReason::Boxiness)
        );
    }

    #[test]
    fn ratios_never_below_their_lower_bound() {
        let shapes = [
            points(&[(0, 0), (40, 0), (40, 30), (0, 30)]),
            points(&[(0, 0), (40, 10), (30, 40), (5, 25)]),
            points(&[(0, 0), (10, 0), (10, 90), (90, 90), (90, 0), (100, 0), (100, 100), (0, 100)]),
        ];
        for shape in shapes {
            let candidate = RegionCandidate::new(Contour::new(shape));
            assert!(candidate.hull_area >= candidate.area - 1e-9);
            assert!(candidate.smoothness().unwrap() >= 1.0 - 1e-9);
            assert!(candidate.boxiness().unwrap() >= 1.0 - 1e-9);
        }
    }

    #[test]
    fn holes_do_not_produce_proposals() {
        let ring = mask_from_fn(120, 120, |x, y| {
            let outer = (10..110).contains(&x) && (10..110).contains(&y);
            let inner = (30..90).contains(&x) && (30..90).contains(&y);
            outer && !inner
        });
        let config = ProposalConfig {
            smoothness_cutoff: 10.0,
            boxiness_hi: 10.0,
            ..lenient()
        };
        let contours = PlausibilityProposer::new(config).propose(&ring);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].bounding_box(), Some((10, 10, 109, 109)));
    }

    fn irregular_masks() -> [BinaryMask; 3] {
        [
            mask_from_fn(120, 120, |x, y| (x / 20 + y / 20) % 2 == 0),
            mask_from_fn(120, 120, |x, y| {
                let dx = x as i32 - 60;
                let dy = y as i32 - 60;
                let r2 = dx * dx + dy * dy;
                (900..2500).contains(&r2) || r2 < 100
            }),
            mask_from_fn(120, 120, |x, y| (x * 7 + y * 13) % 11 < 4),
        ]
    }

    fn accept_everything() -> ProposalConfig {
        ProposalConfig {
            min_area: 0.0,
            boxiness_lo: 0.0,
            boxiness_hi: f64::MAX,
            smoothness_cutoff: f64::MAX,
        }
    }

    #[test]
    fn proposals_bounded_by_components() {
        let proposer = PlausibilityProposer::new(accept_everything());
        for mask in irregular_masks() {
            assert!(proposer.propose(&mask).len() <= component_count(&mask));
        }
    }

    #[test]
    fn cleaned_proposals_bounded_by_components() {
        let policies = [
            MorphologyConfig::default(),
            MorphologyConfig {
                multi_scale: true,
                ..MorphologyConfig::default()
            },
            MorphologyConfig {
                kernel_order: 1,
                open_iterations: 1,
                close_iterations: 2,
                ..MorphologyConfig::default()
            },
        ];
        let proposer = PlausibilityProposer::new(accept_everything());
        for mask in irregular_masks() {
            for policy in &policies {
                let cleaned = EllipticalMorphology::new(policy.clone()).clean(mask.clone());
                let proposed = proposer.propose(&cleaned).len();
                let components = component_count(&cleaned);
                assert!(proposed <= components, "{proposed} proposals for {components} components");
            }
        }
    }
}
