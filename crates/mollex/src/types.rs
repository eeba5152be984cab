use std::fmt;

use geo::{Area, ConvexHull, MinimumRotatedRect};
use geo_types::{Coord, LineString, Polygon};
use image::{GrayImage, ImageBuffer, Luma, RgbaImage};
use imageproc::point::Point;

/// Single-channel intensity in `[0, 1]`.
pub type IntensityField = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Single-channel mask with samples `0` or `255`.
pub type BinaryMask = GrayImage;

/// Closed boundary polygon in image coordinates, in traversal order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contour {
    pub points: Vec<Point<i32>>,
}

impl Contour {
    pub fn new(points: Vec<Point<i32>>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Convert to a geo-types Polygon for area and hull computations
    pub fn to_geo_polygon(&self) -> Polygon<f64> {
        let coords: Vec<Coord<f64>> = self
            .points
            .iter()
            .map(|p| Coord {
                x: p.x as f64,
                y: p.y as f64,
            })
            .collect();
        Polygon::new(LineString::new(coords), vec![])
    }

    /// Unsigned polygon area enclosed by the point chain.
    pub fn area(&self) -> f64 {
        self.to_geo_polygon().unsigned_area()
    }

    pub fn convex_hull_area(&self) -> f64 {
        self.to_geo_polygon().convex_hull().unsigned_area()
    }

    /// Minimum-area enclosing rectangle, `None` for collinear or empty chains.
    pub fn min_area_rect(&self) -> Option<RotatedRect> {
        let rect = self.to_geo_polygon().minimum_rotated_rect()?;
        RotatedRect::from_corners(rect.exterior().0.as_slice())
    }

    /// Axis-aligned inclusive bounds as `(min_x, min_y, max_x, max_y)`.
    pub fn bounding_box(&self) -> Option<(i32, i32, i32, i32)> {
        let first = self.points.first()?;
        let init = (first.x, first.y, first.x, first.y);
        Some(self.points.iter().fold(init, |(x0, y0, x1, y1), p| {
            (x0.min(p.x), y0.min(p.y), x1.max(p.x), y1.max(p.y))
        }))
    }
}

/// Rotated rectangle normalised so that `width >= height`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotatedRect {
    pub center: [f64; 2],
    pub width: f64,
    pub height: f64,
    /// Rotation in degrees.
    pub angle: f64,
}

impl RotatedRect {
    /// Build from the first three corners of a rectangle ring.
    pub fn from_corners(corners: &[Coord<f64>]) -> Option<Self> {
        let [a, b, c, ..] = corners else {
            return None;
        };
        let width = (b.x - a.x).hypot(b.y - a.y);
        let height = (c.x - b.x).hypot(c.y - b.y);
        let angle = (b.y - a.y).atan2(b.x - a.x).to_degrees();
        let center = [(a.x + c.x) / 2.0, (a.y + c.y) / 2.0];
        Some(
            Self {
                center,
                width,
                height,
                angle,
            }
            .normalized(),
        )
    }

    pub fn normalized(mut self) -> Self {
        if self.height > self.width {
            std::mem::swap(&mut self.width, &mut self.height);
            self.angle += 90.0;
        }
        self
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn ratio(&self) -> f64 {
        if self.width > 0.0 {
            self.height / self.width
        } else {
            1.0
        }
    }

    pub fn angle_radians(&self) -> f64 {
        self.angle.to_radians()
    }
}

/// Contour with the features the accept/reject decision looks at.
#[derive(Debug, Clone)]
pub struct RegionCandidate {
    pub contour: Contour,
    pub area: f64,
    pub rect: Option<RotatedRect>,
    pub hull_area: f64,
}

impl RegionCandidate {
    pub fn new(contour: Contour) -> Self {
        let area = contour.area();
        let rect = contour.min_area_rect();
        let hull_area = contour.convex_hull_area();
        Self {
            contour,
            area,
            rect,
            hull_area,
        }
    }

    pub fn boxiness(&self) -> Option<f64> {
        let rect = self.rect.as_ref()?;
        (self.area > 0.0).then(|| rect.area() / self.area)
    }

    pub fn smoothness(&self) -> Option<f64> {
        (self.area > 0.0).then(|| self.hull_area / self.area)
    }
}

/// Packed 8-bit RGB, displayed as six lowercase hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HexColor(pub [u8; 3]);

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "{r:02x}{g:02x}{b:02x}")
    }
}

/// An accepted region cut out of its photograph.
#[derive(Debug, Clone)]
pub struct Segment {
    /// File stem of the source photograph.
    pub source: String,
    /// Position within the photograph's accepted contours.
    pub index: usize,
    pub image: RgbaImage,
    /// `None` when the crop carries no alpha mass.
    pub color: Option<HexColor>,
    pub rect: Option<RotatedRect>,
}

impl Segment {
    pub fn file_name(&self) -> String {
        format!("{}_{}.png", self.source, self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rectangle(x0: i32, y0: i32, x1: i32, y1: i32) -> Contour {
        Contour::new(vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ])
    }

    #[test]
    fn hex_color_pads_each_byte() {
        assert_eq!(HexColor([0x0a, 0xff, 0x00]).to_string(), "0aff00");
        assert_eq!(HexColor([200, 120, 40]).to_string(), "c87828");
    }

    #[test]
    fn rectangle_features() {
        let candidate = RegionCandidate::new(rectangle(10, 10, 110, 60));
        assert!((candidate.area - 5000.0).abs() < 1e-6);
        assert!((candidate.hull_area - 5000.0).abs() < 1e-6);
        let boxiness = candidate.boxiness().unwrap();
        assert!((boxiness - 1.0).abs() < 1e-6, "boxiness {boxiness}");
        let rect = candidate.rect.unwrap();
        assert!(rect.width >= rect.height);
        assert!((rect.width - 100.0).abs() < 1e-6);
        assert!((rect.height - 50.0).abs() < 1e-6);
        assert!((rect.center[0] - 60.0).abs() < 1e-6);
        assert!((rect.center[1] - 35.0).abs() < 1e-6);
    }

    #[test]
    fn normalization_swaps_axes() {
        let rect = RotatedRect {
            center: [0.0, 0.0],
            width: 10.0,
            height: 40.0,
            angle: 0.0,
        }
        .normalized();
        assert_eq!(rect.width, 40.0);
        assert_eq!(rect.height, 10.0);
        assert_eq!(rect.angle, 90.0);
        assert_eq!(rect.ratio(), 0.25);
    }

    #[test]
    fn collinear_contour_has_no_ratios() {
        let line = Contour::new(vec![Point::new(0, 0), Point::new(5, 0), Point::new(9, 0)]);
        let candidate = RegionCandidate::new(line);
        assert_eq!(candidate.area, 0.0);
        assert!(candidate.boxiness().is_none());
        assert!(candidate.smoothness().is_none());
    }

    #[test]
    fn bounding_box_is_inclusive() {
        assert_eq!(rectangle(3, 4, 9, 7).bounding_box(), Some((3, 4, 9, 7)));
        assert_eq!(Contour::new(vec![]).bounding_box(), None);
    }
}
