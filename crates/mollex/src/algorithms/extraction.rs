use image::{imageops, GrayImage, Luma, RgbImage, Rgba, RgbaImage};
use imageproc::{drawing, point::Point};
use tracing::warn;
use crate::{
    config::ExtractionConfig,
    types::{Contour, HexColor, Segment},
};

/// Cuts accepted contours out of the photograph as alpha-masked crops.
#[derive(Debug, Clone, Default)]
pub struct SegmentExtractor {
    pub config: ExtractionConfig,
}

impl SegmentExtractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    /// One segment per contour, in contour order.
    pub fn extract(&self, photo: &RgbImage, contours: &[Contour], source: &str) -> Vec<Segment> {
        contours
            .iter()
            .enumerate()
            .filter_map(|(index, contour)| self.extract_one(photo, contour, source, index))
            .collect()
    }

    pub fn extract_one(
        &self,
        photo: &RgbImage,
        contour: &Contour,
        source: &str,
        index: usize,
    ) -> Option<Segment> {
        let crop = crop_with_alpha(photo, contour)?;
        let image = downsample(crop, self.config.downsampling_width);
        let color = average_color(&image);
        if color.is_none() {
            warn!(source, index, "segment has no alpha mass; color left empty");
        }
        Some(Segment {
            source: source.to_string(),
            index,
            image,
            color,
            rect: contour.min_area_rect(),
        })
    }
}

/// Bounding-box crop of the photograph whose alpha is the filled contour.
///
/// The contour is rasterised directly in crop coordinates; pixels outside the
/// bounding box are transparent in a full-size mask anyway.
pub fn crop_with_alpha(photo: &RgbImage, contour: &Contour) -> Option<RgbaImage> {
    let (x0, y0, x1, y1) = contour.bounding_box()?;
    let x0 = x0.max(0);
    let y0 = y0.max(0);
    let x1 = x1.min(photo.width() as i32 - 1);
    let y1 = y1.min(photo.height() as i32 - 1);
    if x1 < x0 || y1 < y0 {
        return None;
    }
    let width = (x1 - x0 + 1) as u32;
    let height = (y1 - y0 + 1) as u32;

    let local: Vec<Point<i32>> = contour
        .points
        .iter()
        .map(|p| Point::new(p.x - x0, p.y - y0))
        .collect();
    let alpha = fill_contour(width, height, &local);

    Some(RgbaImage::from_fn(width, height, |x, y| {
        let [r, g, b] = photo.get_pixel(x0 as u32 + x, y0 as u32 + y).0;
        Rgba([r, g, b, alpha.get_pixel(x, y)[0]])
    }))
}

fn fill_contour(width: u32, height: u32, points: &[Point<i32>]) -> GrayImage {
    let white = Luma([255u8]);
    let mut alpha = GrayImage::new(width, height);
    match points {
        [] => {}
        [p] => {
            if p.x >= 0 && p.y >= 0 && (p.x as u32) < width && (p.y as u32) < height {
                alpha.put_pixel(p.x as u32, p.y as u32, white);
            }
        }
        [a, b] => drawing::draw_line_segment_mut(
            &mut alpha,
            (a.x as f32, a.y as f32),
            (b.x as f32, b.y as f32),
            white,
        ),
        _ => drawing::draw_polygon_mut(&mut alpha, points, white),
    }
    alpha
}

/// Area-average down to `max_width` when the crop is wider, keeping aspect ratio.
pub fn downsample(image: RgbaImage, max_width: u32) -> RgbaImage {
    let (width, height) = image.dimensions();
    if width <= max_width {
        return image;
    }
    let scale = max_width as f64 / width as f64;
    let new_height = ((height as f64 * scale).round() as u32).max(1);
    imageops::thumbnail(&image, max_width, new_height)
}

/// Alpha-weighted mean colour, `None` when every pixel is transparent.
pub fn average_color(image: &RgbaImage) -> Option<HexColor> {
    let mut sums = [0u64; 3];
    let mut mass = 0u64;
    for pixel in image.pixels() {
        let alpha = u64::from(pixel[3]);
        for (sum, &channel) in sums.iter_mut().zip(&pixel.0[..3]) {
            *sum += alpha * u64::from(channel);
        }
        mass += alpha;
    }
    if mass == 0 {
        return None;
    }
    Some(HexColor(
        sums.map(|sum| (sum as f64 / mass as f64).round().clamp(0.0, 255.0) as u8),
    ))
}
