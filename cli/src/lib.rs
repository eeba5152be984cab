use std::fs;
use std::path::Path;

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use mollex::{Contour, PipelineConfig};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// Load a pipeline configuration from a TOML string
pub fn config_from_toml(content: &str) -> Result<PipelineConfig, CliError> {
    Ok(toml::from_str(content)?)
}

/// Load a pipeline configuration from a JSON string
pub fn config_from_json(content: &str) -> Result<PipelineConfig, CliError> {
    Ok(serde_json::from_str(content)?)
}

/// Auto-detect file format and load configuration
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PipelineConfig, CliError> {
    let path = path.as_ref();
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => config_from_toml(&fs::read_to_string(path)?),
        Some("json") => config_from_json(&fs::read_to_string(path)?),
        _ => Err(CliError::UnsupportedFileFormat),
    }
}

/// Write a configuration, format chosen by extension
pub fn save_config<P: AsRef<Path>>(config: &PipelineConfig, path: P) -> Result<(), CliError> {
    let path = path.as_ref();
    let content = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::to_string_pretty(config)?,
        Some("json") => serde_json::to_string_pretty(config)?,
        _ => return Err(CliError::UnsupportedFileFormat),
    };
    fs::write(path, content)?;
    Ok(())
}

/// Draw each contour as a closed red polyline on a copy of the photograph.
pub fn draw_overlay(photo: &RgbImage, contours: &[Contour]) -> RgbImage {
    let red = Rgb([255u8, 0, 0]);
    let mut overlay = photo.clone();
    for contour in contours {
        let points = &contour.points;
        for (i, start) in points.iter().enumerate() {
            let end = &points[(i + 1) % points.len()];
            draw_line_segment_mut(
                &mut overlay,
                (start.x as f32, start.y as f32),
                (end.x as f32, end.y as f32),
                red,
            );
        }
    }
    overlay
}
