//! RGBA raster artifacts.

use super::{Artifact, ArtifactError, Overlay, SaveOptions};
use crate::capability::AreaInfo;
use crate::template::Params;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

/// Draws coastlines or borders onto a raster.
pub trait OverlayPainter: Send + Sync {
    fn paint(
        &self,
        image: &mut RgbaImage,
        area: Option<&AreaInfo>,
        overlay: &Overlay,
    ) -> Result<(), ArtifactError>;
}

/// A rendered RGBA image with its product metadata.
pub struct ImageArtifact {
    image: RgbaImage,
    metadata: Params,
    area: Option<AreaInfo>,
    painter: Option<Arc<dyn OverlayPainter>>,
}

impl ImageArtifact {
    pub fn new(image: RgbaImage, metadata: Params) -> Self {
        Self {
            image,
            metadata,
            area: None,
            painter: None,
        }
    }

    pub fn with_area(mut self, area: AreaInfo) -> Self {
        self.area = Some(area);
        self
    }

    pub fn with_painter(mut self, painter: Arc<dyn OverlayPainter>) -> Self {
        self.painter = Some(painter);
        self
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

impl Artifact for ImageArtifact {
    fn describe(&self) -> String {
        let name = self
            .metadata
            .get_str("productname")
            .or_else(|| self.metadata.get_str("product"))
            .unwrap_or("image");
        format!("{} {}x{}", name, self.image.width(), self.image.height())
    }

    fn metadata(&self) -> &Params {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut Params {
        &mut self.metadata
    }

    fn area(&self) -> Option<AreaInfo> {
        self.area.clone()
    }

    fn add_overlay(&mut self, overlay: &Overlay) -> Result<(), ArtifactError> {
        match &self.painter {
            Some(painter) => painter.paint(&mut self.image, self.area.as_ref(), overlay),
            None => Err(ArtifactError::OverlayUnsupported(self.describe())),
        }
    }

    fn save(&self, path: &Path, options: &SaveOptions) -> Result<(), ArtifactError> {
        let format = match options.format.as_deref() {
            Some(name) => image_format(name)?,
            None => format_of_path(path)?,
        };
        let image = DynamicImage::ImageRgba8(self.image.clone());
        write_image(&image, path, format, options.compression)
    }
}

/// Resolve a format name (`png`, `jpg`, `tif`, `GTiff`, ...) to an encoder.
pub(super) fn image_format(name: &str) -> Result<ImageFormat, ArtifactError> {
    let lower = name.trim().trim_start_matches('.').to_ascii_lowercase();
    match lower.as_str() {
        "gtiff" | "geotiff" => Ok(ImageFormat::Tiff),
        _ => ImageFormat::from_extension(&lower)
            .ok_or_else(|| ArtifactError::UnsupportedFormat(name.to_string())),
    }
}

pub(super) fn format_of_path(path: &Path) -> Result<ImageFormat, ArtifactError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| ArtifactError::UnsupportedFormat(path.display().to_string()))?;
    image_format(ext)
}

/// Encode `image` to `path`. Compression 0-9 applies to PNG only.
pub(super) fn write_image(
    image: &DynamicImage,
    path: &Path,
    format: ImageFormat,
    compression: u8,
) -> Result<(), ArtifactError> {
    let mut writer = BufWriter::new(File::create(path)?);
    match format {
        ImageFormat::Png => {
            let encoder = PngEncoder::new_with_quality(
                &mut writer,
                png_compression(compression),
                FilterType::Adaptive,
            );
            image.write_with_encoder(encoder)?;
        }
        ImageFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new(&mut writer))?;
        }
        other => image.write_to(&mut writer, other)?,
    }
    writer.flush()?;
    Ok(())
}

fn png_compression(level: u8) -> CompressionType {
    match level {
        0..=3 => CompressionType::Fast,
        4..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}
