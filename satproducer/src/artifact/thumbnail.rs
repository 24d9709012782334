//! Reduced-size previews of written rasters.

use super::raster::{format_of_path, write_image};
use super::ArtifactError;
use std::path::Path;

/// Write a preview of the image at `source` that fits within `size`
/// (width, height), keeping the aspect ratio.
///
/// The preview format follows the extension of `dest`.
pub fn write_thumbnail(source: &Path, dest: &Path, size: (u32, u32)) -> Result<(), ArtifactError> {
    let format = format_of_path(dest)?;
    let image = image::open(source)?;
    let preview = image.thumbnail(size.0, size.1);
    write_image(&preview, dest, format, 6)
}
