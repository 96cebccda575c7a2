//! Image I/O operations service
//!
//! Keeps file and codec handling out of the keying and rendering logic.

use crate::{
    error::{Result, TryOnError},
    types::BasePhoto,
};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::path::Path;

/// Service for decoding, encoding and saving images
pub struct ImageIOService;

impl ImageIOService {
    /// Decode image bytes, sniffing the format from content
    pub fn load_from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        image::load_from_memory(bytes)
            .map_err(|e| TryOnError::processing(format!("Failed to decode image from bytes: {}", e)))
    }

    /// Load a body photo from a local file
    ///
    /// Tries extension-based detection first, then falls back to content sniffing
    /// for files with a misleading or missing extension.
    ///
    /// # Examples
    /// ```rust,no_run
    /// use tryon_compositor::services::ImageIOService;
    ///
    /// # async fn example() -> tryon_compositor::Result<()> {
    /// let photo = ImageIOService::load_base_photo("forearm.jpg").await?;
    /// println!("{}", photo.label());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn load_base_photo<P: AsRef<Path>>(path: P) -> Result<BasePhoto> {
        let path_ref = path.as_ref();
        let data = tokio::fs::read(path_ref)
            .await
            .map_err(|e| TryOnError::file_io_error("read base photo", path_ref, &e))?;

        let format_from_extension = ImageFormat::from_path(path_ref).ok();
        let decoded = match format_from_extension {
            Some(format) => image::load_from_memory_with_format(&data, format).or_else(|e| {
                tracing::debug!(
                    path = %path_ref.display(),
                    error = %e,
                    "Extension-based decoding failed, attempting content-based detection"
                );
                image::load_from_memory(&data)
            }),
            None => image::load_from_memory(&data),
        };

        let image = decoded.map_err(|e| {
            TryOnError::processing_stage_error(
                "base photo decode",
                &e.to_string(),
                Some(&format!(
                    "path: {}, size: {} bytes",
                    path_ref.display(),
                    data.len()
                )),
            )
        })?;

        let label = path_ref
            .file_name()
            .map_or_else(|| path_ref.display().to_string(), |n| n.to_string_lossy().into_owned());
        Ok(BasePhoto::new(label, image.to_rgba8()))
    }

    /// Encode an RGBA buffer as PNG (lossless, keeps alpha)
    pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        image
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|e| TryOnError::processing(format!("Failed to encode PNG: {}", e)))?;
        Ok(buffer)
    }

    /// Save an RGBA image as PNG, creating parent directories as needed
    pub fn save_png<P: AsRef<Path>>(image: &RgbaImage, path: P) -> Result<()> {
        let path_ref = path.as_ref();

        if let Some(parent) = path_ref.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    TryOnError::file_io_error("create output directory", parent, &e)
                })?;
            }
        }

        image
            .save_with_format(path_ref, ImageFormat::Png)
            .map_err(|e| {
                TryOnError::processing_stage_error(
                    "image save",
                    &format!("Failed to save as PNG: {}", e),
                    Some(&format!("path: {}", path_ref.display())),
                )
            })
    }

    /// Check if a file path has a supported image extension
    pub fn is_supported_format<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                matches!(
                    ext.to_lowercase().as_str(),
                    "jpg" | "jpeg" | "png" | "webp" | "tiff" | "tif"
                )
            })
    }
}
