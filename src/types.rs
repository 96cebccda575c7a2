//! Core types for the try-on compositor

use crate::error::{Result, TryOnError};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Reference to a rectangular raster image supplied by a collaborator
///
/// Either a remote URL (e.g. a generated concept) or an in-memory buffer read
/// from a local file. Clones share the underlying buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceImage {
    /// Remote image fetched anonymously before keying
    Url(String),
    /// Encoded image bytes already in memory
    Bytes {
        /// Display label (usually the file name)
        label: String,
        data: Arc<[u8]>,
    },
}

impl SourceImage {
    /// Reference a remote image
    pub fn from_url<S: Into<String>>(url: S) -> Self {
        Self::Url(url.into())
    }

    /// Wrap encoded image bytes
    pub fn from_bytes<S: Into<String>>(label: S, data: impl Into<Arc<[u8]>>) -> Self {
        Self::Bytes {
            label: label.into(),
            data: data.into(),
        }
    }

    /// Read a local file into an in-memory source
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let data = tokio::fs::read(path_ref)
            .await
            .map_err(|e| TryOnError::file_io_error("read overlay image", path_ref, &e))?;
        Ok(Self::from_bytes(path_ref.display().to_string(), data))
    }

    /// Human-readable description used in logs and preview records
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Url(url) => url,
            Self::Bytes { label, .. } => label,
        }
    }

    /// Reference describing this source for persistence
    #[must_use]
    pub fn reference(&self) -> ImageReference {
        match self {
            Self::Url(url) => ImageReference::Url { url: url.clone() },
            Self::Bytes { label, data } => ImageReference::Local {
                label: label.clone(),
                byte_len: data.len(),
            },
        }
    }
}

/// Serializable pointer to an image, as handed to a persistence collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ImageReference {
    Url { url: String },
    Local { label: String, byte_len: usize },
}

/// Why keying produced (or did not produce) a cutout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyingOutcome {
    /// Background pixels were made transparent
    Keyed { keyed_pixels: usize },
    /// Keying was not possible; the original source is used as-is
    Fallback { reason: String },
}

/// Overlay image with background pixels made transparent
#[derive(Debug, Clone)]
pub struct KeyedImage {
    source: SourceImage,
    image: Option<Arc<RgbaImage>>,
    png: Option<Arc<[u8]>>,
    outcome: KeyingOutcome,
}

impl KeyedImage {
    pub(crate) fn keyed(
        source: SourceImage,
        image: RgbaImage,
        png: Vec<u8>,
        keyed_pixels: usize,
    ) -> Self {
        Self {
            source,
            image: Some(Arc::new(image)),
            png: Some(png.into()),
            outcome: KeyingOutcome::Keyed { keyed_pixels },
        }
    }

    /// Fallback wrapping the unmodified source; `image` is present when it decoded
    pub(crate) fn fallback(source: SourceImage, image: Option<RgbaImage>, reason: String) -> Self {
        Self {
            source,
            image: image.map(Arc::new),
            png: None,
            outcome: KeyingOutcome::Fallback { reason },
        }
    }

    /// The source this image was derived from
    #[must_use]
    pub fn source(&self) -> &SourceImage {
        &self.source
    }

    /// Drawable pixels, if any could be decoded
    #[must_use]
    pub fn image(&self) -> Option<&Arc<RgbaImage>> {
        self.image.as_ref()
    }

    /// Lossless PNG encoding of the cutout (keyed images only)
    #[must_use]
    pub fn png_bytes(&self) -> Option<&[u8]> {
        self.png.as_deref()
    }

    #[must_use]
    pub fn outcome(&self) -> &KeyingOutcome {
        &self.outcome
    }

    #[must_use]
    pub fn is_fallback(&self) -> bool {
        matches!(self.outcome, KeyingOutcome::Fallback { .. })
    }

    /// Pixel dimensions, when the image decoded
    #[must_use]
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.image.as_ref().map(|img| img.dimensions())
    }
}

/// Placement of the overlay relative to the viewport
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementState {
    pub scale: f64,
    /// Degrees in `[0, 360)`
    pub rotation_degrees: f64,
    pub opacity: f64,
    /// Anchor as a fraction of viewport width and height, each in `[0, 1]`
    pub position: (f64, f64),
}

impl PlacementState {
    /// Defaults applied whenever an overlay is selected
    #[must_use]
    pub fn with_opacity(opacity: f64) -> Self {
        Self {
            scale: 1.0,
            rotation_degrees: 0.0,
            opacity,
            position: (0.5, 0.5),
        }
    }

    /// Slider label for scale, e.g. `1.5x`
    #[must_use]
    pub fn scale_label(&self) -> String {
        format!("{:.1}x", self.scale)
    }

    /// Slider label for rotation, e.g. `45°`
    #[must_use]
    pub fn rotation_label(&self) -> String {
        format!("{}°", self.rotation_degrees.round())
    }

    /// Slider label for opacity, e.g. `60%`
    #[must_use]
    pub fn opacity_label(&self) -> String {
        format!("{}%", (self.opacity * 100.0).round())
    }
}

/// On-screen bounding box of the rendered base photo element
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportGeometry {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ViewportGeometry {
    #[must_use]
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Normalize a client coordinate into `[0, 1]` on both axes
    ///
    /// Returns `None` for a degenerate (zero-sized or non-finite) box.
    #[must_use]
    pub fn normalize(&self, client_x: f64, client_y: f64) -> Option<(f64, f64)> {
        let usable = |extent: f64| extent.is_finite() && extent > 0.0;
        if !usable(self.width) || !usable(self.height) {
            return None;
        }
        if ![client_x, client_y, self.left, self.top]
            .iter()
            .all(|v| v.is_finite())
        {
            return None;
        }

        let x = ((client_x - self.left) / self.width).clamp(0.0, 1.0);
        let y = ((client_y - self.top) / self.height).clamp(0.0, 1.0);
        Some((x, y))
    }
}

/// Anything that can report the current bounding box of the rendered photo
///
/// Queried on every pointer event; implementors must not cache across events.
pub trait ViewportSource {
    fn bounding_rect(&self) -> ViewportGeometry;
}

impl ViewportSource for ViewportGeometry {
    fn bounding_rect(&self) -> ViewportGeometry {
        *self
    }
}

/// Decoded body photo shown beneath the overlay
#[derive(Debug, Clone)]
pub struct BasePhoto {
    label: String,
    image: Arc<RgbaImage>,
}

impl BasePhoto {
    #[must_use]
    pub fn new<S: Into<String>>(label: S, image: RgbaImage) -> Self {
        Self {
            label: label.into(),
            image: Arc::new(image),
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn image(&self) -> &Arc<RgbaImage> {
        &self.image
    }

    #[must_use]
    pub fn reference(&self) -> ImageReference {
        ImageReference::Local {
            label: self.label.clone(),
            byte_len: self.image.as_raw().len(),
        }
    }
}
