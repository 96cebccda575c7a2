//! Configuration types for keying and compositing

use crate::error::{Result, TryOnError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Blend mode used to draw the overlay layer onto the base photo
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendMode {
    /// Channel-wise product with the base photo (ink-on-skin look)
    #[default]
    Multiply,
    /// Plain source-over compositing
    Normal,
}

impl std::fmt::Display for BlendMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Multiply => write!(f, "multiply"),
            Self::Normal => write!(f, "normal"),
        }
    }
}

/// Background keying parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyingConfig {
    /// A pixel is background when R, G and B are all strictly above this value
    pub threshold: u8,

    /// Largest pixel buffer that is read back for keying; larger images fall back
    pub max_pixels: u64,
}

impl Default for KeyingConfig {
    fn default() -> Self {
        Self {
            threshold: 240,
            max_pixels: 40_000_000,
        }
    }
}

/// Valid bands for the placement sliders
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementLimits {
    pub min_scale: f64,
    pub max_scale: f64,
    pub min_opacity: f64,
    pub max_opacity: f64,
    /// Opacity applied when a new overlay is selected
    pub default_opacity: f64,
}

impl Default for PlacementLimits {
    fn default() -> Self {
        Self {
            min_scale: 0.1,
            max_scale: 3.0,
            min_opacity: 0.1,
            max_opacity: 1.0,
            default_opacity: 0.9,
        }
    }
}

impl PlacementLimits {
    /// Clamp a scale value into the configured band
    #[must_use]
    pub fn clamp_scale(&self, value: f64) -> f64 {
        value.max(self.min_scale).min(self.max_scale)
    }

    /// Clamp an opacity value into the configured band
    #[must_use]
    pub fn clamp_opacity(&self, value: f64) -> f64 {
        value.max(self.min_opacity).min(self.max_opacity)
    }
}

/// Rendering surface dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub width: u32,
    pub height: u32,
    /// Side of the square box the overlay is fitted into before transforming
    pub overlay_box: u32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 500,
            overlay_box: 192,
        }
    }
}

/// Configuration for a compositor instance
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositorConfig {
    pub keying: KeyingConfig,
    pub limits: PlacementLimits,
    pub viewport: ViewportConfig,
    pub blend_mode: BlendMode,
}

impl CompositorConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    /// ```rust
    /// use tryon_compositor::{BlendMode, CompositorConfig};
    ///
    /// let config = CompositorConfig::builder()
    ///     .threshold(235)
    ///     .viewport(1024, 768)
    ///     .blend_mode(BlendMode::Multiply)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.keying.threshold, 235);
    /// ```
    #[must_use]
    pub fn builder() -> CompositorConfigBuilder {
        CompositorConfigBuilder::new()
    }

    /// Load a configuration from a JSON file; missing fields take their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let content = std::fs::read_to_string(path_ref)
            .map_err(|e| TryOnError::file_io_error("read config file", path_ref, &e))?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let limits = &self.limits;

        if !(limits.min_scale.is_finite() && limits.min_scale > 0.0) {
            return Err(TryOnError::config_value_error(
                "min_scale",
                limits.min_scale,
                "> 0",
                Some(0.1),
            ));
        }
        if !(limits.max_scale.is_finite() && limits.max_scale >= limits.min_scale) {
            return Err(TryOnError::config_value_error(
                "max_scale",
                limits.max_scale,
                &format!(">= min_scale ({})", limits.min_scale),
                Some(3.0),
            ));
        }
        if !(limits.min_opacity > 0.0 && limits.min_opacity <= 1.0) {
            return Err(TryOnError::config_value_error(
                "min_opacity",
                limits.min_opacity,
                "(0, 1]",
                Some(0.1),
            ));
        }
        if !(limits.max_opacity >= limits.min_opacity && limits.max_opacity <= 1.0) {
            return Err(TryOnError::config_value_error(
                "max_opacity",
                limits.max_opacity,
                &format!("[min_opacity ({}), 1]", limits.min_opacity),
                Some(1.0),
            ));
        }
        if !(limits.default_opacity >= limits.min_opacity
            && limits.default_opacity <= limits.max_opacity)
        {
            return Err(TryOnError::config_value_error(
                "default_opacity",
                limits.default_opacity,
                &format!("[{}, {}]", limits.min_opacity, limits.max_opacity),
                Some(0.9),
            ));
        }

        let viewport = &self.viewport;
        if viewport.width == 0 || viewport.height == 0 {
            return Err(TryOnError::invalid_config(format!(
                "Viewport must not be empty: {}x{}",
                viewport.width, viewport.height
            )));
        }
        if viewport.overlay_box == 0 {
            return Err(TryOnError::config_value_error(
                "overlay_box",
                viewport.overlay_box,
                ">= 1",
                Some(192),
            ));
        }
        if self.keying.max_pixels == 0 {
            return Err(TryOnError::config_value_error(
                "max_pixels",
                self.keying.max_pixels,
                ">= 1",
                Some(KeyingConfig::default().max_pixels),
            ));
        }

        Ok(())
    }
}

/// Builder for `CompositorConfig`
pub struct CompositorConfigBuilder {
    config: CompositorConfig,
}

impl CompositorConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: CompositorConfig::default(),
        }
    }

    #[must_use]
    pub fn threshold(mut self, threshold: u8) -> Self {
        self.config.keying.threshold = threshold;
        self
    }

    #[must_use]
    pub fn max_pixels(mut self, max_pixels: u64) -> Self {
        self.config.keying.max_pixels = max_pixels;
        self
    }

    #[must_use]
    pub fn scale_band(mut self, min: f64, max: f64) -> Self {
        self.config.limits.min_scale = min;
        self.config.limits.max_scale = max;
        self
    }

    #[must_use]
    pub fn opacity_band(mut self, min: f64, max: f64) -> Self {
        self.config.limits.min_opacity = min;
        self.config.limits.max_opacity = max;
        self
    }

    #[must_use]
    pub fn default_opacity(mut self, opacity: f64) -> Self {
        self.config.limits.default_opacity = opacity;
        self
    }

    #[must_use]
    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.config.viewport.width = width;
        self.config.viewport.height = height;
        self
    }

    #[must_use]
    pub fn overlay_box(mut self, side: u32) -> Self {
        self.config.viewport.overlay_box = side;
        self
    }

    #[must_use]
    pub fn blend_mode(mut self, mode: BlendMode) -> Self {
        self.config.blend_mode = mode;
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> Result<CompositorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for CompositorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
