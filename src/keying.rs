//! Background keying
//!
//! Approximates a cutout of a generated design by making near-white pixels
//! fully transparent. Classification is binary per pixel: a pixel is either
//! left byte-identical or has its alpha set to zero. There is no feathering,
//! colour correction or halo suppression.
//!
//! Keying never fails from the caller's point of view. If the source cannot be
//! fetched, decoded, or read back, the result is a fallback [`KeyedImage`]
//! wrapping the original source.

use crate::{
    config::KeyingConfig,
    error::Result,
    services::{HttpFetcher, ImageIOService, SourceFetcher},
    types::{KeyedImage, SourceImage},
};
use image::{Rgba, RgbaImage};
use instant::Instant;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Whether a pixel counts as background for the given threshold
///
/// All three colour channels must be strictly above `threshold`; alpha plays
/// no part in the decision.
#[must_use]
pub fn is_background(pixel: &Rgba<u8>, threshold: u8) -> bool {
    let [r, g, b, _] = pixel.0;
    r > threshold && g > threshold && b > threshold
}

/// Key an RGBA buffer in place, returning how many pixels were made transparent
///
/// Already-transparent background pixels are counted again, which keeps the
/// operation idempotent: keying twice yields the same buffer.
pub fn key_pixels(image: &mut RgbaImage, threshold: u8) -> usize {
    let mut keyed = 0;
    for pixel in image.pixels_mut() {
        if is_background(pixel, threshold) {
            pixel.0[3] = 0;
            keyed += 1;
        }
    }
    keyed
}

enum KeyStep {
    Keyed {
        image: RgbaImage,
        png: Vec<u8>,
        keyed_pixels: usize,
    },
    Fallback {
        image: Option<RgbaImage>,
        reason: String,
    },
}

fn key_encoded(bytes: &[u8], config: KeyingConfig) -> KeyStep {
    let decoded = match ImageIOService::load_from_bytes(bytes) {
        Ok(decoded) => decoded,
        Err(e) => {
            return KeyStep::Fallback {
                image: None,
                reason: e.to_string(),
            }
        },
    };

    let mut image = decoded.to_rgba8();
    let (width, height) = image.dimensions();
    let pixel_count = u64::from(width) * u64::from(height);
    if pixel_count > config.max_pixels {
        return KeyStep::Fallback {
            image: Some(image),
            reason: format!(
                "pixel buffer of {}x{} exceeds read-back limit of {} pixels",
                width, height, config.max_pixels
            ),
        };
    }

    let keyed_pixels = key_pixels(&mut image, config.threshold);
    match ImageIOService::encode_png(&image) {
        Ok(png) => KeyStep::Keyed {
            image,
            png,
            keyed_pixels,
        },
        Err(e) => KeyStep::Fallback {
            image: Some(decoded.to_rgba8()),
            reason: e.to_string(),
        },
    }
}

/// Background Keying Unit
///
/// Cheap to clone; clones share the fetcher.
#[derive(Clone)]
pub struct BackgroundKeyer {
    config: KeyingConfig,
    fetcher: Arc<dyn SourceFetcher>,
}

impl std::fmt::Debug for BackgroundKeyer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundKeyer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BackgroundKeyer {
    /// Create a keyer that fetches remote sources over HTTP
    pub fn new(config: KeyingConfig) -> Result<Self> {
        Ok(Self::with_fetcher(config, Arc::new(HttpFetcher::new()?)))
    }

    /// Create a keyer with a custom source fetcher
    pub fn with_fetcher(config: KeyingConfig, fetcher: Arc<dyn SourceFetcher>) -> Self {
        Self { config, fetcher }
    }

    #[must_use]
    pub fn config(&self) -> &KeyingConfig {
        &self.config
    }

    /// Decode and key encoded bytes synchronously
    ///
    /// Unlike [`BackgroundKeyer::key_background`] this reports decode errors.
    pub fn key_bytes(&self, bytes: &[u8]) -> Result<RgbaImage> {
        let mut image = ImageIOService::load_from_bytes(bytes)?.to_rgba8();
        key_pixels(&mut image, self.config.threshold);
        Ok(image)
    }

    /// Produce a keyed cutout for `source`, falling back to the original on failure
    ///
    /// Decoding and the per-pixel pass run on the blocking pool so the caller's
    /// event loop stays responsive.
    #[instrument(skip(self, source), fields(source = %source.label()))]
    pub async fn key_background(&self, source: &SourceImage) -> KeyedImage {
        let start = Instant::now();

        let bytes: Arc<[u8]> = match source {
            SourceImage::Bytes { data, .. } => Arc::clone(data),
            SourceImage::Url(url) => match self.fetcher.fetch(url).await {
                Ok(bytes) => bytes.into(),
                Err(e) => {
                    warn!(error = %e, "Overlay source unavailable, using original");
                    return KeyedImage::fallback(source.clone(), None, e.to_string());
                },
            },
        };

        let config = self.config;
        let step = tokio::task::spawn_blocking(move || key_encoded(&bytes, config)).await;

        let keyed = match step {
            Ok(KeyStep::Keyed {
                image,
                png,
                keyed_pixels,
            }) => {
                debug!(
                    width = image.width(),
                    height = image.height(),
                    keyed_pixels,
                    "Background keyed"
                );
                KeyedImage::keyed(source.clone(), image, png, keyed_pixels)
            },
            Ok(KeyStep::Fallback { image, reason }) => {
                warn!(reason = %reason, "Keying failed, using original");
                KeyedImage::fallback(source.clone(), image, reason)
            },
            Err(e) => {
                warn!(error = %e, "Keying task did not complete, using original");
                KeyedImage::fallback(source.clone(), None, e.to_string())
            },
        };

        debug!(
            duration_ms = start.elapsed().as_millis() as u64,
            "Keying finished"
        );
        keyed
    }
}
