#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # Virtual Try-On Compositor
//!
//! Places a generated tattoo design onto a body photo.
//!
//! - **Background keying**: near-white pixels of the design become fully
//!   transparent, giving a hard-edged cutout without a segmentation model.
//! - **Overlay placement**: scale, rotation, opacity and a pointer-driven anchor,
//!   with every value clamped to its valid band.
//! - **Rendering**: the cutout is multiply-blended over the photo so the ink
//!   picks up the skin tone underneath.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tryon_compositor::{Compositor, CompositorConfig, ImageIOService, SourceImage};
//!
//! # async fn example() -> tryon_compositor::Result<()> {
//! let mut compositor = Compositor::new(CompositorConfig::default())?;
//! compositor.select_base_photo(ImageIOService::load_base_photo("forearm.jpg").await?);
//!
//! compositor
//!     .select_and_key(SourceImage::from_url("https://cdn.example.com/koi.png"))
//!     .await;
//! compositor.set_scale(1.5);
//! compositor.set_rotation(45.0);
//! compositor.set_opacity(0.6);
//!
//! if let Some(scene) = compositor.render().scene() {
//!     ImageIOService::save_png(&scene.rasterize(), "preview.png")?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Replacing a pending selection
//!
//! Keying is asynchronous. Selecting a new overlay while an earlier one is still
//! being keyed supersedes it; the stale result is dropped when it arrives.
//!
//! ```rust,no_run
//! use tryon_compositor::{Compositor, CompositorConfig, SourceImage};
//!
//! # async fn example() -> tryon_compositor::Result<()> {
//! let mut compositor = Compositor::new(CompositorConfig::default())?;
//! let first = compositor.select_overlay(SourceImage::from_url("https://cdn.example.com/a.png"));
//! let second = compositor.select_overlay(SourceImage::from_url("https://cdn.example.com/b.png"));
//!
//! let keyer = compositor.keyer().clone();
//! let (first, second) = tokio::join!(first.resolve(&keyer), second.resolve(&keyer));
//! assert!(compositor.apply_keyed(second));
//! assert!(!compositor.apply_keyed(first));
//! # Ok(())
//! # }
//! ```

pub mod blend;
#[cfg(feature = "cli")]
pub mod cli;
pub mod compositor;
pub mod config;
pub mod controller;
pub mod error;
pub mod keying;
pub mod preview;
pub mod render;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;

pub use compositor::Compositor;
pub use config::{
    BlendMode, CompositorConfig, CompositorConfigBuilder, KeyingConfig, PlacementLimits,
    ViewportConfig,
};
pub use controller::{
    ControllerState, KeyedSelection, MouseMove, OverlayController, PendingKey, SelectionToken,
    TouchMove, TouchPoint,
};
pub use error::{Result, TryOnError};
pub use keying::{is_background, key_pixels, BackgroundKeyer};
pub use preview::{JsonFileStore, PreviewRecord, PreviewStore};
pub use render::{OverlayLayer, RenderOutput, Scene, PLACEHOLDER_PROMPT};
pub use services::{HttpFetcher, ImageIOService, SourceFetcher, StaticFetcher};
pub use types::{
    BasePhoto, ImageReference, KeyedImage, KeyingOutcome, PlacementState, SourceImage,
    ViewportGeometry, ViewportSource,
};

#[cfg(feature = "cli")]
pub use tracing_config::{
    cli_tracing_config, init_cli_tracing, spans, TracingConfig, TracingFormat,
};
