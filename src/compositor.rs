//! The try-on compositor component
//!
//! Ties a [`BackgroundKeyer`] and an [`OverlayController`] to an optional base
//! photo and renders the result. Each instance owns its own state.

use crate::{
    config::CompositorConfig,
    controller::{
        ControllerState, KeyedSelection, MouseMove, OverlayController, PendingKey, TouchMove,
    },
    error::Result,
    keying::BackgroundKeyer,
    preview::PreviewRecord,
    render::{self, RenderOutput},
    services::SourceFetcher,
    types::{BasePhoto, KeyedImage, PlacementState, SourceImage, ViewportGeometry, ViewportSource},
};
use std::sync::Arc;
use tracing::info;

/// Virtual try-on compositor
#[derive(Debug, Clone)]
pub struct Compositor {
    config: CompositorConfig,
    keyer: BackgroundKeyer,
    controller: OverlayController,
    base: Option<BasePhoto>,
}

impl Compositor {
    /// Create a compositor that fetches remote overlays over HTTP
    pub fn new(config: CompositorConfig) -> Result<Self> {
        config.validate()?;
        let keyer = BackgroundKeyer::new(config.keying)?;
        Ok(Self::from_parts(config, keyer))
    }

    /// Create a compositor with a custom remote source fetcher
    pub fn with_fetcher(config: CompositorConfig, fetcher: Arc<dyn SourceFetcher>) -> Result<Self> {
        config.validate()?;
        let keyer = BackgroundKeyer::with_fetcher(config.keying, fetcher);
        Ok(Self::from_parts(config, keyer))
    }

    fn from_parts(config: CompositorConfig, keyer: BackgroundKeyer) -> Self {
        Self {
            controller: OverlayController::new(config.limits),
            config,
            keyer,
            base: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    #[must_use]
    pub fn keyer(&self) -> &BackgroundKeyer {
        &self.keyer
    }

    #[must_use]
    pub fn controller(&self) -> &OverlayController {
        &self.controller
    }

    #[must_use]
    pub fn state(&self) -> ControllerState {
        self.controller.state()
    }

    #[must_use]
    pub fn placement(&self) -> Option<&PlacementState> {
        self.controller.placement()
    }

    #[must_use]
    pub fn keyed_image(&self) -> Option<&KeyedImage> {
        self.controller.keyed_image()
    }

    #[must_use]
    pub fn base_photo(&self) -> Option<&BasePhoto> {
        self.base.as_ref()
    }

    pub fn select_base_photo(&mut self, photo: BasePhoto) {
        info!(photo = %photo.label(), "Base photo selected");
        self.base = Some(photo);
    }

    pub fn clear_base_photo(&mut self) {
        self.base = None;
    }

    /// Select an overlay; resolve the returned key with [`Compositor::keyer`]
    pub fn select_overlay(&mut self, source: SourceImage) -> PendingKey {
        self.controller.select_overlay(source)
    }

    /// Install a resolved key; stale results are dropped and `false` returned
    pub fn apply_keyed(&mut self, selection: KeyedSelection) -> bool {
        self.controller.apply_keyed(selection)
    }

    /// Select, key and apply in one step
    pub async fn select_and_key(&mut self, source: SourceImage) -> bool {
        let pending = self.controller.select_overlay(source);
        let selection = pending.resolve(&self.keyer).await;
        self.controller.apply_keyed(selection)
    }

    pub fn deselect_overlay(&mut self) {
        self.controller.deselect();
    }

    pub fn set_scale(&mut self, value: f64) {
        self.controller.set_scale(value);
    }

    pub fn set_rotation(&mut self, degrees: f64) {
        self.controller.set_rotation(degrees);
    }

    pub fn set_opacity(&mut self, value: f64) {
        self.controller.set_opacity(value);
    }

    pub fn set_position(&mut self, x: f64, y: f64) {
        self.controller.set_position(x, y);
    }

    pub fn begin_drag(&mut self) {
        self.controller.begin_drag();
    }

    pub fn end_drag(&mut self) {
        self.controller.end_drag();
    }

    pub fn update_position_from_pointer(
        &mut self,
        client_x: f64,
        client_y: f64,
        viewport: &ViewportGeometry,
    ) -> bool {
        self.controller
            .update_position_from_pointer(client_x, client_y, viewport)
    }

    pub fn on_mouse_move(&mut self, event: &MouseMove, surface: &dyn ViewportSource) -> bool {
        self.controller.on_mouse_move(event, surface)
    }

    pub fn on_touch_move(&mut self, event: &TouchMove, surface: &dyn ViewportSource) -> bool {
        self.controller.on_touch_move(event, surface)
    }

    /// Render the current state
    #[must_use]
    pub fn render(&self) -> RenderOutput {
        render::compose(
            &self.config.viewport,
            self.config.blend_mode,
            self.base.as_ref(),
            self.controller.placement(),
            self.controller.keyed_image(),
        )
    }

    /// Snapshot for a persistence collaborator; needs both a base photo and an overlay
    #[must_use]
    pub fn preview_record(&self) -> Option<PreviewRecord> {
        let base = self.base.as_ref()?;
        let source = self.controller.selected_source()?;
        let placement = self.controller.placement()?;
        Some(PreviewRecord::new(
            base.reference(),
            source.reference(),
            *placement,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::StaticFetcher;
    use image::{Rgba, RgbaImage};

    fn compositor() -> Compositor {
        Compositor::with_fetcher(CompositorConfig::default(), Arc::new(StaticFetcher::new()))
            .unwrap()
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = CompositorConfig::default();
        config.viewport.width = 0;
        assert!(Compositor::with_fetcher(config, Arc::new(StaticFetcher::new())).is_err());
    }

    #[test]
    fn test_preview_record_requires_both_images() {
        let mut compositor = compositor();
        assert!(compositor.preview_record().is_none());

        let _ = compositor.select_overlay(SourceImage::from_url("https://cdn.test/a.png"));
        assert!(compositor.preview_record().is_none());

        compositor.select_base_photo(BasePhoto::new(
            "arm.png",
            RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255])),
        ));
        let record = compositor.preview_record().unwrap();
        assert_eq!(record.placement, *compositor.placement().unwrap());
    }

    #[test]
    fn test_render_without_base_is_placeholder() {
        let mut compositor = compositor();
        let _ = compositor.select_overlay(SourceImage::from_url("https://cdn.test/a.png"));
        assert!(compositor.render().is_placeholder());
    }
}
