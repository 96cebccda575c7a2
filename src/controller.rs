//! Overlay Transform Controller
//!
//! Owns the placement of the active overlay and turns slider and pointer input
//! into state updates. Keying is asynchronous and cancel-by-replacement: every
//! selection issues a fresh [`SelectionToken`], and a keyed result is only
//! installed while its token is still current.

use crate::{
    config::PlacementLimits,
    keying::BackgroundKeyer,
    types::{KeyedImage, PlacementState, SourceImage, ViewportGeometry, ViewportSource},
};
use tracing::{debug, trace};

/// Identity of one overlay selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SelectionToken(u64);

impl SelectionToken {
    #[must_use]
    pub fn generation(self) -> u64 {
        self.0
    }
}

/// Observable controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    NoOverlaySelected,
    OverlaySelected,
    Dragging,
}

/// Keying work issued by a selection, not yet resolved
#[derive(Debug, Clone)]
#[must_use = "a pending key does nothing until resolved and applied"]
pub struct PendingKey {
    token: SelectionToken,
    source: SourceImage,
}

impl PendingKey {
    #[must_use]
    pub fn token(&self) -> SelectionToken {
        self.token
    }

    #[must_use]
    pub fn source(&self) -> &SourceImage {
        &self.source
    }

    /// Run the keyer for this selection
    pub async fn resolve(self, keyer: &BackgroundKeyer) -> KeyedSelection {
        let keyed = keyer.key_background(&self.source).await;
        KeyedSelection {
            token: self.token,
            keyed,
        }
    }
}

/// Keying result tagged with the selection it belongs to
#[derive(Debug, Clone)]
pub struct KeyedSelection {
    token: SelectionToken,
    keyed: KeyedImage,
}

impl KeyedSelection {
    #[must_use]
    pub fn new(token: SelectionToken, keyed: KeyedImage) -> Self {
        Self { token, keyed }
    }

    #[must_use]
    pub fn token(&self) -> SelectionToken {
        self.token
    }

    #[must_use]
    pub fn keyed(&self) -> &KeyedImage {
        &self.keyed
    }
}

/// Mouse move in client coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseMove {
    pub client_x: f64,
    pub client_y: f64,
}

/// One active touch contact
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub client_x: f64,
    pub client_y: f64,
}

/// Touch move carrying every active contact
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TouchMove {
    pub touches: Vec<TouchPoint>,
}

impl MouseMove {
    #[must_use]
    pub fn coordinates(&self) -> (f64, f64) {
        (self.client_x, self.client_y)
    }
}

impl TouchMove {
    /// The first contact drives the drag; `None` once every finger lifted
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.touches.first().map(|t| (t.client_x, t.client_y))
    }
}

#[derive(Debug, Clone)]
struct ActiveOverlay {
    token: SelectionToken,
    source: SourceImage,
    keyed: Option<KeyedImage>,
    placement: PlacementState,
    dragging: bool,
}

/// Placement state machine for a single compositor instance
#[derive(Debug, Clone)]
pub struct OverlayController {
    limits: PlacementLimits,
    generation: u64,
    active: Option<ActiveOverlay>,
}

impl OverlayController {
    #[must_use]
    pub fn new(limits: PlacementLimits) -> Self {
        Self {
            limits,
            generation: 0,
            active: None,
        }
    }

    #[must_use]
    pub fn limits(&self) -> &PlacementLimits {
        &self.limits
    }

    #[must_use]
    pub fn state(&self) -> ControllerState {
        match &self.active {
            None => ControllerState::NoOverlaySelected,
            Some(active) if active.dragging => ControllerState::Dragging,
            Some(_) => ControllerState::OverlaySelected,
        }
    }

    /// Current placement, if an overlay is selected
    #[must_use]
    pub fn placement(&self) -> Option<&PlacementState> {
        self.active.as_ref().map(|a| &a.placement)
    }

    /// Source of the selected overlay
    #[must_use]
    pub fn selected_source(&self) -> Option<&SourceImage> {
        self.active.as_ref().map(|a| &a.source)
    }

    /// Keyed image of the selected overlay, once keying resolved
    #[must_use]
    pub fn keyed_image(&self) -> Option<&KeyedImage> {
        self.active.as_ref().and_then(|a| a.keyed.as_ref())
    }

    /// Token of the current selection
    #[must_use]
    pub fn current_token(&self) -> Option<SelectionToken> {
        self.active.as_ref().map(|a| a.token)
    }

    /// Whether selection keying is still outstanding
    #[must_use]
    pub fn is_keying(&self) -> bool {
        self.active.as_ref().is_some_and(|a| a.keyed.is_none())
    }

    /// Select a new overlay, resetting placement to its defaults
    ///
    /// Any earlier selection, including its pending keying, is superseded.
    pub fn select_overlay(&mut self, source: SourceImage) -> PendingKey {
        self.generation += 1;
        let token = SelectionToken(self.generation);

        debug!(
            generation = token.0,
            source = %source.label(),
            "Overlay selected"
        );

        self.active = Some(ActiveOverlay {
            token,
            source: source.clone(),
            keyed: None,
            placement: PlacementState::with_opacity(self.limits.default_opacity),
            dragging: false,
        });

        PendingKey { token, source }
    }

    /// Install a keying result if it belongs to the current selection
    ///
    /// Returns `false` and drops the result when it is stale.
    pub fn apply_keyed(&mut self, selection: KeyedSelection) -> bool {
        let current = self.current_token();
        match self.active.as_mut() {
            Some(active) if active.token == selection.token => {
                debug!(
                    generation = selection.token.0,
                    fallback = selection.keyed.is_fallback(),
                    "Keyed overlay applied"
                );
                active.keyed = Some(selection.keyed);
                true
            },
            _ => {
                debug!(
                    generation = selection.token.0,
                    current = ?current.map(SelectionToken::generation),
                    "Discarding stale keying result"
                );
                false
            },
        }
    }

    /// Drop the active overlay
    pub fn deselect(&mut self) {
        if self.active.take().is_some() {
            debug!("Overlay deselected");
        }
    }

    fn placement_mut(&mut self) -> Option<&mut PlacementState> {
        self.active.as_mut().map(|a| &mut a.placement)
    }

    /// Set scale, clamped to the configured band
    pub fn set_scale(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        let scale = self.limits.clamp_scale(value);
        if let Some(placement) = self.placement_mut() {
            placement.scale = scale;
        }
    }

    /// Set rotation in degrees, wrapped into `[0, 360)`
    pub fn set_rotation(&mut self, degrees: f64) {
        if !degrees.is_finite() {
            return;
        }
        let mut wrapped = degrees.rem_euclid(360.0);
        // rem_euclid yields -0.0 for negative multiples of 360 and can round
        // up to exactly 360 for tiny negative inputs
        if wrapped >= 360.0 || wrapped == 0.0 {
            wrapped = 0.0;
        }
        if let Some(placement) = self.placement_mut() {
            placement.rotation_degrees = wrapped;
        }
    }

    /// Set opacity, clamped to the configured band
    pub fn set_opacity(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        let opacity = self.limits.clamp_opacity(value);
        if let Some(placement) = self.placement_mut() {
            placement.opacity = opacity;
        }
    }

    /// Set the anchor directly (position sliders), each axis clamped to `[0, 1]`
    pub fn set_position(&mut self, x: f64, y: f64) {
        if !x.is_finite() || !y.is_finite() {
            return;
        }
        if let Some(placement) = self.placement_mut() {
            placement.position = (x.clamp(0.0, 1.0), y.clamp(0.0, 1.0));
        }
    }

    /// Start translating the overlay with pointer moves
    pub fn begin_drag(&mut self) {
        if let Some(active) = self.active.as_mut() {
            active.dragging = true;
            trace!("Drag started");
        }
    }

    pub fn end_drag(&mut self) {
        if let Some(active) = self.active.as_mut() {
            if active.dragging {
                active.dragging = false;
                trace!("Drag ended");
            }
        }
    }

    /// Move the anchor to the pointer, normalized against `viewport`
    ///
    /// A no-op unless a drag is in progress. Returns whether the position changed.
    pub fn update_position_from_pointer(
        &mut self,
        client_x: f64,
        client_y: f64,
        viewport: &ViewportGeometry,
    ) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        if !active.dragging {
            return false;
        }
        let Some(position) = viewport.normalize(client_x, client_y) else {
            return false;
        };

        let changed = active.placement.position != position;
        active.placement.position = position;
        changed
    }

    /// Mouse adapter over [`OverlayController::update_position_from_pointer`]
    pub fn on_mouse_move(&mut self, event: &MouseMove, surface: &dyn ViewportSource) -> bool {
        if !self.is_dragging() {
            return false;
        }
        let (x, y) = event.coordinates();
        self.update_position_from_pointer(x, y, &surface.bounding_rect())
    }

    /// Touch adapter over [`OverlayController::update_position_from_pointer`]
    pub fn on_touch_move(&mut self, event: &TouchMove, surface: &dyn ViewportSource) -> bool {
        if !self.is_dragging() {
            return false;
        }
        match event.coordinates() {
            Some((x, y)) => self.update_position_from_pointer(x, y, &surface.bounding_rect()),
            None => false,
        }
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.active.as_ref().is_some_and(|a| a.dragging)
    }
}

impl Default for OverlayController {
    fn default() -> Self {
        Self::new(PlacementLimits::default())
    }
}
