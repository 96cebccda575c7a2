//! Scene description and CPU rasterization of the try-on view
//!
//! The base photo is fitted inside the viewport (object-contain, letterboxed
//! in black). The overlay is fitted into a square box, centred on its anchor,
//! then scaled, rotated and blended with its opacity.

use crate::{
    blend,
    config::{BlendMode, ViewportConfig},
    types::{BasePhoto, KeyedImage, PlacementState},
};
use image::{imageops, Rgba, RgbaImage};
use kurbo::{Affine, Point, Rect, Vec2};
use std::sync::Arc;

/// Prompt shown while no base photo is selected
pub const PLACEHOLDER_PROMPT: &str = "Upload a body photo to start";

/// Axis-aligned rectangle in viewport pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Largest centred rectangle with the source aspect ratio that fits the box
#[must_use]
pub fn contain(src_width: u32, src_height: u32, box_width: f64, box_height: f64) -> FitRect {
    if src_width == 0 || src_height == 0 {
        return FitRect {
            x: box_width / 2.0,
            y: box_height / 2.0,
            width: 0.0,
            height: 0.0,
        };
    }
    let factor = (box_width / f64::from(src_width)).min(box_height / f64::from(src_height));
    let width = f64::from(src_width) * factor;
    let height = f64::from(src_height) * factor;
    FitRect {
        x: (box_width - width) / 2.0,
        y: (box_height - height) / 2.0,
        width,
        height,
    }
}

/// Untransformed base photo layer
#[derive(Debug, Clone)]
pub struct BaseLayer {
    pub image: Arc<RgbaImage>,
    pub rect: FitRect,
}

/// Transformed overlay layer
#[derive(Debug, Clone)]
pub struct OverlayLayer {
    pub image: Arc<RgbaImage>,
    /// Anchor offset from the viewport's left edge, in percent
    pub left_percent: f64,
    /// Anchor offset from the viewport's top edge, in percent
    pub top_percent: f64,
    /// Side of the square box the image is fitted into, in pixels
    pub box_size: u32,
    pub scale: f64,
    pub rotation_degrees: f64,
    pub opacity: f64,
    pub blend_mode: BlendMode,
}

impl OverlayLayer {
    /// CSS-equivalent transform; the leading translate centres the box on its anchor
    #[must_use]
    pub fn transform_css(&self) -> String {
        format!(
            "translate(-50%, -50%) rotate({}deg) scale({})",
            self.rotation_degrees, self.scale
        )
    }

    /// Map from overlay image pixels to viewport pixels
    ///
    /// The image is fitted into the overlay box, scaled, rotated about its
    /// centre and centred on the anchor. `None` when the image has no area.
    #[must_use]
    pub fn image_to_viewport(&self, viewport_width: u32, viewport_height: u32) -> Option<Affine> {
        let (ow, oh) = self.image.dimensions();
        if ow == 0 || oh == 0 {
            return None;
        }

        let fit = contain(ow, oh, f64::from(self.box_size), f64::from(self.box_size));
        let k = fit.width / f64::from(ow) * self.scale;
        if !(k.is_finite() && k > 0.0) {
            return None;
        }

        let anchor = Vec2::new(
            self.left_percent / 100.0 * f64::from(viewport_width),
            self.top_percent / 100.0 * f64::from(viewport_height),
        );
        let center = Vec2::new(f64::from(ow) / 2.0, f64::from(oh) / 2.0);
        Some(
            Affine::translate(anchor)
                * Affine::rotate(self.rotation_degrees.to_radians())
                * Affine::scale(k)
                * Affine::translate(-center),
        )
    }

    fn draw(&self, canvas: &mut RgbaImage) {
        let (vw, vh) = canvas.dimensions();
        let Some(transform) = self.image_to_viewport(vw, vh) else {
            return;
        };
        let (ow, oh) = self.image.dimensions();
        let inverse = transform.inverse();

        let bounds = transform.transform_rect_bbox(Rect::new(0.0, 0.0, f64::from(ow), f64::from(oh)));
        let x0 = bounds.x0.floor().max(0.0) as u32;
        let y0 = bounds.y0.floor().max(0.0) as u32;
        let x1 = (bounds.x1.ceil().max(0.0) as u32).min(vw);
        let y1 = (bounds.y1.ceil().max(0.0) as u32).min(vh);

        let opacity = self.opacity as f32;
        for y in y0..y1 {
            for x in x0..x1 {
                let uv = inverse * Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
                if uv.x < 0.0 || uv.y < 0.0 || uv.x >= f64::from(ow) || uv.y >= f64::from(oh) {
                    continue;
                }

                let src = self.image.get_pixel(uv.x as u32, uv.y as u32).0;
                let dst = canvas.get_pixel(x, y).0;
                canvas.put_pixel(x, y, Rgba(blend::blend(self.blend_mode, dst, src, opacity)));
            }
        }
    }
}

/// Composited view ready to be displayed or rasterized
#[derive(Debug, Clone)]
pub struct Scene {
    pub width: u32,
    pub height: u32,
    pub base: BaseLayer,
    pub overlay: Option<OverlayLayer>,
}

impl Scene {
    /// Rasterize the scene into an opaque RGBA image
    #[must_use]
    pub fn rasterize(&self) -> RgbaImage {
        let _span = tracing::debug_span!("rasterize", width = self.width, height = self.height)
            .entered();

        let mut canvas = RgbaImage::from_pixel(self.width, self.height, Rgba([0, 0, 0, 255]));
        self.draw_base(&mut canvas);
        if let Some(overlay) = &self.overlay {
            overlay.draw(&mut canvas);
        }
        canvas
    }

    fn draw_base(&self, canvas: &mut RgbaImage) {
        let rect = self.base.rect;
        let target_w = rect.width.round() as u32;
        let target_h = rect.height.round() as u32;
        if target_w == 0 || target_h == 0 {
            return;
        }

        let x = rect.x.round() as i64;
        let y = rect.y.round() as i64;
        if self.base.image.dimensions() == (target_w, target_h) {
            imageops::overlay(canvas, self.base.image.as_ref(), x, y);
        } else {
            let resized = imageops::resize(
                self.base.image.as_ref(),
                target_w,
                target_h,
                imageops::FilterType::Triangle,
            );
            imageops::overlay(canvas, &resized, x, y);
        }
    }
}

/// Result of rendering the compositor
#[derive(Debug, Clone)]
pub enum RenderOutput {
    /// No base photo selected yet
    Placeholder { message: &'static str },
    Composite(Scene),
}

impl RenderOutput {
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder { .. })
    }

    #[must_use]
    pub fn scene(&self) -> Option<&Scene> {
        match self {
            Self::Composite(scene) => Some(scene),
            Self::Placeholder { .. } => None,
        }
    }
}

/// Assemble the scene for the current state
///
/// The overlay layer is omitted while keying is pending or when the keyed
/// image carries no drawable pixels.
#[must_use]
pub fn compose(
    viewport: &ViewportConfig,
    blend_mode: BlendMode,
    base: Option<&BasePhoto>,
    placement: Option<&PlacementState>,
    keyed: Option<&KeyedImage>,
) -> RenderOutput {
    let Some(base) = base else {
        return RenderOutput::Placeholder {
            message: PLACEHOLDER_PROMPT,
        };
    };

    let (bw, bh) = base.image().dimensions();
    let base_layer = BaseLayer {
        image: Arc::clone(base.image()),
        rect: contain(
            bw,
            bh,
            f64::from(viewport.width),
            f64::from(viewport.height),
        ),
    };

    let overlay = match (placement, keyed.and_then(KeyedImage::image)) {
        (Some(placement), Some(image)) => Some(OverlayLayer {
            image: Arc::clone(image),
            left_percent: placement.position.0 * 100.0,
            top_percent: placement.position.1 * 100.0,
            box_size: viewport.overlay_box,
            scale: placement.scale,
            rotation_degrees: placement.rotation_degrees,
            opacity: placement.opacity,
            blend_mode,
        }),
        _ => None,
    };

    RenderOutput::Composite(Scene {
        width: viewport.width,
        height: viewport.height,
        base: base_layer,
        overlay,
    })
}
