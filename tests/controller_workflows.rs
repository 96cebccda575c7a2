//! End-to-end workflows through the compositor: selection, keying races,
//! placement, pointer drags and rendering.

mod common;

use common::{base_photo, design, offline_compositor, png, source, SKIN, INK, WHITE};
use std::sync::Arc;
use tryon_compositor::{
    blend, BlendMode, Compositor, CompositorConfig, ControllerState, MouseMove, RenderOutput,
    SourceImage, StaticFetcher, TouchMove, TouchPoint, ViewportGeometry, PLACEHOLDER_PROMPT,
};

fn pixel(output: &RenderOutput, x: u32, y: u32) -> [u8; 4] {
    let scene = output.scene().expect("composite scene");
    scene.rasterize().get_pixel(x, y).0
}

#[tokio::test]
async fn test_scaled_rotated_overlay_is_multiplied_onto_photo() {
    let mut compositor = offline_compositor(vec![]);
    compositor.select_base_photo(base_photo(800, 500));
    assert!(compositor.select_and_key(source("koi.png", &design(192, 192))).await);

    compositor.set_scale(1.5);
    compositor.set_rotation(45.0);
    compositor.set_opacity(0.6);

    let placement = *compositor.placement().unwrap();
    assert_eq!(placement.scale_label(), "1.5x");
    assert_eq!(placement.rotation_label(), "45°");
    assert_eq!(placement.opacity_label(), "60%");
    assert_eq!(placement.position, (0.5, 0.5));

    let output = compositor.render();
    let layer = output.scene().unwrap().overlay.as_ref().expect("overlay layer");
    assert_eq!(layer.transform_css(), "translate(-50%, -50%) rotate(45deg) scale(1.5)");
    assert_eq!((layer.left_percent, layer.top_percent), (50.0, 50.0));

    let raster = output.scene().unwrap().rasterize();
    let multiplied = blend::multiply(SKIN, INK, 0.6);
    // anchor and a point inside the rotated ink square
    assert_eq!(raster.get_pixel(400, 250).0, multiplied);
    assert_eq!(raster.get_pixel(460, 250).0, multiplied);
    // keyed paper inside the overlay box leaves the skin untouched
    assert_eq!(raster.get_pixel(520, 250).0, SKIN);
    // far outside the overlay
    assert_eq!(raster.get_pixel(5, 5).0, SKIN);
}

#[tokio::test]
async fn test_full_negative_turn_renders_upright() {
    let mut compositor = offline_compositor(vec![]);
    compositor.select_base_photo(base_photo(800, 500));
    compositor.select_and_key(source("koi.png", &design(192, 192))).await;
    compositor.set_rotation(-360.0);

    assert_eq!(compositor.placement().unwrap().rotation_label(), "0°");
    let output = compositor.render();
    let layer = output.scene().unwrap().overlay.as_ref().unwrap();
    assert_eq!(layer.transform_css(), "translate(-50%, -50%) rotate(0deg) scale(1)");
}

#[tokio::test]
async fn test_render_without_base_photo_is_placeholder() {
    let mut compositor = offline_compositor(vec![]);
    compositor.select_and_key(source("koi.png", &design(32, 32))).await;

    match compositor.render() {
        RenderOutput::Placeholder { message } => assert_eq!(message, PLACEHOLDER_PROMPT),
        RenderOutput::Composite(_) => panic!("expected placeholder"),
    }
    assert!(compositor.preview_record().is_none());
}

#[tokio::test]
async fn test_base_photo_is_letterboxed() {
    let mut compositor = offline_compositor(vec![]);
    // square photo in a wide viewport leaves black bars left and right
    compositor.select_base_photo(base_photo(500, 500));

    let output = compositor.render();
    assert_eq!(pixel(&output, 10, 250), [0, 0, 0, 255]);
    assert_eq!(pixel(&output, 400, 250), SKIN);
    assert_eq!(pixel(&output, 790, 250), [0, 0, 0, 255]);
}

#[tokio::test]
async fn test_later_selection_wins_when_it_resolves_first() {
    let mut compositor = offline_compositor(vec![]);
    let first = compositor.select_overlay(source("first.png", &design(16, 16)));
    let second = compositor.select_overlay(source("second.png", &design(24, 24)));
    assert_eq!(compositor.state(), ControllerState::OverlaySelected);
    assert!(compositor.controller().is_keying());

    let keyer = compositor.keyer().clone();
    let second = second.resolve(&keyer).await;
    let first = first.resolve(&keyer).await;

    assert!(compositor.apply_keyed(second));
    assert!(!compositor.apply_keyed(first));

    let keyed = compositor.keyed_image().unwrap();
    assert_eq!(keyed.source().label(), "second.png");
    assert_eq!(keyed.dimensions(), Some((24, 24)));
}

#[tokio::test]
async fn test_stale_result_arriving_first_is_discarded() {
    let mut compositor = offline_compositor(vec![]);
    let first = compositor.select_overlay(source("first.png", &design(16, 16)));
    let second = compositor.select_overlay(source("second.png", &design(24, 24)));

    let keyer = compositor.keyer().clone();
    let (first, second) = tokio::join!(first.resolve(&keyer), second.resolve(&keyer));

    assert!(!compositor.apply_keyed(first));
    // still waiting on the current selection
    assert!(compositor.keyed_image().is_none());
    assert!(compositor.controller().is_keying());

    assert!(compositor.apply_keyed(second));
    assert_eq!(compositor.keyed_image().unwrap().source().label(), "second.png");
    assert!(!compositor.controller().is_keying());
}

#[tokio::test]
async fn test_result_after_deselect_is_discarded() {
    let mut compositor = offline_compositor(vec![]);
    let pending = compositor.select_overlay(source("koi.png", &design(16, 16)));
    compositor.deselect_overlay();

    let resolved = pending.resolve(compositor.keyer()).await;
    assert!(!compositor.apply_keyed(resolved));
    assert_eq!(compositor.state(), ControllerState::NoOverlaySelected);
    assert!(compositor.placement().is_none());
}

#[tokio::test]
async fn test_new_selection_resets_placement() {
    let mut compositor = offline_compositor(vec![]);
    compositor.select_and_key(source("a.png", &design(16, 16))).await;
    compositor.set_scale(2.5);
    compositor.set_rotation(90.0);
    compositor.set_opacity(0.3);
    compositor.set_position(0.1, 0.9);

    compositor.select_and_key(source("b.png", &design(16, 16))).await;
    let placement = compositor.placement().unwrap();
    assert!((placement.scale - 1.0).abs() < f64::EPSILON);
    assert!(placement.rotation_degrees.abs() < f64::EPSILON);
    assert!((placement.opacity - 0.9).abs() < f64::EPSILON);
    assert_eq!(placement.position, (0.5, 0.5));
}

#[tokio::test]
async fn test_keyed_over_url_through_fetcher() {
    let url = "https://cdn.example.com/designs/koi.png";
    let mut compositor = offline_compositor(vec![(url, png(&design(32, 32)))]);

    assert!(compositor.select_and_key(SourceImage::from_url(url)).await);
    let keyed = compositor.keyed_image().unwrap();
    assert!(!keyed.is_fallback());
    assert_eq!(keyed.image().unwrap().get_pixel(0, 0).0, [255, 255, 255, 0]);
}

#[tokio::test]
async fn test_drag_follows_pointer_and_clamps() {
    let mut compositor = offline_compositor(vec![]);
    compositor.select_and_key(source("koi.png", &design(16, 16))).await;
    let surface = ViewportGeometry::new(100.0, 50.0, 800.0, 500.0);

    // moves before a drag do nothing
    let early = MouseMove {
        client_x: 300.0,
        client_y: 100.0,
    };
    assert!(!compositor.on_mouse_move(&early, &surface));
    assert_eq!(compositor.placement().unwrap().position, (0.5, 0.5));

    compositor.begin_drag();
    assert_eq!(compositor.state(), ControllerState::Dragging);

    let quarter = MouseMove {
        client_x: 300.0,
        client_y: 175.0,
    };
    assert!(compositor.on_mouse_move(&quarter, &surface));
    assert_eq!(compositor.placement().unwrap().position, (0.25, 0.25));

    let outside = MouseMove {
        client_x: -400.0,
        client_y: 9_000.0,
    };
    assert!(compositor.on_mouse_move(&outside, &surface));
    assert_eq!(compositor.placement().unwrap().position, (0.0, 1.0));

    compositor.end_drag();
    assert_eq!(compositor.state(), ControllerState::OverlaySelected);
    assert!(!compositor.on_mouse_move(&quarter, &surface));
    assert_eq!(compositor.placement().unwrap().position, (0.0, 1.0));
}

#[tokio::test]
async fn test_touch_drag_uses_first_contact() {
    let mut compositor = offline_compositor(vec![]);
    compositor.select_and_key(source("koi.png", &design(16, 16))).await;
    let surface = ViewportGeometry::new(0.0, 0.0, 400.0, 200.0);
    compositor.begin_drag();

    assert!(!compositor.on_touch_move(&TouchMove::default(), &surface));

    let touches = TouchMove {
        touches: vec![
            TouchPoint {
                client_x: 300.0,
                client_y: 50.0,
            },
            TouchPoint {
                client_x: 0.0,
                client_y: 0.0,
            },
        ],
    };
    assert!(compositor.on_touch_move(&touches, &surface));
    assert_eq!(compositor.placement().unwrap().position, (0.75, 0.25));
}

#[tokio::test]
async fn test_rendered_anchor_tracks_drag() {
    let mut compositor = offline_compositor(vec![]);
    compositor.select_base_photo(base_photo(800, 500));
    compositor.select_and_key(source("koi.png", &design(192, 192))).await;

    compositor.begin_drag();
    compositor.update_position_from_pointer(200.0, 125.0, &ViewportGeometry::new(0.0, 0.0, 800.0, 500.0));
    compositor.end_drag();

    let output = compositor.render();
    let layer = output.scene().unwrap().overlay.as_ref().unwrap();
    assert_eq!((layer.left_percent, layer.top_percent), (25.0, 25.0));

    let raster = output.scene().unwrap().rasterize();
    assert_eq!(raster.get_pixel(200, 125).0, blend::multiply(SKIN, INK, 0.9));
    assert_eq!(raster.get_pixel(400, 250).0, SKIN);
}

#[tokio::test]
async fn test_oversized_source_renders_unkeyed() {
    let config = CompositorConfig::builder()
        .max_pixels(1_000)
        .blend_mode(BlendMode::Normal)
        .build()
        .unwrap();
    let mut compositor =
        Compositor::with_fetcher(config, Arc::new(StaticFetcher::new())).unwrap();
    compositor.select_base_photo(base_photo(800, 500));
    compositor.select_and_key(source("koi.png", &design(192, 192))).await;

    let keyed = compositor.keyed_image().unwrap();
    assert!(keyed.is_fallback());
    // the original pixels are still drawable
    assert_eq!(keyed.image().unwrap().get_pixel(0, 0).0, WHITE);

    compositor.set_opacity(0.6);
    let output = compositor.render();
    // paper was not keyed, so it shows over the skin
    assert_eq!(pixel(&output, 460, 330), blend::over(SKIN, WHITE, 0.6));
}

#[tokio::test]
async fn test_preview_record_captures_sources_and_placement() {
    let url = "https://cdn.example.com/rose.png";
    let mut compositor = offline_compositor(vec![(url, png(&design(16, 16)))]);
    compositor.select_base_photo(base_photo(100, 100));
    compositor.select_and_key(SourceImage::from_url(url)).await;
    compositor.set_rotation(-90.0);

    let record = compositor.preview_record().expect("base photo and overlay present");
    assert!((record.placement.rotation_degrees - 270.0).abs() < f64::EPSILON);

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["overlay"]["kind"], "url");
    assert_eq!(json["overlay"]["url"], url);
    assert_eq!(json["base"]["kind"], "local");
    assert_eq!(json["base"]["label"], "body.png");
}
