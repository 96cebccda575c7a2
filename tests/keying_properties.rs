//! Pixel-level properties of background keying

mod common;

use common::{design, png, solid, source, BLACK, INK, WHITE};
use image::Rgba;
use std::sync::Arc;
use tryon_compositor::{
    is_background, key_pixels, BackgroundKeyer, ImageIOService, KeyingConfig, KeyingOutcome,
    SourceImage, StaticFetcher,
};

fn keyer() -> BackgroundKeyer {
    BackgroundKeyer::with_fetcher(KeyingConfig::default(), Arc::new(StaticFetcher::new()))
}

#[tokio::test]
async fn test_white_image_becomes_fully_transparent() {
    let keyed = keyer()
        .key_background(&source("white.png", &solid(100, 100, WHITE)))
        .await;

    assert_eq!(
        keyed.outcome(),
        &KeyingOutcome::Keyed {
            keyed_pixels: 10_000
        }
    );
    let image = keyed.image().expect("keyed pixels");
    assert!(image.pixels().all(|p| p.0[3] == 0));
    // colour channels are left alone
    assert!(image.pixels().all(|p| p.0[..3] == [255, 255, 255]));
}

#[tokio::test]
async fn test_black_image_is_unchanged() {
    let original = solid(100, 100, BLACK);
    let keyed = keyer().key_background(&source("black.png", &original)).await;

    assert_eq!(keyed.outcome(), &KeyingOutcome::Keyed { keyed_pixels: 0 });
    assert_eq!(keyed.image().expect("keyed pixels").as_ref(), &original);
}

#[tokio::test]
async fn test_design_keeps_ink_and_drops_paper() {
    let original = design(64, 64);
    let keyed = keyer().key_background(&source("koi.png", &original)).await;
    let image = keyed.image().expect("keyed pixels");

    assert_eq!(keyed.dimensions(), Some((64, 64)));
    for (x, y, pixel) in image.enumerate_pixels() {
        let before = original.get_pixel(x, y);
        if before.0 == WHITE {
            assert_eq!(pixel.0, [255, 255, 255, 0], "paper at ({x}, {y})");
        } else {
            assert_eq!(pixel, before, "ink at ({x}, {y})");
        }
    }
    assert_eq!(
        keyed.outcome(),
        &KeyingOutcome::Keyed {
            keyed_pixels: 64 * 64 - 32 * 32
        }
    );
}

#[tokio::test]
async fn test_png_bytes_match_keyed_pixels() {
    let keyed = keyer().key_background(&source("koi.png", &design(16, 16))).await;

    let encoded = keyed.png_bytes().expect("encoded cutout");
    let decoded = ImageIOService::load_from_bytes(encoded).unwrap().to_rgba8();
    assert_eq!(&decoded, keyed.image().unwrap().as_ref());
}

#[test]
fn test_threshold_is_strict_on_every_channel() {
    let threshold = KeyingConfig::default().threshold;
    assert_eq!(threshold, 240);

    assert!(!is_background(&Rgba([240, 240, 240, 255]), threshold));
    assert!(is_background(&Rgba([241, 241, 241, 255]), threshold));
    assert!(!is_background(&Rgba([255, 255, 240, 255]), threshold));
    assert!(!is_background(&Rgba([240, 255, 255, 255]), threshold));
    // alpha does not take part in the decision
    assert!(is_background(&Rgba([250, 250, 250, 0]), threshold));
    assert!(!is_background(&Rgba([10, 10, 10, 0]), threshold));
}

#[tokio::test]
async fn test_keying_its_own_output_changes_nothing() {
    let keyer = keyer();
    let first = keyer.key_background(&source("koi.png", &design(33, 17))).await;
    let reencoded = first.png_bytes().expect("encoded cutout").to_vec();

    let second = keyer
        .key_background(&SourceImage::from_bytes("koi-keyed.png", reencoded))
        .await;

    assert!(!second.is_fallback());
    assert_eq!(second.image().unwrap().as_ref(), first.image().unwrap().as_ref());
    assert_eq!(second.outcome(), first.outcome());
}

#[test]
fn test_keying_is_idempotent() {
    let mut once = design(40, 30);
    let first = key_pixels(&mut once, 240);

    let mut twice = once.clone();
    let second = key_pixels(&mut twice, 240);

    assert_eq!(once, twice);
    assert_eq!(first, second);
}

#[test]
fn test_near_white_below_threshold_is_byte_identical() {
    let mut image = solid(8, 8, [240, 241, 255, 128]);
    image.put_pixel(0, 0, Rgba(INK));
    let original = image.clone();

    assert_eq!(key_pixels(&mut image, 240), 0);
    assert_eq!(image, original);
}

#[test]
fn test_lower_threshold_keys_more() {
    let mut image = solid(4, 1, WHITE);
    image.put_pixel(1, 0, Rgba([235, 235, 235, 255]));
    image.put_pixel(2, 0, Rgba([225, 225, 225, 255]));
    image.put_pixel(3, 0, Rgba(INK));

    let mut strict = image.clone();
    assert_eq!(key_pixels(&mut strict, 240), 1);

    let mut loose = image;
    assert_eq!(key_pixels(&mut loose, 220), 3);
    assert_eq!(loose.get_pixel(3, 0).0, INK);
}

#[test]
fn test_key_bytes_matches_key_pixels() {
    let original = design(20, 20);
    let from_bytes = keyer().key_bytes(&png(&original)).unwrap();

    let mut in_place = original;
    key_pixels(&mut in_place, 240);
    assert_eq!(from_bytes, in_place);
}
