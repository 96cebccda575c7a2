//! Shared test fixtures
//!
//! Images are generated in memory so the suite needs no binary assets.

#![allow(dead_code)]

use image::{Rgba, RgbaImage};
use std::sync::Arc;
use tryon_compositor::{
    BasePhoto, Compositor, CompositorConfig, ImageIOService, SourceImage, StaticFetcher,
};

pub const WHITE: [u8; 4] = [255, 255, 255, 255];
pub const BLACK: [u8; 4] = [0, 0, 0, 255];
pub const INK: [u8; 4] = [20, 40, 160, 255];
pub const SKIN: [u8; 4] = [200, 160, 120, 255];

pub fn solid(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba(color))
}

/// White canvas with a centred square of ink covering half of each axis
pub fn design(width: u32, height: u32) -> RgbaImage {
    let mut image = solid(width, height, WHITE);
    for y in height / 4..height * 3 / 4 {
        for x in width / 4..width * 3 / 4 {
            image.put_pixel(x, y, Rgba(INK));
        }
    }
    image
}

pub fn png(image: &RgbaImage) -> Vec<u8> {
    ImageIOService::encode_png(image).expect("PNG encoding")
}

pub fn source(label: &str, image: &RgbaImage) -> SourceImage {
    SourceImage::from_bytes(label, png(image))
}

pub fn base_photo(width: u32, height: u32) -> BasePhoto {
    BasePhoto::new("body.png", solid(width, height, SKIN))
}

/// Compositor whose fetcher serves only the given URL responses
pub fn offline_compositor(responses: Vec<(&str, Vec<u8>)>) -> Compositor {
    let fetcher = responses
        .into_iter()
        .fold(StaticFetcher::new(), |fetcher, (url, bytes)| {
            fetcher.with_response(url, bytes)
        });
    Compositor::with_fetcher(CompositorConfig::default(), Arc::new(fetcher))
        .expect("default config is valid")
}
