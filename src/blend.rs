//! Per-pixel blending of the overlay onto the base photo
//!
//! Pixels are straight (non-premultiplied) RGBA8. The destination is treated
//! as the backdrop; its alpha is kept unless the source contributes coverage.

use crate::config::BlendMode;

pub type Rgba8 = [u8; 4];

/// Multiply: `out = dst * (1 - a) + (dst * src) * a`, with `a = src_alpha * opacity`
#[must_use]
pub fn multiply(dst: Rgba8, src: Rgba8, opacity: f32) -> Rgba8 {
    let Some(a) = coverage(src, opacity) else {
        return dst;
    };

    let mut out = dst;
    for i in 0..3 {
        let d = f32::from(dst[i]) / 255.0;
        let s = f32::from(src[i]) / 255.0;
        let blended = d * (1.0 - a) + d * s * a;
        out[i] = to_u8(blended);
    }
    out[3] = to_u8(f32::from(dst[3]) / 255.0 + a * (1.0 - f32::from(dst[3]) / 255.0));
    out
}

/// Source-over with straight alpha
#[must_use]
pub fn over(dst: Rgba8, src: Rgba8, opacity: f32) -> Rgba8 {
    let Some(a) = coverage(src, opacity) else {
        return dst;
    };

    let da = f32::from(dst[3]) / 255.0;
    let out_a = a + da * (1.0 - a);
    if out_a <= 0.0 {
        return [0, 0, 0, 0];
    }

    let mut out = [0u8; 4];
    for i in 0..3 {
        let s = f32::from(src[i]) / 255.0;
        let d = f32::from(dst[i]) / 255.0;
        out[i] = to_u8((s * a + d * da * (1.0 - a)) / out_a);
    }
    out[3] = to_u8(out_a);
    out
}

/// Dispatch on `mode`
#[must_use]
pub fn blend(mode: BlendMode, dst: Rgba8, src: Rgba8, opacity: f32) -> Rgba8 {
    match mode {
        BlendMode::Multiply => multiply(dst, src, opacity),
        BlendMode::Normal => over(dst, src, opacity),
    }
}

fn coverage(src: Rgba8, opacity: f32) -> Option<f32> {
    let opacity = opacity.clamp(0.0, 1.0);
    let a = f32::from(src[3]) / 255.0 * opacity;
    (a > 0.0).then_some(a)
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}
