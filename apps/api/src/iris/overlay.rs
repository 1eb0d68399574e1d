//! Overlay renderer — stamps an exact black pupil disk onto a generated iris.
//!
//! The generated image is decoded, normalised to the render frame, and the disk is
//! composited "over" it: fully covered pixels become opaque black, edge pixels are
//! blended by their sub-pixel coverage. The result is always PNG.

use std::io::Cursor;

use image::{imageops::FilterType, ImageFormat, Rgba, RgbaImage};
use thiserror::Error;
use tracing::debug;

use crate::iris::measurement::RenderFrame;

/// Sub-samples per axis used to estimate coverage on edge pixels.
const EDGE_SAMPLES: u32 = 4;

const PUPIL_COLOR: [u8; 3] = [0, 0, 0];

#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("generated image could not be decoded: {0}")]
    Decode(String),

    #[error("pupil compositing failed: {0}")]
    Composite(String),
}

/// Composites a black disk of `radius_px` at the frame centre and re-encodes as PNG.
///
/// Pure with respect to its inputs: the same bytes, radius and frame always produce
/// byte-identical output.
pub fn overlay_pupil(
    image: &[u8],
    radius_px: f64,
    frame: &RenderFrame,
) -> Result<Vec<u8>, OverlayError> {
    if !radius_px.is_finite() || radius_px <= 0.0 {
        return Err(OverlayError::Composite(format!(
            "pupil radius must be a positive number of pixels, got {radius_px}"
        )));
    }

    let decoded = image::load_from_memory(image).map_err(|e| OverlayError::Decode(e.to_string()))?;
    let mut canvas = decoded.to_rgba8();

    let side = frame.side_px();
    if canvas.dimensions() != (side, side) {
        debug!(
            from_width = canvas.width(),
            from_height = canvas.height(),
            side,
            "resizing generated image to render frame"
        );
        canvas = image::imageops::resize(&canvas, side, side, FilterType::Lanczos3);
    }

    let (cx, cy) = frame.center();
    draw_disk(&mut canvas, cx, cy, radius_px);

    let mut buf = Cursor::new(Vec::new());
    canvas
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| OverlayError::Composite(format!("PNG encode failed: {e}")))?;

    Ok(buf.into_inner())
}

/// Draws a filled disk in `PUPIL_COLOR` over `canvas`.
fn draw_disk(canvas: &mut RgbaImage, cx: f64, cy: f64, radius: f64) {
    let (width, height) = canvas.dimensions();
    if width == 0 || height == 0 {
        return;
    }

    let x0 = (cx - radius).floor().max(0.0) as u32;
    let y0 = (cy - radius).floor().max(0.0) as u32;
    let x1 = ((cx + radius).ceil() as u32).min(width - 1);
    let y1 = ((cy + radius).ceil() as u32).min(height - 1);

    for y in y0..=y1 {
        for x in x0..=x1 {
            let coverage = pixel_coverage(x, y, cx, cy, radius);
            if coverage <= 0.0 {
                continue;
            }
            let pixel = canvas.get_pixel_mut(x, y);
            *pixel = blend_over(*pixel, coverage);
        }
    }
}

/// Fraction of pixel `(x, y)` covered by the disk, in `[0, 1]`.
fn pixel_coverage(x: u32, y: u32, cx: f64, cy: f64, radius: f64) -> f64 {
    let r2 = radius * radius;
    let corner_inside = |px: f64, py: f64| {
        let dx = px - cx;
        let dy = py - cy;
        dx * dx + dy * dy <= r2
    };

    let (left, top) = (f64::from(x), f64::from(y));
    let (right, bottom) = (left + 1.0, top + 1.0);
    let corners = [
        corner_inside(left, top),
        corner_inside(right, top),
        corner_inside(left, bottom),
        corner_inside(right, bottom),
    ];
    if corners.iter().all(|&c| c) {
        return 1.0;
    }

    let step = 1.0 / f64::from(EDGE_SAMPLES);
    let mut hits = 0u32;
    for sy in 0..EDGE_SAMPLES {
        for sx in 0..EDGE_SAMPLES {
            let px = left + (f64::from(sx) + 0.5) * step;
            let py = top + (f64::from(sy) + 0.5) * step;
            if corner_inside(px, py) {
                hits += 1;
            }
        }
    }
    f64::from(hits) / f64::from(EDGE_SAMPLES * EDGE_SAMPLES)
}

/// Standard source-over blend of an opaque pupil colour with the given coverage.
fn blend_over(dst: Rgba<u8>, coverage: f64) -> Rgba<u8> {
    if coverage >= 1.0 {
        return Rgba([PUPIL_COLOR[0], PUPIL_COLOR[1], PUPIL_COLOR[2], 255]);
    }
    let mix = |src: u8, dst: u8| -> u8 {
        (f64::from(src) * coverage + f64::from(dst) * (1.0 - coverage)).round() as u8
    };
    Rgba([
        mix(PUPIL_COLOR[0], dst[0]),
        mix(PUPIL_COLOR[1], dst[1]),
        mix(PUPIL_COLOR[2], dst[2]),
        mix(255, dst[3]),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    fn white_png(side: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(side, side, WHITE);
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn white_jpeg(side: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(side, side, image::Rgb([255, 255, 255]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Jpeg).unwrap();
        buf.into_inner()
    }

    fn decode(bytes: &[u8]) -> RgbaImage {
        image::load_from_memory(bytes).unwrap().to_rgba8()
    }

    fn frame(side: u32) -> RenderFrame {
        RenderFrame::new(side, 0.9).unwrap()
    }

    #[test]
    fn test_disk_center_black_and_corners_untouched() {
        let out = overlay_pupil(&white_png(64), 10.0, &frame(64)).unwrap();
        let img = decode(&out);
        assert_eq!(*img.get_pixel(32, 32), BLACK);
        assert_eq!(*img.get_pixel(25, 32), BLACK);
        assert_eq!(*img.get_pixel(0, 0), WHITE);
        assert_eq!(*img.get_pixel(63, 63), WHITE);
        // Just outside the radius along the horizontal axis.
        assert_eq!(*img.get_pixel(43, 32), WHITE);
    }

    #[test]
    fn test_edge_pixels_are_blended() {
        let out = overlay_pupil(&white_png(64), 10.3, &frame(64)).unwrap();
        let img = decode(&out);
        // Pixel [42, 43) straddles x = 42.3.
        let edge = img.get_pixel(42, 32);
        assert!(edge[0] > 0 && edge[0] < 255, "edge value {}", edge[0]);
    }

    #[test]
    fn test_overlay_is_idempotent() {
        let input = white_png(48);
        let first = overlay_pupil(&input, 7.5, &frame(48)).unwrap();
        let second = overlay_pupil(&input, 7.5, &frame(48)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_output_is_png_regardless_of_input_format() {
        let out = overlay_pupil(&white_jpeg(32), 4.0, &frame(32)).unwrap();
        assert_eq!(&out[0..8], &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[test]
    fn test_mismatched_input_is_resized_to_frame() {
        let out = overlay_pupil(&white_png(40), 5.0, &frame(80)).unwrap();
        let img = decode(&out);
        assert_eq!(img.dimensions(), (80, 80));
        assert_eq!(*img.get_pixel(40, 40), BLACK);
    }

    #[test]
    fn test_oversized_radius_covers_frame_without_panicking() {
        let out = overlay_pupil(&white_png(16), 100.0, &frame(16)).unwrap();
        let img = decode(&out);
        assert!(img.pixels().all(|p| *p == BLACK));
    }

    #[test]
    fn test_undecodable_input_is_decode_error() {
        let err = overlay_pupil(b"definitely not an image", 5.0, &frame(32)).unwrap_err();
        assert!(matches!(err, OverlayError::Decode(_)));
    }

    #[test]
    fn test_non_positive_radius_is_composite_error() {
        for radius in [0.0, -2.0, f64::NAN] {
            let err = overlay_pupil(&white_png(16), radius, &frame(16)).unwrap_err();
            assert!(matches!(err, OverlayError::Composite(_)));
        }
    }
}
