use image::RgbaImage;
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

use crate::settings::{Corner, MontageSettings};
use crate::source::ImageHandle;
use crate::text::{TextRenderer, fit_to_width};

use super::layout::{Geometry, TileRect};

/// Gap between the bar and its text when the text sits above the bar.
const TEXT_GAP_ABOVE: i32 = 4;
/// Extra gap below the bar, on top of the text height.
const TEXT_GAP_BELOW: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Where the bar rectangle lands on the canvas.
pub struct BarPlacement {
    pub x: i32,
    pub y: i32,
    pub length: u32,
    pub height: u32,
}

/// Bar length in pixels for `length` physical units.
///
/// Missing or non-positive pixel sizes count as 1.0. The result is kept within
/// one pixel and half the tile width.
pub fn bar_length_px(length: f64, pixel_size: Option<f64>, tile_w: u32) -> u32 {
    let pixel_size = pixel_size
        .filter(|p| p.is_finite() && *p > 0.0)
        .unwrap_or(1.0);
    let max_len = (tile_w / 2).max(1);
    let px = (length / pixel_size).round();
    if px.is_nan() {
        return 1;
    }
    px.clamp(1.0, f64::from(max_len)) as u32
}

pub fn placement(corner: Corner, tile: &TileRect, length: u32) -> BarPlacement {
    let height = (tile.h / 40).max(3);
    let pad = (tile.h / 20) as i32;
    let x = if corner.is_right() {
        tile.right() - length as i32 - pad
    } else {
        tile.x + pad
    };
    let y = if corner.is_top() {
        tile.y + pad
    } else {
        tile.bottom() - height as i32 - pad
    };
    BarPlacement {
        x,
        y,
        length,
        height,
    }
}

pub fn font_size(tile_h: u32) -> u32 {
    (tile_h / 25).max(8)
}

/// Text shown with the bar: the whole-number length and the image unit.
pub fn caption(length: f64, unit: &str) -> String {
    format!("{} {}", length.trunc() as i64, unit)
}

/// Draws the scale bar and its caption on the configured tile only.
pub fn apply<I: ImageHandle>(
    mut canvas: RgbaImage,
    images: &[I],
    geometry: &Geometry,
    settings: &MontageSettings,
    text: &dyn TextRenderer,
) -> RgbaImage {
    if !settings.show_scale_bar {
        return canvas;
    }
    let index = settings.scale_bar_image_index;
    let Some(image) = images.get(index) else {
        tracing::warn!(
            "scale bar image {} is out of range for {} images, skipping",
            index + 1,
            images.len()
        );
        return canvas;
    };

    let tile = geometry.tile(index);
    let corner = settings.scale_bar_position;
    let color = settings.scale_bar_color.rgba();
    let length = bar_length_px(settings.scale_bar_length, image.pixel_size(), tile.w);
    let bar = placement(corner, &tile, length);
    tracing::debug!(
        "scale bar on tile {}: {}px x {}px at ({}, {})",
        index + 1,
        bar.length,
        bar.height,
        bar.x,
        bar.y
    );

    draw_filled_rect_mut(
        &mut canvas,
        Rect::at(bar.x, bar.y).of_size(bar.length, bar.height),
        color,
    );

    let size = font_size(tile.h);
    let label = fit_to_width(
        text,
        &caption(settings.scale_bar_length, image.unit()),
        size,
        tile.w,
    );
    if label.is_empty() {
        return canvas;
    }
    let (label_w, _) = text.measure(&label, size);
    let centered = bar.x + (bar.length / 2) as i32 - (label_w / 2) as i32;
    let label_x = tile.clamp_x(centered, label_w);
    let baseline = if corner.is_top() {
        bar.y + bar.height as i32 + size as i32 + TEXT_GAP_BELOW
    } else {
        bar.y - TEXT_GAP_ABOVE
    };
    text.draw(&mut canvas, &label, label_x, baseline, size, color);
    canvas
}
