use image::{Rgba, RgbaImage};

use crate::settings::{Corner, MontageSettings};
use crate::source::{ImageHandle, display_name};
use crate::text::{TextRenderer, fit_to_width};

use super::layout::{Geometry, TileRect};

pub const LABEL_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

pub fn font_size(tile_h: u32) -> u32 {
    (tile_h / 20).max(10)
}

/// Left edge and baseline of a label `text_w` wide, before clamping.
///
/// The label's height is taken to be its font size.
pub fn anchor(corner: Corner, tile: &TileRect, text_w: u32, font_size: u32) -> (i32, i32) {
    let pad = (font_size / 2) as i32;
    let x = if corner.is_right() {
        tile.right() - text_w as i32 - pad
    } else {
        tile.x + pad
    };
    let baseline = if corner.is_top() {
        tile.y + pad + font_size as i32
    } else {
        tile.bottom() - pad
    };
    (x, baseline)
}

/// Writes each tile's label in the configured corner, never past the tile's sides.
pub fn apply<I: ImageHandle>(
    mut canvas: RgbaImage,
    images: &[I],
    geometry: &Geometry,
    settings: &MontageSettings,
    text: &dyn TextRenderer,
) -> RgbaImage {
    if !settings.show_labels {
        return canvas;
    }
    let size = font_size(geometry.tile_h);
    for (index, image) in images.iter().enumerate() {
        let tile = geometry.tile(index);
        let raw = settings
            .label_override(index)
            .unwrap_or_else(|| display_name(image.title()));
        let label = fit_to_width(text, raw, size, tile.w);
        if label.is_empty() {
            continue;
        }
        let (text_w, _) = text.measure(&label, size);
        let (x, baseline) = anchor(settings.label_position, &tile, text_w, size);
        let x = tile.clamp_x(x, text_w);
        text.draw(&mut canvas, &label, x, baseline, size, LABEL_COLOR);
    }
    canvas
}

#[cfg(test)]
mod tests {
    use image::{DynamicImage, ImageBuffer, Rgba, RgbaImage};

    use crate::montage::layout::{TileRect, plan};
    use crate::montage::tiles::blank_canvas;
    use crate::settings::{Corner, MontageSettings};
    use crate::source::SourceImage;
    use crate::text::BitmapText;

    use super::{LABEL_COLOR, anchor, apply, font_size};

    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    fn tile(w: u32, h: u32) -> TileRect {
        TileRect { x: 0, y: 0, w, h }
    }

    fn named(title: &str, w: u32, h: u32) -> SourceImage {
        SourceImage::new(
            title,
            DynamicImage::ImageRgba8(ImageBuffer::from_pixel(w, h, BLACK)),
        )
    }

    fn lit_columns(canvas: &RgbaImage) -> Vec<u32> {
        canvas
            .enumerate_pixels()
            .filter(|(_, _, p)| **p == LABEL_COLOR)
            .map(|(x, _, _)| x)
            .collect()
    }

    #[test]
    fn font_size_has_a_floor_of_ten() {
        assert_eq!(font_size(150), 10);
        assert_eq!(font_size(400), 20);
    }

    #[test]
    fn anchors_follow_corner() {
        let t = TileRect {
            x: 10,
            y: 20,
            w: 200,
            h: 100,
        };
        assert_eq!(anchor(Corner::TopLeft, &t, 40, 10), (15, 35));
        assert_eq!(anchor(Corner::TopRight, &t, 40, 10), (165, 35));
        assert_eq!(anchor(Corner::BottomLeft, &t, 40, 10), (15, 115));
        assert_eq!(anchor(Corner::BottomRight, &t, 40, 10), (165, 115));
    }

    #[test]
    fn bottom_right_label_on_200_by_150_tile() {
        let t = tile(200, 150);
        let size = font_size(t.h);
        let (x, baseline) = anchor(Corner::BottomRight, &t, 40, size);
        assert_eq!(x, 200 - 40 - 5);
        assert_eq!(baseline, 150 - 5);
        let x = t.clamp_x(x, 40);
        assert!((0..=160).contains(&x));
    }

    #[test]
    fn label_text_drops_extension_and_is_drawn_inside_its_tile() {
        let images = vec![named("ab.tif", 100, 40), named("cd.tif", 100, 40)];
        let settings = MontageSettings {
            rows: 1,
            cols: 2,
            border_thickness: 4,
            label_position: Corner::TopLeft,
            ..Default::default()
        };
        let g = plan(&settings, images.len(), 100, 40);
        let canvas = blank_canvas(&g, BLACK);
        let out = apply(canvas, &images[..1], &g, &settings, &BitmapText);

        let cols = lit_columns(&out);
        assert!(!cols.is_empty());
        // "ab" at scale 1 is 16px wide, padded by 5
        assert!(cols.iter().all(|&x| (5..21).contains(&x)));
    }

    #[test]
    fn very_long_label_is_truncated_to_tile_width() {
        let images = vec![
            named("an-extremely-long-file-name-that-cannot-fit.png", 40, 40),
            named("b.png", 40, 40),
        ];
        let settings = MontageSettings {
            rows: 1,
            cols: 2,
            border_thickness: 10,
            label_position: Corner::TopRight,
            ..Default::default()
        };
        let g = plan(&settings, images.len(), 40, 40);
        let out = apply(blank_canvas(&g, BLACK), &images[..1], &g, &settings, &BitmapText);

        let cols = lit_columns(&out);
        assert!(!cols.is_empty());
        assert!(cols.iter().all(|&x| x < 40));
    }

    #[test]
    fn override_text_replaces_title() {
        let images = vec![named("zzzzzzzz.png", 200, 40), named("b.png", 200, 40)];
        let settings = MontageSettings {
            rows: 1,
            cols: 2,
            border_thickness: 0,
            label_texts: vec!["i".into()],
            ..Default::default()
        };
        let g = plan(&settings, images.len(), 200, 40);
        let out = apply(blank_canvas(&g, BLACK), &images[..1], &g, &settings, &BitmapText);
        let cols = lit_columns(&out);
        // a single glyph cell starting at the pad
        assert!(cols.iter().all(|&x| (5..13).contains(&x)));
    }

    #[test]
    fn disabled_labels_leave_canvas_untouched() {
        let images = vec![named("a.png", 50, 50), named("b.png", 50, 50)];
        let settings = MontageSettings {
            show_labels: false,
            ..Default::default()
        };
        let g = plan(&settings, images.len(), 50, 50);
        let before = blank_canvas(&g, BLACK);
        let out = apply(before.clone(), &images, &g, &settings, &BitmapText);
        assert_eq!(before, out);
    }
}
