use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use font8x8::{BASIC_FONTS, LATIN_FONTS, UnicodeFonts};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};

/// Measures and rasterises annotation text onto a canvas.
pub trait TextRenderer {
    /// Returns `(width, height)` in pixels for `text` at `font_size`.
    fn measure(&self, text: &str, font_size: u32) -> (u32, u32);

    /// Draws `text` with its left edge at `x` and its baseline at `baseline`.
    /// Pixels outside the canvas are skipped.
    fn draw(
        &self,
        canvas: &mut RgbaImage,
        text: &str,
        x: i32,
        baseline: i32,
        font_size: u32,
        color: Rgba<u8>,
    );
}

/// Built-in 8x8 bitmap glyphs, scaled up by whole pixels.
#[derive(Debug, Default, Clone, Copy)]
pub struct BitmapText;

const GLYPH: u32 = 8;

impl BitmapText {
    fn scale(font_size: u32) -> u32 {
        ((font_size + GLYPH / 2) / GLYPH).max(1)
    }

    fn glyph(ch: char) -> Option<[u8; 8]> {
        BASIC_FONTS
            .get(ch)
            .or_else(|| LATIN_FONTS.get(ch))
            .or_else(|| BASIC_FONTS.get('?'))
    }
}

impl TextRenderer for BitmapText {
    fn measure(&self, text: &str, font_size: u32) -> (u32, u32) {
        let cell = GLYPH * Self::scale(font_size);
        (text.chars().count() as u32 * cell, cell)
    }

    fn draw(
        &self,
        canvas: &mut RgbaImage,
        text: &str,
        x: i32,
        baseline: i32,
        font_size: u32,
        color: Rgba<u8>,
    ) {
        let scale = Self::scale(font_size) as i32;
        let top = baseline - GLYPH as i32 * scale;
        let (w, h) = (canvas.width() as i32, canvas.height() as i32);
        let mut cursor_x = x;

        for ch in text.chars() {
            let Some(rows) = Self::glyph(ch) else {
                cursor_x += GLYPH as i32 * scale;
                continue;
            };
            for (row_idx, bits) in rows.iter().enumerate() {
                for col_idx in 0..GLYPH as i32 {
                    if (bits >> col_idx) & 1 == 0 {
                        continue;
                    }
                    let px = cursor_x + col_idx * scale;
                    let py = top + row_idx as i32 * scale;
                    for sy in 0..scale {
                        for sx in 0..scale {
                            let (tx, ty) = (px + sx, py + sy);
                            if tx >= 0 && ty >= 0 && tx < w && ty < h {
                                canvas.put_pixel(tx as u32, ty as u32, color);
                            }
                        }
                    }
                }
            }
            cursor_x += GLYPH as i32 * scale;
        }
    }
}

/// Text rendered from a TrueType/OpenType font file.
pub struct GlyphText {
    font: FontVec,
}

impl GlyphText {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|err| anyhow::anyhow!("invalid font {}: {err}", path.display()))?;
        Ok(Self { font })
    }
}

impl TextRenderer for GlyphText {
    fn measure(&self, text: &str, font_size: u32) -> (u32, u32) {
        text_size(PxScale::from(font_size as f32), &self.font, text)
    }

    fn draw(
        &self,
        canvas: &mut RgbaImage,
        text: &str,
        x: i32,
        baseline: i32,
        font_size: u32,
        color: Rgba<u8>,
    ) {
        let top = baseline - font_size as i32;
        draw_text_mut(
            canvas,
            color,
            x,
            top,
            PxScale::from(font_size as f32),
            &self.font,
            text,
        );
    }
}

/// Loads the configured font, falling back to the bitmap glyphs.
pub fn renderer_for(font_path: Option<&Path>) -> Box<dyn TextRenderer> {
    let Some(path) = font_path else {
        return Box::new(BitmapText);
    };
    match GlyphText::load(path) {
        Ok(text) => {
            tracing::debug!("using font {}", path.display());
            Box::new(text)
        }
        Err(err) => {
            tracing::warn!("font unavailable, using built-in glyphs: {err:#}");
            Box::new(BitmapText)
        }
    }
}

/// Drops trailing characters until `text` fits into `max_width`.
pub fn fit_to_width(
    renderer: &dyn TextRenderer,
    text: &str,
    font_size: u32,
    max_width: u32,
) -> String {
    let mut fitted = text.to_string();
    while !fitted.is_empty() && renderer.measure(&fitted, font_size).0 > max_width {
        fitted.pop();
    }
    fitted
}
