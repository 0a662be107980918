use image::{Rgba, RgbaImage, imageops};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use rayon::prelude::*;

use crate::source::{ImageHandle, display_name};
use crate::text::TextRenderer;

pub const THUMB_W: u32 = 80;
pub const THUMB_H: u32 = 80;
/// Gap before the first thumbnail and between neighbours.
pub const PADDING: u32 = 8;

const STRIP_TOP: u32 = 30;
const CAPTION_CHARS: usize = 10;
const DRAGGED_OPACITY: f32 = 0.4;
const BACKGROUND: Rgba<u8> = Rgba([45, 45, 45, 255]);
const HIGHLIGHT: Rgba<u8> = Rgba([70, 130, 180, 255]);
const INDEX_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const CAPTION_COLOR: Rgba<u8> = Rgba([200, 200, 200, 255]);
const STRIP_TITLE: &str = "Image Order (drag to reorder)";

/// An image and its strip thumbnail; the two always move together.
pub struct Entry<T> {
    pub image: T,
    pub thumbnail: RgbaImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragState {
    Idle,
    /// `target` holds the last thumbnail the pointer was over, if any.
    Dragging { source: usize, target: Option<usize> },
}

type OrderChanged<T> = Box<dyn FnMut(&[Entry<T>])>;

/// Ordered images shown as a horizontal thumbnail strip, reordered by dragging.
pub struct ThumbnailStrip<T> {
    entries: Vec<Entry<T>>,
    drag: DragState,
    on_order_changed: Option<OrderChanged<T>>,
}

impl<T> Default for ThumbnailStrip<T> {
    fn default() -> Self {
        Self::with_entries(Vec::new())
    }
}

impl<T> ThumbnailStrip<T> {
    pub fn with_entries(entries: Vec<Entry<T>>) -> Self {
        Self {
            entries,
            drag: DragState::Idle,
            on_order_changed: None,
        }
    }

    /// Registers the callback fired after every committed move.
    pub fn set_on_order_changed(&mut self, callback: impl FnMut(&[Entry<T>]) + 'static) {
        self.on_order_changed = Some(Box::new(callback));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn entries(&self) -> &[Entry<T>] {
        &self.entries
    }

    pub fn images(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|e| &e.image)
    }

    /// Consumes the strip, yielding images in their current order.
    pub fn into_images(self) -> Vec<T> {
        self.entries.into_iter().map(|e| e.image).collect()
    }

    #[cfg(test)]
    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    pub fn drag_source(&self) -> Option<usize> {
        match self.drag {
            DragState::Dragging { source, .. } => Some(source),
            DragState::Idle => None,
        }
    }

    pub fn drop_target(&self) -> Option<usize> {
        match self.drag {
            DragState::Dragging { target, .. } => target,
            DragState::Idle => None,
        }
    }

    /// Thumbnail under horizontal position `x`; the vertical position never matters.
    pub fn index_at(&self, x: i32) -> Option<usize> {
        let offset = x - PADDING as i32;
        if offset < 0 || self.is_empty() {
            return None;
        }
        let stride = (THUMB_W + PADDING) as i32;
        let index = (offset / stride) as usize;
        (offset % stride <= THUMB_W as i32 && index < self.entries.len()).then_some(index)
    }

    /// Pointer pressed at `x`: starts a drag when it lands on a thumbnail.
    pub fn press(&mut self, x: i32) {
        self.drag = match self.index_at(x) {
            Some(source) => DragState::Dragging {
                source,
                target: None,
            },
            None => DragState::Idle,
        };
    }

    /// Pointer moved to `x` while pressed. Leaving the thumbnails keeps the last target.
    pub fn drag_to(&mut self, x: i32) {
        let DragState::Dragging { source, target } = self.drag else {
            return;
        };
        let hit = self.index_at(x);
        self.drag = DragState::Dragging {
            source,
            target: hit.or(target),
        };
    }

    /// Pointer released: commits the move if source and target differ.
    /// Always returns to idle. Returns `true` when the order changed.
    pub fn release(&mut self) -> bool {
        let drag = std::mem::replace(&mut self.drag, DragState::Idle);
        match drag {
            DragState::Dragging {
                source,
                target: Some(target),
            } => self.move_entry(source, target),
            _ => false,
        }
    }

    /// Moves the entry at `from` so it ends up at `to`, keeping everything else in order.
    pub fn move_entry(&mut self, from: usize, to: usize) -> bool {
        if from == to || from >= self.entries.len() || to >= self.entries.len() {
            return false;
        }
        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);
        tracing::debug!("moved thumbnail {} to {}", from + 1, to + 1);
        if let Some(callback) = self.on_order_changed.as_mut() {
            callback(&self.entries);
        }
        true
    }

    /// `(width, height)` the strip needs to show every thumbnail with its caption.
    pub fn preferred_size(&self) -> (u32, u32) {
        let width = (self.entries.len() as u32 * (THUMB_W + PADDING) + PADDING).max(300);
        (width, THUMB_H + 55)
    }
}

impl<T: ImageHandle + Sync> ThumbnailStrip<T> {
    /// Builds the strip, rendering thumbnails in parallel.
    pub fn from_images(images: Vec<T>) -> Self {
        let thumbnails: Vec<RgbaImage> = images.par_iter().map(make_thumbnail).collect();
        let entries = images
            .into_iter()
            .zip(thumbnails)
            .map(|(image, thumbnail)| Entry { image, thumbnail })
            .collect();
        Self::with_entries(entries)
    }
}

impl<T: ImageHandle> ThumbnailStrip<T> {
    /// Short caption for thumbnail `index`: the title without extension, cut to ten characters.
    pub fn caption(&self, index: usize) -> Option<String> {
        let entry = self.entries.get(index)?;
        Some(short_caption(display_name(entry.image.title())))
    }

    /// Rasterises the strip as it looks mid-interaction.
    pub fn render(&self, text: &dyn TextRenderer) -> RgbaImage {
        let (width, height) = self.preferred_size();
        let mut canvas = RgbaImage::from_pixel(width, height, BACKGROUND);
        text.draw(&mut canvas, STRIP_TITLE, PADDING as i32, 20, 11, CAPTION_COLOR);

        let y = STRIP_TOP as i32;
        for (index, entry) in self.entries.iter().enumerate() {
            let x = (PADDING + index as u32 * (THUMB_W + PADDING)) as i32;

            if self.drop_target() == Some(index) {
                draw_filled_rect_mut(
                    &mut canvas,
                    Rect::at(x - 3, y - 3).of_size(THUMB_W + 6, THUMB_H + 6),
                    HIGHLIGHT,
                );
            }
            if self.drag_source() == Some(index) {
                let faded = fade(&entry.thumbnail, DRAGGED_OPACITY);
                imageops::overlay(&mut canvas, &faded, i64::from(x), i64::from(y));
            } else {
                imageops::replace(&mut canvas, &entry.thumbnail, i64::from(x), i64::from(y));
            }

            let number = (index + 1).to_string();
            text.draw(
                &mut canvas,
                &number,
                x + 4,
                y + THUMB_H as i32 - 4,
                11,
                INDEX_COLOR,
            );
            if let Some(caption) = self.caption(index) {
                text.draw(
                    &mut canvas,
                    &caption,
                    x,
                    y + THUMB_H as i32 + 12,
                    9,
                    CAPTION_COLOR,
                );
            }
        }
        canvas
    }
}

/// Horizontal centre of thumbnail `index`, for driving the strip programmatically.
pub fn pointer_x_for(index: usize) -> i32 {
    (PADDING + index as u32 * (THUMB_W + PADDING) + THUMB_W / 2) as i32
}

/// Fixed-size thumbnail used by the strip.
pub fn make_thumbnail<I: ImageHandle>(image: &I) -> RgbaImage {
    image.resized(THUMB_W, THUMB_H)
}

fn short_caption(name: &str) -> String {
    if name.chars().count() > CAPTION_CHARS {
        let head: String = name.chars().take(CAPTION_CHARS).collect();
        format!("{head}...")
    } else {
        name.to_string()
    }
}

/// Copy of `thumbnail` with its alpha scaled by `opacity`.
fn fade(thumbnail: &RgbaImage, opacity: f32) -> RgbaImage {
    let mut faded = thumbnail.clone();
    for px in faded.pixels_mut() {
        px[3] = (f32::from(px[3]) * opacity).round() as u8;
    }
    faded
}
