use image::{Rgba, RgbaImage, imageops};

use crate::source::ImageHandle;

use super::layout::Geometry;

/// Canvas pre-filled with the border color; unused cells stay this color.
pub fn blank_canvas(geometry: &Geometry, fill: Rgba<u8>) -> RgbaImage {
    RgbaImage::from_pixel(geometry.canvas_w, geometry.canvas_h, fill)
}

/// Copies every image into its row-major slot, resizing to the tile size when needed.
/// Tiles are flattened to opaque color and overwrite the canvas.
pub fn apply<I: ImageHandle>(mut canvas: RgbaImage, images: &[I], geometry: &Geometry) -> RgbaImage {
    for (index, image) in images.iter().enumerate() {
        let (x, y) = geometry.origin(index);
        let mut tile = if image.width() == geometry.tile_w && image.height() == geometry.tile_h {
            image.to_rgba()
        } else {
            image.resized(geometry.tile_w, geometry.tile_h)
        };
        for px in tile.pixels_mut() {
            px[3] = u8::MAX;
        }
        imageops::replace(&mut canvas, &tile, i64::from(x), i64::from(y));
    }
    canvas
}
