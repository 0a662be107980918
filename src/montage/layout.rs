use crate::settings::MontageSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Grid shape and pixel dimensions derived once per montage run.
pub struct Geometry {
    pub rows: u32,
    pub cols: u32,
    pub tile_w: u32,
    pub tile_h: u32,
    pub border: u32,
    pub canvas_w: u32,
    pub canvas_h: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Canvas rectangle occupied by one tile.
pub struct TileRect {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl TileRect {
    pub fn right(&self) -> i32 {
        self.x + self.w as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.h as i32
    }

    /// Horizontal position for content `width` wide, pulled back inside the tile.
    /// Content wider than the tile starts at the tile's left edge.
    pub fn clamp_x(&self, x: i32, width: u32) -> i32 {
        x.min(self.right() - width as i32).max(self.x)
    }
}

impl Geometry {
    /// Row-major `(row, col)` of the tile at sequence position `index`.
    pub fn cell(&self, index: usize) -> (u32, u32) {
        let cols = self.cols as usize;
        ((index / cols) as u32, (index % cols) as u32)
    }

    /// Top-left canvas pixel of the tile at sequence position `index`.
    pub fn origin(&self, index: usize) -> (u32, u32) {
        let (row, col) = self.cell(index);
        (
            col * (self.tile_w + self.border),
            row * (self.tile_h + self.border),
        )
    }

    pub fn tile(&self, index: usize) -> TileRect {
        let (x, y) = self.origin(index);
        TileRect {
            x: x as i32,
            y: y as i32,
            w: self.tile_w,
            h: self.tile_h,
        }
    }
}

/// Plans the grid for `count` images whose first image is `first_w` x `first_h`.
///
/// A grid too small for `count` grows by columns only; rows stay as requested.
/// `count` must be at least 1.
pub fn plan(settings: &MontageSettings, count: usize, first_w: u32, first_h: u32) -> Geometry {
    debug_assert!(count >= 1, "layout needs at least one image");

    let rows = settings.rows.max(1);
    let needed_cols = count.max(1).div_ceil(rows as usize) as u32;
    let cols = settings.cols.max(1).max(needed_cols);

    let border = settings.border_thickness;
    let (tile_w, tile_h) = if settings.expand_canvas {
        (first_w.max(1), first_h.max(1))
    } else {
        (
            first_w.saturating_sub(border).max(1),
            first_h.saturating_sub(border).max(1),
        )
    };

    Geometry {
        rows,
        cols,
        tile_w,
        tile_h,
        border,
        canvas_w: cols * tile_w + (cols - 1) * border,
        canvas_h: rows * tile_h + (rows - 1) * border,
    }
}
