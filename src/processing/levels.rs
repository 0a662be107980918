use image::DynamicImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Input values mapped to black (`min`) and white (`max`); `min <= max` always holds.
pub struct DisplayRange {
    min: u8,
    max: u8,
}

impl Default for DisplayRange {
    fn default() -> Self {
        Self::FULL
    }
}

impl DisplayRange {
    pub const FULL: DisplayRange = DisplayRange { min: 0, max: 255 };

    /// Builds a range, swapping the ends if given in reverse.
    pub fn new(a: u8, b: u8) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn min(&self) -> u8 {
        self.min
    }

    pub fn max(&self) -> u8 {
        self.max
    }

    /// Moves the low end; pushing it past `max` drags `max` along.
    pub fn set_min(&mut self, value: u8) {
        self.min = value;
        if self.max < value {
            self.max = value;
        }
    }

    /// Moves the high end; pulling it below `min` drags `min` along.
    pub fn set_max(&mut self, value: u8) {
        self.max = value;
        if self.min > value {
            self.min = value;
        }
    }

    pub fn is_full(&self) -> bool {
        *self == Self::FULL
    }

    /// Maps one input value through the range.
    pub fn map(&self, value: u8) -> u8 {
        if self.min == self.max {
            return if value >= self.max { 255 } else { 0 };
        }
        if value <= self.min {
            return 0;
        }
        if value >= self.max {
            return 255;
        }
        let span = f32::from(self.max - self.min);
        (f32::from(value - self.min) * 255.0 / span).round() as u8
    }

    fn lut(&self) -> [u8; 256] {
        let mut table = [0u8; 256];
        for (value, out) in table.iter_mut().enumerate() {
            *out = self.map(value as u8);
        }
        table
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// One display range per color channel (R, G, B).
pub struct ChannelRanges(pub [DisplayRange; 3]);

impl ChannelRanges {
    pub fn uniform(range: DisplayRange) -> Self {
        Self([range; 3])
    }

    pub fn is_identity(&self) -> bool {
        self.0.iter().all(DisplayRange::is_full)
    }

    /// Moves every channel's low end, then its high end, keeping `min <= max`.
    pub fn with_bounds(mut self, min: Option<u8>, max: Option<u8>) -> Self {
        for range in self.0.iter_mut() {
            if let Some(min) = min {
                range.set_min(min);
            }
            if let Some(max) = max {
                range.set_max(max);
            }
        }
        self
    }
}

/// Observed min/max of each color channel, ignoring alpha.
pub fn auto_ranges(img: &DynamicImage) -> ChannelRanges {
    let rgba = img.to_rgba8();
    let mut lo = [u8::MAX; 3];
    let mut hi = [u8::MIN; 3];
    for px in rgba.pixels() {
        for c in 0..3 {
            lo[c] = lo[c].min(px[c]);
            hi[c] = hi[c].max(px[c]);
        }
    }
    if rgba.width() == 0 || rgba.height() == 0 {
        return ChannelRanges::default();
    }
    ChannelRanges([
        DisplayRange::new(lo[0], hi[0]),
        DisplayRange::new(lo[1], hi[1]),
        DisplayRange::new(lo[2], hi[2]),
    ])
}

/// Linearly stretches each channel so its range spans 0..=255.
pub fn apply(img: DynamicImage, ranges: &ChannelRanges) -> DynamicImage {
    if ranges.is_identity() {
        return img;
    }
    let tables = ranges.0.map(|range| range.lut());
    let mut rgba = img.to_rgba8();
    for px in rgba.pixels_mut() {
        for c in 0..3 {
            px[c] = tables[c][px[c] as usize];
        }
    }
    DynamicImage::ImageRgba8(rgba)
}

#[cfg(test)]
mod tests {
    use image::{DynamicImage, ImageBuffer, Rgba};

    use super::{ChannelRanges, DisplayRange, apply, auto_ranges};

    #[test]
    fn raising_min_past_max_drags_max() {
        let mut r = DisplayRange::new(10, 100);
        r.set_min(150);
        assert_eq!((r.min(), r.max()), (150, 150));
    }

    #[test]
    fn lowering_max_below_min_drags_min() {
        let mut r = DisplayRange::new(50, 200);
        r.set_max(20);
        assert_eq!((r.min(), r.max()), (20, 20));
    }

    #[test]
    fn new_orders_its_ends() {
        assert_eq!(DisplayRange::new(200, 10), DisplayRange::new(10, 200));
    }

    #[test]
    fn map_stretches_and_clips() {
        let r = DisplayRange::new(50, 150);
        assert_eq!(r.map(0), 0);
        assert_eq!(r.map(50), 0);
        assert_eq!(r.map(100), 128);
        assert_eq!(r.map(150), 255);
        assert_eq!(r.map(220), 255);
    }

    #[test]
    fn degenerate_range_thresholds() {
        let r = DisplayRange::new(90, 90);
        assert_eq!(r.map(89), 0);
        assert_eq!(r.map(90), 255);
    }

    #[test]
    fn auto_ranges_follow_each_channel() {
        let mut buf = ImageBuffer::from_pixel(2, 1, Rgba([40u8, 0, 7, 255]));
        buf.put_pixel(1, 0, Rgba([200, 255, 7, 10]));
        let ranges = auto_ranges(&DynamicImage::ImageRgba8(buf));
        assert_eq!(ranges.0[0], DisplayRange::new(40, 200));
        assert_eq!(ranges.0[1], DisplayRange::FULL);
        assert_eq!(ranges.0[2], DisplayRange::new(7, 7));
    }

    #[test]
    fn bounds_apply_on_top_of_auto_ranges() {
        let auto = ChannelRanges([
            DisplayRange::new(40, 200),
            DisplayRange::new(0, 100),
            DisplayRange::FULL,
        ]);
        let raised = auto.with_bounds(Some(150), None);
        assert_eq!(raised.0[0], DisplayRange::new(150, 200));
        // min pushed past max drags max along
        assert_eq!(raised.0[1], DisplayRange::new(150, 150));
        assert_eq!(raised.0[2], DisplayRange::new(150, 255));

        let lowered = auto.with_bounds(None, Some(30));
        assert_eq!(lowered.0[0], DisplayRange::new(30, 30));
        assert_eq!(lowered.0[1], DisplayRange::new(0, 30));

        // min applies first, so a max below it wins
        let both = ChannelRanges::default().with_bounds(Some(90), Some(60));
        assert_eq!(both.0[0], DisplayRange::new(60, 60));
        assert_eq!(auto.with_bounds(None, None), auto);
    }

    #[test]
    fn auto_scaled_image_spans_full_range_and_keeps_alpha() {
        let mut buf = ImageBuffer::from_pixel(2, 1, Rgba([60u8, 60, 60, 128]));
        buf.put_pixel(1, 0, Rgba([120, 120, 120, 128]));
        let img = DynamicImage::ImageRgba8(buf);
        let ranges = auto_ranges(&img);
        let out = apply(img, &ranges).to_rgba8();
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0, 128]);
        assert_eq!(out.get_pixel(1, 0).0, [255, 255, 255, 128]);
    }

    #[test]
    fn full_range_is_identity() {
        let img = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(3, 3, Rgba([1, 2, 3, 4])));
        let out = apply(img.clone(), &ChannelRanges::default());
        assert_eq!(img.to_rgba8(), out.to_rgba8());
    }
}
