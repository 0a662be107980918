use image::Rgba;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
/// Tile corner an annotation is anchored to.
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub fn is_top(self) -> bool {
        matches!(self, Corner::TopLeft | Corner::TopRight)
    }

    pub fn is_right(self) -> bool {
        matches!(self, Corner::TopRight | Corner::BottomRight)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
/// Fill colors offered for borders and the scale bar.
pub enum Swatch {
    White,
    Black,
    Gray,
}

impl Swatch {
    pub fn rgba(self) -> Rgba<u8> {
        match self {
            Swatch::White => Rgba([255, 255, 255, 255]),
            Swatch::Black => Rgba([0, 0, 0, 255]),
            Swatch::Gray => Rgba([128, 128, 128, 255]),
        }
    }
}

/// Widest gap accepted between tiles.
pub const MAX_BORDER: u32 = 200;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
/// Layout and annotation parameters for one montage run.
pub struct MontageSettings {
    pub rows: u32,
    pub cols: u32,
    /// Gap between neighbouring tiles; the outer canvas edge never gets one.
    pub border_thickness: u32,
    pub border_color: Swatch,
    /// `true` keeps the first image's size per tile, `false` shrinks tiles by the border.
    pub expand_canvas: bool,
    pub show_labels: bool,
    pub label_position: Corner,
    // per-position overrides, empty entries fall back to the image title
    pub label_texts: Vec<String>,
    pub show_scale_bar: bool,
    pub scale_bar_position: Corner,
    pub scale_bar_image_index: usize,
    /// Physical length in the image's calibration unit.
    pub scale_bar_length: f64,
    pub scale_bar_color: Swatch,
}

impl Default for MontageSettings {
    fn default() -> Self {
        Self {
            rows: 2,
            cols: 2,
            border_thickness: 5,
            border_color: Swatch::White,
            expand_canvas: true,
            show_labels: true,
            label_position: Corner::BottomLeft,
            label_texts: Vec::new(),
            show_scale_bar: true,
            scale_bar_position: Corner::BottomRight,
            scale_bar_image_index: 0,
            scale_bar_length: 10.0,
            scale_bar_color: Swatch::White,
        }
    }
}

impl MontageSettings {
    /// Rejects parameter sets the layout planner cannot work with.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.rows >= 1, "rows must be at least 1");
        anyhow::ensure!(self.cols >= 1, "columns must be at least 1");
        anyhow::ensure!(
            self.border_thickness <= MAX_BORDER,
            "border thickness must be at most {MAX_BORDER}px, got {}",
            self.border_thickness
        );
        anyhow::ensure!(
            self.scale_bar_length.is_finite() && self.scale_bar_length > 0.0,
            "scale bar length must be a positive number, got {}",
            self.scale_bar_length
        );
        Ok(())
    }

    /// Label override for the tile at `index`, if one was given.
    pub fn label_override(&self, index: usize) -> Option<&str> {
        self.label_texts
            .get(index)
            .map(String::as_str)
            .filter(|text| !text.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_dialog_presets() {
        let s = MontageSettings::default();
        assert_eq!((s.rows, s.cols, s.border_thickness), (2, 2, 5));
        assert!(s.expand_canvas);
        assert_eq!(s.label_position, Corner::BottomLeft);
        assert_eq!(s.scale_bar_position, Corner::BottomRight);
        assert_eq!(s.scale_bar_length, 10.0);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_grid_and_bad_length() {
        let mut s = MontageSettings::default();
        s.cols = 0;
        assert!(s.validate().is_err());

        let mut s = MontageSettings::default();
        s.scale_bar_length = 0.0;
        assert!(s.validate().is_err());
        s.scale_bar_length = f64::NAN;
        assert!(s.validate().is_err());
    }

    #[test]
    fn validate_caps_border_thickness() {
        let mut s = MontageSettings::default();
        s.border_thickness = MAX_BORDER;
        assert!(s.validate().is_ok());
        s.border_thickness = u32::MAX;
        assert!(s.validate().is_err());
    }

    #[test]
    fn empty_label_override_falls_back() {
        let mut s = MontageSettings::default();
        s.label_texts = vec!["first".into(), String::new()];
        assert_eq!(s.label_override(0), Some("first"));
        assert_eq!(s.label_override(1), None);
        assert_eq!(s.label_override(7), None);
    }

    #[test]
    fn partial_toml_keeps_defaults_for_missing_fields() {
        let parsed: MontageSettings =
            toml::from_str("rows = 3\nlabel_position = \"top-right\"\nborder_color = \"gray\"")
                .expect("settings should parse");
        assert_eq!(parsed.rows, 3);
        assert_eq!(parsed.cols, 2);
        assert_eq!(parsed.label_position, Corner::TopRight);
        assert_eq!(parsed.border_color.rgba(), Rgba([128, 128, 128, 255]));
    }

    #[test]
    fn corner_helpers() {
        assert!(Corner::TopRight.is_top() && Corner::TopRight.is_right());
        assert!(!Corner::BottomLeft.is_top() && !Corner::BottomLeft.is_right());
    }
}
