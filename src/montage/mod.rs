//! Grid montage composition.
//!
//! The canvas moves by value through each stage:
//! layout plan -> tiles -> labels -> scale bar.

pub mod labels;
pub mod layout;
pub mod scale_bar;
pub mod tiles;

use image::RgbaImage;

use crate::output::Presenter;
use crate::settings::MontageSettings;
use crate::source::ImageHandle;
use crate::text::TextRenderer;

pub use layout::Geometry;

/// Title given to the finished montage.
pub const MONTAGE_TITLE: &str = "Insta Montage";
/// Fewest images a montage request accepts.
pub const MIN_IMAGES: usize = 2;

/// Renders `images` in order into one annotated canvas.
pub fn compose<I: ImageHandle>(
    images: &[I],
    settings: &MontageSettings,
    text: &dyn TextRenderer,
) -> anyhow::Result<(RgbaImage, Geometry)> {
    let Some(first) = images.first() else {
        anyhow::bail!("montage needs at least one image");
    };
    settings.validate()?;

    let geometry = layout::plan(settings, images.len(), first.width(), first.height());
    tracing::info!(
        "montage grid {}x{} of {}x{} tiles, canvas {}x{}",
        geometry.rows,
        geometry.cols,
        geometry.tile_w,
        geometry.tile_h,
        geometry.canvas_w,
        geometry.canvas_h
    );

    let canvas = tiles::blank_canvas(&geometry, settings.border_color.rgba());
    let canvas = tiles::apply(canvas, images, &geometry);
    let canvas = labels::apply(canvas, images, &geometry, settings, text);
    let canvas = scale_bar::apply(canvas, images, &geometry, settings, text);
    Ok((canvas, geometry))
}

/// Checks the request, composes the montage and hands it to `sink`.
pub fn run<I: ImageHandle>(
    images: &[I],
    settings: &MontageSettings,
    text: &dyn TextRenderer,
    sink: &mut dyn Presenter,
) -> anyhow::Result<Geometry> {
    anyhow::ensure!(
        images.len() >= MIN_IMAGES,
        "please provide at least {MIN_IMAGES} images to make a montage (got {})",
        images.len()
    );
    let (canvas, geometry) = compose(images, settings, text)?;
    sink.present(&canvas, MONTAGE_TITLE)?;
    Ok(geometry)
}

#[cfg(test)]
mod tests {
    use image::{DynamicImage, ImageBuffer, Rgba, RgbaImage};

    use crate::output::Presenter;
    use crate::settings::{MontageSettings, Swatch};
    use crate::source::SourceImage;
    use crate::text::BitmapText;

    use super::{MONTAGE_TITLE, compose, run};

    #[derive(Default)]
    struct Captured {
        calls: Vec<(u32, u32, String)>,
    }

    impl Presenter for Captured {
        fn present(&mut self, raster: &RgbaImage, title: &str) -> anyhow::Result<()> {
            self.calls
                .push((raster.width(), raster.height(), title.to_string()));
            Ok(())
        }
    }

    fn solid(title: &str, w: u32, h: u32, v: u8) -> SourceImage {
        SourceImage::new(
            title,
            DynamicImage::ImageRgba8(ImageBuffer::from_pixel(w, h, Rgba([v, v, v, 255]))),
        )
    }

    #[test]
    fn run_rejects_fewer_than_two_images() {
        let mut sink = Captured::default();
        let one = vec![solid("a.png", 10, 10, 1)];
        let err = run(&one, &MontageSettings::default(), &BitmapText, &mut sink)
            .expect_err("single image must be rejected");
        assert!(err.to_string().contains("at least 2"));
        assert!(sink.calls.is_empty());
    }

    #[test]
    fn compose_rejects_empty_input() {
        let none: Vec<SourceImage> = Vec::new();
        assert!(compose(&none, &MontageSettings::default(), &BitmapText).is_err());
    }

    #[test]
    fn run_presents_expanded_grid() {
        let images: Vec<SourceImage> = (0..5)
            .map(|i| solid(&format!("{i}.png"), 30, 20, i as u8 * 40))
            .collect();
        let settings = MontageSettings {
            rows: 2,
            cols: 2,
            border_thickness: 2,
            border_color: Swatch::Black,
            show_labels: false,
            show_scale_bar: false,
            ..Default::default()
        };
        let mut sink = Captured::default();
        let geometry = run(&images, &settings, &BitmapText, &mut sink).expect("montage");

        assert_eq!((geometry.rows, geometry.cols), (2, 3));
        assert_eq!(
            sink.calls,
            vec![(3 * 30 + 2 * 2, 2 * 20 + 2, MONTAGE_TITLE.to_string())]
        );
    }

    #[test]
    fn compose_places_sources_in_sequence_order() {
        let images = vec![
            solid("a.png", 8, 8, 10),
            solid("b.png", 8, 8, 20),
            solid("c.png", 8, 8, 30),
            solid("d.png", 8, 8, 40),
        ];
        let settings = MontageSettings {
            rows: 2,
            cols: 2,
            border_thickness: 0,
            show_labels: false,
            show_scale_bar: false,
            ..Default::default()
        };
        let (canvas, _) = compose(&images, &settings, &BitmapText).expect("montage");
        assert_eq!(canvas.get_pixel(0, 0)[0], 10);
        assert_eq!(canvas.get_pixel(8, 0)[0], 20);
        assert_eq!(canvas.get_pixel(0, 8)[0], 30);
        assert_eq!(canvas.get_pixel(8, 8)[0], 40);
    }

    #[test]
    fn compose_propagates_invalid_settings() {
        let images = vec![solid("a.png", 8, 8, 1), solid("b.png", 8, 8, 2)];
        let settings = MontageSettings {
            scale_bar_length: -1.0,
            ..Default::default()
        };
        assert!(compose(&images, &settings, &BitmapText).is_err());
    }

    #[test]
    fn oversized_border_is_rejected_before_planning() {
        let images = vec![solid("a.png", 8, 8, 1), solid("b.png", 8, 8, 2)];
        let settings = MontageSettings {
            rows: 1,
            border_thickness: u32::MAX,
            ..Default::default()
        };
        let err = compose(&images, &settings, &BitmapText).expect_err("border must be capped");
        assert!(err.to_string().contains("border thickness"));
    }
}
