mod config;
mod montage;
mod output;
mod processing;
mod reorder;
mod settings;
mod source;
mod text;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use rayon::prelude::*;

use config::MontageConfig;
use output::{FileSink, OutputFormat, Presenter};
use processing::levels::{self, ChannelRanges, DisplayRange};
use reorder::ThumbnailStrip;
use settings::{Corner, MontageSettings, Swatch};
use source::{Calibration, ImageHandle, SourceImage};

#[derive(Parser, Debug)]
#[command(name = "insta-montage")]
#[command(version, about = "Arrange images into an annotated grid montage", long_about = None)]
struct Cli {
    /// Input images, or directories of images, in montage order
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    /// Output file (.png, .jpg or .webp)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Requested grid rows
    #[arg(long, value_name = "N")]
    rows: Option<u32>,

    /// Requested grid columns (grows when the images do not fit)
    #[arg(long, value_name = "N")]
    cols: Option<u32>,

    /// Border thickness between tiles in pixels
    #[arg(long, value_name = "PX")]
    border: Option<u32>,

    #[arg(long, value_enum, value_name = "COLOR")]
    border_color: Option<Swatch>,

    /// Shrink tiles by the border thickness instead of growing the canvas
    #[arg(long)]
    scale_down: bool,

    #[arg(long)]
    no_labels: bool,

    #[arg(long, value_enum, value_name = "CORNER")]
    label_position: Option<Corner>,

    /// Label text for the tile at the same position (repeatable)
    #[arg(long = "label", value_name = "TEXT")]
    labels: Vec<String>,

    #[arg(long)]
    no_scale_bar: bool,

    #[arg(long, value_enum, value_name = "CORNER")]
    scale_bar_position: Option<Corner>,

    /// 1-based position of the tile that gets the scale bar
    #[arg(long, value_name = "N", value_parser = parse_position)]
    scale_bar_image: Option<usize>,

    /// Scale bar length in calibration units
    #[arg(long, value_name = "LENGTH")]
    scale_bar_length: Option<f64>,

    #[arg(long, value_enum, value_name = "COLOR")]
    scale_bar_color: Option<Swatch>,

    /// Physical size of one pixel, applied to every input
    #[arg(long, value_name = "SIZE")]
    pixel_size: Option<f64>,

    /// Calibration unit used with --pixel-size
    #[arg(long, value_name = "UNIT", requires = "pixel_size")]
    unit: Option<String>,

    /// Reorder before composing: move image FROM to position TO (1-based, repeatable)
    #[arg(long = "move", value_name = "FROM:TO", value_parser = parse_move)]
    moves: Vec<(usize, usize)>,

    /// Stretch each input's channels to their full range
    #[arg(long, conflicts_with = "display_range")]
    auto_levels: bool,

    /// Fixed display range for every input
    #[arg(long, value_name = "MIN,MAX", value_parser = parse_display_range)]
    display_range: Option<DisplayRange>,

    /// Low end of every channel's range, applied after the range flags above
    #[arg(long, value_name = "VALUE")]
    display_min: Option<u8>,

    /// High end of every channel's range, applied after --display-min
    #[arg(long, value_name = "VALUE")]
    display_max: Option<u8>,

    /// Font file for labels (defaults to built-in glyphs)
    #[arg(long, value_name = "FILE")]
    font: Option<PathBuf>,

    /// Also write the thumbnail strip to this file
    #[arg(long, value_name = "FILE")]
    strip_preview: Option<PathBuf>,

    /// Store the effective layout settings as the new defaults
    #[arg(long)]
    save_defaults: bool,
}

fn parse_position(raw: &str) -> Result<usize, String> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(format!("positions are 1-based integers, got '{raw}'")),
    }
}

fn parse_move(raw: &str) -> Result<(usize, usize), String> {
    let (from, to) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected FROM:TO, got '{raw}'"))?;
    Ok((parse_position(from)?, parse_position(to)?))
}

fn parse_display_range(raw: &str) -> Result<DisplayRange, String> {
    let (min, max) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected MIN,MAX, got '{raw}'"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<u8>()
            .map_err(|_| format!("range ends must be 0-255, got '{v}'"))
    };
    Ok(DisplayRange::new(parse(min)?, parse(max)?))
}

/// Layers command-line flags over the configured defaults.
fn effective_settings(cli: &Cli, defaults: &MontageSettings) -> MontageSettings {
    let mut s = defaults.clone();
    if let Some(rows) = cli.rows {
        s.rows = rows;
    }
    if let Some(cols) = cli.cols {
        s.cols = cols;
    }
    if let Some(border) = cli.border {
        s.border_thickness = border;
    }
    if let Some(color) = cli.border_color {
        s.border_color = color;
    }
    if cli.scale_down {
        s.expand_canvas = false;
    }
    if cli.no_labels {
        s.show_labels = false;
    }
    if let Some(corner) = cli.label_position {
        s.label_position = corner;
    }
    if !cli.labels.is_empty() {
        s.label_texts = cli.labels.clone();
    }
    if cli.no_scale_bar {
        s.show_scale_bar = false;
    }
    if let Some(corner) = cli.scale_bar_position {
        s.scale_bar_position = corner;
    }
    if let Some(position) = cli.scale_bar_image {
        s.scale_bar_image_index = position.saturating_sub(1);
    }
    if let Some(length) = cli.scale_bar_length {
        s.scale_bar_length = length;
    }
    if let Some(color) = cli.scale_bar_color {
        s.scale_bar_color = color;
    }
    s
}

fn load_sources(cli: &Cli) -> anyhow::Result<Vec<SourceImage>> {
    let paths = source::collect_inputs(&cli.inputs)?;
    anyhow::ensure!(
        paths.len() >= montage::MIN_IMAGES,
        "please provide at least {} images to make a montage (found {})",
        montage::MIN_IMAGES,
        paths.len()
    );

    let override_calibration = cli.pixel_size.map(|pixel_width| Calibration {
        unit: cli
            .unit
            .clone()
            .unwrap_or_else(|| source::PIXEL_UNIT.to_string()),
        pixel_width: Some(pixel_width),
    });
    let fixed_range = cli.display_range.map(ChannelRanges::uniform);
    let has_bounds = cli.display_min.is_some() || cli.display_max.is_some();

    paths
        .par_iter()
        .map(|path| -> anyhow::Result<SourceImage> {
            let mut src = SourceImage::open(path)?;
            if let Some(calibration) = override_calibration.clone() {
                src.set_calibration(calibration);
            }
            let mut ranges = if cli.auto_levels {
                Some(levels::auto_ranges(src.image()))
            } else {
                fixed_range
            };
            if has_bounds {
                ranges = Some(
                    ranges
                        .unwrap_or_default()
                        .with_bounds(cli.display_min, cli.display_max),
                );
            }
            if let Some(ranges) = ranges {
                let [r, g, b] = ranges.0;
                tracing::debug!(
                    "{} display ranges R {}-{} G {}-{} B {}-{}",
                    src.title(),
                    r.min(),
                    r.max(),
                    g.min(),
                    g.max(),
                    b.min(),
                    b.max()
                );
                src.map_image(|img| levels::apply(img, &ranges));
            }
            tracing::debug!(
                "loaded {} ({}x{}, {} per pixel: {:?})",
                src.title(),
                src.width(),
                src.height(),
                src.unit(),
                src.pixel_size()
            );
            Ok(src)
        })
        .collect()
}

/// Runs the requested moves through the strip's press/drag/release handling.
fn apply_moves(
    strip: &mut ThumbnailStrip<SourceImage>,
    moves: &[(usize, usize)],
) -> anyhow::Result<()> {
    for &(from, to) in moves {
        anyhow::ensure!(
            from <= strip.len() && to <= strip.len(),
            "move {from}:{to} is out of range for {} images",
            strip.len()
        );
        strip.press(reorder::pointer_x_for(from - 1));
        strip.drag_to(reorder::pointer_x_for(to - 1));
        strip.release();
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = MontageConfig::load();
    let settings = effective_settings(&cli, &config.montage);
    settings.validate()?;

    let sources = load_sources(&cli)?;
    tracing::info!("loaded {} images", sources.len());

    let mut strip = ThumbnailStrip::from_images(sources);
    strip.set_on_order_changed(|entries| {
        let order: Vec<&str> = entries.iter().map(|e| e.image.title()).collect();
        tracing::info!("image order: {}", order.join(", "));
    });
    apply_moves(&mut strip, &cli.moves)?;
    if !cli.moves.is_empty() {
        let order: Vec<&str> = strip.images().map(|img| img.title()).collect();
        tracing::info!("montage order after moves: {}", order.join(", "));
    }

    let font_path = cli.font.clone().or_else(|| config.font_path.clone());
    let text = text::renderer_for(font_path.as_deref());

    if let Some(path) = &cli.strip_preview {
        let mut preview = FileSink::new(path.clone(), config.encode_options());
        preview.present(&strip.render(text.as_ref()), "Image Order")?;
    }

    let images = strip.into_images();
    let output_path = match &cli.output {
        Some(path) => path.clone(),
        None => output::build_output_path(
            &config.default_output_dir(),
            "insta-montage",
            OutputFormat::Png,
        ),
    };
    let mut sink = FileSink::new(output_path, config.encode_options());
    let geometry = montage::run(&images, &settings, text.as_ref(), &mut sink)
        .context("montage failed")?;

    if let Some(path) = sink.written() {
        println!(
            "{} ({}x{} grid, {}x{} px)",
            path.display(),
            geometry.rows,
            geometry.cols,
            geometry.canvas_w,
            geometry.canvas_h
        );
    }

    if cli.save_defaults {
        config.montage = settings;
        config.save();
        if let Some(path) = MontageConfig::config_path() {
            tracing::info!("saved defaults to {}", path.display());
        }
    }
    Ok(())
}
