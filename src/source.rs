use std::path::{Path, PathBuf};

use anyhow::Context;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};

/// Resampling used whenever a tile or thumbnail changes size.
pub const SMOOTH_FILTER: FilterType = FilterType::Triangle;

/// Unit reported by images without physical calibration.
pub const PIXEL_UNIT: &str = "pixel";

static RAW_EXTS: &[&str] = &["raf", "dng", "nef", "cr2", "arw"];
static SUPPORTED_IMAGE_EXTS: &[&str] = &[
    "jpg", "jpeg", "png", "tiff", "tif", "webp", "bmp", "raf", "dng", "nef", "cr2", "arw",
];

/// What the montage needs from an input image.
pub trait ImageHandle {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// Display name, usually the file name including its extension.
    fn title(&self) -> &str;
    fn unit(&self) -> &str;
    /// Physical length of one pixel in [`ImageHandle::unit`], if known.
    fn pixel_size(&self) -> Option<f64>;
    fn to_rgba(&self) -> RgbaImage;

    fn resized(&self, width: u32, height: u32) -> RgbaImage {
        imageops::resize(&self.to_rgba(), width, height, SMOOTH_FILTER)
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Physical pixel size and the unit it is expressed in.
pub struct Calibration {
    pub unit: String,
    pub pixel_width: Option<f64>,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            unit: PIXEL_UNIT.to_string(),
            pixel_width: None,
        }
    }
}

#[derive(Debug, Clone)]
/// A decoded input image plus the metadata the montage reads from it.
pub struct SourceImage {
    title: String,
    image: DynamicImage,
    calibration: Calibration,
}

impl SourceImage {
    pub fn new(title: impl Into<String>, image: DynamicImage) -> Self {
        Self {
            title: title.into(),
            image,
            calibration: Calibration::default(),
        }
    }

    /// Decodes `path` and reads its calibration tags when present.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let image =
            open_image(path).with_context(|| format!("failed to open {}", path.display()))?;
        let title = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let calibration = match read_calibration(path) {
            Ok(calibration) => calibration,
            Err(err) => {
                tracing::debug!("no calibration for {}: {err}", path.display());
                Calibration::default()
            }
        };
        Ok(Self::new(title, image).with_calibration(calibration))
    }

    pub fn with_calibration(mut self, calibration: Calibration) -> Self {
        self.calibration = calibration;
        self
    }

    pub fn set_calibration(&mut self, calibration: Calibration) {
        self.calibration = calibration;
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// Replaces the pixel data, keeping title and calibration.
    pub fn map_image(&mut self, f: impl FnOnce(DynamicImage) -> DynamicImage) {
        let image = std::mem::replace(&mut self.image, DynamicImage::new_rgba8(0, 0));
        self.image = f(image);
    }
}

impl ImageHandle for SourceImage {
    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn unit(&self) -> &str {
        &self.calibration.unit
    }

    fn pixel_size(&self) -> Option<f64> {
        self.calibration.pixel_width
    }

    fn to_rgba(&self) -> RgbaImage {
        self.image.to_rgba8()
    }

    fn resized(&self, width: u32, height: u32) -> RgbaImage {
        self.image.resize_exact(width, height, SMOOTH_FILTER).to_rgba8()
    }
}

/// Title without its trailing `.ext`; names without a usable stem are kept whole.
pub fn display_name(title: &str) -> &str {
    match title.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => title,
    }
}

fn has_extension(path: &Path, exts: &[&str]) -> bool {
    let Some(ext) = path.extension().map(|e| e.to_string_lossy()) else {
        return false;
    };
    exts.iter().any(|known| ext.eq_ignore_ascii_case(known))
}

pub fn is_raw_image(path: &Path) -> bool {
    has_extension(path, RAW_EXTS)
}

/// Returns `true` if the path has a supported image extension.
pub fn is_supported_image(path: &Path) -> bool {
    has_extension(path, SUPPORTED_IMAGE_EXTS)
}

/// Expands directories into their supported, non-hidden images sorted by name.
/// Plain file arguments keep their command-line order.
pub fn collect_inputs(args: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for arg in args {
        if !arg.is_dir() {
            out.push(arg.clone());
            continue;
        }
        let mut found: Vec<(String, PathBuf)> = std::fs::read_dir(arg)
            .with_context(|| format!("read_dir failed for {}", arg.display()))?
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                let name = entry.file_name().to_string_lossy().into_owned();
                (!name.starts_with('.') && path.is_file() && is_supported_image(&path))
                    .then_some((name, path))
            })
            .collect();
        found.sort_by(|a, b| a.0.cmp(&b.0));
        out.extend(found.into_iter().map(|(_, p)| p));
    }
    Ok(out)
}

/// Open an image, falling back to raw decoding for RAW extensions.
pub fn open_image(path: &Path) -> anyhow::Result<DynamicImage> {
    if let Ok(img) = image::open(path) {
        return Ok(img);
    }
    if !is_raw_image(path) {
        // Re-open to surface the decoder's own error.
        return Ok(image::open(path)?);
    }

    let raw = rawler::decode_file(path)?;
    let develop = rawler::imgop::develop::RawDevelop::default();
    let intermediate = develop.develop_intermediate(&raw)?;
    intermediate
        .to_dynamic_image()
        .ok_or_else(|| anyhow::anyhow!("raw develop produced invalid image"))
}

fn read_calibration(path: &Path) -> anyhow::Result<Calibration> {
    let file = std::fs::File::open(path)?;
    let mut bufreader = std::io::BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut bufreader)?;

    let x_resolution = exif
        .get_field(exif::Tag::XResolution, exif::In::PRIMARY)
        .and_then(|f| match f.value {
            exif::Value::Rational(ref v) => v.first().map(|r| r.to_f64()),
            _ => None,
        });
    let description = exif
        .get_field(exif::Tag::ImageDescription, exif::In::PRIMARY)
        .and_then(|f| match f.value {
            exif::Value::Ascii(ref v) => v.first().map(|s| String::from_utf8_lossy(s).into_owned()),
            _ => None,
        });
    let resolution_unit = exif
        .get_field(exif::Tag::ResolutionUnit, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0));

    Ok(calibration_from_tags(
        x_resolution,
        description.as_deref(),
        resolution_unit,
    ))
}

/// Builds a calibration from TIFF/EXIF resolution tags.
///
/// An ImageJ description's `unit=` wins over `ResolutionUnit`. Plain 72 dpi
/// is the common "no real resolution" default and is treated as uncalibrated.
fn calibration_from_tags(
    x_resolution: Option<f64>,
    description: Option<&str>,
    resolution_unit: Option<u32>,
) -> Calibration {
    let Some(xres) = x_resolution.filter(|r| r.is_finite() && *r > 0.0) else {
        return Calibration::default();
    };
    let unit = match description.and_then(parse_imagej_unit) {
        Some(unit) => unit,
        None => match resolution_unit {
            Some(3) => "cm".to_string(),
            Some(2) if (xres - 72.0).abs() > f64::EPSILON => "inch".to_string(),
            _ => return Calibration::default(),
        },
    };
    Calibration {
        unit,
        pixel_width: Some(1.0 / xres),
    }
}

fn parse_imagej_unit(description: &str) -> Option<String> {
    if !description.starts_with("ImageJ=") {
        return None;
    }
    description
        .lines()
        .find_map(|line| line.trim().strip_prefix("unit="))
        .map(|unit| unit.trim().replace("\\u00B5", "\u{b5}"))
        .filter(|unit| !unit.is_empty())
}
