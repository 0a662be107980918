use std::path::{Path, PathBuf};

use anyhow::Context;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{
    CompressionType as PngCompressionType, FilterType as PngFilterType, PngEncoder,
};
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, RgbaImage};

/// Receives the finished montage.
pub trait Presenter {
    fn present(&mut self, raster: &RgbaImage, title: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpg,
    Png,
    Webp,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
        }
    }

    /// Picks the encoder from the path's extension, defaulting to PNG.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "jpg" | "jpeg" => OutputFormat::Jpg,
            "webp" => OutputFormat::Webp,
            _ => OutputFormat::Png,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EncodeOptions {
    pub jpg_quality: u8,
    pub png_compression: u8,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            jpg_quality: 90,
            png_compression: 6,
        }
    }
}

/// Writes the montage to an image file.
pub struct FileSink {
    path: PathBuf,
    options: EncodeOptions,
    written: Option<PathBuf>,
}

impl FileSink {
    pub fn new(path: PathBuf, options: EncodeOptions) -> Self {
        Self {
            path,
            options,
            written: None,
        }
    }

    /// Path of the last file successfully written.
    pub fn written(&self) -> Option<&Path> {
        self.written.as_deref()
    }
}

impl Presenter for FileSink {
    fn present(&mut self, raster: &RgbaImage, title: &str) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create_dir_all {}", parent.display()))?;
        }
        let format = OutputFormat::from_path(&self.path);
        write_raster(raster, &self.path, format, self.options)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        tracing::info!(
            "{title}: wrote {}x{} {} to {}",
            raster.width(),
            raster.height(),
            format.extension(),
            self.path.display()
        );
        self.written = Some(self.path.clone());
        Ok(())
    }
}

/// `<dir>/<stem>.<ext>`, or the first free `<stem>-N.<ext>` when taken.
pub fn build_output_path(output_dir: &Path, stem: &str, format: OutputFormat) -> PathBuf {
    let base = output_dir.join(format!("{}.{}", stem, format.extension()));
    if !base.exists() {
        return base;
    }
    for n in 2..10000 {
        let candidate = output_dir.join(format!("{}-{}.{}", stem, n, format.extension()));
        if !candidate.exists() {
            return candidate;
        }
    }
    output_dir.join(format!("{}-final.{}", stem, format.extension()))
}

fn write_raster(
    raster: &RgbaImage,
    output_path: &Path,
    format: OutputFormat,
    options: EncodeOptions,
) -> anyhow::Result<()> {
    let file = std::fs::File::create(output_path)?;
    let writer = std::io::BufWriter::new(file);
    let rgb = DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(raster.clone()).to_rgb8());
    match format {
        OutputFormat::Jpg => {
            let encoder = JpegEncoder::new_with_quality(writer, options.jpg_quality.clamp(1, 100));
            rgb.write_with_encoder(encoder)?;
        }
        OutputFormat::Png => {
            let compression = PngCompressionType::Level(options.png_compression.min(9));
            let encoder =
                PngEncoder::new_with_quality(writer, compression, PngFilterType::Adaptive);
            rgb.write_with_encoder(encoder)?;
        }
        OutputFormat::Webp => {
            let encoder = WebPEncoder::new_lossless(writer);
            rgb.write_with_encoder(encoder)?;
        }
    }
    Ok(())
}
