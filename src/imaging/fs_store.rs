//! Filesystem-backed image store.
//!
//! Source images are read from `images_dir`; results are written to
//! `output_dir` and referenced as `{public_base_url}/{name}`.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::ImageReader` with format sniffing |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (configured quality, RGB8) |
//! | Encode → PNG | `image::codecs::png::PngEncoder` (float samples narrowed to 16-bit) |
//! | Encode → WebP | `image::codecs::webp::WebPEncoder` (lossless, RGBA8) |
//! | Encode → TIFF | `image::codecs::tiff::TiffEncoder` (gray+alpha widened to RGBA, float narrowed to 16-bit) |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) |

use super::format::{Extension, OutputFormat};
use super::store::{ImageStore, StoreError};
use image::{DynamicImage, ImageReader};
use std::borrow::Cow;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Store backed by two local directories.
#[derive(Debug, Clone)]
pub struct FsStore {
    images_dir: PathBuf,
    output_dir: PathBuf,
    public_base_url: String,
    quality: u8,
}

impl FsStore {
    pub fn new(
        images_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
        quality: u8,
    ) -> Self {
        Self {
            images_dir: images_dir.into(),
            output_dir: output_dir.into(),
            public_base_url: public_base_url.into(),
            quality: quality.clamp(1, 100),
        }
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, StoreError> {
        if !is_plain_file_name(name) {
            return Err(StoreError::NotFound(name.to_string()));
        }
        let path = self.images_dir.join(name);
        if path.is_file() {
            Ok(path)
        } else {
            Err(StoreError::NotFound(name.to_string()))
        }
    }

    fn public_reference(&self, name: &str) -> String {
        let base = self.public_base_url.trim_end_matches('/');
        if base.is_empty() {
            name.to_string()
        } else {
            format!("{base}/{name}")
        }
    }
}

/// Reject anything that could escape the images directory.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && Path::new(name).is_relative()
}

/// Convert color types the PNG and TIFF encoders reject into the nearest
/// layout they accept. Everything else is passed through unchanged.
fn encodable(image: &DynamicImage, format: OutputFormat) -> Cow<'_, DynamicImage> {
    match (format, image) {
        // PNG has no float samples
        (OutputFormat::Png | OutputFormat::Tiff, DynamicImage::ImageRgb32F(_)) => {
            Cow::Owned(DynamicImage::ImageRgb16(image.to_rgb16()))
        }
        (OutputFormat::Png | OutputFormat::Tiff, DynamicImage::ImageRgba32F(_)) => {
            Cow::Owned(DynamicImage::ImageRgba16(image.to_rgba16()))
        }
        // TIFF has no gray+alpha
        (OutputFormat::Tiff, DynamicImage::ImageLumaA8(_)) => {
            Cow::Owned(DynamicImage::ImageRgba8(image.to_rgba8()))
        }
        (OutputFormat::Tiff, DynamicImage::ImageLumaA16(_)) => {
            Cow::Owned(DynamicImage::ImageRgba16(image.to_rgba16()))
        }
        _ => Cow::Borrowed(image),
    }
}

fn encode_to(
    image: &DynamicImage,
    format: OutputFormat,
    path: &Path,
    quality: u8,
) -> Result<(), StoreError> {
    use image::codecs::{
        avif::AvifEncoder, jpeg::JpegEncoder, png::PngEncoder, tiff::TiffEncoder,
        webp::WebPEncoder,
    };

    let writer = BufWriter::new(File::create(path)?);
    let result = match format {
        // JPEG has no alpha channel
        OutputFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8())
            .write_with_encoder(JpegEncoder::new_with_quality(writer, quality)),
        OutputFormat::Png => encodable(image, format).write_with_encoder(PngEncoder::new(writer)),
        // The WebP encoder only takes 8-bit RGB(A)
        OutputFormat::Webp => DynamicImage::ImageRgba8(image.to_rgba8())
            .write_with_encoder(WebPEncoder::new_lossless(writer)),
        OutputFormat::Tiff => {
            encodable(image, format).write_with_encoder(TiffEncoder::new(writer))
        }
        OutputFormat::Avif => DynamicImage::ImageRgba8(image.to_rgba8())
            .write_with_encoder(AvifEncoder::new_with_speed_quality(writer, 6, quality)),
    };
    result.map_err(|e| StoreError::Encode {
        name: path.display().to_string(),
        reason: e.to_string(),
    })
}

impl ImageStore for FsStore {
    fn find(&self, name: &str) -> Result<PathBuf, StoreError> {
        self.resolve(name)
    }

    fn load(&self, name: &str) -> Result<DynamicImage, StoreError> {
        let path = self.resolve(name)?;
        let decode_err = |reason: String| StoreError::Decode {
            name: name.to_string(),
            reason,
        };
        ImageReader::open(&path)?
            .with_guessed_format()?
            .decode()
            .map_err(|e| decode_err(e.to_string()))
    }

    fn save(&self, image: &DynamicImage, name: &str) -> Result<String, StoreError> {
        if !is_plain_file_name(name) {
            return Err(StoreError::Encode {
                name: name.to_string(),
                reason: "name must be a plain file name".into(),
            });
        }
        let ext = Extension::from_path(Path::new(name));
        let format = OutputFormat::from_extension(&ext)
            .ok_or_else(|| StoreError::UnsupportedFormat(ext.to_string()))?;

        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(name);
        if let Err(e) = encode_to(image, format, &path, self.quality) {
            // Don't leave a truncated file behind
            let _ = std::fs::remove_file(&path);
            return Err(e);
        }
        Ok(self.public_reference(name))
    }
}
