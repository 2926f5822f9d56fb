//! Transform operations.
//!
//! Each action kind implements [`Operation`]: a validation pass over its
//! decoded parameters plus an `apply` that borrows the current image and
//! returns a [`StepOutput`]. Transforms never mutate their input; the
//! pipeline folds the output into the next state, so a failed step leaves
//! the previous state exactly as it was.
//!
//! | Kind | Output | Implementation |
//! |---|---|---|
//! | crop | new image | `DynamicImage::crop_imm` after a bounds check |
//! | resize | new image | `DynamicImage::resize_exact` with `FilterType::Triangle` (bilinear) |
//! | convert | new extension | format lookup only; re-encoding happens on save |

use super::calculations::{height_for_width, rect_within, scaled_dimensions, width_for_height};
use super::format::{Extension, OutputFormat};
use super::params::{ActionKind, ConvertParams, CropParams, ResizeParams};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Largest side a resize may produce unless configured otherwise.
pub const DEFAULT_MAX_DIMENSION: u32 = 16384;

/// Largest pixel count a resize may produce unless configured otherwise
/// (64 MiP, 256 MiB as RGBA8).
pub const DEFAULT_MAX_PIXELS: u64 = 64 * 1024 * 1024;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("dimensions must be non-zero (got {width}x{height})")]
    ZeroDimension { width: u64, height: u64 },
    #[error(
        "rectangle {width}x{height} at {x},{y} exceeds image bounds {image_width}x{image_height}"
    )]
    OutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },
    #[error("resize needs a width, a height or a scale")]
    MissingTarget,
    #[error("resize scale cannot be combined with width or height")]
    ConflictingTarget,
    #[error("scale must be a positive number (got {0})")]
    InvalidScale(f64),
    #[error("target {width}x{height} exceeds the {max}px limit")]
    TooLarge { width: u64, height: u64, max: u32 },
    #[error("target {width}x{height} exceeds the {max} pixel limit")]
    TooManyPixels { width: u64, height: u64, max: u64 },
    #[error("unsupported format `{0}`")]
    UnsupportedFormat(String),
}

/// Limits and format policy shared by every step of a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformSettings {
    pub max_dimension: u32,
    /// Upper bound on `width * height` of a resize result.
    pub max_pixels: u64,
    /// Formats a convert step may target.
    pub formats: Vec<OutputFormat>,
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            max_pixels: DEFAULT_MAX_PIXELS,
            formats: OutputFormat::ALL.to_vec(),
        }
    }
}

/// What a single step changed.
#[derive(Debug, Clone)]
pub enum StepOutput {
    Image(DynamicImage),
    Extension(Extension),
}

/// A pipeline step: typed parameters that know how to check and apply themselves.
pub trait Operation: DeserializeOwned {
    const KIND: ActionKind;

    /// Structural checks that don't depend on the image.
    fn validate(&self, settings: &TransformSettings) -> Result<(), TransformError>;

    /// Apply to the current image. Must not panic on any validated input.
    fn apply(
        &self,
        image: &DynamicImage,
        settings: &TransformSettings,
    ) -> Result<StepOutput, TransformError>;
}

impl Operation for CropParams {
    const KIND: ActionKind = ActionKind::Crop;

    fn validate(&self, _settings: &TransformSettings) -> Result<(), TransformError> {
        if self.width == 0 || self.height == 0 {
            return Err(TransformError::ZeroDimension {
                width: self.width as u64,
                height: self.height as u64,
            });
        }
        Ok(())
    }

    fn apply(
        &self,
        image: &DynamicImage,
        _settings: &TransformSettings,
    ) -> Result<StepOutput, TransformError> {
        crop(image, self).map(StepOutput::Image)
    }
}

impl Operation for ResizeParams {
    const KIND: ActionKind = ActionKind::Resize;

    fn validate(&self, settings: &TransformSettings) -> Result<(), TransformError> {
        match (self.width, self.height, self.scale) {
            (None, None, None) => Err(TransformError::MissingTarget),
            (Some(_), _, Some(_)) | (_, Some(_), Some(_)) => Err(TransformError::ConflictingTarget),
            (None, None, Some(s)) if !s.is_finite() || s <= 0.0 => {
                Err(TransformError::InvalidScale(s))
            }
            (w, h, _) if w == Some(0) || h == Some(0) => Err(TransformError::ZeroDimension {
                width: w.unwrap_or_default() as u64,
                height: h.unwrap_or_default() as u64,
            }),
            (w, h, _) => {
                let max = settings.max_dimension;
                if w.unwrap_or(0) > max || h.unwrap_or(0) > max {
                    return Err(TransformError::TooLarge {
                        width: w.unwrap_or_default() as u64,
                        height: h.unwrap_or_default() as u64,
                        max,
                    });
                }
                if let (Some(w), Some(h)) = (w, h) {
                    check_pixels(w as u64, h as u64, settings.max_pixels)?;
                }
                Ok(())
            }
        }
    }

    fn apply(
        &self,
        image: &DynamicImage,
        settings: &TransformSettings,
    ) -> Result<StepOutput, TransformError> {
        let (width, height) = resize_target(image.dimensions(), self, settings)?;
        Ok(StepOutput::Image(resize(image, width, height)))
    }
}

impl Operation for ConvertParams {
    const KIND: ActionKind = ActionKind::Convert;

    fn validate(&self, settings: &TransformSettings) -> Result<(), TransformError> {
        target_format(&self.format, &settings.formats).map(|_| ())
    }

    fn apply(
        &self,
        _image: &DynamicImage,
        settings: &TransformSettings,
    ) -> Result<StepOutput, TransformError> {
        convert(&self.format, &settings.formats).map(StepOutput::Extension)
    }
}

/// Cut `params` out of `image`.
///
/// The bounds check runs before any pixel access; `crop_imm` would
/// otherwise clamp silently.
pub fn crop(image: &DynamicImage, params: &CropParams) -> Result<DynamicImage, TransformError> {
    let (image_width, image_height) = image.dimensions();
    let rect = (params.x, params.y, params.width, params.height);
    if !rect_within(rect, (image_width, image_height)) {
        return Err(TransformError::OutOfBounds {
            x: params.x,
            y: params.y,
            width: params.width,
            height: params.height,
            image_width,
            image_height,
        });
    }
    Ok(image.crop_imm(params.x, params.y, params.width, params.height))
}

/// Resample to exactly `width x height`.
pub fn resize(image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    image.resize_exact(width, height, FilterType::Triangle)
}

/// Resolve a resize request against the current image size.
pub fn resize_target(
    current: (u32, u32),
    params: &ResizeParams,
    settings: &TransformSettings,
) -> Result<(u32, u32), TransformError> {
    let max_dimension = settings.max_dimension;
    let (width, height) = match (params.width, params.height, params.scale) {
        (Some(w), Some(h), None) => (w as u64, h as u64),
        (Some(w), None, None) => (w as u64, height_for_width(current, w) as u64),
        (None, Some(h), None) => (width_for_height(current, h) as u64, h as u64),
        (None, None, Some(s)) if s.is_finite() && s > 0.0 => scaled_dimensions(current, s),
        (None, None, Some(s)) => return Err(TransformError::InvalidScale(s)),
        (None, None, None) => return Err(TransformError::MissingTarget),
        _ => return Err(TransformError::ConflictingTarget),
    };
    if width == 0 || height == 0 {
        return Err(TransformError::ZeroDimension { width, height });
    }
    if width > max_dimension as u64 || height > max_dimension as u64 {
        return Err(TransformError::TooLarge {
            width,
            height,
            max: max_dimension,
        });
    }
    check_pixels(width, height, settings.max_pixels)?;
    Ok((width as u32, height as u32))
}

fn check_pixels(width: u64, height: u64, max: u64) -> Result<(), TransformError> {
    if width.saturating_mul(height) > max {
        return Err(TransformError::TooManyPixels { width, height, max });
    }
    Ok(())
}

/// Extension a converted image will be saved under.
pub fn convert(format: &str, supported: &[OutputFormat]) -> Result<Extension, TransformError> {
    target_format(format, supported).map(OutputFormat::extension)
}

fn target_format(tag: &str, supported: &[OutputFormat]) -> Result<OutputFormat, TransformError> {
    tag.parse::<OutputFormat>()
        .ok()
        .filter(|f| supported.contains(f))
        .ok_or_else(|| TransformError::UnsupportedFormat(tag.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::gradient_image;

    fn settings() -> TransformSettings {
        TransformSettings::default()
    }

    // =========================================================================
    // crop
    // =========================================================================

    #[test]
    fn crop_yields_rectangle_size() {
        let img = gradient_image(100, 80);
        for (x, y, w, h) in [(0, 0, 100, 80), (10, 20, 30, 40), (99, 79, 1, 1)] {
            let out = crop(
                &img,
                &CropParams {
                    x,
                    y,
                    width: w,
                    height: h,
                },
            )
            .unwrap();
            assert_eq!(out.dimensions(), (w, h));
        }
    }

    #[test]
    fn crop_keeps_source_pixels() {
        let img = gradient_image(50, 50);
        let out = crop(
            &img,
            &CropParams {
                x: 10,
                y: 5,
                width: 4,
                height: 4,
            },
        )
        .unwrap();
        assert_eq!(out.get_pixel(0, 0), img.get_pixel(10, 5));
        assert_eq!(out.get_pixel(3, 3), img.get_pixel(13, 8));
    }

    #[test]
    fn crop_out_of_bounds_reports_image_size() {
        let img = gradient_image(100, 100);
        let err = crop(
            &img,
            &CropParams {
                x: 90,
                y: 0,
                width: 20,
                height: 10,
            },
        )
        .unwrap_err();
        assert_eq!(
            err,
            TransformError::OutOfBounds {
                x: 90,
                y: 0,
                width: 20,
                height: 10,
                image_width: 100,
                image_height: 100,
            }
        );
    }

    #[test]
    fn crop_validate_rejects_zero_size() {
        let params = CropParams {
            x: 0,
            y: 0,
            width: 0,
            height: 10,
        };
        assert!(matches!(
            params.validate(&settings()),
            Err(TransformError::ZeroDimension { width: 0, height: 10 })
        ));
    }

    // =========================================================================
    // resize
    // =========================================================================

    #[test]
    fn resize_exact_dimensions() {
        let img = gradient_image(64, 48);
        for (w, h) in [(32, 24), (1, 1), (100, 7)] {
            let params = ResizeParams {
                width: Some(w),
                height: Some(h),
                scale: None,
            };
            params.validate(&settings()).unwrap();
            let StepOutput::Image(out) = params.apply(&img, &settings()).unwrap() else {
                panic!("resize must produce an image");
            };
            assert_eq!(out.dimensions(), (w, h));
        }
    }

    #[test]
    fn resize_zero_width_or_height_rejected() {
        for (w, h) in [(0, 10), (10, 0), (0, 0)] {
            let params = ResizeParams {
                width: Some(w),
                height: Some(h),
                scale: None,
            };
            assert!(matches!(
                params.validate(&settings()),
                Err(TransformError::ZeroDimension { .. })
            ));
        }
    }

    #[test]
    fn resize_is_deterministic() {
        let img = gradient_image(97, 61);
        let a = resize(&img, 40, 30);
        let b = resize(&img, 40, 30);
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn resize_target_keeps_aspect_for_single_side() {
        let only_width = ResizeParams {
            width: Some(800),
            ..ResizeParams::default()
        };
        assert_eq!(
            resize_target((1600, 900), &only_width, &settings()),
            Ok((800, 450))
        );

        let only_height = ResizeParams {
            height: Some(400),
            ..ResizeParams::default()
        };
        assert_eq!(
            resize_target((600, 800), &only_height, &settings()),
            Ok((300, 400))
        );
    }

    #[test]
    fn resize_target_scale() {
        let params = ResizeParams {
            scale: Some(0.5),
            ..ResizeParams::default()
        };
        assert_eq!(
            resize_target((200, 150), &params, &settings()),
            Ok((100, 75))
        );
    }

    #[test]
    fn resize_target_scale_collapsing_to_zero_fails() {
        let params = ResizeParams {
            scale: Some(0.01),
            ..ResizeParams::default()
        };
        assert_eq!(
            resize_target((10, 10), &params, &settings()),
            Err(TransformError::ZeroDimension {
                width: 0,
                height: 0
            })
        );
    }

    #[test]
    fn resize_target_over_limit_fails() {
        let params = ResizeParams {
            scale: Some(4.0),
            ..ResizeParams::default()
        };
        let small = TransformSettings {
            max_dimension: 256,
            ..settings()
        };
        assert!(matches!(
            resize_target((100, 100), &params, &small),
            Err(TransformError::TooLarge { max: 256, .. })
        ));
    }

    #[test]
    fn resize_pixel_count_is_capped() {
        let capped = TransformSettings {
            max_pixels: 10_000,
            ..settings()
        };
        let exact = ResizeParams {
            width: Some(200),
            height: Some(100),
            scale: None,
        };
        assert_eq!(
            exact.validate(&capped),
            Err(TransformError::TooManyPixels {
                width: 200,
                height: 100,
                max: 10_000
            })
        );

        // A single side passes validation; the derived size is checked on apply
        let one_side = ResizeParams {
            width: Some(200),
            ..ResizeParams::default()
        };
        one_side.validate(&capped).unwrap();
        assert!(matches!(
            one_side.apply(&gradient_image(100, 100), &capped),
            Err(TransformError::TooManyPixels { .. })
        ));

        // Within both caps
        assert_eq!(resize_target((100, 100), &one_side, &settings()), Ok((200, 200)));
    }

    #[test]
    fn default_caps_reject_largest_exact_resize() {
        let params = ResizeParams {
            width: Some(DEFAULT_MAX_DIMENSION),
            height: Some(DEFAULT_MAX_DIMENSION),
            scale: None,
        };
        assert!(matches!(
            params.validate(&settings()),
            Err(TransformError::TooManyPixels { .. })
        ));
    }

    #[test]
    fn resize_validate_rules() {
        let s = settings();
        assert_eq!(
            ResizeParams::default().validate(&s),
            Err(TransformError::MissingTarget)
        );
        assert_eq!(
            ResizeParams {
                width: Some(10),
                height: None,
                scale: Some(2.0)
            }
            .validate(&s),
            Err(TransformError::ConflictingTarget)
        );
        assert!(matches!(
            ResizeParams {
                scale: Some(-1.0),
                ..ResizeParams::default()
            }
            .validate(&s),
            Err(TransformError::InvalidScale(_))
        ));
        assert!(matches!(
            ResizeParams {
                scale: Some(f64::NAN),
                ..ResizeParams::default()
            }
            .validate(&s),
            Err(TransformError::InvalidScale(_))
        ));
        assert!(matches!(
            ResizeParams {
                width: Some(DEFAULT_MAX_DIMENSION + 1),
                ..ResizeParams::default()
            }
            .validate(&s),
            Err(TransformError::TooLarge { .. })
        ));
    }

    // =========================================================================
    // convert
    // =========================================================================

    #[test]
    fn convert_reports_new_extension() {
        let ext = convert("png", &OutputFormat::ALL).unwrap();
        assert_eq!(ext.as_str(), ".png");
        assert_eq!(convert("JPEG", &OutputFormat::ALL).unwrap().as_str(), ".jpg");
    }

    #[test]
    fn convert_leaves_geometry_alone() {
        let img = gradient_image(30, 20);
        let params = ConvertParams {
            format: "webp".into(),
        };
        let out = params.apply(&img, &settings()).unwrap();
        assert!(matches!(out, StepOutput::Extension(ref e) if e.as_str() == ".webp"));
    }

    #[test]
    fn convert_rejects_unknown_format() {
        assert_eq!(
            convert("gif", &OutputFormat::ALL),
            Err(TransformError::UnsupportedFormat("gif".into()))
        );
    }

    #[test]
    fn convert_rejects_format_outside_configured_set() {
        let supported = [OutputFormat::Jpeg, OutputFormat::Png];
        assert_eq!(
            convert("avif", &supported),
            Err(TransformError::UnsupportedFormat("avif".into()))
        );
        assert!(convert("png", &supported).is_ok());
    }
}
