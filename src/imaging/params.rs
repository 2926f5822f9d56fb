//! Parameter types for pipeline actions.
//!
//! These structs describe *what* a step should do, not *how*. They are
//! decoded from the untyped `params` payload of an action, one struct per
//! action kind, and then checked by a second, kind-specific validation pass
//! before any pixel is touched.
//!
//! ## Types
//!
//! - [`ActionKind`]: the closed set of supported kinds (`crop`, `resize`, `convert`).
//! - [`CropParams`]: rectangle to keep, in current-image pixel coordinates.
//! - [`ResizeParams`]: exact size, one side with aspect preserved, or a scale factor.
//! - [`ConvertParams`]: target encoding tag.
//! - [`ActionParams`]: tagged union of the above; the dispatcher's unit of work.
//!
//! Unknown fields are rejected so a typo like `widht` fails loudly instead of
//! silently falling back to a default.

use super::format::OutputFormat;
use super::operations::{Operation, StepOutput, TransformError, TransformSettings};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Crop,
    Resize,
    Convert,
}

impl ActionKind {
    /// Exact, case-sensitive match on the wire tag.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "crop" => Some(ActionKind::Crop),
            "resize" => Some(ActionKind::Resize),
            "convert" => Some(ActionKind::Convert),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Crop => "crop",
            ActionKind::Resize => "resize",
            ActionKind::Convert => "convert",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rectangle to keep. Origin is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CropParams {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Resize target.
///
/// - `width` + `height`: exact size (aspect ratio not preserved)
/// - only one of them: the other is derived from the current aspect ratio
/// - `scale`: both sides multiplied by the factor
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResizeParams {
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub scale: Option<f64>,
}

/// Target encoding. Kept as a raw string so an unknown tag is reported as a
/// convert failure rather than a malformed payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConvertParams {
    pub format: String,
}

/// Decoded parameters, one variant per [`ActionKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum ActionParams {
    Crop(CropParams),
    Resize(ResizeParams),
    Convert(ConvertParams),
}

impl ActionParams {
    /// Decode an untyped payload into the shape `kind` expects.
    ///
    /// Wrong field types or missing required fields surface here, before
    /// validation runs.
    pub fn decode(kind: ActionKind, payload: &serde_json::Value) -> Result<Self, serde_json::Error> {
        match kind {
            ActionKind::Crop => decode_as::<CropParams>(payload).map(ActionParams::Crop),
            ActionKind::Resize => decode_as::<ResizeParams>(payload).map(ActionParams::Resize),
            ActionKind::Convert => decode_as::<ConvertParams>(payload).map(ActionParams::Convert),
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            ActionParams::Crop(_) => CropParams::KIND,
            ActionParams::Resize(_) => ResizeParams::KIND,
            ActionParams::Convert(_) => ConvertParams::KIND,
        }
    }

    /// Kind-specific structural checks that don't need the image.
    pub fn validate(&self, settings: &TransformSettings) -> Result<(), TransformError> {
        match self {
            ActionParams::Crop(p) => p.validate(settings),
            ActionParams::Resize(p) => p.validate(settings),
            ActionParams::Convert(p) => p.validate(settings),
        }
    }

    /// Run the transform against the current image.
    pub fn apply(
        &self,
        image: &DynamicImage,
        settings: &TransformSettings,
    ) -> Result<StepOutput, TransformError> {
        match self {
            ActionParams::Crop(p) => p.apply(image, settings),
            ActionParams::Resize(p) => p.apply(image, settings),
            ActionParams::Convert(p) => p.apply(image, settings),
        }
    }

    /// One-line summary for step reports.
    pub fn describe(&self) -> String {
        match self {
            ActionParams::Crop(p) => format!("{}x{} at {},{}", p.width, p.height, p.x, p.y),
            ActionParams::Resize(p) => match (p.width, p.height, p.scale) {
                (_, _, Some(s)) => format!("scale {s}"),
                (Some(w), Some(h), None) => format!("to {w}x{h}"),
                (Some(w), None, None) => format!("to width {w}"),
                (None, Some(h), None) => format!("to height {h}"),
                (None, None, None) => "without target".to_string(),
            },
            ActionParams::Convert(p) => match p.format.parse::<OutputFormat>() {
                Ok(format) => format!("to {format}"),
                Err(_) => format!("to {}", p.format.trim().to_ascii_lowercase()),
            },
        }
    }
}

fn decode_as<T: serde::de::DeserializeOwned>(
    payload: &serde_json::Value,
) -> Result<T, serde_json::Error> {
    T::deserialize(payload)
}
