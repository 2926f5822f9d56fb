//! Output formats and file extensions.
//!
//! The pipeline tracks the extension a result will be persisted under
//! separately from the pixel buffer. Only a convert step changes it; the
//! actual re-encoding happens when the store saves the final image.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Encodings a convert step may target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    Webp,
    Tiff,
    Avif,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 5] = [
        OutputFormat::Jpeg,
        OutputFormat::Png,
        OutputFormat::Webp,
        OutputFormat::Tiff,
        OutputFormat::Avif,
    ];

    /// Canonical tag, as written in config files.
    pub fn name(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
            OutputFormat::Tiff => "tiff",
            OutputFormat::Avif => "avif",
        }
    }

    /// Extension a converted image is persisted under.
    pub fn extension(self) -> Extension {
        let ext = match self {
            OutputFormat::Jpeg => ".jpg",
            OutputFormat::Png => ".png",
            OutputFormat::Webp => ".webp",
            OutputFormat::Tiff => ".tiff",
            OutputFormat::Avif => ".avif",
        };
        Extension(ext.to_string())
    }

    /// Map an extension back to its encoder. `None` for anything we can't write.
    pub fn from_extension(ext: &Extension) -> Option<Self> {
        ext.without_dot().parse().ok()
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFormat(pub String);

impl fmt::Display for UnknownFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown image format `{}`", self.0)
    }
}

impl std::error::Error for UnknownFormat {}

impl FromStr for OutputFormat {
    type Err = UnknownFormat;

    /// Case-insensitive, accepts `jpg` and `tif` aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::Webp),
            "tif" | "tiff" => Ok(OutputFormat::Tiff),
            "avif" => Ok(OutputFormat::Avif),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

/// Lowercased file extension including the leading dot (`.jpg`).
///
/// Empty when the source file has no extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Extension(String);

impl Extension {
    /// Build from a raw extension, with or without the dot.
    pub fn new(raw: &str) -> Self {
        let raw = raw.trim().trim_start_matches('.').to_ascii_lowercase();
        if raw.is_empty() {
            Self::default()
        } else {
            Self(format!(".{raw}"))
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::new)
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn without_dot(&self) -> &str {
        self.0.trim_start_matches('.')
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
