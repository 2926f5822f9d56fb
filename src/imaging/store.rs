//! Image storage trait and shared types.
//!
//! The [`ImageStore`] trait is the boundary between the in-memory pipeline
//! and wherever images actually live. It covers the three calls a request
//! needs: locate the source, decode it, and persist the result.
//!
//! The production implementation is [`FsStore`](super::fs_store::FsStore),
//! backed by two directories on local disk.

use image::DynamicImage;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image not found: {0}")]
    NotFound(String),
    #[error("failed to decode {name}: {reason}")]
    Decode { name: String, reason: String },
    #[error("unsupported output format: {0}")]
    UnsupportedFormat(String),
    #[error("failed to encode {name}: {reason}")]
    Encode { name: String, reason: String },
}

/// Locate, load and persist images.
///
/// Implementations must be safe to share between concurrent requests; the
/// pipeline itself holds no locks.
pub trait ImageStore: Sync {
    /// Resolve an image name to its location. The extension of the returned
    /// path seeds the pipeline's extension state.
    fn find(&self, name: &str) -> Result<PathBuf, StoreError>;

    /// Decode the named image into memory.
    fn load(&self, name: &str) -> Result<DynamicImage, StoreError>;

    /// Encode `image` according to the extension of `name`, store it, and
    /// return its public reference.
    fn save(&self, image: &DynamicImage, name: &str) -> Result<String, StoreError>;
}
