//! Output name generation.
//!
//! Every processed image is stored under a fresh name so concurrent requests
//! never overwrite each other:
//!
//! ```text
//! {prefix}_{32 hex chars}{extension}
//! proc_4f1c9a0e5b7d2c8836e1a0b9f3d4c5e6.png
//! ```
//!
//! The token is 16 bytes from the operating system's RNG. Randomness comes
//! through the [`TokenSource`] trait so a failing source can be simulated;
//! a failure there is internal, never something the caller can fix.

use rand::TryRngCore;
use rand::rngs::OsRng;
use thiserror::Error;

use crate::imaging::Extension;

/// Bytes of randomness per generated name.
pub const TOKEN_BYTES: usize = 16;

#[derive(Error, Debug)]
pub enum NameError {
    #[error("randomness source unavailable: {0}")]
    Randomness(String),
}

/// Source of random bytes for name tokens.
pub trait TokenSource: Sync {
    fn fill(&self, buf: &mut [u8]) -> Result<(), NameError>;
}

/// Operating-system RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsTokenSource;

impl TokenSource for OsTokenSource {
    fn fill(&self, buf: &mut [u8]) -> Result<(), NameError> {
        let mut rng = OsRng;
        rng.try_fill_bytes(buf)
            .map_err(|e| NameError::Randomness(e.to_string()))
    }
}

/// Hex token of `bytes` random bytes.
pub fn random_token(source: &impl TokenSource, bytes: usize) -> Result<String, NameError> {
    let mut buf = vec![0u8; bytes];
    source.fill(&mut buf)?;
    Ok(hex::encode(buf))
}

/// Generate a unique name like `proc_<token>.png`.
pub fn generate_name(
    source: &impl TokenSource,
    prefix: &str,
    extension: &Extension,
) -> Result<String, NameError> {
    let token = random_token(source, TOKEN_BYTES)?;
    Ok(format!("{prefix}_{token}{extension}"))
}
