//! # Photo Editor
//!
//! Applies a short, ordered list of image actions (crop, resize, convert) to a
//! stored image and saves the result under a freshly generated name.
//!
//! # Architecture: One Request, One Pipeline
//!
//! ```text
//! 1. Validate   JSON body      →  Request         (shape + limits, no image yet)
//! 2. Run        Request        →  PipelineState   (each action sees the previous output)
//! 3. Persist    PipelineState  →  reference       (random name, encoder from extension)
//! ```
//!
//! A request either completes every action and is saved exactly once, or fails
//! with the first error and saves nothing. Every failure maps onto a small set
//! of categories (malformed input, not found, invalid action, out-of-range
//! parameters, unsupported encoding, internal) so any transport can report it.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`request`] | Request schema, size limits, and the structural validator |
//! | [`pipeline`] | Action dispatch and the left-to-right runner |
//! | [`imaging`] | Typed action parameters, crop/resize/convert transforms, output formats, image storage |
//! | [`naming`] | Random output names from the OS RNG |
//! | [`process`] | The end-to-end request service and error categories |
//! | [`config`] | `config.toml` loading, validation, and merging onto stock defaults |
//! | [`output`] | CLI output formatting for reports, plans, and errors |
//!
//! # Design Decisions
//!
//! ## Closed Action Set
//!
//! Action kinds are a closed enum ([`imaging::ActionKind`]) with one typed
//! parameter struct each. Unknown kinds pass request validation (the
//! validator only checks shape) and are rejected by the dispatcher with their
//! position in the list, so the caller learns exactly which step was wrong.
//!
//! ## Functional State Threading
//!
//! Transforms borrow the current `(image, extension)` state and return only
//! what changed. The runner folds that into the next state after the step
//! succeeds, so a failed step can never leave a half-updated state behind.
//!
//! ## Convert Is Deferred
//!
//! `convert` only changes the extension carried through the pipeline. Pixels
//! are encoded once, at save time, by the store's encoder for the final
//! extension. Later crops and resizes after a convert stay lossless.

pub mod config;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod request;

#[cfg(test)]
pub(crate) mod test_helpers;
