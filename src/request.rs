//! Inbound request shape and schema-level validation.
//!
//! A request names a stored image and lists the actions to apply to it:
//!
//! ```json
//! {
//!   "image_name": "cat.jpg",
//!   "actions": [
//!     {"action": "crop",    "params": {"x": 10, "y": 10, "width": 200, "height": 150}},
//!     {"action": "resize",  "params": {"width": 100}},
//!     {"action": "convert", "params": {"format": "png"}}
//!   ]
//! }
//! ```
//!
//! Parsing happens in two steps. [`RawRequest`] mirrors the wire format with
//! every field optional, so a missing field is reported by name instead of as
//! an opaque decode error. [`RawRequest::validate`] then applies the arity and
//! length rules and produces a [`Request`], which is what the pipeline runs.
//! Nothing about the action *parameters* is checked here beyond presence;
//! their shape is the dispatcher's business.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hard ceiling on actions per request.
pub const MAX_ACTIONS: usize = 5;
pub const MAX_IMAGE_NAME_LEN: usize = 100;
pub const MAX_KIND_LEN: usize = 10;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("empty request")]
    EmptyBody,
    #[error("failed to decode request: {0}")]
    Malformed(String),
    #[error("field {0} is required")]
    Missing(String),
    #[error("field {0} must not be empty")]
    Empty(String),
    #[error("field {field} must have at most {max} elements (got {actual})")]
    TooMany {
        field: String,
        max: usize,
        actual: usize,
    },
    #[error("field {field} must be at most {max} characters (got {actual})")]
    TooLong {
        field: String,
        max: usize,
        actual: usize,
    },
}

impl ValidationError {
    /// The offending field, when the error is about one.
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::EmptyBody | ValidationError::Malformed(_) => None,
            ValidationError::Missing(f) | ValidationError::Empty(f) => Some(f),
            ValidationError::TooMany { field, .. } | ValidationError::TooLong { field, .. } => {
                Some(field)
            }
        }
    }
}

/// Per-request limits. Defaults are also the maximums.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLimits {
    pub max_actions: usize,
    pub max_image_name_len: usize,
    pub max_kind_len: usize,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_actions: MAX_ACTIONS,
            max_image_name_len: MAX_IMAGE_NAME_LEN,
            max_kind_len: MAX_KIND_LEN,
        }
    }
}

/// One action as it arrives on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAction {
    #[serde(rename = "action", alias = "kind", default)]
    pub kind: Option<String>,
    /// `null` deserializes to `None` and is rejected like a missing field.
    #[serde(default)]
    pub params: Option<serde_json::Value>,
}

/// A request as it arrives on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRequest {
    #[serde(default)]
    pub actions: Option<Vec<RawAction>>,
    #[serde(alias = "imageName", default)]
    pub image_name: Option<String>,
}

impl RawRequest {
    /// Parse a JSON body. An empty body and an unparsable one are reported
    /// separately.
    pub fn from_json(body: &str) -> Result<Self, ValidationError> {
        if body.trim().is_empty() {
            return Err(ValidationError::EmptyBody);
        }
        serde_json::from_str(body).map_err(|e| ValidationError::Malformed(e.to_string()))
    }

    /// Check every schema rule and produce a runnable [`Request`].
    ///
    /// Top-level fields are checked first, then each action in order; the
    /// first violation wins.
    pub fn validate(self, limits: &RequestLimits) -> Result<Request, ValidationError> {
        let image_name = self
            .image_name
            .ok_or_else(|| ValidationError::Missing("image_name".into()))?;
        check_text("image_name", &image_name, limits.max_image_name_len)?;

        let raw_actions = self
            .actions
            .ok_or_else(|| ValidationError::Missing("actions".into()))?;
        if raw_actions.is_empty() {
            return Err(ValidationError::Empty("actions".into()));
        }
        if raw_actions.len() > limits.max_actions {
            return Err(ValidationError::TooMany {
                field: "actions".into(),
                max: limits.max_actions,
                actual: raw_actions.len(),
            });
        }

        let actions = raw_actions
            .into_iter()
            .enumerate()
            .map(|(i, raw)| raw.validate(i, limits))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Request {
            image_name,
            actions,
        })
    }
}

impl RawAction {
    fn validate(self, index: usize, limits: &RequestLimits) -> Result<Action, ValidationError> {
        let kind_field = format!("actions[{index}].action");
        let kind = self
            .kind
            .ok_or_else(|| ValidationError::Missing(kind_field.clone()))?;
        check_text(&kind_field, &kind, limits.max_kind_len)?;

        let params = self
            .params
            .ok_or_else(|| ValidationError::Missing(format!("actions[{index}].params")))?;

        Ok(Action { kind, params })
    }
}

/// Required, non-empty, and at most `max` characters (not bytes).
fn check_text(field: &str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Missing(field.to_string()));
    }
    let len = value.chars().count();
    if len > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
            actual: len,
        });
    }
    Ok(())
}

/// A validated action: kind tag present, params present and non-null.
///
/// The kind is still an arbitrary string at this point; unknown kinds are
/// reported by the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    kind: String,
    params: serde_json::Value,
}

impl Action {
    pub fn new(kind: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            params,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn params(&self) -> &serde_json::Value {
        &self.params
    }
}

/// A validated request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    image_name: String,
    actions: Vec<Action>,
}

impl Request {
    /// Parse and validate in one go.
    pub fn parse(body: &str, limits: &RequestLimits) -> Result<Self, ValidationError> {
        RawRequest::from_json(body)?.validate(limits)
    }

    pub fn image_name(&self) -> &str {
        &self.image_name
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }
}
