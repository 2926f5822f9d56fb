//! Request processing.
//!
//! Ties the stages together for one request:
//!
//! ```text
//! body ──validate──▶ Request ──find/load──▶ PipelineState ──run──▶ PipelineRun
//!                                                                     │
//!                            reference ◀──save── name ◀──generate─────┘
//! ```
//!
//! Nothing is written unless every action succeeded. A failure at any stage
//! becomes a [`ProcessError`], which maps onto one [`ErrorCategory`]; the
//! numeric status codes exist for transports, the core only deals in
//! categories.

use crate::config::EditorConfig;
use crate::imaging::{Extension, ImageStore, StoreError, TransformError};
use crate::naming::{NameError, TokenSource, generate_name};
use crate::pipeline::{AppliedStep, Pipeline, PipelineError, PipelineState};
use crate::request::{Request, ValidationError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),
    #[error("could not read source image: {0}")]
    Source(#[source] StoreError),
    #[error("{0}")]
    Pipeline(#[from] PipelineError),
    #[error("failed to generate output name: {0}")]
    Naming(#[from] NameError),
    #[error("failed to save result: {0}")]
    Persist(#[source] StoreError),
}

/// Caller-facing classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    MalformedInput,
    NotFound,
    InvalidAction,
    OutOfRange,
    UnsupportedEncoding,
    Internal,
}

impl ErrorCategory {
    /// HTTP-style status code for transports that want one.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorCategory::MalformedInput
            | ErrorCategory::InvalidAction
            | ErrorCategory::OutOfRange => 400,
            ErrorCategory::NotFound => 404,
            ErrorCategory::UnsupportedEncoding => 415,
            ErrorCategory::Internal => 500,
        }
    }
}

impl ProcessError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ProcessError::Validation(_) => ErrorCategory::MalformedInput,
            // Any source that can't be located or decoded counts as missing
            ProcessError::Source(_) => ErrorCategory::NotFound,
            ProcessError::Pipeline(PipelineError::UnknownAction { .. }) => {
                ErrorCategory::InvalidAction
            }
            ProcessError::Pipeline(PipelineError::Decode { .. }) => ErrorCategory::MalformedInput,
            ProcessError::Pipeline(PipelineError::Transform { source, .. }) => match source {
                TransformError::UnsupportedFormat(_) => ErrorCategory::UnsupportedEncoding,
                _ => ErrorCategory::OutOfRange,
            },
            ProcessError::Naming(_) => ErrorCategory::Internal,
            ProcessError::Persist(StoreError::Io(_)) => ErrorCategory::Internal,
            ProcessError::Persist(_) => ErrorCategory::UnsupportedEncoding,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.category().status_code()
    }
}

/// Everything known about a successful request.
#[derive(Debug, Clone)]
pub struct ProcessReport {
    pub image_name: String,
    /// Public reference returned by the store.
    pub reference: String,
    /// Generated output name.
    pub name: String,
    pub source_dimensions: (u32, u32),
    pub source_extension: Extension,
    pub output_dimensions: (u32, u32),
    pub steps: Vec<AppliedStep>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Error,
}

/// Wire shape of a request outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ProcessResponse {
    pub fn from_result(result: &Result<ProcessReport, ProcessError>) -> Self {
        match result {
            Ok(report) => Self {
                status: ResponseStatus::Ok,
                reference: Some(report.reference.clone()),
                error_message: None,
            },
            Err(e) => Self {
                status: ResponseStatus::Error,
                reference: None,
                error_message: Some(e.to_string()),
            },
        }
    }
}

/// Validate a raw JSON body, then process it.
pub fn process_body(
    store: &impl ImageStore,
    tokens: &impl TokenSource,
    config: &EditorConfig,
    body: &str,
) -> Result<ProcessReport, ProcessError> {
    let request = Request::parse(body, &config.request_limits()).inspect_err(|e| {
        tracing::error!(error = %e, field = e.field(), "request rejected");
    })?;
    process_request(store, tokens, config, &request)
}

/// Run a validated request end to end and persist the result.
#[tracing::instrument(
    name = "process",
    skip_all,
    fields(image = %request.image_name(), actions = request.actions().len())
)]
pub fn process_request(
    store: &impl ImageStore,
    tokens: &impl TokenSource,
    config: &EditorConfig,
    request: &Request,
) -> Result<ProcessReport, ProcessError> {
    let result = run_stages(store, tokens, config, request);
    match &result {
        Ok(report) => tracing::info!(
            reference = %report.reference,
            width = report.output_dimensions.0,
            height = report.output_dimensions.1,
            "saved processed image"
        ),
        Err(e) => tracing::error!(
            error = %e,
            category = ?e.category(),
            "request failed"
        ),
    }
    result
}

fn run_stages(
    store: &impl ImageStore,
    tokens: &impl TokenSource,
    config: &EditorConfig,
    request: &Request,
) -> Result<ProcessReport, ProcessError> {
    let name = request.image_name();
    let path = store.find(name).map_err(ProcessError::Source)?;
    let source_extension = Extension::from_path(&path);
    let image = store.load(name).map_err(ProcessError::Source)?;

    let initial = PipelineState::new(image, source_extension.clone());
    let source_dimensions = initial.dimensions();

    let pipeline = Pipeline::new(config.transform_settings());
    let run = pipeline.run(request.actions(), initial)?;

    let output_dimensions = run.state.dimensions();
    let (image, extension) = run.state.into_parts();
    let output_name = generate_name(tokens, &config.output.name_prefix, &extension)?;
    let reference = store
        .save(&image, &output_name)
        .map_err(ProcessError::Persist)?;

    Ok(ProcessReport {
        image_name: name.to_string(),
        reference,
        name: output_name,
        source_dimensions,
        source_extension,
        output_dimensions,
        steps: run.steps,
    })
}
