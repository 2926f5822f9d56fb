//! The action pipeline.
//!
//! A pipeline applies an ordered list of actions to one image, strictly left
//! to right. Each step sees only the output of the step before it.
//!
//! ```text
//! (image, .jpg) ──crop──▶ (image', .jpg) ──resize──▶ (image'', .jpg) ──convert──▶ (image'', .png)
//! ```
//!
//! ## Per-step contract
//!
//! For the action at index `i`, the [`Dispatcher`]:
//!
//! 1. looks the kind tag up in the closed set (`crop`, `resize`, `convert`);
//!    anything else is [`PipelineError::UnknownAction`]
//! 2. decodes the params payload into that kind's typed shape
//!    ([`PipelineError::Decode`] on mismatch)
//! 3. runs the kind-specific validation, then the transform
//!    ([`PipelineError::Transform`] on failure)
//!
//! Crop and resize produce a new image and keep the extension; convert
//! produces a new extension and keeps the image. Every error carries the
//! index and kind of the failing action, and stops the run; there is no
//! recovery or retry.
//!
//! ## State threading
//!
//! [`PipelineState`] is owned by the runner. Transforms borrow it and return
//! a [`StepOutput`]; the runner folds that into the next state only after the
//! step succeeded, so on error the previous state is untouched and simply
//! dropped with the run.

use crate::imaging::{
    ActionKind, ActionParams, Extension, StepOutput, TransformError, TransformSettings,
};
use crate::request::Action;
use image::{DynamicImage, GenericImageView};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("action #{index}: field {kind} is not a valid action")]
    UnknownAction { index: usize, kind: String },
    #[error("action #{index}: invalid {kind} params: {source}")]
    Decode {
        index: usize,
        kind: ActionKind,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to perform action {kind} (#{index}): {source}")]
    Transform {
        index: usize,
        kind: ActionKind,
        #[source]
        source: TransformError,
    },
}

impl PipelineError {
    /// Zero-based position of the failing action.
    pub fn index(&self) -> usize {
        match self {
            PipelineError::UnknownAction { index, .. }
            | PipelineError::Decode { index, .. }
            | PipelineError::Transform { index, .. } => *index,
        }
    }

    /// Kind tag of the failing action, as the caller sent it.
    pub fn kind(&self) -> &str {
        match self {
            PipelineError::UnknownAction { kind, .. } => kind,
            PipelineError::Decode { kind, .. } | PipelineError::Transform { kind, .. } => {
                kind.as_str()
            }
        }
    }
}

/// The `(image, extension)` pair threaded through a run.
#[derive(Debug, Clone)]
pub struct PipelineState {
    image: DynamicImage,
    extension: Extension,
}

impl PipelineState {
    pub fn new(image: DynamicImage, extension: Extension) -> Self {
        Self { image, extension }
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn extension(&self) -> &Extension {
        &self.extension
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn into_parts(self) -> (DynamicImage, Extension) {
        (self.image, self.extension)
    }

    /// Fold one step's output into the next state.
    fn advance(self, output: StepOutput) -> Self {
        match output {
            StepOutput::Image(image) => Self { image, ..self },
            StepOutput::Extension(extension) => Self { extension, ..self },
        }
    }
}

/// Record of one successfully applied action.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedStep {
    pub index: usize,
    pub kind: ActionKind,
    pub description: String,
    /// Image size after the step.
    pub dimensions: (u32, u32),
    /// Extension after the step.
    pub extension: Extension,
}

/// Result of a complete run.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub state: PipelineState,
    pub steps: Vec<AppliedStep>,
}

/// Maps an action to its decode/validate/transform triple.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher<'a> {
    settings: &'a TransformSettings,
}

impl<'a> Dispatcher<'a> {
    pub fn new(settings: &'a TransformSettings) -> Self {
        Self { settings }
    }

    /// Decode and validate an action without touching an image.
    pub fn prepare(&self, index: usize, action: &Action) -> Result<ActionParams, PipelineError> {
        let kind = ActionKind::parse(action.kind()).ok_or_else(|| PipelineError::UnknownAction {
            index,
            kind: action.kind().to_string(),
        })?;

        let params = ActionParams::decode(kind, action.params())
            .map_err(|source| PipelineError::Decode { index, kind, source })?;

        params
            .validate(self.settings)
            .map_err(|source| PipelineError::Transform { index, kind, source })?;

        Ok(params)
    }

    /// Run one step against the current state.
    pub fn dispatch(
        &self,
        index: usize,
        action: &Action,
        state: &PipelineState,
    ) -> Result<(ActionParams, StepOutput), PipelineError> {
        let params = self.prepare(index, action)?;
        let output = params
            .apply(&state.image, self.settings)
            .map_err(|source| PipelineError::Transform {
                index,
                kind: params.kind(),
                source,
            })?;
        Ok((params, output))
    }
}

/// Drives the dispatcher over a full action list.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    settings: TransformSettings,
}

impl Pipeline {
    pub fn new(settings: TransformSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &TransformSettings {
        &self.settings
    }

    /// Apply every action in order, stopping at the first failure.
    #[tracing::instrument(
        name = "pipeline",
        skip_all,
        fields(actions = actions.len(), extension = %initial.extension())
    )]
    pub fn run(
        &self,
        actions: &[Action],
        initial: PipelineState,
    ) -> Result<PipelineRun, PipelineError> {
        let dispatcher = Dispatcher::new(&self.settings);
        let mut state = initial;
        let mut steps = Vec::with_capacity(actions.len());

        for (index, action) in actions.iter().enumerate() {
            let (params, output) = dispatcher.dispatch(index, action, &state).inspect_err(|e| {
                tracing::debug!(index, kind = action.kind(), error = %e, "step failed");
            })?;
            state = state.advance(output);

            let (width, height) = state.dimensions();
            tracing::debug!(
                index,
                kind = %params.kind(),
                width,
                height,
                extension = %state.extension(),
                "step applied"
            );
            steps.push(AppliedStep {
                index,
                kind: params.kind(),
                description: params.describe(),
                dimensions: (width, height),
                extension: state.extension().clone(),
            });
        }

        Ok(PipelineRun { state, steps })
    }

    /// Decode and validate every action without an image.
    ///
    /// Catches unknown kinds, malformed params and image-independent
    /// violations. Bounds checks that need the image still only happen
    /// during [`run`](Self::run).
    pub fn plan(&self, actions: &[Action]) -> Result<Vec<ActionParams>, PipelineError> {
        let dispatcher = Dispatcher::new(&self.settings);
        actions
            .iter()
            .enumerate()
            .map(|(index, action)| dispatcher.prepare(index, action))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::{CropParams, OutputFormat, crop, resize};
    use crate::test_helpers::{gradient_image, gradient_state};
    use serde_json::json;

    fn crop_action(x: u32, y: u32, w: u32, h: u32) -> Action {
        Action::new("crop", json!({"x": x, "y": y, "width": w, "height": h}))
    }

    fn resize_action(w: u32, h: u32) -> Action {
        Action::new("resize", json!({"width": w, "height": h}))
    }

    fn convert_action(format: &str) -> Action {
        Action::new("convert", json!({"format": format}))
    }

    // =========================================================================
    // Single steps
    // =========================================================================

    #[test]
    fn crop_step_changes_image_not_extension() {
        let run = Pipeline::default()
            .run(&[crop_action(10, 10, 30, 20)], gradient_state(100, 80, "jpg"))
            .unwrap();
        assert_eq!(run.state.dimensions(), (30, 20));
        assert_eq!(run.state.extension().as_str(), ".jpg");
    }

    #[test]
    fn convert_step_changes_extension_not_image() {
        let run = Pipeline::default()
            .run(&[convert_action("png")], gradient_state(40, 30, "jpg"))
            .unwrap();
        assert_eq!(run.state.extension().as_str(), ".png");
        assert_eq!(run.state.dimensions(), (40, 30));
        assert_eq!(
            run.state.image().as_bytes(),
            gradient_image(40, 30).as_bytes()
        );
    }

    #[test]
    fn steps_are_reported_in_order() {
        let run = Pipeline::default()
            .run(
                &[
                    crop_action(0, 0, 50, 50),
                    resize_action(10, 10),
                    convert_action("webp"),
                ],
                gradient_state(100, 100, "png"),
            )
            .unwrap();

        let kinds: Vec<ActionKind> = run.steps.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![ActionKind::Crop, ActionKind::Resize, ActionKind::Convert]
        );
        assert_eq!(run.steps[0].dimensions, (50, 50));
        assert_eq!(run.steps[1].dimensions, (10, 10));
        assert_eq!(run.steps[1].extension.as_str(), ".png");
        assert_eq!(run.steps[2].extension.as_str(), ".webp");
        assert_eq!(run.steps[2].description, "to webp");
    }

    // =========================================================================
    // Composition
    // =========================================================================

    #[test]
    fn crop_then_resize_matches_manual_composition() {
        let source = gradient_image(120, 90);
        let run = Pipeline::default()
            .run(
                &[crop_action(20, 10, 80, 60), resize_action(40, 30)],
                PipelineState::new(source.clone(), Extension::new("jpg")),
            )
            .unwrap();

        let manual = resize(
            &crop(
                &source,
                &CropParams {
                    x: 20,
                    y: 10,
                    width: 80,
                    height: 60,
                },
            )
            .unwrap(),
            40,
            30,
        );
        assert_eq!(run.state.image().as_bytes(), manual.as_bytes());
    }

    #[test]
    fn order_matters() {
        // The rectangle only fits the pre-resize image
        let actions = [resize_action(50, 50), crop_action(60, 60, 30, 30)];
        let err = Pipeline::default()
            .run(&actions, gradient_state(100, 100, "jpg"))
            .unwrap_err();
        assert_eq!(err.index(), 1);
        assert_eq!(err.kind(), "crop");

        let reversed = [crop_action(60, 60, 30, 30), resize_action(50, 50)];
        let run = Pipeline::default()
            .run(&reversed, gradient_state(100, 100, "jpg"))
            .unwrap();
        assert_eq!(run.state.dimensions(), (50, 50));
    }

    #[test]
    fn later_convert_wins() {
        let run = Pipeline::default()
            .run(
                &[convert_action("png"), convert_action("jpeg")],
                gradient_state(10, 10, "webp"),
            )
            .unwrap();
        assert_eq!(run.state.extension().as_str(), ".jpg");
    }

    // =========================================================================
    // Failures
    // =========================================================================

    #[test]
    fn unknown_kind_names_the_kind() {
        let err = Pipeline::default()
            .run(
                &[crop_action(0, 0, 5, 5), Action::new("blur", json!({"sigma": 2}))],
                gradient_state(10, 10, "jpg"),
            )
            .unwrap_err();
        assert!(matches!(
            &err,
            PipelineError::UnknownAction { index: 1, kind } if kind == "blur"
        ));
        assert!(err.to_string().contains("blur"));
    }

    #[test]
    fn crop_out_of_bounds_is_attributed_to_crop() {
        let err = Pipeline::default()
            .run(&[crop_action(90, 0, 20, 10)], gradient_state(100, 100, "jpg"))
            .unwrap_err();
        match err {
            PipelineError::Transform {
                index: 0,
                kind: ActionKind::Crop,
                source: TransformError::OutOfBounds { image_width: 100, .. },
            } => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn failed_step_leaves_caller_state_untouched() {
        let settings = TransformSettings::default();
        let dispatcher = Dispatcher::new(&settings);
        let state = gradient_state(100, 100, "jpg");

        let result = dispatcher.dispatch(0, &crop_action(90, 0, 20, 10), &state);
        assert!(result.is_err());
        assert_eq!(state.dimensions(), (100, 100));
        assert_eq!(state.image().as_bytes(), gradient_image(100, 100).as_bytes());
    }

    #[test]
    fn resize_to_zero_is_transform_error() {
        let err = Pipeline::default()
            .run(&[resize_action(0, 10)], gradient_state(10, 10, "jpg"))
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Transform {
                kind: ActionKind::Resize,
                source: TransformError::ZeroDimension { .. },
                ..
            }
        ));
    }

    #[test]
    fn malformed_params_are_decode_errors() {
        let err = Pipeline::default()
            .run(
                &[Action::new("resize", json!({"width": "big"}))],
                gradient_state(10, 10, "jpg"),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Decode {
                index: 0,
                kind: ActionKind::Resize,
                ..
            }
        ));
    }

    #[test]
    fn error_stops_the_run() {
        // The third action would fail too, but the second one is reported
        let err = Pipeline::default()
            .run(
                &[
                    convert_action("png"),
                    convert_action("gif"),
                    Action::new("blur", json!({})),
                ],
                gradient_state(10, 10, "jpg"),
            )
            .unwrap_err();
        assert_eq!(err.index(), 1);
        assert_eq!(err.kind(), "convert");
    }

    #[test]
    fn restricted_format_set_is_enforced() {
        let pipeline = Pipeline::new(TransformSettings {
            formats: vec![OutputFormat::Png],
            ..TransformSettings::default()
        });
        let err = pipeline
            .run(&[convert_action("jpeg")], gradient_state(4, 4, "png"))
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Transform {
                source: TransformError::UnsupportedFormat(_),
                ..
            }
        ));
    }

    // =========================================================================
    // plan
    // =========================================================================

    #[test]
    fn plan_decodes_without_image() {
        let params = Pipeline::default()
            .plan(&[crop_action(1, 2, 3, 4), convert_action("tiff")])
            .unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params[1].kind(), ActionKind::Convert);
    }

    #[test]
    fn plan_cannot_see_image_bounds() {
        // Bounds depend on the image, so a huge crop still plans fine
        assert!(
            Pipeline::default()
                .plan(&[crop_action(5000, 5000, 10, 10)])
                .is_ok()
        );
    }

    #[test]
    fn plan_reports_first_invalid_action() {
        let err = Pipeline::default()
            .plan(&[resize_action(10, 10), Action::new("rotate", json!({}))])
            .unwrap_err();
        assert_eq!(err.index(), 1);
        assert_eq!(err.kind(), "rotate");
    }
}
