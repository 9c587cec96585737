//! Run state: the linear stage machine and the per-run snapshot.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{DetectionResult, EnhancementResult, ExtractionResult, ValidationResult};

/// Stages of a pipeline run.
///
/// `Idle → Detecting → Enhancing → Extracting → Validating → Complete`, with
/// `Errored` reachable from every non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Idle,
    Detecting,
    Enhancing,
    Extracting,
    Validating,
    Complete,
    Errored,
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Errored)
    }

    /// The stage that follows on success.
    pub fn next(&self) -> Option<Stage> {
        match self {
            Self::Idle => Some(Self::Detecting),
            Self::Detecting => Some(Self::Enhancing),
            Self::Enhancing => Some(Self::Extracting),
            Self::Extracting => Some(Self::Validating),
            Self::Validating => Some(Self::Complete),
            Self::Complete | Self::Errored => None,
        }
    }

    pub fn can_advance_to(&self, to: Stage) -> bool {
        if to == Self::Errored {
            return !self.is_terminal();
        }
        self.next() == Some(to)
    }

    /// Progress checkpoint reached on entering this stage. `Errored` keeps
    /// whatever progress the run had.
    pub fn checkpoint(&self) -> Option<u8> {
        match self {
            Self::Idle => Some(0),
            Self::Detecting => Some(20),
            Self::Enhancing => Some(40),
            Self::Extracting => Some(60),
            Self::Validating => Some(80),
            Self::Complete => Some(100),
            Self::Errored => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Detecting => "detecting",
            Self::Enhancing => "enhancing",
            Self::Extracting => "extracting",
            Self::Validating => "validating",
            Self::Complete => "complete",
            Self::Errored => "errored",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single visible error of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunError {
    /// Failing stage; `None` for input errors raised before any stage ran.
    pub stage: Option<Stage>,
    /// Step label shown at the time of failure.
    pub step: Option<String>,
    /// Underlying failure message.
    pub message: String,
    /// Combined user-facing message.
    pub summary: String,
}

impl RunError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            stage: None,
            step: None,
            summary: message.clone(),
            message,
        }
    }

    pub fn stage_failed(stage: Stage, step: Option<&str>, message: impl Into<String>) -> Self {
        let message = message.into();
        let label = step.unwrap_or("Unknown");
        Self {
            stage: Some(stage),
            step: step.map(str::to_string),
            summary: format!("Failed at step: {label}. Error: {message}"),
            message,
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary)
    }
}

/// Snapshot of one pipeline run.
///
/// Results of completed stages stay set when a later stage fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRun {
    pub id: Uuid,
    pub stage: Stage,
    /// Human-readable label of the current step.
    pub step: Option<String>,
    /// 0..=100, never decreases within a run.
    pub progress: u8,
    pub detection: Option<DetectionResult>,
    pub enhancement: Option<EnhancementResult>,
    /// Whether the enhancer was asked to sharpen the crop.
    pub enhancement_attempted: bool,
    pub extraction: Option<ExtractionResult>,
    pub validation: Option<ValidationResult>,
    pub error: Option<RunError>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl PipelineRun {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            stage: Stage::Idle,
            step: None,
            progress: 0,
            detection: None,
            enhancement: None,
            enhancement_attempted: false,
            extraction: None,
            validation: None,
            error: None,
            started_at: None,
            finished_at: None,
        }
    }

    /// Discard every result and error; the run gets a fresh id.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Enter `stage` with a step label. Returns `false` (and leaves the run
    /// untouched) when the transition is not allowed.
    pub fn advance(&mut self, stage: Stage, step: impl Into<String>) -> bool {
        if !self.stage.can_advance_to(stage) {
            return false;
        }
        if self.stage == Stage::Idle {
            self.started_at = Some(Utc::now());
        }
        self.stage = stage;
        self.step = Some(step.into());
        if let Some(checkpoint) = stage.checkpoint() {
            self.progress = self.progress.max(checkpoint);
        }
        if stage.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
        true
    }

    /// Move to `Errored`, keeping results and progress.
    pub fn fail(&mut self, error: RunError) -> bool {
        if !self.stage.can_advance_to(Stage::Errored) {
            return false;
        }
        self.stage = Stage::Errored;
        self.error = Some(error);
        self.finished_at = Some(Utc::now());
        true
    }

    pub fn is_finished(&self) -> bool {
        self.stage.is_terminal()
    }

    pub fn has_results(&self) -> bool {
        self.detection.is_some()
            || self.enhancement.is_some()
            || self.extraction.is_some()
            || self.validation.is_some()
    }
}

impl Default for PipelineRun {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageRef;

    #[test]
    fn stages_advance_linearly() {
        let mut run = PipelineRun::new();
        assert!(!run.advance(Stage::Enhancing, "skip ahead"));
        assert!(run.advance(Stage::Detecting, "Detecting & Cropping plate..."));
        assert!(run.started_at.is_some());
        assert!(run.advance(Stage::Enhancing, "Processing image..."));
        assert!(!run.advance(Stage::Detecting, "backwards"));
        assert!(run.advance(Stage::Extracting, "Extracting text..."));
        assert!(run.advance(Stage::Validating, "Validating format..."));
        assert!(run.advance(Stage::Complete, "Analysis Complete!"));
        assert_eq!(run.progress, 100);
        assert!(run.is_finished());
        assert!(!run.fail(RunError::invalid_input("too late")));
    }

    #[test]
    fn progress_checkpoints() {
        let checkpoints: Vec<_> = [
            Stage::Detecting,
            Stage::Enhancing,
            Stage::Extracting,
            Stage::Validating,
            Stage::Complete,
        ]
        .iter()
        .filter_map(Stage::checkpoint)
        .collect();
        assert_eq!(checkpoints, vec![20, 40, 60, 80, 100]);
        assert_eq!(Stage::Errored.checkpoint(), None);
    }

    #[test]
    fn failure_keeps_results_and_progress() {
        let mut run = PipelineRun::new();
        run.advance(Stage::Detecting, "Detecting & Cropping plate...");
        run.detection = Some(crate::DetectionResult::fallback(&ImageRef::new(
            "image/png",
            vec![1],
        )));
        run.advance(Stage::Enhancing, "Processing image...");
        let step = run.step.clone();
        assert!(run.fail(RunError::stage_failed(Stage::Enhancing, step.as_deref(), "boom")));
        assert_eq!(run.stage, Stage::Errored);
        assert_eq!(run.progress, 40);
        assert!(run.detection.is_some());
        assert_eq!(
            run.error.unwrap().summary,
            "Failed at step: Processing image.... Error: boom"
        );
    }

    #[test]
    fn reset_clears_everything() {
        let mut run = PipelineRun::new();
        let first_id = run.id;
        run.advance(Stage::Detecting, "Detecting & Cropping plate...");
        run.extraction = Some(crate::ExtractionResult { text: "KA05N123".into() });
        run.fail(RunError::invalid_input("x"));
        run.reset();
        assert_ne!(run.id, first_id);
        assert_eq!(run.stage, Stage::Idle);
        assert_eq!(run.progress, 0);
        assert!(!run.has_results());
        assert!(run.error.is_none());
    }

    #[test]
    fn idle_can_error_for_bad_input() {
        let mut run = PipelineRun::new();
        assert!(run.fail(RunError::invalid_input("Please upload an image first.")));
        let err = run.error.unwrap();
        assert_eq!(err.stage, None);
        assert_eq!(err.summary, "Please upload an image first.");
    }
}
