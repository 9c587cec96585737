use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use platelens_core::{ImageRef, PipelineRun, RunError, Stage, ValidationResult};
use platelens_media::{EMPTY_UPLOAD, INVALID_FILE_TYPE};
use platelens_understanding::PlateAnalyzer;

pub const STEP_DETECTING: &str = "Detecting & Cropping plate...";
pub const STEP_ENHANCING: &str = "Enhancing image...";
pub const STEP_PROCESSING: &str = "Processing image...";
pub const STEP_EXTRACTING: &str = "Extracting text...";
pub const STEP_VALIDATING: &str = "Validating format...";
pub const STEP_COMPLETE: &str = "Analysis Complete!";

pub const NO_UPLOAD: &str = "Please upload an image first.";

/// Subscriber for run snapshots.
pub type RunUpdates = mpsc::UnboundedSender<PipelineRun>;

/// The strictly serial four-stage plate pipeline.
#[derive(Clone)]
pub struct Pipeline {
    analyzer: PlateAnalyzer,
}

impl Pipeline {
    pub fn new(analyzer: PlateAnalyzer) -> Self {
        Self { analyzer }
    }

    pub fn analyzer(&self) -> &PlateAnalyzer {
        &self.analyzer
    }

    /// Run the pipeline on `upload` and return the final snapshot.
    pub async fn run(&self, upload: Option<&ImageRef>) -> PipelineRun {
        self.run_with_updates(upload, None).await
    }

    /// Run the pipeline, publishing every intermediate snapshot to `updates`.
    pub async fn run_with_updates(
        &self,
        upload: Option<&ImageRef>,
        updates: Option<&RunUpdates>,
    ) -> PipelineRun {
        let mut run = PipelineRun::new();
        self.drive(&mut run, upload, updates).await;
        run
    }

    /// Drive `run` to a terminal stage.
    ///
    /// The run is reset first, so results of a previous run are never visible
    /// once the new run has started. Failures end in `Errored` with earlier
    /// results left in place.
    pub async fn drive(
        &self,
        run: &mut PipelineRun,
        upload: Option<&ImageRef>,
        updates: Option<&RunUpdates>,
    ) {
        run.reset();
        publish(updates, run);

        let Some(original) = upload else {
            warn!("Analysis requested without an upload");
            run.fail(RunError::invalid_input(NO_UPLOAD));
            publish(updates, run);
            return;
        };
        if !original.is_image() {
            warn!(mime = %original.mime_type(), "Analysis requested for a non-image upload");
            run.fail(RunError::invalid_input(INVALID_FILE_TYPE));
            publish(updates, run);
            return;
        }
        if original.is_empty() {
            warn!(mime = %original.mime_type(), "Analysis requested for an empty upload");
            run.fail(RunError::invalid_input(EMPTY_UPLOAD));
            publish(updates, run);
            return;
        }

        info!(
            run_id = %run.id,
            provider = %self.analyzer.provider_name(),
            mime = %original.mime_type(),
            bytes = original.len(),
            "Pipeline run started"
        );

        enter(run, Stage::Detecting, STEP_DETECTING, updates);
        let detection = match self.analyzer.detect(original).await {
            Ok(detection) => detection,
            Err(e) => return halt(run, e, updates),
        };
        run.detection = Some(detection.clone());
        publish(updates, run);

        let should_enhance = detection.needs_enhancement(original);
        let step = if should_enhance { STEP_ENHANCING } else { STEP_PROCESSING };
        enter(run, Stage::Enhancing, step, updates);
        run.enhancement_attempted = should_enhance;
        let enhancement = self
            .analyzer
            .enhance(&detection.plate_image, should_enhance)
            .await;
        run.enhancement = Some(enhancement.clone());
        publish(updates, run);

        enter(run, Stage::Extracting, STEP_EXTRACTING, updates);
        let extraction = match self.analyzer.extract(&enhancement.processed_image).await {
            Ok(extraction) => extraction,
            Err(e) => return halt(run, e, updates),
        };
        run.extraction = Some(extraction.clone());
        publish(updates, run);

        enter(run, Stage::Validating, STEP_VALIDATING, updates);
        let validation = if extraction.is_blank() {
            debug!("Extracted text is blank; skipping validator");
            ValidationResult::nothing_to_validate()
        } else {
            match self.analyzer.validate(&extraction.text).await {
                Ok(validation) => validation,
                Err(e) => return halt(run, e, updates),
            }
        };
        run.validation = Some(validation);
        publish(updates, run);

        enter(run, Stage::Complete, STEP_COMPLETE, updates);
        info!(
            run_id = %run.id,
            enhanced = run.enhancement_attempted,
            is_valid = run.validation.as_ref().map(|v| v.is_valid),
            "Pipeline run complete"
        );
    }
}

fn enter(run: &mut PipelineRun, stage: Stage, step: &str, updates: Option<&RunUpdates>) {
    let advanced = run.advance(stage, step);
    debug_assert!(advanced, "illegal stage transition to {stage}");
    debug!(run_id = %run.id, stage = %stage, progress = run.progress, "{step}");
    publish(updates, run);
}

fn halt(run: &mut PipelineRun, error: anyhow::Error, updates: Option<&RunUpdates>) {
    let stage = run.stage;
    let message = format!("{error:#}");
    let failure = RunError::stage_failed(stage, run.step.as_deref(), message);
    warn!(run_id = %run.id, stage = %stage, error = %failure.message, "Pipeline run failed");
    run.fail(failure);
    publish(updates, run);
}

fn publish(updates: Option<&RunUpdates>, run: &PipelineRun) {
    if let Some(tx) = updates {
        if tx.send(run.clone()).is_err() {
            debug!(run_id = %run.id, "Snapshot subscriber went away");
        }
    }
}
