use std::sync::Arc;

use bytes::Bytes;
use tracing::info;

use platelens_core::{ImageRef, PipelineRun, PlateLensError, RunError};

use crate::driver::{Pipeline, RunUpdates};

/// Presentation-side state: the current upload and the latest run.
///
/// A new upload or a new analysis replaces the previous run wholesale.
pub struct Session {
    pipeline: Arc<Pipeline>,
    upload: Option<ImageRef>,
    run: PipelineRun,
}

impl Session {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            pipeline,
            upload: None,
            run: PipelineRun::new(),
        }
    }

    /// Replace the upload. Non-image uploads are rejected and clear the
    /// previous upload, leaving the error on the run.
    pub fn upload(&mut self, image: ImageRef) -> Result<(), PlateLensError> {
        self.run.reset();
        if !image.is_image() {
            self.upload = None;
            let error = PlateLensError::InvalidInput(platelens_media::INVALID_FILE_TYPE.into());
            self.run.fail(RunError::invalid_input(error.to_string()));
            return Err(error);
        }
        info!(mime = %image.mime_type(), bytes = image.len(), "New upload");
        self.upload = Some(image);
        Ok(())
    }

    /// Replace the upload from raw bytes and an optional declared media type.
    pub fn upload_bytes(
        &mut self,
        declared_mime: Option<&str>,
        data: impl Into<Bytes>,
    ) -> Result<(), PlateLensError> {
        match platelens_media::accept_upload(declared_mime, data) {
            Ok(image) => self.upload(image),
            Err(error) => {
                self.run.reset();
                self.upload = None;
                self.run.fail(RunError::invalid_input(error.to_string()));
                Err(error)
            }
        }
    }

    /// Analyze the current upload, publishing snapshots to `updates`.
    pub async fn analyze(&mut self, updates: Option<&RunUpdates>) -> &PipelineRun {
        self.pipeline
            .drive(&mut self.run, self.upload.as_ref(), updates)
            .await;
        &self.run
    }

    pub fn current_upload(&self) -> Option<&ImageRef> {
        self.upload.as_ref()
    }

    pub fn run(&self) -> &PipelineRun {
        &self.run
    }

    pub fn error(&self) -> Option<&RunError> {
        self.run.error.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platelens_core::{Capability, Stage};
    use platelens_understanding::{MockReply, MockVisionModel, PlateAnalyzer};
    use tokio::sync::mpsc;

    fn photo() -> ImageRef {
        ImageRef::new("image/jpeg", vec![0xff, 0xd8, 0xff, 7])
    }

    fn session(mock: MockVisionModel) -> Session {
        let pipeline = Pipeline::new(PlateAnalyzer::new(Arc::new(mock)));
        Session::new(Arc::new(pipeline))
    }

    #[tokio::test]
    async fn analyze_without_upload_reports_error() {
        let mut session = session(MockVisionModel::new());
        let run = session.analyze(None).await;
        assert_eq!(run.stage, Stage::Errored);
        assert_eq!(session.error().unwrap().summary, crate::NO_UPLOAD);
    }

    #[tokio::test]
    async fn second_run_starts_from_a_clean_slate() {
        let mock = MockVisionModel::new()
            .on(Capability::ExtractText, MockReply::fail("first run breaks"));
        let mut session = session(mock);
        session.upload(photo()).unwrap();

        let first = session.analyze(None).await.clone();
        assert_eq!(first.stage, Stage::Errored);
        assert!(first.detection.is_some());

        let (tx, mut rx) = mpsc::unbounded_channel();
        let second = session.analyze(Some(&tx)).await.clone();
        drop(tx);
        assert_eq!(second.stage, Stage::Complete);
        assert!(second.error.is_none());
        assert_ne!(second.id, first.id);

        let mut snapshots = Vec::new();
        while let Some(s) = rx.recv().await {
            snapshots.push(s);
        }
        let entering_detection = snapshots
            .iter()
            .find(|s| s.stage == Stage::Detecting)
            .unwrap();
        assert!(!entering_detection.has_results());
        assert!(entering_detection.error.is_none());
        assert!(snapshots.iter().all(|s| s.error.is_none()));
    }

    #[tokio::test]
    async fn new_upload_discards_previous_results() {
        let mut session = session(MockVisionModel::new());
        session.upload(photo()).unwrap();
        session.analyze(None).await;
        assert!(session.run().has_results());

        session
            .upload(ImageRef::new("image/png", vec![0x89, b'P', b'N', b'G']))
            .unwrap();
        assert!(!session.run().has_results());
        assert_eq!(session.run().stage, Stage::Idle);
    }

    #[test]
    fn non_image_upload_clears_upload_and_sets_error() {
        let mut session = session(MockVisionModel::new());
        session.upload(photo()).unwrap();
        let err = session
            .upload_bytes(Some("text/plain"), b"hello".to_vec())
            .unwrap_err();
        assert!(matches!(err, PlateLensError::InvalidInput(_)));
        assert!(session.current_upload().is_none());
        assert_eq!(
            session.error().unwrap().summary,
            platelens_media::INVALID_FILE_TYPE
        );
    }
}
