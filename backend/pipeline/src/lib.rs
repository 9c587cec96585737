//! Pipeline driver: sequences detect → enhance → extract → validate,
//! publishing a [`PipelineRun`](platelens_core::PipelineRun) snapshot at
//! every transition.

pub mod driver;
pub mod session;

pub use driver::{
    Pipeline, RunUpdates, NO_UPLOAD, STEP_COMPLETE, STEP_DETECTING,
    STEP_ENHANCING, STEP_EXTRACTING, STEP_PROCESSING, STEP_VALIDATING,
};
pub use session::Session;
pub use platelens_understanding::NO_PLATE_IMAGE;
