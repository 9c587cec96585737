pub mod error;
pub mod image;
pub mod run;
pub mod traits;
pub mod types;

pub use error::PlateLensError;
pub use image::ImageRef;
pub use run::{PipelineRun, RunError, Stage};
pub use traits::{Capability, ModelRequest, ModelResponse, ResponseModality, VisionModel};
pub use types::{
    DetectionResult, EnhancementResult, ExtractionResult, ValidationResult, NO_TEXT_TO_VALIDATE,
};
