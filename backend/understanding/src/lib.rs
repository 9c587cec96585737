//! Plate understanding: the four model-backed stage operations and the
//! providers they talk to.

pub mod analyzer;
pub mod parse;
pub mod prompts;
pub mod providers;
pub mod stages;

pub use analyzer::{ModelSelection, PlateAnalyzer, DEFAULT_IMAGE_MODEL, DEFAULT_TEXT_MODEL};
pub use providers::{GeminiProvider, MockReply, MockVisionModel};
pub use stages::{detect_plate, enhance_plate, extract_text, validate_format, NO_PLATE_IMAGE};
