pub mod gemini;
pub mod mock;

pub use gemini::{GeminiProvider, DEFAULT_GEMINI_BASE_URL};
pub use mock::{MockReply, MockVisionModel};
