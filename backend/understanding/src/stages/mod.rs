pub mod detect;
pub mod enhance;
pub mod extract;
pub mod validate;

pub use detect::detect_plate;
pub use enhance::enhance_plate;
pub use extract::{extract_text, NO_PLATE_IMAGE};
pub use validate::validate_format;
