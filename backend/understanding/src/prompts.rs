//! Fixed instruction templates for the four plate capabilities.

use serde_json::{json, Value};

/// Marker the detector answers with for a blurry crop.
pub const BLURRY_TRUE: &str = "BLURRY: TRUE";
/// Marker the detector answers with for a sharp crop, or when cropping failed.
pub const BLURRY_FALSE: &str = "BLURRY: FALSE";

pub const DETECT_PROMPT: &str = r#"You are an expert in license plate detection and image analysis.
Analyze the attached vehicle photo.

1. Detect the primary license plate. It may be skewed, rotated or at an angle.
2. Produce a new image containing a tight crop of ONLY the detected plate. Straighten (deskew) it if you can; otherwise crop it as it is. This cropped image is your image output.
3. Decide whether the CROPPED plate is blurry, out of focus, or too low in resolution to read reliably.

Your TEXT output must be exactly one of:
BLURRY: TRUE
BLURRY: FALSE
No other words.

If no plate is found, or you cannot crop it reliably, output the original photo as the image and answer BLURRY: FALSE."#;

pub const ENHANCE_PROMPT: &str = "Enhance this license plate image for maximum clarity of its characters so that it is suitable for OCR. Apply super-resolution style sharpening (similar to Real-ESRGAN) and keep every character exactly as it appears. Output the enhanced image.";

pub const EXTRACT_PROMPT: &str = "Extract the text from the attached license plate image. Transcribe the characters exactly as printed. Respond in JSON with a single field `extractedText` containing the transcription, or an empty string if nothing is legible.";

const VALIDATE_PROMPT_TEMPLATE: &str = r#"You are an expert in Indian license plate formats. Decide whether the text below, extracted from a license plate, is in a valid Indian standard format.

License Plate Text: {plate_text}

A standard plate consists of:
1. State code: two uppercase letters (e.g. MH, DL, KA, AP, TN).
2. RTO code: two digits (e.g. 01, 12, 37).
3. Series: one to three uppercase letters (e.g. A, AB, ABC).
4. Number: usually four digits (e.g. 0001, 1234); some older plates have one to three.

Spaces or hyphens between segments are optional. Valid examples:
- DL01AB1234
- MH 12 XY 3456
- KA-05-N-123
- AP37AY0001
- GJ 05 R 123

Be strict. The text should be uppercase letters and digits in the right segments and quantities. Special characters other than an occasional space or hyphen make the format invalid.

Respond in JSON with:
- isValidFormat: true if the plate is in a valid Indian format, false otherwise.
- validationMessage: why it is valid or invalid, naming the segment that is wrong when invalid."#;

/// Build the validation instruction for a piece of extracted text.
pub fn build_validation_prompt(plate_text: &str) -> String {
    VALIDATE_PROMPT_TEMPLATE.replace("{plate_text}", plate_text)
}

/// Response schema for text extraction.
pub fn extraction_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "extractedText": { "type": "STRING" }
        },
        "required": ["extractedText"]
    })
}

/// Response schema for format validation.
pub fn validation_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "isValidFormat": { "type": "BOOLEAN" },
            "validationMessage": { "type": "STRING" }
        },
        "required": ["isValidFormat", "validationMessage"]
    })
}
