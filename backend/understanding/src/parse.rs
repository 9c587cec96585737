//! Parsing of free-form model answers.

use crate::prompts::{BLURRY_FALSE, BLURRY_TRUE};

/// Read the detector's blurriness marker.
///
/// Exact match after trimming, case-insensitive. Anything else is `None`.
pub fn parse_blurriness(text: Option<&str>) -> Option<bool> {
    let text = text?.trim();
    if text.eq_ignore_ascii_case(BLURRY_TRUE) {
        Some(true)
    } else if text.eq_ignore_ascii_case(BLURRY_FALSE) {
        Some(false)
    } else {
        None
    }
}

/// Extract JSON from a response (handles markdown code blocks and prose).
pub fn extract_json_from_response(response: &str) -> String {
    let response = response.trim();

    if response.starts_with("```") {
        if let Some(end) = response.rfind("```") {
            let start = response.find('\n').map(|i| i + 1).unwrap_or(3);
            if start < end {
                return response[start..end].trim().to_string();
            }
        }
    }

    if let Some(start) = response.find('{') {
        if let Some(end) = response.rfind('}') {
            if start < end {
                return response[start..=end].to_string();
            }
        }
    }

    response.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blurriness_markers() {
        assert_eq!(parse_blurriness(Some("BLURRY: TRUE")), Some(true));
        assert_eq!(parse_blurriness(Some("  blurry: true\n")), Some(true));
        assert_eq!(parse_blurriness(Some("Blurry: False")), Some(false));
    }

    #[test]
    fn unrecognized_blurriness_is_none() {
        assert_eq!(parse_blurriness(None), None);
        assert_eq!(parse_blurriness(Some("")), None);
        assert_eq!(parse_blurriness(Some("The plate is BLURRY: TRUE")), None);
        assert_eq!(parse_blurriness(Some("BLURRY:TRUE")), None);
    }

    #[test]
    fn test_extract_json_markdown() {
        let response = "```json\n{\"extractedText\": \"KA05N123\"}\n```";
        assert_eq!(extract_json_from_response(response), "{\"extractedText\": \"KA05N123\"}");
    }

    #[test]
    fn test_extract_json_plain() {
        let response = "{\"isValidFormat\": true}";
        assert_eq!(extract_json_from_response(response), response);
    }

    #[test]
    fn test_extract_json_with_text() {
        let response = "Here you go: {\"extractedText\": \"DL01AB1234\"} done";
        assert_eq!(
            extract_json_from_response(response),
            "{\"extractedText\": \"DL01AB1234\"}"
        );
    }
}
