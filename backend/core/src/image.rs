//! Encoded image references.
//!
//! Every image that crosses a stage boundary is an [`ImageRef`]: the encoded
//! bytes plus their declared media type. On the wire it travels as a
//! `data:<mime>;base64,<payload>` URI.

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::PlateLensError;

/// An opaque encoded image.
///
/// Equality is byte-exact over the encoding: two references are the same
/// image iff both the media type and the encoded bytes match.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ImageRef {
    mime_type: String,
    data: Bytes,
}

impl ImageRef {
    pub fn new(mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Build from a base64 payload and a declared media type.
    pub fn from_base64(mime_type: impl Into<String>, payload: &str) -> Result<Self, PlateLensError> {
        let data = STANDARD
            .decode(payload.trim())
            .map_err(|e| PlateLensError::InvalidImage(format!("bad base64 payload: {e}")))?;
        Ok(Self::new(mime_type, data))
    }

    /// Parse a `data:<mime>;base64,<payload>` URI.
    pub fn from_data_uri(uri: &str) -> Result<Self, PlateLensError> {
        let rest = uri
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| PlateLensError::InvalidImage("missing 'data:' prefix".into()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| PlateLensError::InvalidImage("missing ',' separator".into()))?;

        let mut params = header.split(';');
        let mime_type = params.next().unwrap_or_default().trim();
        if mime_type.is_empty() {
            return Err(PlateLensError::InvalidImage("missing media type".into()));
        }
        if !params.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
            return Err(PlateLensError::InvalidImage(
                "only base64-encoded data URIs are supported".into(),
            ));
        }

        Self::from_base64(mime_type, payload)
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn bytes(&self) -> Bytes {
        self.data.clone()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the declared media type is an image type.
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }
}

impl fmt::Debug for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageRef")
            .field("mime_type", &self.mime_type)
            .field("len", &self.data.len())
            .finish()
    }
}

impl FromStr for ImageRef {
    type Err = PlateLensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_data_uri(s)
    }
}

impl Serialize for ImageRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_data_uri())
    }
}

impl<'de> Deserialize<'de> for ImageRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let uri = String::deserialize(deserializer)?;
        Self::from_data_uri(&uri).map_err(serde::de::Error::custom)
    }
}
