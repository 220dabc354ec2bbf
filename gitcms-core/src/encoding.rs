//! Transport decoding for blob payloads.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unsupported content encoding '{0}'")]
    UnsupportedEncoding(String),

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("content is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Decode a blob's `content` according to its declared `encoding`.
///
/// GitHub wraps base64 payloads at 60 columns, so whitespace is stripped
/// before decoding.
pub fn decode_content(content: &str, encoding: &str) -> Result<String, DecodeError> {
    match encoding.to_ascii_lowercase().as_str() {
        "base64" => {
            let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
            let bytes = STANDARD.decode(compact)?;
            Ok(String::from_utf8(bytes)?)
        }
        "utf-8" | "utf8" => Ok(content.to_string()),
        other => Err(DecodeError::UnsupportedEncoding(other.to_string())),
    }
}
