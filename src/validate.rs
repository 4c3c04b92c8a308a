//! Admission checks run before any decode work.
//!
//! Everything checked here is client-declared: the size from the multipart
//! header and the content-type. Rejecting early keeps oversized or disallowed
//! payloads from ever reaching a decoder.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("file size {size} exceeds limit of {limit} bytes")]
    SizeExceeded { size: u64, limit: u64 },
    #[error("missing content type")]
    MissingContentType,
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),
}

/// Admit or reject an upload by its declared size and content-type.
///
/// Checks run in order: size, presence of a content-type, then an exact
/// string match against `allowed_types`.
pub fn validate(
    declared_size: u64,
    declared_content_type: &str,
    allowed_types: &[String],
    max_size: u64,
) -> Result<(), AdmissionError> {
    if declared_size > max_size {
        return Err(AdmissionError::SizeExceeded {
            size: declared_size,
            limit: max_size,
        });
    }

    if declared_content_type.is_empty() {
        return Err(AdmissionError::MissingContentType);
    }

    if allowed_types.iter().any(|t| t == declared_content_type) {
        Ok(())
    } else {
        Err(AdmissionError::UnsupportedType(
            declared_content_type.to_string(),
        ))
    }
}
