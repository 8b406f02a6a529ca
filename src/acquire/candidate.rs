//! Candidate files and the validation gate in front of the pipeline.
//!
//! Validation happens before any decode work or state change: a rejected
//! candidate leaves the session exactly as it was.

use base64::{engine::general_purpose::STANDARD, Engine};

/// A user-supplied file as handed over by a picker or drag-and-drop surface:
/// a name, a declared MIME type, and the raw bytes.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl CandidateFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Parses a `data:<mime>;base64,<payload>` URL into a candidate.
    ///
    /// This is how a previously staged image comes back from the embedding
    /// shell, which stores picked files as data URLs.
    pub fn from_data_url(name: impl Into<String>, url: &str) -> Result<Self, AcquireError> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| AcquireError::MalformedDataUrl("missing data: scheme".into()))?;
        let (mime, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| AcquireError::MalformedDataUrl("missing ;base64, marker".into()))?;
        let bytes = STANDARD
            .decode(payload)
            .map_err(|e| AcquireError::MalformedDataUrl(e.to_string()))?;
        Ok(Self::new(name, mime, bytes))
    }

    /// Renders the candidate back to a data URL.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }

    /// The validation gate: MIME family first, then the size cap.
    ///
    /// A rejection carries no side effects; the caller's state is untouched.
    pub fn validate(&self, max_bytes: u64) -> Result<(), AcquireError> {
        if !self.mime.starts_with("image/") {
            return Err(AcquireError::InvalidFileType {
                mime: self.mime.clone(),
            });
        }
        if self.bytes.len() as u64 > max_bytes {
            return Err(AcquireError::FileTooLarge {
                size: self.bytes.len() as u64,
                limit: max_bytes,
            });
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    #[error("Not an image file (declared MIME type {mime:?})")]
    InvalidFileType { mime: String },

    #[error("File is {size} bytes — the limit is {limit} bytes")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("Failed to read image data: {0}")]
    FileReadError(String),

    #[error("Malformed data URL: {0}")]
    MalformedDataUrl(String),

    #[error("Decoded image has zero width or height")]
    EmptyImage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MAX_FILE_BYTES;

    #[test]
    fn accepts_any_image_mime() {
        for mime in ["image/png", "image/jpeg", "image/webp", "image/x-obscure"] {
            let file = CandidateFile::new("pic", mime, vec![0u8; 16]);
            assert!(file.validate(DEFAULT_MAX_FILE_BYTES).is_ok(), "{mime}");
        }
    }

    #[test]
    fn rejects_non_image_mime() {
        let file = CandidateFile::new("notes.txt", "text/plain", vec![0u8; 16]);
        let err = file.validate(DEFAULT_MAX_FILE_BYTES).unwrap_err();
        assert!(matches!(err, AcquireError::InvalidFileType { mime } if mime == "text/plain"));
    }

    #[test]
    fn size_limit_is_exclusive() {
        let at_limit = CandidateFile::new("a.png", "image/png", vec![0u8; 64]);
        assert!(at_limit.validate(64).is_ok());

        let over = CandidateFile::new("b.png", "image/png", vec![0u8; 65]);
        let err = over.validate(64).unwrap_err();
        assert!(matches!(err, AcquireError::FileTooLarge { size: 65, limit: 64 }));
    }

    #[test]
    fn oversized_image_mime_still_rejected_on_size() {
        // 15 MiB of valid-MIME bytes trips the size cap, not the type check.
        let big = CandidateFile::new("big.png", "image/png", vec![0u8; 15 * 1024 * 1024]);
        let err = big.validate(DEFAULT_MAX_FILE_BYTES).unwrap_err();
        assert!(matches!(err, AcquireError::FileTooLarge { .. }));
    }

    #[test]
    fn data_url_round_trip() {
        let file = CandidateFile::new("pic", "image/png", vec![1, 2, 3, 4]);
        let url = file.to_data_url();
        assert!(url.starts_with("data:image/png;base64,"));

        let back = CandidateFile::from_data_url("pic", &url).unwrap();
        assert_eq!(back.mime, "image/png");
        assert_eq!(back.bytes, vec![1, 2, 3, 4]);
    }

    #[test]
    fn malformed_data_url_rejected() {
        for bad in ["image/png;base64,AAAA", "data:image/png,AAAA", "data:image/png;base64,@@@"] {
            assert!(matches!(
                CandidateFile::from_data_url("pic", bad),
                Err(AcquireError::MalformedDataUrl(_))
            ));
        }
    }
}
