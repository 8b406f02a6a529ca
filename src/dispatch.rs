//! Upload dispatch — hands encoded crops to the backend collaborator.
//!
//! The sink is an injected trait so sessions stay testable; the shipped
//! implementation POSTs a multipart form with a single binary part named
//! `image`. No retries here — a failure surfaces to the caller and the
//! change-detection gate stays uncommitted so the same bytes can retry.

use reqwest::multipart::{Form, Part};

/// Multipart part name the backend expects.
pub const UPLOAD_PART_NAME: &str = "image";

/// One encoded crop, packaged for upload.
#[derive(Debug, Clone)]
pub struct UploadPayload {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime: String,
}

impl UploadPayload {
    pub fn new(bytes: Vec<u8>, file_name: impl Into<String>, mime: impl Into<String>) -> Self {
        Self {
            bytes,
            file_name: file_name.into(),
            mime: mime.into(),
        }
    }

    /// The standard PNG payload produced by the rasterizer.
    pub fn png(bytes: Vec<u8>) -> Self {
        Self::new(bytes, "cropped_image.png", "image/png")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Could not build upload payload: {0}")]
    BadPayload(String),

    #[error("Upload request failed: {0}")]
    Transport(String),

    #[error("Backend rejected upload (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Where finished crops go. Implemented over HTTP in production and by
/// recording fakes in tests.
pub trait UploadSink {
    fn upload(
        &self,
        payload: UploadPayload,
    ) -> impl std::future::Future<Output = Result<(), DispatchError>> + Send;
}

/// Multipart POST to a fixed endpoint.
pub struct HttpUploadSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpUploadSink {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

impl UploadSink for HttpUploadSink {
    async fn upload(&self, payload: UploadPayload) -> Result<(), DispatchError> {
        let byte_len = payload.bytes.len();
        let part = Part::bytes(payload.bytes)
            .file_name(payload.file_name)
            .mime_str(&payload.mime)
            .map_err(|e| DispatchError::BadPayload(e.to_string()))?;
        let form = Form::new().part(UPLOAD_PART_NAME, part);

        log::info!(
            "[DISPATCH] POST {} — {} bytes as part {:?}",
            self.endpoint,
            byte_len,
            UPLOAD_PART_NAME
        );

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Backends wrap errors as {"message": "..."}; fall back to the raw body.
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
                .unwrap_or(body);
            log::error!("[DISPATCH] Rejected with HTTP {}: {}", status, message);
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        log::info!("[DISPATCH] Upload accepted (HTTP {})", status);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_payload_carries_the_expected_part_metadata() {
        let payload = UploadPayload::png(vec![1, 2, 3]);
        assert_eq!(payload.file_name, "cropped_image.png");
        assert_eq!(payload.mime, "image/png");
        assert_eq!(payload.bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn invalid_endpoint_is_a_transport_error() {
        let sink = HttpUploadSink::new("not-a-valid-endpoint");
        let err = sink.upload(UploadPayload::png(vec![0u8; 8])).await.unwrap_err();
        assert!(matches!(err, DispatchError::Transport(_)));
    }
}
