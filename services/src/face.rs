//! Face verification used as a hard gate at check-in.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use util::config;

use crate::error::{AttendanceError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct FaceMatch {
    pub matched: bool,
    pub confidence: f64,
}

impl FaceMatch {
    /// A match only counts when the service agrees and is confident enough.
    pub fn passes(&self, threshold: f64) -> bool {
        self.matched && self.confidence >= threshold
    }
}

/// Compares a live sample against a student's stored reference encoding.
#[async_trait]
pub trait FaceVerifier: Send + Sync {
    async fn verify(&self, sample: &str, reference: &str) -> Result<FaceMatch>;
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    sample: &'a str,
    reference: &'a str,
}

/// Calls an external verification service over HTTP.
pub struct HttpFaceVerifier {
    client: Client,
    url: String,
}

impl HttpFaceVerifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AttendanceError::FaceService(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Builds a verifier from configuration, or `None` when no URL is set.
    pub fn from_config() -> Result<Option<Self>> {
        let url = config::face_verification_url();
        if url.trim().is_empty() {
            return Ok(None);
        }
        let timeout = Duration::from_secs(config::face_verification_timeout_seconds());
        Self::new(url, timeout).map(Some)
    }
}

#[async_trait]
impl FaceVerifier for HttpFaceVerifier {
    async fn verify(&self, sample: &str, reference: &str) -> Result<FaceMatch> {
        let resp = self
            .client
            .post(&self.url)
            .json(&VerifyRequest { sample, reference })
            .send()
            .await
            .map_err(|e| AttendanceError::FaceService(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AttendanceError::FaceService(format!(
                "verification service returned {status}"
            )));
        }

        resp.json::<FaceMatch>()
            .await
            .map_err(|e| AttendanceError::FaceService(format!("malformed response: {e}")))
    }
}
