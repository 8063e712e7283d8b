//! External employer-inference collaborator, abstracted behind a trait so the
//! cleaner can be stubbed in tests and the provider swapped freely.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::domain::Profile;
use crate::error::Result;

/// Guesses the current employer for a profile whose company column came back
/// empty. `Ok(None)` means no guess; errors are the caller's to swallow.
#[async_trait]
pub trait CompanyDetector: Send + Sync {
    async fn detect(&self, profile: &Profile) -> Result<Option<String>>;
}

/// Detector used when no inference endpoint is configured.
pub struct NoopDetector;

#[async_trait]
impl CompanyDetector for NoopDetector {
    async fn detect(&self, _profile: &Profile) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Calls an HTTP text-classification endpoint with the profile's name, role,
/// experience entries and raw row, expecting `{"company": "..."}` back.
pub struct HttpCompanyDetector {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct DetectAnswer {
    company: Option<String>,
}

impl HttpCompanyDetector {
    pub fn new(endpoint: String, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            token,
        }
    }
}

#[async_trait]
impl CompanyDetector for HttpCompanyDetector {
    async fn detect(&self, profile: &Profile) -> Result<Option<String>> {
        let payload = json!({
            "name": profile.name,
            "current_role": profile.current_role,
            "experience": profile.experience,
            "raw": profile.raw_json,
        });
        let mut request = self
            .client
            .post(&self.endpoint)
            .timeout(Duration::from_secs(10))
            .json(&payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?.error_for_status()?;
        let answer: DetectAnswer = response.json().await?;
        Ok(answer
            .company
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty()))
    }
}
