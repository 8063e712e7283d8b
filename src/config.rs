use std::env;
use std::path::PathBuf;

/// Runtime configuration, read from the environment (`.env` supported).
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the SQLite document store.
    pub database_path: PathBuf,
    /// Default HTTP listen port for `serve`.
    pub port: u16,
    /// Endpoint of the external employer-inference service, if any.
    pub company_inference_url: Option<String>,
    /// Bearer token for the inference service.
    pub company_inference_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let database_path = env::var("TALENTBASE_DB")
            .unwrap_or_else(|_| "data/profiles.db".to_string())
            .into();
        let port = env::var("TALENTBASE_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8000);
        Self {
            database_path,
            port,
            company_inference_url: env::var("COMPANY_INFERENCE_URL").ok(),
            company_inference_token: env::var("COMPANY_INFERENCE_TOKEN").ok(),
        }
    }
}
