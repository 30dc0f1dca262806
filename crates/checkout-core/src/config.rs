//! Console Configuration
//!
//! Operator-supplied connection settings: where the backend lives, which
//! Razorpay key the widget uses, and the bearer token for backend calls.

use serde::{Deserialize, Serialize};

use crate::error::{PaymentError, Result};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:4000/api";

/// Backend and widget settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// e.g. `http://localhost:4000/api`, no trailing slash
    pub api_base_url: String,

    /// Razorpay key id (`rzp_test_...`)
    #[serde(default)]
    pub razorpay_key_id: String,

    /// JWT for the backend
    #[serde(default)]
    pub auth_token: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            razorpay_key_id: String::new(),
            auth_token: String::new(),
        }
    }
}

impl ConsoleConfig {
    pub fn new(
        api_base_url: impl Into<String>,
        razorpay_key_id: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Self {
        Self {
            api_base_url: normalize_base_url(&api_base_url.into()),
            razorpay_key_id: razorpay_key_id.into(),
            auth_token: auth_token.into(),
        }
    }

    /// Create from environment variables (after loading `.env`)
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_base_url =
            std::env::var("API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.into());
        let razorpay_key_id = std::env::var("RAZORPAY_KEY_ID").unwrap_or_default();
        let auth_token = std::env::var("AUTH_TOKEN").unwrap_or_default();

        Self::new(api_base_url, razorpay_key_id, auth_token)
    }

    /// Check the settings are usable for backend calls
    pub fn validate(&self) -> Result<()> {
        let url = self.api_base_url.trim();
        if url.is_empty() {
            return Err(PaymentError::Config("API base URL is not set".into()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(PaymentError::Config(format!(
                "API base URL must start with http:// or https://, got '{url}'"
            )));
        }
        Ok(())
    }

    /// Token with everything but the last four characters hidden
    pub fn masked_token(&self) -> String {
        mask(&self.auth_token)
    }

    pub fn normalized(mut self) -> Self {
        self.api_base_url = normalize_base_url(&self.api_base_url);
        self
    }
}

impl std::fmt::Debug for ConsoleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleConfig")
            .field("api_base_url", &self.api_base_url)
            .field("razorpay_key_id", &self.razorpay_key_id)
            .field("auth_token", &self.masked_token())
            .finish()
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn mask(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("{}{tail}", "*".repeat(count - 4))
}
