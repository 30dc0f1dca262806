//! Verification Dispatch
//!
//! Routes a widget receipt to the backend endpoint that validates its
//! signature. One POST per call, no retries.

use serde_json::Value;

use crate::error::{GENERIC_VERIFICATION_MESSAGE, VerificationError, backend_message};
use crate::intent::{PaymentReceipt, VerifyRequest};
use crate::purpose::PaymentPurpose;

/// Result of a successful verification: the backend's JSON body, untouched
pub type VerificationResult = Value;

/// Posts receipts to the purpose-specific verification endpoint
#[derive(Clone, Debug, Default)]
pub struct VerificationDispatcher {
    http: reqwest::Client,
}

impl VerificationDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuse an existing connection pool
    pub const fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Verify a receipt for a known purpose
    pub async fn verify(
        &self,
        purpose: PaymentPurpose,
        receipt: &PaymentReceipt,
        api_base_url: &str,
        auth_token: &str,
    ) -> Result<VerificationResult, VerificationError> {
        let url = endpoint_url(api_base_url, purpose);

        tracing::info!(
            purpose = %purpose,
            intent_id = %receipt.intent_id,
            payment_id = %receipt.payment_id,
            url = %url,
            "Verifying payment"
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(auth_token)
            .json(&VerifyRequest::from(receipt))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(purpose = %purpose, error = %e, "Verification request failed");
                VerificationError::NetworkFailure(e)
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(VerificationError::NetworkFailure)?;

        if !status.is_success() {
            let message = backend_message(&body).unwrap_or_else(|| {
                format!("{GENERIC_VERIFICATION_MESSAGE} (HTTP {})", status.as_u16())
            });
            tracing::warn!(
                purpose = %purpose,
                status = status.as_u16(),
                message = %message,
                "Backend rejected payment verification"
            );
            return Err(VerificationError::BackendRejected {
                status: status.as_u16(),
                message,
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        let result: Value = serde_json::from_str(&body)
            .map_err(|e| VerificationError::MalformedResponse(e.to_string()))?;

        tracing::info!(purpose = %purpose, intent_id = %receipt.intent_id, "Payment verified");
        Ok(result)
    }

    /// Verify a receipt whose purpose arrives as a free-form tag.
    ///
    /// An unknown tag fails before any request is sent.
    pub async fn verify_tagged(
        &self,
        purpose: &str,
        receipt: &PaymentReceipt,
        api_base_url: &str,
        auth_token: &str,
    ) -> Result<VerificationResult, VerificationError> {
        let purpose: PaymentPurpose = purpose.parse()?;
        self.verify(purpose, receipt, api_base_url, auth_token).await
    }
}

/// One-shot verification with a fresh client
pub async fn verify_payment(
    purpose: PaymentPurpose,
    receipt: &PaymentReceipt,
    api_base_url: &str,
    auth_token: &str,
) -> Result<VerificationResult, VerificationError> {
    VerificationDispatcher::new()
        .verify(purpose, receipt, api_base_url, auth_token)
        .await
}

fn endpoint_url(api_base_url: &str, purpose: PaymentPurpose) -> String {
    format!(
        "{}{}",
        api_base_url.trim_end_matches('/'),
        purpose.verify_endpoint()
    )
}
