//! Payment Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Fallback text when the backend gives no usable message
pub const GENERIC_VERIFICATION_MESSAGE: &str = "Payment verification failed";

/// Failures of a single verification call
///
/// None of these are retried; the dispatcher makes exactly one attempt.
#[derive(Error, Debug)]
pub enum VerificationError {
    /// Purpose tag outside the known set, raised before any network I/O
    #[error("Invalid payment purpose: {0}")]
    InvalidPurpose(String),

    /// Transport-level failure (connection refused, DNS, TLS, ...)
    #[error("Network failure: {0}")]
    NetworkFailure(#[source] reqwest::Error),

    /// Backend answered with a non-2xx status
    #[error("{message}")]
    BackendRejected { status: u16, message: String },

    /// Backend answered 2xx but the body was not JSON
    #[error("Malformed verification response: {0}")]
    MalformedResponse(String),
}

impl VerificationError {
    /// Text suitable for showing to the operator.
    ///
    /// Backend rejections are passed through untouched.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidPurpose(purpose) => format!("Unknown payment purpose '{purpose}'"),
            Self::NetworkFailure(_) => "Could not reach the payment backend.".into(),
            Self::BackendRejected { message, .. } => message.clone(),
            Self::MalformedResponse(_) => GENERIC_VERIFICATION_MESSAGE.into(),
        }
    }
}

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Verification dispatch failed
    #[error(transparent)]
    Verification(#[from] VerificationError),

    /// Checkout intent failed validation
    #[error("Invalid checkout intent: {0}")]
    InvalidIntent(String),

    /// Operator input missing or malformed
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Checkout widget could not be opened
    #[error("Checkout widget unavailable: {0}")]
    WidgetUnavailable(String),

    /// Backend created the business object but returned no payment-intent id
    #[error("Failed to get Razorpay Order ID for {0}")]
    MissingIntent(String),

    /// Widget was closed without completing payment
    #[error("Checkout abandoned for intent {0}")]
    Abandoned(String),

    /// No pending checkout matches this intent id
    #[error("Unknown checkout intent: {0}")]
    UnknownIntent(String),

    /// Backend API call failed at the transport layer
    #[error("Backend unreachable: {0}")]
    Network(#[from] reqwest::Error),

    /// Backend API call answered with a non-2xx status
    #[error("{message}")]
    Backend { status: u16, message: String },

    /// Backend response could not be decoded
    #[error("Unexpected backend response: {0}")]
    Decode(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),
}

impl PaymentError {
    /// Whether the caller supplied bad input (as opposed to a backend fault)
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidIntent(_)
                | Self::InvalidInput(_)
                | Self::Config(_)
                | Self::Verification(VerificationError::InvalidPurpose(_))
        )
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Verification(e) => e.user_message(),
            Self::Backend { message, .. } => message.clone(),
            Self::InvalidIntent(msg) | Self::InvalidInput(msg) => msg.clone(),
            Self::MissingIntent(_) => "Failed to get Razorpay Order ID".into(),
            Self::Abandoned(_) => "Checkout was closed before payment completed.".into(),
            Self::Network(_) => "Could not reach the payment backend.".into(),
            Self::WidgetUnavailable(_) => "Checkout widget is not available.".into(),
            Self::Config(_) => "Service configuration error.".into(),
            _ => "An error occurred processing your request.".into(),
        }
    }
}

/// Pull the operator-facing message out of a backend error body.
///
/// Looks at `error`, then `message`; anything else yields `None`.
pub(crate) fn backend_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error", "message"]
        .iter()
        .find_map(|field| value.get(field).and_then(serde_json::Value::as_str))
        .map(str::to_string)
}
