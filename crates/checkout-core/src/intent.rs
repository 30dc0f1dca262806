//! Checkout Intents and Receipts
//!
//! An intent goes into the widget, a receipt comes out of it.

use serde::{Deserialize, Serialize};

use crate::error::{PaymentError, Result};

/// One payment attempt to hand to the checkout widget
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutIntent {
    /// Payment-intent id issued by the backend (Razorpay order id)
    pub intent_id: String,

    /// Amount in the smallest currency unit (paise for INR)
    pub amount_minor_units: u64,

    /// Shown to the payer inside the widget
    pub description: String,

    /// Client-facing Razorpay key id
    pub public_key: String,
}

impl CheckoutIntent {
    pub fn new(
        intent_id: impl Into<String>,
        amount_minor_units: u64,
        description: impl Into<String>,
        public_key: impl Into<String>,
    ) -> Self {
        Self {
            intent_id: intent_id.into(),
            amount_minor_units,
            description: description.into(),
            public_key: public_key.into(),
        }
    }

    /// Check the fields the widget cannot work without
    pub fn validate(&self) -> Result<()> {
        if self.intent_id.trim().is_empty() {
            return Err(PaymentError::InvalidIntent("intent id is empty".into()));
        }
        if self.amount_minor_units == 0 {
            return Err(PaymentError::InvalidIntent("amount must be positive".into()));
        }
        validate_public_key(&self.public_key)
    }
}

/// A key id the widget will accept: set, and free of whitespace
pub(crate) fn validate_public_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(PaymentError::InvalidIntent("Razorpay key id is not set".into()));
    }
    if key.chars().any(char::is_whitespace) {
        return Err(PaymentError::InvalidIntent(
            "Razorpay key id contains whitespace".into(),
        ));
    }
    Ok(())
}

/// Proof of payment returned by the widget
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub intent_id: String,
    pub payment_id: String,
    pub signature: String,
}

/// Payload the widget passes to its `handler`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetResponse {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

impl From<WidgetResponse> for PaymentReceipt {
    fn from(response: WidgetResponse) -> Self {
        Self {
            intent_id: response.razorpay_order_id,
            payment_id: response.razorpay_payment_id,
            signature: response.razorpay_signature,
        }
    }
}

/// Verification request body, in the backend's field names
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

impl From<&PaymentReceipt> for VerifyRequest {
    fn from(receipt: &PaymentReceipt) -> Self {
        Self {
            razorpay_order_id: receipt.intent_id.clone(),
            razorpay_payment_id: receipt.payment_id.clone(),
            razorpay_signature: receipt.signature.clone(),
        }
    }
}

/// Customer details pre-filled into the widget
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prefill {
    pub name: String,
    pub email: String,
    pub contact: String,
}

impl Default for Prefill {
    fn default() -> Self {
        Self {
            name: "Test User".into(),
            email: "test@example.com".into(),
            contact: "9999999999".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub color: String,
}

/// Merchant-level widget settings shared by every checkout
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantProfile {
    pub name: String,
    pub currency: String,
    pub theme_color: String,
    pub prefill: Prefill,
}

impl Default for MerchantProfile {
    fn default() -> Self {
        Self {
            name: "Roll2Bowl".into(),
            currency: "INR".into(),
            theme_color: "#F37254".into(),
            prefill: Prefill::default(),
        }
    }
}

/// Options handed to the widget constructor, minus the handler
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetOptions {
    pub key: String,
    pub amount: u64,
    pub currency: String,
    pub name: String,
    pub description: String,
    pub order_id: String,
    pub prefill: Prefill,
    pub theme: Theme,
}

impl WidgetOptions {
    pub fn build(intent: &CheckoutIntent, merchant: &MerchantProfile) -> Self {
        Self {
            key: intent.public_key.clone(),
            amount: intent.amount_minor_units,
            currency: merchant.currency.clone(),
            name: merchant.name.clone(),
            description: intent.description.clone(),
            order_id: intent.intent_id.clone(),
            prefill: merchant.prefill.clone(),
            theme: Theme {
                color: merchant.theme_color.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_validation() {
        assert!(CheckoutIntent::new("order_1", 99900, "Test", "rzp_test_abc").validate().is_ok());
        assert!(CheckoutIntent::new("", 99900, "Test", "rzp_test_abc").validate().is_err());
        assert!(CheckoutIntent::new("order_1", 0, "Test", "rzp_test_abc").validate().is_err());
        assert!(CheckoutIntent::new("order_1", 100, "Test", "  ").validate().is_err());
    }

    #[test]
    fn test_widget_response_maps_to_receipt() {
        let response: WidgetResponse = serde_json::from_value(serde_json::json!({
            "razorpay_order_id": "order_1",
            "razorpay_payment_id": "pay_1",
            "razorpay_signature": "sig_1",
        }))
        .unwrap();

        let receipt = PaymentReceipt::from(response);
        assert_eq!(receipt.intent_id, "order_1");
        assert_eq!(receipt.payment_id, "pay_1");
        assert_eq!(receipt.signature, "sig_1");
    }

    #[test]
    fn test_verify_request_uses_backend_field_names() {
        let receipt = PaymentReceipt {
            intent_id: "order_1".into(),
            payment_id: "pay_1".into(),
            signature: "sig_1".into(),
        };
        let body = serde_json::to_value(VerifyRequest::from(&receipt)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "razorpayOrderId": "order_1",
                "razorpayPaymentId": "pay_1",
                "razorpaySignature": "sig_1",
            })
        );
    }

    #[test]
    fn test_widget_options_shape() {
        let intent = CheckoutIntent::new(
            "order_9",
            49900,
            "Subscription upgrade for branch b1",
            "rzp_test_abc",
        );
        let options = WidgetOptions::build(&intent, &MerchantProfile::default());
        let value = serde_json::to_value(&options).unwrap();

        assert_eq!(value["key"], "rzp_test_abc");
        assert_eq!(value["amount"], 49900);
        assert_eq!(value["currency"], "INR");
        assert_eq!(value["order_id"], "order_9");
        assert_eq!(value["theme"]["color"], "#F37254");
        assert_eq!(value["prefill"]["contact"], "9999999999");
    }
}
