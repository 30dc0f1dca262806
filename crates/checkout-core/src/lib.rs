//! # checkout-core
//!
//! Checkout handoff and payment verification for the Razorpay test console.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────┐   intent id   ┌──────────────┐   receipt   ┌──────────────────┐
//! │   Backend    │──────────────▶│   Checkout   │────────────▶│   Verification   │
//! │ order / sub  │   + amount    │    widget    │  (order id, │    dispatcher    │
//! │   action     │               │  (Razorpay)  │  payment id,│  POST by purpose │
//! └──────────────┘               └──────────────┘  signature) └──────────────────┘
//! ```
//!
//! The widget runs outside this process. [`CheckoutWidgetFactory`] is the
//! seam to it; [`HostedWidgetFactory`] parks widgets for a browser page to
//! open, and tests substitute their own.
//!
//! | purpose | verified at |
//! |---|---|
//! | Order | `/payment/verify` |
//! | SubscriptionPurchase | `/subscription/purchase-verify` |
//! | SubscriptionUpgrade | `/subscription/upgrade-verify` |
//! | SubscriptionRenewal | `/subscription/renew-verify` |
//! | SubscriptionTopup | `/subscription-topup-verify` |
//!
//! Signature checking is the backend's job. Verification is attempted
//! exactly once per receipt.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use checkout_core::{PaymentPurpose, PaymentReceipt, verify_payment};
//!
//! let receipt = PaymentReceipt {
//!     intent_id: "order_1".into(),
//!     payment_id: "pay_1".into(),
//!     signature: "sig_1".into(),
//! };
//!
//! let body = verify_payment(
//!     PaymentPurpose::SubscriptionRenewal,
//!     &receipt,
//!     "http://localhost:4000/api",
//!     &token,
//! ).await?;
//! ```

mod attempts;
mod backend;
mod checkout;
mod config;
mod error;
mod flow;
mod hosted;
mod intent;
mod purpose;
mod verify;

pub use attempts::{AttemptStatus, AttemptStore, MemoryAttemptStore, PaymentAttempt};
pub use backend::{
    BackendClient, CreatedOrder, Customer, DeliveryAddress, FoodItem, OrderDraft, OrderItem,
    OrderTotals, PaymentInitData, SubscriptionCheckout, UserProfile,
};
pub use checkout::{CheckoutInitiator, CheckoutWidgetFactory, CompletionHandler, PendingCheckout};
pub use config::{ConsoleConfig, DEFAULT_API_BASE_URL};
pub use error::{PaymentError, Result, VerificationError};
pub use flow::{PaymentAction, PaymentFlow, PreparedPayment, StartedPayment};
pub use hosted::HostedWidgetFactory;
pub use intent::{
    CheckoutIntent, MerchantProfile, PaymentReceipt, Prefill, Theme, VerifyRequest, WidgetOptions,
    WidgetResponse,
};
pub use purpose::PaymentPurpose;
pub use verify::{VerificationDispatcher, VerificationResult, verify_payment};
