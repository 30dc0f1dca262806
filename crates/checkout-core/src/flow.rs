//! Payment Flows
//!
//! Ties the pieces together for each kind of payment:
//!
//! ```text
//! create on backend ──▶ open checkout ──▶ payer completes ──▶ verify
//!   (order/sub action)    (intent id)       (receipt)        (by purpose)
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::attempts::{AttemptStore, PaymentAttempt};
use crate::backend::{BackendClient, Customer, OrderDraft};
use crate::checkout::{CheckoutInitiator, PendingCheckout};
use crate::config::ConsoleConfig;
use crate::error::{PaymentError, Result};
use crate::intent::{CheckoutIntent, WidgetOptions, validate_public_key};
use crate::purpose::PaymentPurpose;
use crate::verify::VerificationDispatcher;

/// Minor units per major unit (paise per rupee)
pub const MINOR_UNITS: u64 = 100;

/// Top-ups are charged ₹10 per additional order
pub const TOPUP_PRICE_PER_ORDER: u64 = 10;

/// A payment the operator wants to make, with its inputs
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PaymentAction {
    Order {
        draft: OrderDraft,
    },
    SubscriptionPurchase {
        branch_id: String,
        subscription_id: String,
        /// Rupees
        amount: u64,
    },
    SubscriptionTopup {
        branch_id: String,
        additional_orders: u64,
    },
    SubscriptionUpgrade {
        branch_id: String,
        new_subscription_id: String,
        amount: u64,
    },
    SubscriptionRenewal {
        branch_id: String,
        amount: u64,
    },
}

impl PaymentAction {
    pub const fn purpose(&self) -> PaymentPurpose {
        match self {
            Self::Order { .. } => PaymentPurpose::Order,
            Self::SubscriptionPurchase { .. } => PaymentPurpose::SubscriptionPurchase,
            Self::SubscriptionTopup { .. } => PaymentPurpose::SubscriptionTopup,
            Self::SubscriptionUpgrade { .. } => PaymentPurpose::SubscriptionUpgrade,
            Self::SubscriptionRenewal { .. } => PaymentPurpose::SubscriptionRenewal,
        }
    }

    /// Reject bad inputs before touching the backend
    pub fn validate(&self) -> Result<()> {
        fn required(value: &str, message: &str) -> Result<()> {
            if value.trim().is_empty() {
                Err(PaymentError::InvalidInput(message.into()))
            } else {
                Ok(())
            }
        }

        match self {
            Self::Order { draft } => draft.validate(),
            Self::SubscriptionPurchase {
                branch_id,
                subscription_id,
                amount,
            } => {
                required(branch_id, "Branch ID and Subscription ID are required")?;
                required(subscription_id, "Branch ID and Subscription ID are required")?;
                charge(*amount).map(drop)
            }
            Self::SubscriptionUpgrade {
                branch_id,
                new_subscription_id,
                amount,
            } => {
                let message = "Branch ID and New Subscription ID are required";
                required(branch_id, message)?;
                required(new_subscription_id, message)?;
                charge(*amount).map(drop)
            }
            Self::SubscriptionTopup {
                branch_id,
                additional_orders,
            } => {
                required(branch_id, "Branch ID is required")?;
                topup_charge(*additional_orders).map(drop)
            }
            Self::SubscriptionRenewal { branch_id, amount } => {
                required(branch_id, "Branch ID is required")?;
                charge(*amount).map(drop)
            }
        }
    }
}

/// Widget amount for a rupee price; zero and overflow are rejected
fn charge(rupees: u64) -> Result<u64> {
    if rupees == 0 {
        return Err(PaymentError::InvalidInput(
            "Amount must be greater than zero".into(),
        ));
    }
    rupees
        .checked_mul(MINOR_UNITS)
        .ok_or_else(|| PaymentError::InvalidInput(format!("amount {rupees} is too large")))
}

fn topup_charge(additional_orders: u64) -> Result<u64> {
    if additional_orders == 0 {
        return Err(PaymentError::InvalidInput(
            "Additional orders must be at least 1".into(),
        ));
    }
    additional_orders
        .checked_mul(TOPUP_PRICE_PER_ORDER)
        .ok_or_else(|| PaymentError::InvalidInput("too many additional orders".into()))
        .and_then(charge)
}

/// Business object created for a payment, ready for checkout
#[derive(Clone, Debug)]
pub struct PreparedPayment {
    pub purpose: PaymentPurpose,
    pub intent: CheckoutIntent,

    /// Order or subscription details returned by the backend
    pub details: Value,
}

/// A checkout that has been handed to the widget
#[derive(Debug)]
pub struct StartedPayment {
    pub attempt: PaymentAttempt,
    pub options: WidgetOptions,
    pub details: Value,

    /// Resolves to the final attempt once verified or abandoned
    pub settled: JoinHandle<PaymentAttempt>,
}

/// Runs payments end to end
pub struct PaymentFlow<S: AttemptStore> {
    backend: BackendClient,
    initiator: CheckoutInitiator,
    dispatcher: VerificationDispatcher,
    attempts: Arc<S>,
}

impl<S: AttemptStore + 'static> PaymentFlow<S> {
    pub fn new(
        backend: BackendClient,
        initiator: CheckoutInitiator,
        dispatcher: VerificationDispatcher,
        attempts: Arc<S>,
    ) -> Self {
        Self {
            backend,
            initiator,
            dispatcher,
            attempts,
        }
    }

    /// Create the business object and build its checkout intent.
    ///
    /// Inputs and the key id are checked first, so nothing is created on
    /// the backend for a checkout that could never open.
    pub async fn prepare(&self, action: &PaymentAction) -> Result<PreparedPayment> {
        action.validate()?;

        let key = self.backend.config().razorpay_key_id.clone();
        validate_public_key(&key)?;
        let purpose = action.purpose();

        let (intent, details) = match action {
            PaymentAction::Order { draft } => {
                let mut draft = draft.clone();
                if draft.customer.is_none() {
                    match self.backend.current_user().await {
                        Ok(user) => draft.customer = Some(Customer::from(&user)),
                        Err(e) => {
                            tracing::warn!(error = %e, "Creating order without customer details");
                        }
                    }
                }

                let totals = self.backend.calculate_order(&draft).await?;
                let created = self.backend.create_order(&draft, &totals).await?;
                let init = created.payment_init_data.clone().ok_or_else(|| {
                    PaymentError::MissingIntent(format!("order {}", created.order_id()))
                })?;

                let intent = CheckoutIntent::new(
                    init.razorpay_order_id,
                    init.amount,
                    format!("Payment for Order #{}", created.order_id()),
                    key,
                );
                (intent, created.order)
            }

            PaymentAction::SubscriptionPurchase {
                branch_id,
                subscription_id,
                amount,
            } => {
                let checkout = self
                    .backend
                    .purchase_subscription(branch_id, subscription_id, *amount)
                    .await?;
                let intent = CheckoutIntent::new(
                    checkout.intent_id("subscription purchase")?,
                    charge(*amount)?,
                    format!("Subscription purchase for branch {branch_id}"),
                    key,
                );
                (intent, Value::Object(checkout.details))
            }

            PaymentAction::SubscriptionTopup {
                branch_id,
                additional_orders,
            } => {
                let checkout = self
                    .backend
                    .topup_subscription(branch_id, *additional_orders)
                    .await?;
                let intent = CheckoutIntent::new(
                    checkout.intent_id("subscription top-up")?,
                    topup_charge(*additional_orders)?,
                    format!("Top-up {additional_orders} orders for branch {branch_id}"),
                    key,
                );
                (intent, Value::Object(checkout.details))
            }

            PaymentAction::SubscriptionUpgrade {
                branch_id,
                new_subscription_id,
                amount,
            } => {
                let checkout = self
                    .backend
                    .upgrade_subscription(branch_id, new_subscription_id, *amount)
                    .await?;
                let intent = CheckoutIntent::new(
                    checkout.intent_id("subscription upgrade")?,
                    charge(*amount)?,
                    format!("Subscription upgrade for branch {branch_id}"),
                    key,
                );
                (intent, Value::Object(checkout.details))
            }

            PaymentAction::SubscriptionRenewal { branch_id, amount } => {
                let checkout = self.backend.renew_subscription(branch_id, *amount).await?;
                let intent = CheckoutIntent::new(
                    checkout.intent_id("subscription renewal")?,
                    charge(*amount)?,
                    format!("Subscription renewal for branch {branch_id}"),
                    key,
                );
                (intent, Value::Object(checkout.details))
            }
        };

        Ok(PreparedPayment {
            purpose,
            intent,
            details,
        })
    }

    /// Create, open checkout, and verify in the background.
    ///
    /// Must be called inside a Tokio runtime.
    pub async fn start(&self, action: &PaymentAction) -> Result<StartedPayment> {
        let prepared = self.prepare(action).await?;

        // Saved before the widget can complete
        let mut attempt = PaymentAttempt::new(prepared.purpose, &prepared.intent);
        self.attempts.save(&attempt)?;

        let (options, pending) = match self.initiator.open_checkout_async(&prepared.intent) {
            Ok(opened) => opened,
            Err(e) => {
                attempt.failed(e.user_message());
                record(&*self.attempts, &attempt);
                return Err(e);
            }
        };

        tracing::info!(
            attempt_id = %attempt.id,
            purpose = %prepared.purpose,
            intent_id = %attempt.intent_id,
            "Checkout opened"
        );

        let settled = tokio::spawn(settle(
            attempt.clone(),
            pending,
            self.dispatcher.clone(),
            self.backend.config().clone(),
            self.attempts.clone(),
        ));

        Ok(StartedPayment {
            attempt,
            options,
            details: prepared.details,
            settled,
        })
    }
}

/// Wait for the receipt, verify it, and record the outcome
async fn settle<S: AttemptStore>(
    mut attempt: PaymentAttempt,
    pending: PendingCheckout,
    dispatcher: VerificationDispatcher,
    config: ConsoleConfig,
    attempts: Arc<S>,
) -> PaymentAttempt {
    let receipt = match pending.receipt().await {
        Ok(receipt) => receipt,
        Err(_) => {
            attempt.abandoned();
            record(&*attempts, &attempt);
            return attempt;
        }
    };

    attempt.receipt_received(receipt.clone());
    record(&*attempts, &attempt);

    match dispatcher
        .verify(attempt.purpose, &receipt, &config.api_base_url, &config.auth_token)
        .await
    {
        Ok(result) => attempt.verified(result),
        Err(e) => {
            tracing::error!(
                attempt_id = %attempt.id,
                purpose = %attempt.purpose,
                error = %e,
                "Payment verification failed"
            );
            attempt.failed(e.user_message());
        }
    }

    record(&*attempts, &attempt);
    attempt
}

fn record<S: AttemptStore + ?Sized>(attempts: &S, attempt: &PaymentAttempt) {
    if let Err(e) = attempts.save(attempt) {
        tracing::error!(attempt_id = %attempt.id, error = %e, "Failed to record payment attempt");
    }
}
