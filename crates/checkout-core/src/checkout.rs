//! Checkout Handoff
//!
//! Opens the Razorpay checkout widget for an intent and reports the
//! receipt once the payer completes it. The widget itself lives outside
//! this process; [`CheckoutWidgetFactory`] is the seam to it.

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::error::{PaymentError, Result};
use crate::intent::{
    CheckoutIntent, MerchantProfile, PaymentReceipt, WidgetOptions, WidgetResponse,
};

/// Single-shot completion callback.
///
/// Consumed on invocation, so it fires at most once. Dropping it
/// without invoking it means the payer never completed payment.
pub struct CompletionHandler(Box<dyn FnOnce(PaymentReceipt) + Send>);

impl CompletionHandler {
    pub fn new(on_complete: impl FnOnce(PaymentReceipt) + Send + 'static) -> Self {
        Self(Box::new(on_complete))
    }

    /// Deliver the widget's handler payload
    pub fn complete(self, response: WidgetResponse) {
        (self.0)(PaymentReceipt::from(response));
    }
}

impl std::fmt::Debug for CompletionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CompletionHandler")
    }
}

/// Constructs and opens checkout widgets
///
/// Implement this for each place the widget can live: a browser page,
/// a test double, etc.
pub trait CheckoutWidgetFactory: Send + Sync {
    /// Open a widget. Must return without waiting for the payer.
    fn open(&self, options: WidgetOptions, handler: CompletionHandler) -> Result<()>;
}

/// Receipt that has not arrived yet
#[derive(Debug)]
pub struct PendingCheckout {
    intent_id: String,
    receiver: oneshot::Receiver<PaymentReceipt>,
}

impl PendingCheckout {
    pub fn intent_id(&self) -> &str {
        &self.intent_id
    }

    /// Wait for the payer. Resolves at most once; fails with
    /// [`PaymentError::Abandoned`] if the widget was discarded.
    pub async fn receipt(self) -> Result<PaymentReceipt> {
        self.receiver
            .await
            .map_err(|_| PaymentError::Abandoned(self.intent_id))
    }
}

/// Opens checkout widgets through an injected factory
#[derive(Clone)]
pub struct CheckoutInitiator {
    factory: Arc<dyn CheckoutWidgetFactory>,
    merchant: MerchantProfile,
}

impl CheckoutInitiator {
    pub fn new(factory: Arc<dyn CheckoutWidgetFactory>) -> Self {
        Self {
            factory,
            merchant: MerchantProfile::default(),
        }
    }

    pub const fn merchant(&self) -> &MerchantProfile {
        &self.merchant
    }

    /// Open the widget and return immediately.
    ///
    /// `on_complete` runs once when the payer finishes, on whatever task
    /// delivers the widget's callback. It never runs if the payer closes
    /// the widget.
    pub fn open_checkout<F>(&self, intent: &CheckoutIntent, on_complete: F) -> Result<WidgetOptions>
    where
        F: FnOnce(PaymentReceipt) + Send + 'static,
    {
        intent.validate()?;

        let options = WidgetOptions::build(intent, &self.merchant);

        tracing::info!(
            intent_id = %intent.intent_id,
            amount = intent.amount_minor_units,
            description = %intent.description,
            "Opening checkout"
        );

        self.factory
            .open(options.clone(), CompletionHandler::new(on_complete))?;

        Ok(options)
    }

    /// Future-flavoured [`open_checkout`](Self::open_checkout)
    pub fn open_checkout_async(
        &self,
        intent: &CheckoutIntent,
    ) -> Result<(WidgetOptions, PendingCheckout)> {
        let (sender, receiver) = oneshot::channel();
        let options = self.open_checkout(intent, move |receipt| {
            // Receiver gone means the caller stopped caring
            let _ = sender.send(receipt);
        })?;

        Ok((
            options,
            PendingCheckout {
                intent_id: intent.intent_id.clone(),
                receiver,
            },
        ))
    }
}

impl std::fmt::Debug for CheckoutInitiator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutInitiator")
            .field("merchant", &self.merchant)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Completes every widget on open with a fixed payment
    struct CompletingWidget {
        opened: Mutex<Vec<WidgetOptions>>,
    }

    impl CheckoutWidgetFactory for CompletingWidget {
        fn open(&self, options: WidgetOptions, handler: CompletionHandler) -> Result<()> {
            let order_id = options.order_id.clone();
            self.opened.lock().unwrap().push(options);
            handler.complete(WidgetResponse {
                razorpay_order_id: order_id,
                razorpay_payment_id: "pay_1".into(),
                razorpay_signature: "sig_1".into(),
            });
            Ok(())
        }
    }

    /// Payer always closes the widget
    struct ClosedWidget;

    impl CheckoutWidgetFactory for ClosedWidget {
        fn open(&self, _options: WidgetOptions, handler: CompletionHandler) -> Result<()> {
            drop(handler);
            Ok(())
        }
    }

    struct MissingSdk;

    impl CheckoutWidgetFactory for MissingSdk {
        fn open(&self, _options: WidgetOptions, _handler: CompletionHandler) -> Result<()> {
            Err(PaymentError::WidgetUnavailable("checkout.js not loaded".into()))
        }
    }

    fn intent() -> CheckoutIntent {
        CheckoutIntent::new("order_1", 99900, "Subscription purchase for branch b1", "rzp_test_key")
    }

    #[test]
    fn test_completion_fires_once_with_matching_receipt() {
        let widget = Arc::new(CompletingWidget { opened: Mutex::new(Vec::new()) });
        let initiator = CheckoutInitiator::new(widget.clone());

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(None));
        let (calls_cb, seen_cb) = (calls.clone(), seen.clone());

        initiator
            .open_checkout(&intent(), move |receipt| {
                calls_cb.fetch_add(1, Ordering::SeqCst);
                *seen_cb.lock().unwrap() = Some(receipt);
            })
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            seen.lock().unwrap().clone(),
            Some(PaymentReceipt {
                intent_id: "order_1".into(),
                payment_id: "pay_1".into(),
                signature: "sig_1".into(),
            })
        );

        let opened = widget.opened.lock().unwrap();
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0].order_id, "order_1");
        assert_eq!(opened[0].amount, 99900);
        assert_eq!(opened[0].key, "rzp_test_key");
    }

    #[test]
    fn test_invalid_intent_never_opens() {
        let widget = Arc::new(CompletingWidget { opened: Mutex::new(Vec::new()) });
        let initiator = CheckoutInitiator::new(widget.clone());

        let bad = CheckoutIntent::new("order_1", 0, "free?", "rzp_test_key");
        let result = initiator.open_checkout(&bad, |_| panic!("must not complete"));

        assert!(matches!(result, Err(PaymentError::InvalidIntent(_))));
        assert!(widget.opened.lock().unwrap().is_empty());
    }

    #[test]
    fn test_factory_failure_propagates() {
        let initiator = CheckoutInitiator::new(Arc::new(MissingSdk));
        let result = initiator.open_checkout(&intent(), |_| {});
        assert!(matches!(result, Err(PaymentError::WidgetUnavailable(_))));
    }

    #[tokio::test]
    async fn test_async_checkout_resolves() {
        let widget = Arc::new(CompletingWidget { opened: Mutex::new(Vec::new()) });
        let initiator = CheckoutInitiator::new(widget);

        let (_, pending) = initiator.open_checkout_async(&intent()).unwrap();
        let receipt = pending.receipt().await.unwrap();
        assert_eq!(receipt.intent_id, "order_1");
    }

    #[tokio::test]
    async fn test_closed_widget_is_abandoned() {
        let initiator = CheckoutInitiator::new(Arc::new(ClosedWidget));

        let (_, pending) = initiator.open_checkout_async(&intent()).unwrap();
        assert_eq!(pending.intent_id(), "order_1");
        assert!(matches!(
            pending.receipt().await,
            Err(PaymentError::Abandoned(id)) if id == "order_1"
        ));
    }
}
