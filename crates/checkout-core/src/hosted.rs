//! Browser-hosted Checkout Widget
//!
//! The widget runs in the operator's browser. Opening one parks its
//! handler here, keyed by order id, until the page has run Razorpay's
//! checkout.js with the same options and posted the handler payload back.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::checkout::{CheckoutWidgetFactory, CompletionHandler};
use crate::error::{PaymentError, Result};
use crate::intent::{WidgetOptions, WidgetResponse};

struct ParkedWidget {
    handler: CompletionHandler,
    opened_at: DateTime<Utc>,
}

/// Widget factory backed by a browser page
#[derive(Default)]
pub struct HostedWidgetFactory {
    parked: Mutex<HashMap<String, ParkedWidget>>,
}

impl HostedWidgetFactory {
    pub fn new() -> Self {
        Self::default()
    }

    fn parked(&self) -> Result<MutexGuard<'_, HashMap<String, ParkedWidget>>> {
        self.parked
            .lock()
            .map_err(|e| PaymentError::Storage(e.to_string()))
    }

    /// Order ids of open widgets, oldest first
    pub fn open_intents(&self) -> Result<Vec<String>> {
        let parked = self.parked()?;
        let mut open: Vec<_> = parked
            .iter()
            .map(|(id, w)| (w.opened_at, id.clone()))
            .collect();
        open.sort();
        Ok(open.into_iter().map(|(_, id)| id).collect())
    }

    /// Deliver the widget's handler payload to whoever opened it
    pub fn complete(&self, response: WidgetResponse) -> Result<()> {
        let parked = self
            .parked()?
            .remove(&response.razorpay_order_id)
            .ok_or_else(|| PaymentError::UnknownIntent(response.razorpay_order_id.clone()))?;

        tracing::info!(
            intent_id = %response.razorpay_order_id,
            payment_id = %response.razorpay_payment_id,
            "Checkout completed"
        );

        // Lock released above; the handler may take its time
        parked.handler.complete(response);
        Ok(())
    }

    /// Payer closed the widget without paying
    pub fn abandon(&self, order_id: &str) -> Result<()> {
        let parked = self
            .parked()?
            .remove(order_id)
            .ok_or_else(|| PaymentError::UnknownIntent(order_id.to_string()))?;

        tracing::info!(intent_id = %order_id, "Checkout abandoned");
        drop(parked);
        Ok(())
    }
}

impl CheckoutWidgetFactory for HostedWidgetFactory {
    fn open(&self, options: WidgetOptions, handler: CompletionHandler) -> Result<()> {
        let order_id = options.order_id;
        let previous = self.parked()?.insert(
            order_id.clone(),
            ParkedWidget {
                handler,
                opened_at: Utc::now(),
            },
        );

        if previous.is_some() {
            tracing::warn!(intent_id = %order_id, "Replaced an open checkout for the same intent");
        }
        Ok(())
    }
}
