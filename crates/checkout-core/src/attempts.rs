//! Payment Attempt Ledger
//!
//! Tracks each checkout from widget handoff to verification outcome so
//! the console can show what happened to the last few payments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::error::{PaymentError, Result};
use crate::intent::{CheckoutIntent, PaymentReceipt};
use crate::purpose::PaymentPurpose;

/// Where an attempt stands
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AttemptStatus {
    AwaitingPayment,
    Verifying,
    Verified,
    Failed { message: String },
    Abandoned,
}

impl AttemptStatus {
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Verified | Self::Failed { .. } | Self::Abandoned)
    }
}

/// One trip through the widget
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentAttempt {
    pub id: Uuid,
    pub purpose: PaymentPurpose,
    pub intent_id: String,
    pub amount_minor_units: u64,
    pub description: String,
    pub status: AttemptStatus,

    /// Set once the widget reports completion
    pub receipt: Option<PaymentReceipt>,

    /// Backend's verification body, on success
    pub verification: Option<Value>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentAttempt {
    pub fn new(purpose: PaymentPurpose, intent: &CheckoutIntent) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            purpose,
            intent_id: intent.intent_id.clone(),
            amount_minor_units: intent.amount_minor_units,
            description: intent.description.clone(),
            status: AttemptStatus::AwaitingPayment,
            receipt: None,
            verification: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn receipt_received(&mut self, receipt: PaymentReceipt) {
        self.receipt = Some(receipt);
        self.transition(AttemptStatus::Verifying);
    }

    pub fn verified(&mut self, result: Value) {
        self.verification = Some(result);
        self.transition(AttemptStatus::Verified);
    }

    pub fn failed(&mut self, message: impl Into<String>) {
        self.transition(AttemptStatus::Failed {
            message: message.into(),
        });
    }

    pub fn abandoned(&mut self) {
        self.transition(AttemptStatus::Abandoned);
    }

    fn transition(&mut self, status: AttemptStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

/// Attempt storage trait
pub trait AttemptStore: Send + Sync {
    /// Save or update an attempt
    fn save(&self, attempt: &PaymentAttempt) -> Result<()>;

    fn get(&self, id: &Uuid) -> Result<Option<PaymentAttempt>>;

    /// Latest attempt for a payment-intent id
    fn get_by_intent(&self, intent_id: &str) -> Result<Option<PaymentAttempt>>;

    /// All attempts, newest first
    fn list(&self) -> Result<Vec<PaymentAttempt>>;

    /// Forget everything
    fn clear(&self) -> Result<()>;
}

/// In-memory attempt store
pub struct MemoryAttemptStore {
    attempts: RwLock<HashMap<Uuid, PaymentAttempt>>,
    by_intent: RwLock<HashMap<String, Uuid>>,
}

impl Default for MemoryAttemptStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAttemptStore {
    pub fn new() -> Self {
        Self {
            attempts: RwLock::new(HashMap::new()),
            by_intent: RwLock::new(HashMap::new()),
        }
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> PaymentError {
    PaymentError::Storage(e.to_string())
}

impl AttemptStore for MemoryAttemptStore {
    fn save(&self, attempt: &PaymentAttempt) -> Result<()> {
        let mut attempts = self.attempts.write().map_err(poisoned)?;
        let mut by_intent = self.by_intent.write().map_err(poisoned)?;

        by_intent.insert(attempt.intent_id.clone(), attempt.id);
        attempts.insert(attempt.id, attempt.clone());

        Ok(())
    }

    fn get(&self, id: &Uuid) -> Result<Option<PaymentAttempt>> {
        let attempts = self.attempts.read().map_err(poisoned)?;
        Ok(attempts.get(id).cloned())
    }

    fn get_by_intent(&self, intent_id: &str) -> Result<Option<PaymentAttempt>> {
        let attempts = self.attempts.read().map_err(poisoned)?;
        let by_intent = self.by_intent.read().map_err(poisoned)?;

        Ok(by_intent.get(intent_id).and_then(|id| attempts.get(id).cloned()))
    }

    fn list(&self) -> Result<Vec<PaymentAttempt>> {
        let attempts = self.attempts.read().map_err(poisoned)?;
        let mut all: Vec<_> = attempts.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    fn clear(&self) -> Result<()> {
        self.attempts.write().map_err(poisoned)?.clear();
        self.by_intent.write().map_err(poisoned)?.clear();
        Ok(())
    }
}
