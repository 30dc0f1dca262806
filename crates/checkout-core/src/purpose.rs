//! Payment Purposes
//!
//! The business reason for a payment decides which backend endpoint
//! verifies it.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::VerificationError;

/// Why a payment is being collected
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentPurpose {
    Order,
    SubscriptionPurchase,
    SubscriptionUpgrade,
    SubscriptionRenewal,
    SubscriptionTopup,
}

impl PaymentPurpose {
    /// Every purpose, in routing-table order
    pub const ALL: [Self; 5] = [
        Self::Order,
        Self::SubscriptionPurchase,
        Self::SubscriptionUpgrade,
        Self::SubscriptionRenewal,
        Self::SubscriptionTopup,
    ];

    /// Verification endpoint suffix, appended to the API base URL
    pub const fn verify_endpoint(self) -> &'static str {
        match self {
            Self::Order => "/payment/verify",
            Self::SubscriptionPurchase => "/subscription/purchase-verify",
            Self::SubscriptionUpgrade => "/subscription/upgrade-verify",
            Self::SubscriptionRenewal => "/subscription/renew-verify",
            Self::SubscriptionTopup => "/subscription-topup-verify",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Order => "order",
            Self::SubscriptionPurchase => "subscription-purchase",
            Self::SubscriptionUpgrade => "subscription-upgrade",
            Self::SubscriptionRenewal => "subscription-renewal",
            Self::SubscriptionTopup => "subscription-topup",
        }
    }
}

impl std::fmt::Display for PaymentPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentPurpose {
    type Err = VerificationError;

    /// Accepts the canonical names plus the short tags the console
    /// buttons use (`subscription`, `upgrade`, `renewal`, `topup`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "order" => Ok(Self::Order),
            "subscription" | "purchase" | "subscription-purchase" => Ok(Self::SubscriptionPurchase),
            "upgrade" | "subscription-upgrade" => Ok(Self::SubscriptionUpgrade),
            "renewal" | "renew" | "subscription-renewal" => Ok(Self::SubscriptionRenewal),
            "topup" | "top-up" | "subscription-topup" => Ok(Self::SubscriptionTopup),
            _ => Err(VerificationError::InvalidPurpose(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_table() {
        let routes: Vec<_> = PaymentPurpose::ALL
            .iter()
            .map(|p| p.verify_endpoint())
            .collect();
        assert_eq!(
            routes,
            vec![
                "/payment/verify",
                "/subscription/purchase-verify",
                "/subscription/upgrade-verify",
                "/subscription/renew-verify",
                "/subscription-topup-verify",
            ]
        );
    }

    #[test]
    fn test_short_tags() {
        let parse = |tag: &str| tag.parse::<PaymentPurpose>().unwrap();
        assert_eq!(parse("subscription"), PaymentPurpose::SubscriptionPurchase);
        assert_eq!(parse("topup"), PaymentPurpose::SubscriptionTopup);
        assert_eq!(parse("Renewal"), PaymentPurpose::SubscriptionRenewal);
    }

    #[test]
    fn test_canonical_names_round_trip() {
        for purpose in PaymentPurpose::ALL {
            assert_eq!(purpose.as_str().parse::<PaymentPurpose>().unwrap(), purpose);
        }
    }

    #[test]
    fn test_unknown_purpose() {
        let err = "refund".parse::<PaymentPurpose>().unwrap_err();
        assert!(matches!(err, VerificationError::InvalidPurpose(ref p) if p == "refund"));
    }
}
