use serde::{Deserialize, Serialize};
use validator::Validate;

use super::common::PaymentStatus;
use crate::validation::validate_iso_date;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct Payment {
    pub id: String,
    #[serde(alias = "amountPayed")]
    pub amount_paid: f64,
    #[serde(default)]
    pub payment_date: Option<String>,
    #[serde(alias = "paymentStatus")]
    pub status: PaymentStatus,
    pub contribution_id: String,
}

/// Body for recording or editing a payment against a contribution.
/// The server rejects payments that would exceed the contribution amount.
#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    #[validate(range(exclusive_min = 0.0, message = "Amount must be positive"))]
    pub amount_paid: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_iso_date"))]
    pub payment_date: Option<String>,
    pub status: PaymentStatus,
    #[validate(length(min = 1, message = "Contribution is required"))]
    pub contribution_id: String,
}

impl PaymentRequest {
    /// A completed payment dated today
    pub fn completed(contribution_id: impl Into<String>, amount_paid: f64) -> Self {
        Self {
            amount_paid,
            payment_date: Some(chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()),
            status: PaymentStatus::Completed,
            contribution_id: contribution_id.into(),
        }
    }
}
