use serde::{Deserialize, Serialize};
use validator::Validate;

use super::common::ContributionStatus;
use super::payment::Payment;
use crate::validation::validate_generation_year;

/// Annual dues obligation assigned to a member (or to one of their children).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct Contribution {
    pub id: String,
    pub year: i32,
    #[serde(default)]
    pub amount: f64,
    #[serde(alias = "contributionStatus", default)]
    pub status: Option<ContributionStatus>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub total_paid: f64,
    #[serde(default)]
    pub remaining: f64,
    #[serde(default)]
    pub member_id: Option<String>,
    #[serde(default)]
    pub member_name: Option<String>,
    #[serde(default)]
    pub child_id: Option<String>,
    #[serde(default)]
    pub child_name: Option<String>,
    #[serde(default)]
    pub payments: Vec<Payment>,
}

/// Coarse payment progress used for badges and summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentProgress {
    Pending,
    Partial,
    Paid,
}

impl Contribution {
    /// Recompute `remaining` from `amount` and `total_paid`.
    ///
    /// Every record leaving the API layer goes through this, so callers can
    /// rely on `remaining == amount - total_paid`.
    pub fn reconciled(mut self) -> Self {
        self.remaining = self.amount - self.total_paid;
        self
    }

    pub fn is_fully_paid(&self) -> bool {
        self.remaining <= 0.0
    }

    /// Share of the amount already paid, rounded to a whole percent.
    pub fn payment_percentage(&self) -> u32 {
        if self.amount <= 0.0 {
            return 0;
        }
        ((self.total_paid / self.amount) * 100.0).round().clamp(0.0, 100.0) as u32
    }

    pub fn progress(&self) -> PaymentProgress {
        match self.payment_percentage() {
            0 => PaymentProgress::Pending,
            100 => PaymentProgress::Paid,
            _ => PaymentProgress::Partial,
        }
    }

    /// Name of whoever owes this contribution: the child when set, else the member
    pub fn debtor_name(&self) -> &str {
        self.child_name
            .as_deref()
            .or(self.member_name.as_deref())
            .unwrap_or("Unknown")
    }

    /// True when this contribution belongs to `person_id`, directly or as a child
    pub fn belongs_to(&self, person_id: &str) -> bool {
        self.member_id.as_deref() == Some(person_id) || self.child_id.as_deref() == Some(person_id)
    }
}

/// Body of `POST /admins/contributions`: generate every eligible member's dues for a year.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct GenerateContributionsRequest {
    #[validate(custom(function = "validate_generation_year"))]
    pub year: i32,
}

#[derive(Debug, Clone, Default, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ContributionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(exclusive_min = 0.0, message = "Amount must be positive"))]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ContributionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_id: Option<String>,
}
