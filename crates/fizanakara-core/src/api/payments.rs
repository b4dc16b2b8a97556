//! Payment endpoints under `/admins/payments`.

use anyhow::{Context, Result};
use tracing::info;
use validator::Validate;

use super::client::path_id;
use super::{ApiClient, ApiError};
use crate::models::{Payment, PaymentRequest};

const PAYMENTS_PATH: &str = "/admins/payments";

impl ApiClient {
    pub async fn payments_for(&self, contribution_id: &str) -> Result<Vec<Payment>> {
        let contribution_id = path_id(contribution_id)?;
        self.get(&format!("{}/contribution/{}", PAYMENTS_PATH, contribution_id))
            .await
            .with_context(|| format!("Failed to fetch payments for {}", contribution_id))
    }

    /// Record a payment. The server refuses amounts above what is still owed.
    pub async fn create_payment(&self, request: &PaymentRequest) -> Result<Payment> {
        request.validate().map_err(ApiError::from)?;
        let payment: Payment = self
            .post(PAYMENTS_PATH, request)
            .await
            .context("Failed to record payment")?;
        info!(
            payment_id = %payment.id,
            contribution_id = %payment.contribution_id,
            amount = payment.amount_paid,
            "Payment recorded"
        );
        Ok(payment)
    }

    pub async fn update_payment(&self, id: &str, request: &PaymentRequest) -> Result<Payment> {
        let id = path_id(id)?;
        request.validate().map_err(ApiError::from)?;
        self.put(&format!("{}/{}", PAYMENTS_PATH, id), request)
            .await
            .with_context(|| format!("Failed to update payment {}", id))
    }

    pub async fn delete_payment(&self, id: &str) -> Result<()> {
        let id = path_id(id)?;
        self.delete_unit(&format!("{}/{}", PAYMENTS_PATH, id)).await
    }
}
