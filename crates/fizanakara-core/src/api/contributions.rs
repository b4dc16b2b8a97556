//! Annual dues endpoints under `/admins/contributions`.
//!
//! The server's `remaining` figure is not trusted: every record is
//! reconciled against `amount - totalPaid` before it leaves this module.

use anyhow::{Context, Result};
use tracing::info;
use validator::Validate;

use super::client::path_id;
use super::{ApiClient, ApiError};
use crate::models::{Contribution, ContributionUpdate, GenerateContributionsRequest};

const CONTRIBUTIONS_PATH: &str = "/admins/contributions";

fn reconcile_all(contributions: Vec<Contribution>) -> Vec<Contribution> {
    contributions.into_iter().map(Contribution::reconciled).collect()
}

impl ApiClient {
    pub async fn list_contributions(&self) -> Result<Vec<Contribution>> {
        let contributions: Vec<Contribution> = self
            .get(CONTRIBUTIONS_PATH)
            .await
            .context("Failed to fetch contributions")?;
        Ok(reconcile_all(contributions))
    }

    pub async fn contributions_for(&self, person_id: &str, year: i32) -> Result<Vec<Contribution>> {
        let person_id = path_id(person_id)?;
        let contributions: Vec<Contribution> = self
            .get(&format!("{}/person/{}/year/{}", CONTRIBUTIONS_PATH, person_id, year))
            .await
            .with_context(|| format!("Failed to fetch {} contributions for {}", year, person_id))?;
        Ok(reconcile_all(contributions))
    }

    /// Create the year's dues for every eligible member
    pub async fn generate_contributions(&self, year: i32) -> Result<Vec<Contribution>> {
        let request = GenerateContributionsRequest { year };
        request.validate().map_err(ApiError::from)?;

        let contributions: Vec<Contribution> = self
            .post(CONTRIBUTIONS_PATH, &request)
            .await
            .with_context(|| format!("Failed to generate contributions for {}", year))?;
        info!(year, count = contributions.len(), "Contributions generated");
        Ok(reconcile_all(contributions))
    }

    pub async fn update_contribution(&self, id: &str, update: &ContributionUpdate) -> Result<Contribution> {
        let id = path_id(id)?;
        update.validate().map_err(ApiError::from)?;
        let contribution: Contribution = self
            .put(&format!("{}/{}", CONTRIBUTIONS_PATH, id), update)
            .await
            .with_context(|| format!("Failed to update contribution {}", id))?;
        Ok(contribution.reconciled())
    }

    pub async fn delete_contribution(&self, id: &str) -> Result<()> {
        let id = path_id(id)?;
        self.delete_unit(&format!("{}/{}", CONTRIBUTIONS_PATH, id)).await
    }
}
