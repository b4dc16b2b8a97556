//! Member registry endpoints under `/admins/persons`.

use anyhow::{Context, Result};
use tracing::info;
use validator::Validate;

use super::client::path_id;
use super::{ApiClient, ApiError};
use crate::models::{GenericResponse, Person, PersonRequest};

const PERSONS_PATH: &str = "/admins/persons";

impl ApiClient {
    pub async fn list_members(&self) -> Result<Vec<Person>> {
        self.get(PERSONS_PATH).await.context("Failed to fetch members")
    }

    pub async fn get_member(&self, id: &str) -> Result<Person> {
        let id = path_id(id)?;
        self.get(&format!("{}/{}", PERSONS_PATH, id)).await
    }

    pub async fn create_member(&self, request: &PersonRequest) -> Result<Person> {
        request.validate().map_err(ApiError::from)?;
        let person: Person = self
            .post(PERSONS_PATH, request)
            .await
            .context("Failed to create member")?;
        info!(member_id = %person.id, "Member created");
        Ok(person)
    }

    pub async fn update_member(&self, id: &str, request: &PersonRequest) -> Result<Person> {
        let id = path_id(id)?;
        request.validate().map_err(ApiError::from)?;
        self.put(&format!("{}/{}", PERSONS_PATH, id), request)
            .await
            .with_context(|| format!("Failed to update member {}", id))
    }

    pub async fn delete_member(&self, id: &str) -> Result<GenericResponse> {
        let id = path_id(id)?;
        self.delete(&format!("{}/{}", PERSONS_PATH, id))
            .await
            .with_context(|| format!("Failed to delete member {}", id))
    }

    /// Remove every member. SUPERADMIN only on the server.
    pub async fn delete_all_members(&self) -> Result<GenericResponse> {
        self.delete(&format!("{}/delete-all", PERSONS_PATH)).await
    }

    /// Turn a dependent who reached majority into a full member
    pub async fn promote_member(&self, id: &str) -> Result<Person> {
        let id = path_id(id)?;
        let person: Person = self
            .post_empty(&format!("{}/{}/promote", PERSONS_PATH, id))
            .await
            .with_context(|| format!("Failed to promote member {}", id))?;
        info!(member_id = %person.id, "Member promoted");
        Ok(person)
    }

    pub async fn add_child(&self, parent_id: &str, request: &PersonRequest) -> Result<Person> {
        let parent_id = path_id(parent_id)?;
        request.validate().map_err(ApiError::from)?;
        self.post(&format!("{}/{}/children", PERSONS_PATH, parent_id), request)
            .await
            .with_context(|| format!("Failed to add child to {}", parent_id))
    }

    pub async fn list_children(&self, parent_id: &str) -> Result<Vec<Person>> {
        let parent_id = path_id(parent_id)?;
        self.get(&format!("{}/{}/children", PERSONS_PATH, parent_id))
            .await
    }
}
