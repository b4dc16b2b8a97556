//! District and tribute endpoints. Both taxonomies share one shape, so the
//! calls are parameterized by `LocationKind`.

use anyhow::{Context, Result};
use validator::Validate;

use super::{ApiClient, ApiError};
use crate::models::{GenericResponse, Location, LocationKind, LocationRequest};

impl ApiClient {
    pub async fn list_locations(&self, kind: LocationKind) -> Result<Vec<Location>> {
        self.get(kind.base_path())
            .await
            .with_context(|| format!("Failed to fetch {}s", kind))
    }

    pub async fn get_location(&self, kind: LocationKind, id: i64) -> Result<Location> {
        self.get(&format!("{}/{}", kind.base_path(), id)).await
    }

    pub async fn create_location(&self, kind: LocationKind, request: &LocationRequest) -> Result<Location> {
        request.validate().map_err(ApiError::from)?;
        self.post(kind.base_path(), request)
            .await
            .with_context(|| format!("Failed to create {}", kind))
    }

    pub async fn update_location(&self, kind: LocationKind, id: i64, request: &LocationRequest) -> Result<Location> {
        request.validate().map_err(ApiError::from)?;
        self.put(&format!("{}/{}", kind.base_path(), id), request)
            .await
            .with_context(|| format!("Failed to update {} {}", kind, id))
    }

    pub async fn delete_location(&self, kind: LocationKind, id: i64) -> Result<GenericResponse> {
        self.delete(&format!("{}/{}", kind.base_path(), id))
            .await
            .with_context(|| format!("Failed to delete {} {}", kind, id))
    }

    pub async fn delete_all_locations(&self, kind: LocationKind) -> Result<GenericResponse> {
        self.delete(&format!("{}/delete-all", kind.base_path())).await
    }
}
