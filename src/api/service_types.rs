//! Service type API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{CreateServiceTypeRequest, ServiceType};
use crate::AppState;

/// GET /api/service-types - List all service types.
pub async fn list_service_types(State(state): State<AppState>) -> ApiResult<Vec<ServiceType>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_service_types().await {
        Ok(service_types) => success(service_types, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/service-types - Create a new service type.
pub async fn create_service_type(
    State(state): State<AppState>,
    Json(request): Json<CreateServiceTypeRequest>,
) -> ApiResult<ServiceType> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if request.name.trim().is_empty() {
        return error(
            AppError::Validation("Service type name is required".to_string()),
            revision_id,
        );
    }

    match state.repo.create_service_type(&request).await {
        Ok(service_type) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(service_type, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/service-types/:id - Delete a service type.
pub async fn delete_service_type(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.delete_service_type(&id).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
