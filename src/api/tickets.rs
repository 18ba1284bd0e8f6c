//! Ticket API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;

use super::{error, success, ApiResult};
use crate::auth::Caller;
use crate::errors::AppError;
use crate::models::{CompleteTicketRequest, Ticket};
use crate::queue::lifecycle::{authorize_operator, completion_service_type};
use crate::AppState;

/// GET /api/tickets - List tickets still in the queue.
pub async fn list_active_tickets(State(state): State<AppState>) -> ApiResult<Vec<Ticket>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_active_tickets().await {
        Ok(tickets) => success(tickets, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/tickets/:id - Get a single ticket.
pub async fn get_ticket(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Ticket> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_ticket(&id).await {
        Ok(Some(ticket)) => success(ticket, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Ticket {} not found", id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/tickets - Draw a new ticket at a kiosk.
pub async fn create_ticket(State(state): State<AppState>) -> ApiResult<Ticket> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state
        .repo
        .create_ticket(Utc::now(), state.config.numbering, state.config.utc_offset)
        .await
    {
        Ok(ticket) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(ticket, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/tickets/:id/call - Call a specific waiting ticket.
pub async fn call_ticket(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(id): Path<String>,
) -> ApiResult<Ticket> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let operator = match authorize_operator(identity) {
        Ok(operator) => operator,
        Err(e) => return error(e, revision_id),
    };

    match state.repo.call_ticket(&id, &operator.id, Utc::now()).await {
        Ok(ticket) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(ticket, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/tickets/:id/complete - Complete a called ticket.
pub async fn complete_ticket(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(id): Path<String>,
    Json(request): Json<CompleteTicketRequest>,
) -> ApiResult<Ticket> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = authorize_operator(identity) {
        return error(e, revision_id);
    }

    let service_type_id =
        match completion_service_type(state.config.require_service_type, request.service_type_id)
        {
            Ok(service_type_id) => service_type_id,
            Err(e) => return error(e, revision_id),
        };

    match state
        .repo
        .complete_ticket(&id, service_type_id.as_deref())
        .await
    {
        Ok(ticket) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(ticket, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
