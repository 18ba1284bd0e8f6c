//! Queue views and the call-next action.

use axum::extract::{Path, State};
use chrono::Utc;

use super::{error, success, ApiResult};
use crate::auth::Caller;
use crate::errors::AppError;
use crate::models::{DisplayView, KioskView, OperatorView, Ticket, TicketStatus};
use crate::queue::lifecycle::authorize_operator;
use crate::queue::projection::{display_view, kiosk_view, operator_view, Directory};
use crate::queue::DayWindow;
use crate::AppState;

/// Number of recent calls listed on the operator console.
const OPERATOR_RECENT_CALLS: usize = 5;

/// Tickets the live views work from: everything created today plus
/// anything still open from earlier days.
pub(crate) async fn live_tickets(state: &AppState) -> Result<Vec<Ticket>, AppError> {
    let today = DayWindow::containing(Utc::now(), state.config.utc_offset);
    let tickets = state.repo.list_tickets().await?;
    Ok(tickets
        .into_iter()
        .filter(|t| t.status != TicketStatus::Completed || today.contains(t.created_at))
        .collect())
}

/// POST /api/queue/call-next - Call the oldest waiting ticket.
pub async fn call_next(State(state): State<AppState>, Caller(identity): Caller) -> ApiResult<Ticket> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let operator = match authorize_operator(identity) {
        Ok(operator) => operator,
        Err(e) => return error(e, revision_id),
    };

    match state.repo.call_next(&operator.id, Utc::now()).await {
        Ok(ticket) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(ticket, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/queue/kiosk/:id - Status of the ticket a kiosk printed.
pub async fn get_kiosk_view(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<KioskView> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let ticket = match state.repo.get_ticket(&id).await {
        Ok(Some(ticket)) => ticket,
        Ok(None) => {
            return error(
                AppError::NotFound(format!("Ticket {} not found", id)),
                revision_id,
            )
        }
        Err(e) => return error(e, revision_id),
    };

    match state.repo.list_accounts().await {
        Ok(accounts) => success(kiosk_view(&ticket, &Directory::new(&accounts)), revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/queue/operator - Console state for the calling attendant.
pub async fn get_operator_view(
    State(state): State<AppState>,
    Caller(identity): Caller,
) -> ApiResult<OperatorView> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let operator = match authorize_operator(identity) {
        Ok(operator) => operator,
        Err(e) => return error(e, revision_id),
    };

    let tickets = match live_tickets(&state).await {
        Ok(tickets) => tickets,
        Err(e) => return error(e, revision_id),
    };

    match state.repo.list_accounts().await {
        Ok(accounts) => success(
            operator_view(
                &tickets,
                &Directory::new(&accounts),
                &operator.id,
                OPERATOR_RECENT_CALLS,
            ),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/queue/display - "Now serving" for queue-mode screens.
pub async fn get_display_view(State(state): State<AppState>) -> ApiResult<DisplayView> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match build_display_view(&state).await {
        Ok(view) => success(view, revision_id),
        Err(e) => error(e, revision_id),
    }
}

pub(crate) async fn build_display_view(state: &AppState) -> Result<DisplayView, AppError> {
    let tickets = live_tickets(state).await?;
    let accounts = state.repo.list_accounts().await?;
    Ok(display_view(
        &tickets,
        &Directory::new(&accounts),
        state.config.display_history,
    ))
}
