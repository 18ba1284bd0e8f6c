//! Reporting API endpoint.

use axum::extract::{Query, State};
use chrono::Utc;

use super::{error, success, ApiResult};
use crate::auth::Caller;
use crate::errors::AppError;
use crate::models::{QueueReport, ReportQuery, Role};
use crate::queue::projection::{queue_report, ReportScope};
use crate::queue::DayWindow;
use crate::AppState;

/// GET /api/reports/queue - Aggregates over a range of local days.
///
/// Only super admins may report across attendants; everyone else sees
/// their own tickets whatever `attendantId` says.
pub async fn get_queue_report(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Query(query): Query<ReportQuery>,
) -> ApiResult<QueueReport> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let Some(viewer) = identity else {
        return error(
            AppError::Unauthenticated("Sign in to view reports".to_string()),
            revision_id,
        );
    };

    let offset = state.config.utc_offset;
    let today = DayWindow::containing(Utc::now(), offset).day;
    let from = query.from.unwrap_or(today);
    let to = query.to.unwrap_or(from.max(today));
    if from > to {
        return error(
            AppError::Validation("Report range starts after it ends".to_string()),
            revision_id,
        );
    }

    let attendant_id = match viewer.role {
        Role::SuperAdmin => query.attendant_id.filter(|id| !id.trim().is_empty()),
        _ => Some(viewer.id.clone()),
    };

    let scope = ReportScope {
        from,
        to,
        service_type_id: query.service_type_id.filter(|id| !id.trim().is_empty()),
        attendant_id,
        offset,
    };

    let tickets = match state.repo.list_tickets().await {
        Ok(tickets) => tickets,
        Err(e) => return error(e, revision_id),
    };
    let service_types = match state.repo.list_service_types().await {
        Ok(service_types) => service_types,
        Err(e) => return error(e, revision_id),
    };
    let accounts = match state.repo.list_accounts().await {
        Ok(accounts) => accounts,
        Err(e) => return error(e, revision_id),
    };

    success(
        queue_report(&tickets, &service_types, &accounts, &scope),
        revision_id,
    )
}
