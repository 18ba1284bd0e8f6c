//! Snapshot API endpoints.

use axum::extract::State;

use super::{success, ApiResult};
use crate::errors::AppErrorWithRevision;
use crate::models::{RevisionInfo, Snapshot, Summary};
use crate::AppState;

/// GET /api/snapshot - Get the full snapshot.
pub async fn get_snapshot(State(state): State<AppState>) -> ApiResult<Snapshot> {
    let snapshot = state
        .repo
        .get_snapshot()
        .await
        .map_err(|e| AppErrorWithRevision {
            error: e,
            revision_id: 0,
        })?;

    let revision_id = snapshot.revision_id;
    success(snapshot, revision_id)
}

/// GET /api/snapshot/revision - Get the current revision info.
pub async fn get_revision(State(state): State<AppState>) -> ApiResult<RevisionInfo> {
    let revision_info = state
        .repo
        .get_revision_info()
        .await
        .map_err(|e| AppErrorWithRevision {
            error: e,
            revision_id: 0,
        })?;

    let revision_id = revision_info.revision_id;
    success(revision_info, revision_id)
}

/// GET /api/summary - Dashboard counters.
pub async fn get_summary(State(state): State<AppState>) -> ApiResult<Summary> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_summary().await {
        Ok(summary) => success(summary, revision_id),
        Err(e) => super::error(e, revision_id),
    }
}
