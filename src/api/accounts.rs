//! Account API endpoints.
//!
//! Provisioning (create, delete and role changes) additionally requires
//! the admin key.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};

use super::{error, success, ApiResult};
use crate::auth::require_admin_key;
use crate::errors::AppError;
use crate::models::{Account, CreateAccountRequest, RemovalReport, UpdateAccountRequest};
use crate::AppState;

/// GET /api/accounts - List all accounts.
pub async fn list_accounts(State(state): State<AppState>) -> ApiResult<Vec<Account>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_accounts().await {
        Ok(accounts) => success(accounts, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/accounts/:id - Get a single account.
pub async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Account> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_account(&id).await {
        Ok(Some(account)) => success(account, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Account {} not found", id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/accounts - Provision a new account.
pub async fn create_account(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateAccountRequest>,
) -> ApiResult<Account> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = require_admin_key(&headers, &state.config) {
        return error(e, revision_id);
    }

    let email = request.email.as_deref().map(str::trim).unwrap_or("");
    let name = request.name.as_deref().map(str::trim).unwrap_or("");
    if email.is_empty() && name.is_empty() {
        return error(
            AppError::Validation("An account needs an email or a name".to_string()),
            revision_id,
        );
    }
    if !email.is_empty() && !email.contains('@') {
        return error(
            AppError::Validation(format!("Invalid email address: {}", email)),
            revision_id,
        );
    }

    match state.repo.create_account(&request).await {
        Ok(account) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(account, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/accounts/:id - Update an account's profile.
///
/// Name and desk edits need only the API key; changing the role also
/// needs the admin key.
pub async fn update_account(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<UpdateAccountRequest>,
) -> ApiResult<Account> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if request.role.is_some() {
        if let Err(e) = require_admin_key(&headers, &state.config) {
            return error(e, revision_id);
        }
    }

    match state.repo.update_account(&id, &request).await {
        Ok(account) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(account, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/accounts/:id - Remove an account, reporting each step.
pub async fn delete_account(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<RemovalReport> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = require_admin_key(&headers, &state.config) {
        return error(e, revision_id);
    }

    match state.repo.remove_account(&id).await {
        Ok(report) if report.completed => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(report, new_revision)
        }
        Ok(report) => {
            // Completed steps stay done; a retry resumes from the failed one.
            let failed = match report.steps.iter().find(|s| !s.ok) {
                Some(step) => format!(
                    "Account removal stopped at {:?}: {}",
                    step.step,
                    step.error.as_deref().unwrap_or("unknown error")
                ),
                None => "Account removal did not finish".to_string(),
            };
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            error(AppError::Internal(failed), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
