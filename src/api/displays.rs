//! Display API endpoints, including the player view a screen polls.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;

use super::queue::build_display_view;
use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{
    AssignPlaylistRequest, CreateDisplayRequest, Display, DisplayMode, PlayerView, Resolution,
    UpdateDisplayRequest,
};
use crate::playback::position_now;
use crate::AppState;

fn validate_resolution(resolution: &Resolution) -> Result<(), AppError> {
    if resolution.width == 0 || resolution.height == 0 {
        return Err(AppError::Validation(
            "Resolution width and height must be positive".to_string(),
        ));
    }
    Ok(())
}

fn validate_size(size_inches: Option<f64>) -> Result<(), AppError> {
    match size_inches {
        Some(size) if !(size.is_finite() && size > 0.0) => Err(AppError::Validation(
            "Screen size must be a positive number of inches".to_string(),
        )),
        _ => Ok(()),
    }
}

/// GET /api/displays - List all displays.
pub async fn list_displays(State(state): State<AppState>) -> ApiResult<Vec<Display>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_displays().await {
        Ok(displays) => success(displays, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/displays/:id - Get a single display.
pub async fn get_display(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Display> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_display(&id).await {
        Ok(Some(display)) => success(display, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Display {} not found", id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/displays - Register a display.
pub async fn create_display(
    State(state): State<AppState>,
    Json(request): Json<CreateDisplayRequest>,
) -> ApiResult<Display> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if request.name.trim().is_empty() {
        return error(
            AppError::Validation("Display name is required".to_string()),
            revision_id,
        );
    }
    if let Err(e) = validate_resolution(&request.resolution).and(validate_size(request.size_inches))
    {
        return error(e, revision_id);
    }

    match state.repo.create_display(&request).await {
        Ok(display) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(display, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/displays/:id - Update a display.
pub async fn update_display(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateDisplayRequest>,
) -> ApiResult<Display> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if matches!(&request.name, Some(name) if name.trim().is_empty()) {
        return error(
            AppError::Validation("Display name cannot be empty".to_string()),
            revision_id,
        );
    }
    if let Some(resolution) = &request.resolution {
        if let Err(e) = validate_resolution(resolution) {
            return error(e, revision_id);
        }
    }
    if let Err(e) = validate_size(request.size_inches) {
        return error(e, revision_id);
    }

    match state.repo.update_display(&id, &request).await {
        Ok(display) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(display, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/displays/:id/playlist - Assign or clear the display's playlist.
pub async fn assign_playlist(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<AssignPlaylistRequest>,
) -> ApiResult<Display> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let playlist_id = request
        .playlist_id
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());

    match state.repo.assign_playlist(&id, playlist_id).await {
        Ok(display) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(display, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/displays/:id - Delete a display.
pub async fn delete_display(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.delete_display(&id).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/displays/:id/player - What the screen should render right now.
pub async fn get_player_view(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<PlayerView> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let display = match state.repo.get_display(&id).await {
        Ok(Some(display)) => display,
        Ok(None) => {
            return error(
                AppError::NotFound(format!("Display {} not found", id)),
                revision_id,
            )
        }
        Err(e) => return error(e, revision_id),
    };

    let playlist = match display.assigned_playlist_id.as_deref() {
        Some(playlist_id) => match state.repo.get_playlist(playlist_id).await {
            Ok(playlist) => playlist,
            Err(e) => return error(e, revision_id),
        },
        None => None,
    };
    let position = playlist
        .as_ref()
        .and_then(|p| position_now(&p.slides, Utc::now()));

    let queue = match display.display_mode {
        DisplayMode::Queue => match build_display_view(&state).await {
            Ok(view) => Some(view),
            Err(e) => return error(e, revision_id),
        },
        DisplayMode::Playlist => None,
    };

    success(
        PlayerView {
            display,
            playlist,
            position,
            queue,
        },
        revision_id,
    )
}
