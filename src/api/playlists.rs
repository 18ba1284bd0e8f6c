//! Playlist and slide API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{CreatePlaylistRequest, CreateSlideRequest, Playlist, Slide, UpdateSlideRequest};
use crate::AppState;

/// GET /api/playlists - List all playlists with their slides.
pub async fn list_playlists(State(state): State<AppState>) -> ApiResult<Vec<Playlist>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_playlists().await {
        Ok(playlists) => success(playlists, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/playlists/:id - Get a single playlist.
pub async fn get_playlist(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Playlist> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_playlist(&id).await {
        Ok(Some(playlist)) => success(playlist, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Playlist {} not found", id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/playlists - Create an empty playlist.
pub async fn create_playlist(
    State(state): State<AppState>,
    Json(request): Json<CreatePlaylistRequest>,
) -> ApiResult<Playlist> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if request.name.trim().is_empty() {
        return error(
            AppError::Validation("Playlist name is required".to_string()),
            revision_id,
        );
    }

    match state.repo.create_playlist(&request).await {
        Ok(playlist) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(playlist, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/playlists/:id - Delete a playlist and its slides.
pub async fn delete_playlist(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.delete_playlist(&id).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/playlists/:id/slides - Add a slide.
pub async fn add_slide(
    State(state): State<AppState>,
    Path(playlist_id): Path<String>,
    Json(request): Json<CreateSlideRequest>,
) -> ApiResult<Slide> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if request.url.trim().is_empty() {
        return error(
            AppError::Validation("Slide url is required".to_string()),
            revision_id,
        );
    }
    if request.duration == 0 {
        return error(
            AppError::Validation("Slide duration must be at least one second".to_string()),
            revision_id,
        );
    }

    match state.repo.add_slide(&playlist_id, &request).await {
        Ok(slide) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(slide, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/slides/:id - Update a slide.
pub async fn update_slide(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateSlideRequest>,
) -> ApiResult<Slide> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if matches!(&request.url, Some(url) if url.trim().is_empty()) {
        return error(
            AppError::Validation("Slide url cannot be empty".to_string()),
            revision_id,
        );
    }
    if request.duration == Some(0) {
        return error(
            AppError::Validation("Slide duration must be at least one second".to_string()),
            revision_id,
        );
    }

    match state.repo.update_slide(&id, &request).await {
        Ok(slide) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(slide, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/slides/:id - Remove a slide.
pub async fn delete_slide(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.delete_slide(&id).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
