//! Displays, playlists and slides.

use chrono::{SubsecRound, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::repository::bump_revision;
use super::{parse_ts, ts, Repository};
use crate::errors::AppError;
use crate::feed::{ChangeKind, Table};
use crate::models::{
    CreateDisplayRequest, CreatePlaylistRequest, CreateSlideRequest, Display, DisplayMode,
    Orientation, Playlist, Resolution, Slide, SlideKind, Summary, UpdateDisplayRequest,
    UpdateSlideRequest,
};

const DISPLAY_COLUMNS: &str = "id, name, location, width, height, orientation, display_mode,
     assigned_playlist_id, size_inches, created_at";

const SLIDE_COLUMNS: &str = "id, playlist_id, kind, url, duration, sort_order";

impl Repository {
    // ==================== DISPLAY OPERATIONS ====================

    /// List all displays.
    pub async fn list_displays(&self) -> Result<Vec<Display>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM displays ORDER BY name, id",
            DISPLAY_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(display_from_row).collect()
    }

    /// Get a display by ID.
    pub async fn get_display(&self, id: &str) -> Result<Option<Display>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM displays WHERE id = ?",
            DISPLAY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(display_from_row).transpose()
    }

    /// Register a display in playlist mode with nothing assigned.
    pub async fn create_display(&self, request: &CreateDisplayRequest) -> Result<Display, AppError> {
        let screen = Display {
            id: uuid::Uuid::new_v4().to_string(),
            name: request.name.trim().to_string(),
            location: request.location.trim().to_string(),
            resolution: request.resolution,
            orientation: request.orientation,
            display_mode: DisplayMode::Playlist,
            assigned_playlist_id: None,
            size_inches: request.size_inches,
            created_at: Utc::now().trunc_subsecs(6),
        };

        let mut tx = self.pool.begin().await?;
        let revision_id = bump_revision(&mut tx).await?;

        sqlx::query(
            "INSERT INTO displays (id, name, location, width, height, orientation, display_mode,
                                   assigned_playlist_id, size_inches, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, NULL, ?, ?)",
        )
        .bind(&screen.id)
        .bind(&screen.name)
        .bind(&screen.location)
        .bind(i64::from(screen.resolution.width))
        .bind(i64::from(screen.resolution.height))
        .bind(screen.orientation.as_str())
        .bind(screen.display_mode.as_str())
        .bind(screen.size_inches)
        .bind(ts(screen.created_at))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(display_id = %screen.id, name = %screen.name, "Display registered");
        self.publish(Table::Displays, ChangeKind::Insert, &screen.id, revision_id);

        Ok(screen)
    }

    /// Update a display's configuration.
    pub async fn update_display(
        &self,
        id: &str,
        request: &UpdateDisplayRequest,
    ) -> Result<Display, AppError> {
        let mut display = self
            .get_display(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Display {} not found", id)))?;

        if let Some(name) = &request.name {
            display.name = name.trim().to_string();
        }
        if let Some(location) = &request.location {
            display.location = location.trim().to_string();
        }
        if let Some(resolution) = request.resolution {
            display.resolution = resolution;
        }
        if let Some(orientation) = request.orientation {
            display.orientation = orientation;
        }
        if let Some(mode) = request.display_mode {
            display.display_mode = mode;
        }
        if request.size_inches.is_some() {
            display.size_inches = request.size_inches;
        }

        let mut tx = self.pool.begin().await?;
        let revision_id = bump_revision(&mut tx).await?;

        sqlx::query(
            "UPDATE displays SET name = ?, location = ?, width = ?, height = ?, orientation = ?,
                                 display_mode = ?, size_inches = ?
             WHERE id = ?",
        )
        .bind(&display.name)
        .bind(&display.location)
        .bind(i64::from(display.resolution.width))
        .bind(i64::from(display.resolution.height))
        .bind(display.orientation.as_str())
        .bind(display.display_mode.as_str())
        .bind(display.size_inches)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.publish(Table::Displays, ChangeKind::Update, id, revision_id);
        Ok(display)
    }

    /// Assign a playlist to a display, or clear the assignment with `None`.
    pub async fn assign_playlist(
        &self,
        display_id: &str,
        playlist_id: Option<&str>,
    ) -> Result<Display, AppError> {
        if let Some(playlist_id) = playlist_id {
            let exists: Option<String> = sqlx::query_scalar("SELECT id FROM playlists WHERE id = ?")
                .bind(playlist_id)
                .fetch_optional(&self.pool)
                .await?;
            if exists.is_none() {
                return Err(AppError::Validation(format!(
                    "Unknown playlist {}",
                    playlist_id
                )));
            }
        }

        let mut tx = self.pool.begin().await?;
        let revision_id = bump_revision(&mut tx).await?;

        let result = sqlx::query("UPDATE displays SET assigned_playlist_id = ? WHERE id = ?")
            .bind(playlist_id)
            .bind(display_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Display {} not found",
                display_id
            )));
        }

        tx.commit().await?;

        tracing::info!(display_id = %display_id, playlist = ?playlist_id, "Playlist assigned");
        self.publish(Table::Displays, ChangeKind::Update, display_id, revision_id);

        self.get_display(display_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Display {} not found", display_id)))
    }

    /// Delete a display.
    pub async fn delete_display(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        let revision_id = bump_revision(&mut tx).await?;

        let result = sqlx::query("DELETE FROM displays WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Display {} not found", id)));
        }

        tx.commit().await?;
        self.publish(Table::Displays, ChangeKind::Delete, id, revision_id);
        Ok(())
    }

    // ==================== PLAYLIST OPERATIONS ====================

    /// List all playlists with their slides.
    pub async fn list_playlists(&self) -> Result<Vec<Playlist>, AppError> {
        let rows = sqlx::query("SELECT id, name, created_at FROM playlists ORDER BY name, id")
            .fetch_all(&self.pool)
            .await?;

        let mut slides = self.all_slides().await?;
        let mut playlists = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String = row.get("id");
            let (own, rest): (Vec<Slide>, Vec<Slide>) =
                slides.into_iter().partition(|s| s.playlist_id == id);
            slides = rest;
            playlists.push(playlist_from_row(row, own)?);
        }
        Ok(playlists)
    }

    /// Get a playlist by ID.
    pub async fn get_playlist(&self, id: &str) -> Result<Option<Playlist>, AppError> {
        let row = sqlx::query("SELECT id, name, created_at FROM playlists WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let slides = self.slides_for(id).await?;
                Ok(Some(playlist_from_row(&row, slides)?))
            }
            None => Ok(None),
        }
    }

    /// Create an empty playlist.
    pub async fn create_playlist(
        &self,
        request: &CreatePlaylistRequest,
    ) -> Result<Playlist, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().trunc_subsecs(6);
        let name = request.name.trim().to_string();

        let mut tx = self.pool.begin().await?;
        let revision_id = bump_revision(&mut tx).await?;

        sqlx::query("INSERT INTO playlists (id, name, created_at) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(&name)
            .bind(ts(now))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        self.publish(Table::Playlists, ChangeKind::Insert, &id, revision_id);

        Ok(Playlist {
            id,
            name,
            created_at: now,
            slides: Vec::new(),
        })
    }

    /// Delete a playlist with its slides, unassigning it from every display.
    ///
    /// One revision covers the whole deletion; every change it publishes
    /// carries that revision.
    pub async fn delete_playlist(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        let revision_id = bump_revision(&mut tx).await?;

        let displays: Vec<String> =
            sqlx::query_scalar("SELECT id FROM displays WHERE assigned_playlist_id = ?")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

        sqlx::query("UPDATE displays SET assigned_playlist_id = NULL WHERE assigned_playlist_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let slides: Vec<String> = sqlx::query_scalar("SELECT id FROM slides WHERE playlist_id = ?")
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM slides WHERE playlist_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM playlists WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Playlist {} not found", id)));
        }

        tx.commit().await?;

        tracing::info!(
            playlist_id = %id,
            unassigned = displays.len(),
            slides = slides.len(),
            "Playlist deleted"
        );
        for display_id in &displays {
            self.publish(Table::Displays, ChangeKind::Update, display_id, revision_id);
        }
        for slide_id in &slides {
            self.publish(Table::Slides, ChangeKind::Delete, slide_id, revision_id);
        }
        self.publish(Table::Playlists, ChangeKind::Delete, id, revision_id);
        Ok(())
    }

    // ==================== SLIDE OPERATIONS ====================

    async fn all_slides(&self) -> Result<Vec<Slide>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM slides ORDER BY playlist_id, sort_order, rowid",
            SLIDE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(slide_from_row).collect()
    }

    /// Slides of one playlist in display order.
    pub async fn slides_for(&self, playlist_id: &str) -> Result<Vec<Slide>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM slides WHERE playlist_id = ? ORDER BY sort_order, rowid",
            SLIDE_COLUMNS
        ))
        .bind(playlist_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(slide_from_row).collect()
    }

    pub async fn get_slide(&self, id: &str) -> Result<Option<Slide>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM slides WHERE id = ?", SLIDE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(slide_from_row).transpose()
    }

    /// Add a slide to a playlist. Without an explicit order it goes last.
    pub async fn add_slide(
        &self,
        playlist_id: &str,
        request: &CreateSlideRequest,
    ) -> Result<Slide, AppError> {
        let exists: Option<String> = sqlx::query_scalar("SELECT id FROM playlists WHERE id = ?")
            .bind(playlist_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound(format!(
                "Playlist {} not found",
                playlist_id
            )));
        }

        let order = match request.order {
            Some(order) => order,
            None => {
                let max: Option<i64> =
                    sqlx::query_scalar("SELECT MAX(sort_order) FROM slides WHERE playlist_id = ?")
                        .bind(playlist_id)
                        .fetch_one(&self.pool)
                        .await?;
                max.map_or(0, |m| m + 1)
            }
        };

        let slide = Slide {
            id: uuid::Uuid::new_v4().to_string(),
            playlist_id: playlist_id.to_string(),
            kind: request.kind,
            url: request.url.trim().to_string(),
            duration: request.duration,
            order,
        };

        let mut tx = self.pool.begin().await?;
        let revision_id = bump_revision(&mut tx).await?;

        sqlx::query(
            "INSERT INTO slides (id, playlist_id, kind, url, duration, sort_order)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&slide.id)
        .bind(&slide.playlist_id)
        .bind(slide.kind.as_str())
        .bind(&slide.url)
        .bind(i64::from(slide.duration))
        .bind(slide.order)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.publish(Table::Slides, ChangeKind::Insert, &slide.id, revision_id);
        Ok(slide)
    }

    /// Update a slide's content, duration or position.
    pub async fn update_slide(
        &self,
        id: &str,
        request: &UpdateSlideRequest,
    ) -> Result<Slide, AppError> {
        let mut slide = self
            .get_slide(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Slide {} not found", id)))?;

        if let Some(url) = &request.url {
            slide.url = url.trim().to_string();
        }
        if let Some(duration) = request.duration {
            slide.duration = duration;
        }
        if let Some(order) = request.order {
            slide.order = order;
        }

        let mut tx = self.pool.begin().await?;
        let revision_id = bump_revision(&mut tx).await?;

        sqlx::query("UPDATE slides SET url = ?, duration = ?, sort_order = ? WHERE id = ?")
            .bind(&slide.url)
            .bind(i64::from(slide.duration))
            .bind(slide.order)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        self.publish(Table::Slides, ChangeKind::Update, id, revision_id);
        Ok(slide)
    }

    pub async fn delete_slide(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        let revision_id = bump_revision(&mut tx).await?;

        let result = sqlx::query("DELETE FROM slides WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Slide {} not found", id)));
        }

        tx.commit().await?;
        self.publish(Table::Slides, ChangeKind::Delete, id, revision_id);
        Ok(())
    }

    // ==================== SUMMARY ====================

    /// Counters for the dashboard.
    pub async fn get_summary(&self) -> Result<Summary, AppError> {
        let row = sqlx::query(
            "SELECT
                 (SELECT COUNT(*) FROM displays) AS displays,
                 (SELECT COUNT(*) FROM displays WHERE assigned_playlist_id IS NOT NULL) AS active_screens,
                 (SELECT COUNT(*) FROM playlists) AS playlists,
                 (SELECT COUNT(*) FROM tickets WHERE status = 'waiting') AS waiting,
                 (SELECT COUNT(*) FROM tickets WHERE status = 'called') AS in_service",
        )
        .fetch_one(&self.pool)
        .await?;

        let count = |name: &str| row.get::<i64, _>(name).max(0) as usize;
        Ok(Summary {
            displays: count("displays"),
            active_screens: count("active_screens"),
            playlists: count("playlists"),
            waiting: count("waiting"),
            in_service: count("in_service"),
        })
    }
}

// ==================== ROW MAPPING HELPERS ====================

fn display_from_row(row: &SqliteRow) -> Result<Display, AppError> {
    let orientation: String = row.get("orientation");
    let mode: String = row.get("display_mode");
    let created_at: String = row.get("created_at");
    Ok(Display {
        id: row.get("id"),
        name: row.get("name"),
        location: row.get("location"),
        resolution: Resolution {
            width: row.get::<i64, _>("width").clamp(0, i64::from(u32::MAX)) as u32,
            height: row.get::<i64, _>("height").clamp(0, i64::from(u32::MAX)) as u32,
        },
        orientation: Orientation::parse(&orientation)
            .ok_or_else(|| AppError::Internal(format!("Unknown orientation {}", orientation)))?,
        display_mode: DisplayMode::parse(&mode)
            .ok_or_else(|| AppError::Internal(format!("Unknown display mode {}", mode)))?,
        assigned_playlist_id: row.get("assigned_playlist_id"),
        size_inches: row.get("size_inches"),
        created_at: parse_ts(&created_at)?,
    })
}

fn playlist_from_row(row: &SqliteRow, slides: Vec<Slide>) -> Result<Playlist, AppError> {
    let created_at: String = row.get("created_at");
    Ok(Playlist {
        id: row.get("id"),
        name: row.get("name"),
        created_at: parse_ts(&created_at)?,
        slides,
    })
}

fn slide_from_row(row: &SqliteRow) -> Result<Slide, AppError> {
    let kind: String = row.get("kind");
    Ok(Slide {
        id: row.get("id"),
        playlist_id: row.get("playlist_id"),
        kind: SlideKind::parse(&kind)
            .ok_or_else(|| AppError::Internal(format!("Unknown slide kind {}", kind)))?,
        url: row.get("url"),
        duration: row.get::<i64, _>("duration").clamp(0, i64::from(u32::MAX)) as u32,
        order: row.get("sort_order"),
    })
}
