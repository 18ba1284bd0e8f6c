//! Database module for SQLite persistence.
//!
//! SQLite is the single authoritative store; clients only hold replicas.

mod accounts;
mod repository;
mod signage;

pub use repository::*;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use crate::errors::AppError;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run embedded migrations
    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meta (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            schema_version INTEGER NOT NULL DEFAULT 1,
            revision_id INTEGER NOT NULL DEFAULT 0,
            generated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        INSERT OR IGNORE INTO meta (id, schema_version, revision_id, generated_at)
        VALUES (1, 1, 0, datetime('now'));
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
            id TEXT PRIMARY KEY,
            email TEXT UNIQUE,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS profiles (
            id TEXT PRIMARY KEY,
            name TEXT,
            desk_info TEXT,
            role TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // attendant_ref and service_type_ref are plain references: removing an
    // account or a service type never rewrites tickets.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS service_types (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tickets (
            id TEXT PRIMARY KEY,
            number TEXT NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('waiting', 'called', 'completed')),
            created_at TEXT NOT NULL,
            called_at TEXT,
            attendant_ref TEXT,
            service_type_ref TEXT,
            CHECK ((status = 'waiting') = (called_at IS NULL AND attendant_ref IS NULL)),
            CHECK (service_type_ref IS NULL OR status = 'completed')
        );

        CREATE TABLE IF NOT EXISTS ticket_sequences (
            day TEXT PRIMARY KEY,
            last_value INTEGER NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS playlists (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS slides (
            id TEXT PRIMARY KEY,
            playlist_id TEXT NOT NULL REFERENCES playlists(id),
            kind TEXT NOT NULL,
            url TEXT NOT NULL,
            duration INTEGER NOT NULL,
            sort_order INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS displays (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            location TEXT NOT NULL DEFAULT '',
            width INTEGER NOT NULL,
            height INTEGER NOT NULL,
            orientation TEXT NOT NULL,
            display_mode TEXT NOT NULL DEFAULT 'playlist',
            assigned_playlist_id TEXT REFERENCES playlists(id),
            size_inches REAL,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for common queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_tickets_created_at ON tickets(created_at);
        CREATE INDEX IF NOT EXISTS idx_tickets_status ON tickets(status);
        CREATE INDEX IF NOT EXISTS idx_tickets_attendant ON tickets(attendant_ref);
        CREATE INDEX IF NOT EXISTS idx_slides_playlist ON slides(playlist_id, sort_order);
        CREATE INDEX IF NOT EXISTS idx_displays_playlist ON displays(assigned_playlist_id);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Fixed-width RFC 3339 in UTC, so text order equals time order.
pub(crate) fn ts(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(raw: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| AppError::Internal(format!("Corrupt timestamp {:?}: {}", raw, e)))
}

pub(crate) fn parse_opt_ts(raw: Option<String>) -> Result<Option<DateTime<Utc>>, AppError> {
    raw.as_deref().map(parse_ts).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_text_sorts_chronologically() {
        let early = Utc.with_ymd_and_hms(2026, 1, 9, 9, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2026, 1, 10, 8, 0, 0).unwrap();
        assert!(ts(early) < ts(late));
        assert_eq!(ts(early), "2026-01-09T09:00:00.000000Z");
        assert_eq!(parse_ts(&ts(late)).unwrap(), late);
    }

    #[test]
    fn test_parse_ts_rejects_garbage() {
        assert!(matches!(parse_ts("yesterday"), Err(AppError::Internal(_))));
    }
}
