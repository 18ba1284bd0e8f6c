//! Database repository: revision tracking, snapshot and ticket lifecycle.
//!
//! Every mutation bumps the revision with [`bump_revision`] inside its own
//! transaction and publishes on the change feed only after commit.

use chrono::{DateTime, FixedOffset, SubsecRound, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

use super::{parse_opt_ts, parse_ts, ts};
use crate::errors::AppError;
use crate::feed::{ChangeEvent, ChangeFeed, ChangeKind, Table};
use crate::models::{
    CreateServiceTypeRequest, RevisionInfo, ServiceType, Snapshot, Ticket, TicketStatus,
};
use crate::queue::lifecycle::ensure_transition;
use crate::queue::{format_number, DayWindow, NumberingMode};

const TICKET_COLUMNS: &str =
    "id, number, status, created_at, called_at, attendant_ref, service_type_ref";

/// Increment the revision on `conn`, normally an open transaction.
///
/// Run it as the first statement of a mutation: it takes the write lock
/// up front, and it rolls back with everything else if the mutation fails.
pub(super) async fn bump_revision(conn: &mut SqliteConnection) -> Result<i64, AppError> {
    let revision_id: i64 = sqlx::query_scalar(
        "UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1
         RETURNING revision_id",
    )
    .bind(ts(Utc::now()))
    .fetch_one(&mut *conn)
    .await?;
    Ok(revision_id)
}

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pub(super) pool: SqlitePool,
    feed: ChangeFeed,
}

impl Repository {
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        Self { pool, feed }
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    /// Get the current revision ID.
    pub async fn get_revision_id(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("revision_id"))
    }

    /// Get revision info.
    pub async fn get_revision_info(&self) -> Result<RevisionInfo, AppError> {
        let row = sqlx::query("SELECT revision_id, generated_at FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(RevisionInfo {
            revision_id: row.get("revision_id"),
            generated_at: row.get("generated_at"),
        })
    }

    /// Notify subscribers of a committed change.
    pub(super) fn publish(&self, table: Table, kind: ChangeKind, id: &str, revision_id: i64) {
        self.feed.publish(ChangeEvent {
            table,
            kind,
            id: id.to_string(),
            revision_id,
        });
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get the full snapshot.
    pub async fn get_snapshot(&self) -> Result<Snapshot, AppError> {
        let meta =
            sqlx::query("SELECT schema_version, revision_id, generated_at FROM meta WHERE id = 1")
                .fetch_one(&self.pool)
                .await?;

        Ok(Snapshot {
            schema_version: meta.get("schema_version"),
            revision_id: meta.get("revision_id"),
            generated_at: meta.get("generated_at"),
            tickets: self.list_tickets().await?,
            service_types: self.list_service_types().await?,
            accounts: self.list_accounts().await?,
            displays: self.list_displays().await?,
            playlists: self.list_playlists().await?,
        })
    }

    // ==================== TICKET OPERATIONS ====================

    /// List every ticket, oldest first.
    pub async fn list_tickets(&self) -> Result<Vec<Ticket>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM tickets ORDER BY created_at, rowid",
            TICKET_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(ticket_from_row).collect()
    }

    /// List tickets still in the queue (waiting or called), oldest first.
    pub async fn list_active_tickets(&self) -> Result<Vec<Ticket>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM tickets WHERE status != 'completed' ORDER BY created_at, rowid",
            TICKET_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(ticket_from_row).collect()
    }

    /// Get a ticket by ID.
    pub async fn get_ticket(&self, id: &str) -> Result<Option<Ticket>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM tickets WHERE id = ?", TICKET_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(ticket_from_row).transpose()
    }

    /// Create a waiting ticket numbered within the local day of `now`.
    ///
    /// The number, the row and the revision are written in one transaction;
    /// if any of them fails nothing is stored.
    pub async fn create_ticket(
        &self,
        now: DateTime<Utc>,
        numbering: NumberingMode,
        offset: FixedOffset,
    ) -> Result<Ticket, AppError> {
        let window = DayWindow::containing(now, offset);
        let id = uuid::Uuid::new_v4().to_string();

        let mut tx = self.pool.begin().await?;
        let revision_id = bump_revision(&mut tx).await?;

        let value: i64 = match numbering {
            NumberingMode::Sequence => {
                sqlx::query_scalar(
                    "INSERT INTO ticket_sequences (day, last_value) VALUES (?, 1)
                     ON CONFLICT(day) DO UPDATE SET last_value = last_value + 1
                     RETURNING last_value",
                )
                .bind(window.key())
                .fetch_one(&mut *tx)
                .await?
            }
            NumberingMode::DailyCount => {
                let count: i64 = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM tickets WHERE created_at >= ? AND created_at < ?",
                )
                .bind(ts(window.start))
                .bind(ts(window.end))
                .fetch_one(&mut *tx)
                .await?;
                count + 1
            }
        };
        let number = format_number(value.max(1) as u64);

        let row = sqlx::query(&format!(
            "INSERT INTO tickets (id, number, status, created_at) VALUES (?, ?, 'waiting', ?)
             RETURNING {}",
            TICKET_COLUMNS
        ))
        .bind(&id)
        .bind(&number)
        .bind(ts(now))
        .fetch_one(&mut *tx)
        .await?;
        let ticket = ticket_from_row(&row)?;

        tx.commit().await?;

        tracing::info!(ticket_id = %ticket.id, number = %ticket.number, "Ticket created");
        self.publish(Table::Tickets, ChangeKind::Insert, &ticket.id, revision_id);
        Ok(ticket)
    }

    /// Call a specific waiting ticket. The first caller wins; later calls
    /// against the same ticket fail without changing it.
    pub async fn call_ticket(
        &self,
        id: &str,
        attendant_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Ticket, AppError> {
        let mut tx = self.pool.begin().await?;
        let revision_id = bump_revision(&mut tx).await?;

        let row = sqlx::query(&format!(
            "UPDATE tickets SET status = 'called', called_at = ?, attendant_ref = ?
             WHERE id = ? AND status = 'waiting'
             RETURNING {}",
            TICKET_COLUMNS
        ))
        .bind(ts(now))
        .bind(attendant_id)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let ticket = match row {
            Some(row) => ticket_from_row(&row)?,
            None => {
                tx.rollback().await?;
                return Err(self.rejected_transition(id, TicketStatus::Called).await);
            }
        };
        tx.commit().await?;

        tracing::info!(
            ticket_id = %ticket.id,
            number = %ticket.number,
            attendant = %attendant_id,
            "Ticket called"
        );
        self.publish(Table::Tickets, ChangeKind::Update, id, revision_id);
        Ok(ticket)
    }

    /// Call the oldest waiting ticket for an attendant who holds none.
    pub async fn call_next(
        &self,
        attendant_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Ticket, AppError> {
        let mut tx = self.pool.begin().await?;
        let revision_id = bump_revision(&mut tx).await?;

        // Pick, guard and update in one statement: two desks never take the
        // same head and one desk never holds two tickets.
        let row = sqlx::query(&format!(
            "UPDATE tickets SET status = 'called', called_at = ?, attendant_ref = ?
             WHERE id = (
                 SELECT id FROM tickets WHERE status = 'waiting'
                 ORDER BY created_at, rowid LIMIT 1
             ) AND status = 'waiting'
               AND NOT EXISTS (
                 SELECT 1 FROM tickets WHERE status = 'called' AND attendant_ref = ?
             )
             RETURNING {}",
            TICKET_COLUMNS
        ))
        .bind(ts(now))
        .bind(attendant_id)
        .bind(attendant_id)
        .fetch_optional(&mut *tx)
        .await?;

        let ticket = match row {
            Some(row) => ticket_from_row(&row)?,
            None => {
                let in_service: Option<String> = sqlx::query_scalar(
                    "SELECT number FROM tickets WHERE status = 'called' AND attendant_ref = ?
                     LIMIT 1",
                )
                .bind(attendant_id)
                .fetch_optional(&mut *tx)
                .await?;
                tx.rollback().await?;

                return Err(match in_service {
                    Some(number) => AppError::Conflict(format!(
                        "Complete ticket {} before calling the next one",
                        number
                    )),
                    None => AppError::NotFound("No tickets waiting".to_string()),
                });
            }
        };
        tx.commit().await?;

        tracing::info!(
            ticket_id = %ticket.id,
            number = %ticket.number,
            attendant = %attendant_id,
            "Next ticket called"
        );
        self.publish(Table::Tickets, ChangeKind::Update, &ticket.id, revision_id);
        Ok(ticket)
    }

    /// Complete a called ticket, tagging the service rendered.
    pub async fn complete_ticket(
        &self,
        id: &str,
        service_type_id: Option<&str>,
    ) -> Result<Ticket, AppError> {
        if let Some(service_type_id) = service_type_id {
            if self.get_service_type(service_type_id).await?.is_none() {
                return Err(AppError::Validation(format!(
                    "Unknown service type {}",
                    service_type_id
                )));
            }
        }

        let mut tx = self.pool.begin().await?;
        let revision_id = bump_revision(&mut tx).await?;

        let row = sqlx::query(&format!(
            "UPDATE tickets SET status = 'completed', service_type_ref = ?
             WHERE id = ? AND status = 'called'
             RETURNING {}",
            TICKET_COLUMNS
        ))
        .bind(service_type_id)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let ticket = match row {
            Some(row) => ticket_from_row(&row)?,
            None => {
                tx.rollback().await?;
                return Err(self.rejected_transition(id, TicketStatus::Completed).await);
            }
        };
        tx.commit().await?;

        tracing::info!(
            ticket_id = %ticket.id,
            number = %ticket.number,
            service_type = ?service_type_id,
            "Ticket completed"
        );
        self.publish(Table::Tickets, ChangeKind::Update, id, revision_id);
        Ok(ticket)
    }

    /// Explain why a guarded status update touched no row.
    async fn rejected_transition(&self, id: &str, target: TicketStatus) -> AppError {
        match self.get_ticket(id).await {
            Ok(Some(ticket)) => match ensure_transition(id, ticket.status, target) {
                Err(err) => err,
                Ok(()) => AppError::Conflict(format!("Ticket {} changed concurrently", id)),
            },
            Ok(None) => AppError::NotFound(format!("Ticket {} not found", id)),
            Err(err) => err,
        }
    }

    // ==================== SERVICE TYPE OPERATIONS ====================

    /// List all service types.
    pub async fn list_service_types(&self) -> Result<Vec<ServiceType>, AppError> {
        let rows = sqlx::query("SELECT id, name, created_at FROM service_types ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(service_type_from_row).collect()
    }

    /// Get a service type by ID.
    pub async fn get_service_type(&self, id: &str) -> Result<Option<ServiceType>, AppError> {
        let row = sqlx::query("SELECT id, name, created_at FROM service_types WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(service_type_from_row).transpose()
    }

    /// Create a new service type.
    pub async fn create_service_type(
        &self,
        request: &CreateServiceTypeRequest,
    ) -> Result<ServiceType, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().trunc_subsecs(6);
        let name = request.name.trim().to_string();

        let mut tx = self.pool.begin().await?;
        let revision_id = bump_revision(&mut tx).await?;

        sqlx::query("INSERT INTO service_types (id, name, created_at) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(&name)
            .bind(ts(now))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        self.publish(Table::ServiceTypes, ChangeKind::Insert, &id, revision_id);

        Ok(ServiceType {
            id,
            name,
            created_at: now,
        })
    }

    /// Delete a service type. Tickets completed with it keep their reference.
    pub async fn delete_service_type(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        let revision_id = bump_revision(&mut tx).await?;

        let result = sqlx::query("DELETE FROM service_types WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Service type {} not found", id)));
        }

        tx.commit().await?;
        self.publish(Table::ServiceTypes, ChangeKind::Delete, id, revision_id);
        Ok(())
    }
}

// ==================== ROW MAPPING HELPERS ====================

fn ticket_from_row(row: &SqliteRow) -> Result<Ticket, AppError> {
    let status: String = row.get("status");
    let created_at: String = row.get("created_at");
    Ok(Ticket {
        id: row.get("id"),
        number: row.get("number"),
        status: TicketStatus::parse(&status)
            .ok_or_else(|| AppError::Internal(format!("Unknown ticket status {}", status)))?,
        created_at: parse_ts(&created_at)?,
        called_at: parse_opt_ts(row.get("called_at"))?,
        attendant_ref: row.get("attendant_ref"),
        service_type_ref: row.get("service_type_ref"),
    })
}

fn service_type_from_row(row: &SqliteRow) -> Result<ServiceType, AppError> {
    let created_at: String = row.get("created_at");
    Ok(ServiceType {
        id: row.get("id"),
        name: row.get("name"),
        created_at: parse_ts(&created_at)?,
    })
}
