//! Account and profile persistence, including the removal saga.

use chrono::{SubsecRound, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::repository::bump_revision;
use super::{parse_ts, ts, Repository};
use crate::errors::AppError;
use crate::feed::{ChangeKind, Table};
use crate::models::{
    Account, CreateAccountRequest, Profile, RemovalReport, RemovalStep, Role, StepOutcome,
    UpdateAccountRequest,
};

const ACCOUNT_SELECT: &str = "SELECT a.id, a.email, a.active, a.created_at,
            p.id AS profile_id, p.name, p.desk_info, p.role
     FROM accounts a LEFT JOIN profiles p ON p.id = a.id";

impl Repository {
    /// List all accounts with their profiles.
    pub async fn list_accounts(&self) -> Result<Vec<Account>, AppError> {
        let rows = sqlx::query(&format!("{} ORDER BY a.created_at, a.id", ACCOUNT_SELECT))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(account_from_row).collect()
    }

    /// Get an account by ID.
    pub async fn get_account(&self, id: &str) -> Result<Option<Account>, AppError> {
        let row = sqlx::query(&format!("{} WHERE a.id = ?", ACCOUNT_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    pub async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        let row = sqlx::query(&format!("{} WHERE a.email = ?", ACCOUNT_SELECT))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    /// Create an account and its profile together.
    pub async fn create_account(&self, request: &CreateAccountRequest) -> Result<Account, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().trunc_subsecs(6);
        let email = clean(request.email.as_deref());

        if let Some(email) = &email {
            if self.find_account_by_email(email).await?.is_some() {
                return Err(AppError::Conflict(format!(
                    "An account with email {} already exists",
                    email
                )));
            }
        }

        let profile = Profile {
            name: clean(request.name.as_deref()),
            desk_info: clean(request.desk_info.as_deref()),
            role: request.role,
        };

        let mut tx = self.pool.begin().await?;
        let revision_id = bump_revision(&mut tx).await?;

        sqlx::query("INSERT INTO accounts (id, email, active, created_at) VALUES (?, ?, 1, ?)")
            .bind(&id)
            .bind(&email)
            .bind(ts(now))
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO profiles (id, name, desk_info, role) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(&profile.name)
            .bind(&profile.desk_info)
            .bind(profile.role.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(account_id = %id, role = profile.role.as_str(), "Account created");
        self.publish(Table::Accounts, ChangeKind::Insert, &id, revision_id);

        Ok(Account {
            id,
            email,
            active: true,
            created_at: now,
            profile: Some(profile),
        })
    }

    /// Update profile fields. A missing profile is recreated.
    pub async fn update_account(
        &self,
        id: &str,
        request: &UpdateAccountRequest,
    ) -> Result<Account, AppError> {
        let existing = self
            .get_account(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Account {} not found", id)))?;

        let current = existing.profile.unwrap_or(Profile {
            name: None,
            desk_info: None,
            role: Role::Attendant,
        });
        let name = match &request.name {
            Some(name) => clean(Some(name)),
            None => current.name,
        };
        let desk_info = match &request.desk_info {
            Some(desk) => clean(Some(desk)),
            None => current.desk_info,
        };
        let role = request.role.unwrap_or(current.role);

        let mut tx = self.pool.begin().await?;
        let revision_id = bump_revision(&mut tx).await?;

        sqlx::query(
            "INSERT INTO profiles (id, name, desk_info, role) VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name, desk_info = excluded.desk_info, role = excluded.role",
        )
        .bind(id)
        .bind(&name)
        .bind(&desk_info)
        .bind(role.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.publish(Table::Profiles, ChangeKind::Update, id, revision_id);

        self.get_account(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Account {} not found", id)))
    }

    pub async fn deactivate_account(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("UPDATE accounts SET active = 0 WHERE id = ? AND active = 1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() > 0 {
            let revision_id = bump_revision(&mut tx).await?;
            tx.commit().await?;
            self.publish(Table::Accounts, ChangeKind::Update, id, revision_id);
        }
        Ok(())
    }

    pub async fn delete_profile(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM profiles WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() > 0 {
            let revision_id = bump_revision(&mut tx).await?;
            tx.commit().await?;
            self.publish(Table::Profiles, ChangeKind::Delete, id, revision_id);
        }
        Ok(())
    }

    pub async fn delete_account_record(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() > 0 {
            let revision_id = bump_revision(&mut tx).await?;
            tx.commit().await?;
            self.publish(Table::Accounts, ChangeKind::Delete, id, revision_id);
        }
        Ok(())
    }

    /// Remove an account in ordered steps, stopping at the first failure.
    ///
    /// Each step is a no-op when already done, so a partial removal can be
    /// retried. Tickets keep their `attendant_ref`.
    pub async fn remove_account(&self, id: &str) -> Result<RemovalReport, AppError> {
        let account_exists: Option<String> =
            sqlx::query_scalar("SELECT id FROM accounts WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        let profile_exists: Option<String> =
            sqlx::query_scalar("SELECT id FROM profiles WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        if account_exists.is_none() && profile_exists.is_none() {
            return Err(AppError::NotFound(format!("Account {} not found", id)));
        }

        let mut steps = Vec::with_capacity(RemovalStep::ALL.len());
        for step in RemovalStep::ALL {
            let result = match step {
                RemovalStep::DeactivateAccount => self.deactivate_account(id).await,
                RemovalStep::DeleteProfile => self.delete_profile(id).await,
                RemovalStep::DeleteAccount => self.delete_account_record(id).await,
            };
            match result {
                Ok(()) => steps.push(StepOutcome {
                    step,
                    ok: true,
                    error: None,
                }),
                Err(e) => {
                    tracing::warn!(account_id = %id, step = ?step, error = %e, "Account removal step failed");
                    steps.push(StepOutcome {
                        step,
                        ok: false,
                        error: Some(e.message()),
                    });
                    break;
                }
            }
        }

        let completed = steps.len() == RemovalStep::ALL.len() && steps.iter().all(|s| s.ok);
        if completed {
            tracing::info!(account_id = %id, "Account removed");
        }
        Ok(RemovalReport {
            account_id: id.to_string(),
            completed,
            steps,
        })
    }

    /// Ensure an active super admin with this email exists.
    pub async fn seed_super_admin(&self, email: &str) -> Result<Account, AppError> {
        if let Some(existing) = self.find_account_by_email(email).await? {
            if existing.role() == Some(Role::SuperAdmin) && existing.active {
                return Ok(existing);
            }
            sqlx::query("UPDATE accounts SET active = 1 WHERE id = ?")
                .bind(&existing.id)
                .execute(&self.pool)
                .await?;
            let account = self
                .update_account(
                    &existing.id,
                    &UpdateAccountRequest {
                        role: Some(Role::SuperAdmin),
                        ..Default::default()
                    },
                )
                .await?;
            tracing::info!(account_id = %account.id, "Promoted seed account to super admin");
            return Ok(account);
        }

        let account = self
            .create_account(&CreateAccountRequest {
                email: Some(email.to_string()),
                name: None,
                desk_info: None,
                role: Role::SuperAdmin,
            })
            .await?;
        tracing::info!(account_id = %account.id, "Seeded super admin account");
        Ok(account)
    }
}

fn clean(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn account_from_row(row: &SqliteRow) -> Result<Account, AppError> {
    let created_at: String = row.get("created_at");
    let profile_id: Option<String> = row.get("profile_id");
    let profile = match profile_id {
        Some(_) => {
            let role: String = row.get("role");
            Some(Profile {
                name: row.get("name"),
                desk_info: row.get("desk_info"),
                role: Role::parse(&role)
                    .ok_or_else(|| AppError::Internal(format!("Unknown role {}", role)))?,
            })
        }
        None => None,
    };

    Ok(Account {
        id: row.get("id"),
        email: row.get("email"),
        active: row.get::<i64, _>("active") != 0,
        created_at: parse_ts(&created_at)?,
        profile,
    })
}
