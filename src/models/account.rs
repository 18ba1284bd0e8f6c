//! Account and profile models.
//!
//! An account is the identity record; its profile carries role and desk
//! metadata. Attendants are accounts with the `attendant` role, so every
//! ticket's `attendant_ref` points at an account id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Access role stored on the profile.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Editor,
    Viewer,
    Attendant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Editor => "editor",
            Role::Viewer => "viewer",
            Role::Attendant => "attendant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "super_admin" => Some(Role::SuperAdmin),
            "editor" => Some(Role::Editor),
            "viewer" => Some(Role::Viewer),
            "attendant" => Some(Role::Attendant),
            _ => None,
        }
    }

    /// Whether the role may call and complete tickets.
    pub fn can_operate_queue(&self) -> bool {
        !matches!(self, Role::Viewer)
    }

    /// Whether the role appears on the attendant leaderboard.
    pub fn is_ranked(&self) -> bool {
        matches!(self, Role::Attendant | Role::SuperAdmin)
    }
}

fn default_role() -> Role {
    Role::Attendant
}

/// Role and desk metadata of an account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desk_info: Option<String>,
    pub role: Role,
}

/// An account together with its profile, if the profile still exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
}

impl Account {
    /// Name shown on displays and reports: profile name, then email, then id.
    pub fn label(&self) -> String {
        self.profile
            .as_ref()
            .and_then(|p| p.name.clone())
            .filter(|n| !n.trim().is_empty())
            .or_else(|| self.email.clone())
            .unwrap_or_else(|| self.id.clone())
    }

    pub fn role(&self) -> Option<Role> {
        self.profile.as_ref().map(|p| p.role)
    }

    /// The caller view of this account. Inactive accounts and accounts
    /// without a profile cannot act.
    pub fn identity(&self) -> Option<CallerIdentity> {
        if !self.active {
            return None;
        }
        let profile = self.profile.as_ref()?;
        Some(CallerIdentity {
            id: self.id.clone(),
            label: self.label(),
            desk: profile.desk_info.clone(),
            role: profile.role,
        })
    }
}

/// Who is performing an operator action.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CallerIdentity {
    pub id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desk: Option<String>,
    pub role: Role,
}

/// Request body for creating an account.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub desk_info: Option<String>,
    #[serde(default = "default_role")]
    pub role: Role,
}

/// Request body for updating an account's profile.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub desk_info: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

/// One step of the account removal saga.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RemovalStep {
    DeactivateAccount,
    DeleteProfile,
    DeleteAccount,
}

impl RemovalStep {
    pub const ALL: [RemovalStep; 3] = [
        RemovalStep::DeactivateAccount,
        RemovalStep::DeleteProfile,
        RemovalStep::DeleteAccount,
    ];
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StepOutcome {
    pub step: RemovalStep,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of an account removal. Steps after a failure are not attempted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemovalReport {
    pub account_id: String,
    pub completed: bool,
    pub steps: Vec<StepOutcome>,
}
