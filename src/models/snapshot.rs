//! Full snapshot of the store, the unit a client replica is replaced with.

use serde::{Deserialize, Serialize};

use super::{Account, Display, Playlist, ServiceType, Ticket};

/// Everything a client needs to rebuild its views.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub schema_version: i32,
    pub generated_at: String,
    pub revision_id: i64,
    pub tickets: Vec<Ticket>,
    pub service_types: Vec<ServiceType>,
    pub accounts: Vec<Account>,
    pub displays: Vec<Display>,
    pub playlists: Vec<Playlist>,
}

/// Revision information for change detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionInfo {
    pub revision_id: i64,
    pub generated_at: String,
}

/// Dashboard counters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub displays: usize,
    /// Displays with a playlist assigned
    pub active_screens: usize,
    pub playlists: usize,
    pub waiting: usize,
    pub in_service: usize,
}
