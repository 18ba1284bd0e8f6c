//! Change notification feed.
//!
//! Every committed mutation is published as a [`ChangeEvent`]. Subscribers
//! refetch the state they show; events carry no row payload.

mod socket;

pub use socket::*;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::errors::AppError;

/// Table a change happened in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Tickets,
    ServiceTypes,
    Accounts,
    Profiles,
    Displays,
    Playlists,
    Slides,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Tickets => "tickets",
            Table::ServiceTypes => "service_types",
            Table::Accounts => "accounts",
            Table::Profiles => "profiles",
            Table::Displays => "displays",
            Table::Playlists => "playlists",
            Table::Slides => "slides",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tickets" => Some(Table::Tickets),
            "service_types" => Some(Table::ServiceTypes),
            "accounts" => Some(Table::Accounts),
            "profiles" => Some(Table::Profiles),
            "displays" | "tvs" => Some(Table::Displays),
            "playlists" => Some(Table::Playlists),
            "slides" => Some(Table::Slides),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "insert" => Some(ChangeKind::Insert),
            "update" => Some(ChangeKind::Update),
            "delete" => Some(ChangeKind::Delete),
            _ => None,
        }
    }
}

/// One committed mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
    pub id: String,
    pub revision_id: i64,
}

/// In-process fan-out of change events.
#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish to every current subscriber. Returns how many received it.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        tracing::debug!(
            table = event.table.as_str(),
            id = %event.id,
            revision = event.revision_id,
            "Publishing change"
        );
        // No subscribers is not an error.
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Table and event mask of one subscriber. `None` means everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Subscription {
    tables: Option<HashSet<Table>>,
    kinds: Option<HashSet<ChangeKind>>,
}

impl Subscription {
    /// Parse comma-separated masks such as `tickets,displays` and
    /// `insert,update`. `*` or an empty mask selects everything.
    pub fn parse(tables: Option<&str>, events: Option<&str>) -> Result<Self, AppError> {
        Ok(Self {
            tables: parse_mask(tables, Table::parse, "table")?,
            kinds: parse_mask(events, ChangeKind::parse, "event")?,
        })
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        let table_ok = self
            .tables
            .as_ref()
            .map_or(true, |t| t.contains(&event.table));
        let kind_ok = self
            .kinds
            .as_ref()
            .map_or(true, |k| k.contains(&event.kind));
        table_ok && kind_ok
    }

    pub fn tables(&self) -> Vec<Table> {
        let mut tables: Vec<Table> = self.tables.iter().flatten().copied().collect();
        tables.sort_by_key(|t| t.as_str());
        tables
    }
}

fn parse_mask<T: Eq + std::hash::Hash>(
    raw: Option<&str>,
    parse: fn(&str) -> Option<T>,
    what: &str,
) -> Result<Option<HashSet<T>>, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty() && *r != "*") else {
        return Ok(None);
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse(s).ok_or_else(|| AppError::Validation(format!("Unknown {}: {}", what, s))))
        .collect::<Result<HashSet<T>, AppError>>()
        .map(Some)
}
