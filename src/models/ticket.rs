//! Ticket model: one queued service request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a ticket. Transitions only move forward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Waiting,
    Called,
    Completed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Waiting => "waiting",
            TicketStatus::Called => "called",
            TicketStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "waiting" => Some(TicketStatus::Waiting),
            "called" => Some(TicketStatus::Called),
            "completed" => Some(TicketStatus::Completed),
            _ => None,
        }
    }
}

/// A ticket in the service queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    pub number: String,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub called_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendant_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_type_ref: Option<String>,
}

impl Ticket {
    /// Milliseconds between creation and call, once the ticket has been called.
    pub fn wait_millis(&self) -> Option<i64> {
        self.called_at
            .map(|called_at| (called_at - self.created_at).num_milliseconds())
    }
}

/// Request body for completing a ticket.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteTicketRequest {
    #[serde(default)]
    pub service_type_id: Option<String>,
}
