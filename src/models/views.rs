//! Derived views produced by the queue projection. Never persisted.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{Display, Playlist, Role, Ticket, TicketStatus};

/// A ticket with the calling attendant's label and desk resolved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedTicket {
    #[serde(flatten)]
    pub ticket: Ticket,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendant_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desk: Option<String>,
}

/// What the kiosk that printed a ticket watches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KioskView {
    pub ticket_id: String,
    pub number: String,
    pub status: TicketStatus,
    /// True once the ticket has left the waiting list
    pub called: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub called_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendant_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desk: Option<String>,
}

/// Operator console state for one attendant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OperatorView {
    /// Oldest first
    pub waiting: Vec<Ticket>,
    pub waiting_count: usize,
    /// The caller's in-service ticket; while set, completion replaces call-next
    pub current: Option<Ticket>,
    pub recent_calls: Vec<AnnotatedTicket>,
}

/// Text a display speaks when a new ticket is called.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub ticket_id: String,
    pub text: String,
}

/// "Now serving" plus history, shown on queue-mode displays.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DisplayView {
    pub current: Option<AnnotatedTicket>,
    pub history: Vec<AnnotatedTicket>,
    pub announcement: Option<Announcement>,
}

/// Where a playlist's cycle stands at a given instant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SlidePosition {
    pub index: usize,
    pub slide_id: String,
    pub remaining_seconds: u64,
    pub cycle_seconds: u64,
}

/// Everything a screen needs to render.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub display: Display,
    pub playlist: Option<Playlist>,
    pub position: Option<SlidePosition>,
    /// Present in queue mode only
    pub queue: Option<DisplayView>,
}

/// Filters of the reporting view. Dates are local days, both inclusive;
/// missing dates default to today.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
    #[serde(default)]
    pub service_type_id: Option<String>,
    #[serde(default)]
    pub attendant_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStat {
    pub service_type_id: String,
    pub name: String,
    pub count: usize,
    pub avg_wait_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttendantStat {
    pub account_id: String,
    pub name: String,
    pub role: Role,
    pub count: usize,
}

/// Aggregates over the tickets created in the selected window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueueReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub total_created: usize,
    /// Tickets that left the waiting list
    pub total_handled: usize,
    pub in_progress: usize,
    pub avg_wait_minutes: i64,
    /// Percent of created tickets that were called or completed
    pub efficiency: u32,
    pub service_stats: Vec<ServiceStat>,
    pub attendant_stats: Vec<AttendantStat>,
    pub hourly_counts: [usize; 24],
    pub max_hourly: usize,
}
