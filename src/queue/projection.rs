//! Views derived from a full ticket snapshot.
//!
//! Every function here is pure: the same snapshot always yields the same
//! view, so repeated or reordered refreshes cannot drift.

use std::collections::HashMap;

use chrono::{FixedOffset, NaiveDate};

use super::lifecycle::{calls_newest_first, current_for, waiting_fifo};
use super::sequence::{local_hour, DayWindow};
use crate::models::{
    Account, AnnotatedTicket, Announcement, AttendantStat, DisplayView, KioskView, OperatorView,
    QueueReport, ServiceStat, ServiceType, Ticket, TicketStatus,
};

/// Lookup of attendant label and desk by account id.
pub struct Directory<'a> {
    accounts: HashMap<&'a str, &'a Account>,
}

impl<'a> Directory<'a> {
    pub fn new(accounts: &'a [Account]) -> Self {
        Self {
            accounts: accounts.iter().map(|a| (a.id.as_str(), a)).collect(),
        }
    }

    fn annotate(&self, ticket: &Ticket) -> AnnotatedTicket {
        let account = ticket
            .attendant_ref
            .as_deref()
            .and_then(|id| self.accounts.get(id));
        AnnotatedTicket {
            ticket: ticket.clone(),
            attendant_label: account.map(|a| a.label()),
            desk: account.and_then(|a| a.profile.as_ref()?.desk_info.clone()),
        }
    }
}

/// Status of the ticket a kiosk handed out.
pub fn kiosk_view(ticket: &Ticket, directory: &Directory<'_>) -> KioskView {
    let annotated = directory.annotate(ticket);
    KioskView {
        ticket_id: ticket.id.clone(),
        number: ticket.number.clone(),
        status: ticket.status,
        called: ticket.status != TicketStatus::Waiting,
        called_at: ticket.called_at,
        attendant_label: annotated.attendant_label,
        desk: annotated.desk,
    }
}

/// Waiting list plus the caller's in-service ticket.
pub fn operator_view(
    tickets: &[Ticket],
    directory: &Directory<'_>,
    attendant_id: &str,
    recent: usize,
) -> OperatorView {
    let waiting: Vec<Ticket> = waiting_fifo(tickets).into_iter().cloned().collect();
    OperatorView {
        waiting_count: waiting.len(),
        waiting,
        current: current_for(tickets, attendant_id).cloned(),
        recent_calls: calls_newest_first(tickets)
            .into_iter()
            .take(recent)
            .map(|t| directory.annotate(t))
            .collect(),
    }
}

/// Global "now serving" and the `history` calls before it.
pub fn display_view(tickets: &[Ticket], directory: &Directory<'_>, history: usize) -> DisplayView {
    let mut calls = calls_newest_first(tickets).into_iter();
    let current = calls.next().map(|t| directory.annotate(t));
    let history = calls.take(history).map(|t| directory.annotate(t)).collect();
    let announcement = current.as_ref().map(announcement_for);
    DisplayView {
        current,
        history,
        announcement,
    }
}

fn announcement_for(ticket: &AnnotatedTicket) -> Announcement {
    let place: Vec<&str> = [ticket.desk.as_deref(), ticket.attendant_label.as_deref()]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .collect();
    let text = if place.is_empty() {
        format!("Ticket {}", ticket.ticket.number)
    } else {
        format!("Ticket {}. {}", ticket.ticket.number, place.join(", "))
    };
    Announcement {
        ticket_id: ticket.ticket.id.clone(),
        text,
    }
}

/// Selection of tickets a report covers.
#[derive(Debug, Clone)]
pub struct ReportScope {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub service_type_id: Option<String>,
    pub attendant_id: Option<String>,
    pub offset: FixedOffset,
}

/// Aggregates over the tickets created inside the scope's day range.
pub fn queue_report(
    tickets: &[Ticket],
    service_types: &[ServiceType],
    accounts: &[Account],
    scope: &ReportScope,
) -> QueueReport {
    let start = DayWindow::for_day(scope.from, scope.offset).start;
    let end = DayWindow::for_day(scope.to, scope.offset).end;

    let selected: Vec<&Ticket> = tickets
        .iter()
        .filter(|t| t.created_at >= start && t.created_at < end)
        .filter(|t| match &scope.attendant_id {
            Some(id) => t.attendant_ref.as_deref() == Some(id.as_str()),
            None => true,
        })
        .filter(|t| match &scope.service_type_id {
            Some(id) => t.service_type_ref.as_deref() == Some(id.as_str()),
            None => true,
        })
        .collect();

    let completed: Vec<&Ticket> = selected
        .iter()
        .copied()
        .filter(|t| t.status == TicketStatus::Completed)
        .collect();
    let in_progress = selected
        .iter()
        .filter(|t| t.status == TicketStatus::Called)
        .count();

    let mut hourly_counts = [0usize; 24];
    for ticket in &selected {
        hourly_counts[local_hour(ticket.created_at, scope.offset) as usize] += 1;
    }

    let total_created = selected.len();
    let attended = completed.len() + in_progress;
    let efficiency = if total_created > 0 {
        (attended as f64 / total_created as f64 * 100.0).round() as u32
    } else {
        0
    };

    let mut service_stats: Vec<ServiceStat> = service_types
        .iter()
        .map(|st| {
            let tagged: Vec<&Ticket> = completed
                .iter()
                .copied()
                .filter(|t| t.service_type_ref.as_deref() == Some(st.id.as_str()))
                .collect();
            ServiceStat {
                service_type_id: st.id.clone(),
                name: st.name.clone(),
                count: tagged.len(),
                avg_wait_minutes: average_wait_minutes(&tagged, false),
            }
        })
        .collect();
    service_stats.sort_by(|a, b| b.count.cmp(&a.count));

    let mut attendant_stats: Vec<AttendantStat> = accounts
        .iter()
        .filter_map(|account| {
            let role = account.role().filter(|r| r.is_ranked())?;
            let count = completed
                .iter()
                .filter(|t| t.attendant_ref.as_deref() == Some(account.id.as_str()))
                .count();
            Some(AttendantStat {
                account_id: account.id.clone(),
                name: account.label(),
                role,
                count,
            })
        })
        .collect();
    attendant_stats.sort_by(|a, b| b.count.cmp(&a.count));

    QueueReport {
        from: scope.from,
        to: scope.to,
        total_created,
        total_handled: attended,
        in_progress,
        avg_wait_minutes: average_wait_minutes(&selected, true),
        efficiency,
        service_stats,
        attendant_stats,
        max_hourly: hourly_counts.iter().copied().max().unwrap_or(0).max(1),
        hourly_counts,
    }
}

/// Mean positive wait in whole minutes, 0 when nothing was called.
/// Rounded mean wait of the called tickets, in minutes. The headline
/// figure skips waits that are not positive; per-service figures keep them.
fn average_wait_minutes(tickets: &[&Ticket], positive_only: bool) -> i64 {
    let waits: Vec<i64> = tickets
        .iter()
        .filter_map(|t| t.wait_millis())
        .filter(|ms| !positive_only || *ms > 0)
        .collect();
    if waits.is_empty() {
        return 0;
    }
    let mean = waits.iter().sum::<i64>() as f64 / waits.len() as f64;
    (mean / 60_000.0).round() as i64
}
