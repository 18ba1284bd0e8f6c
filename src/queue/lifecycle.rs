//! Ticket state machine rules: waiting -> called -> completed.

use crate::errors::AppError;
use crate::models::{CallerIdentity, Ticket, TicketStatus};

/// The only status a ticket may move to from `current`, if any.
pub fn next_status(current: TicketStatus) -> Option<TicketStatus> {
    match current {
        TicketStatus::Waiting => Some(TicketStatus::Called),
        TicketStatus::Called => Some(TicketStatus::Completed),
        TicketStatus::Completed => None,
    }
}

/// Reject anything other than the single forward step.
pub fn ensure_transition(
    ticket_id: &str,
    current: TicketStatus,
    target: TicketStatus,
) -> Result<(), AppError> {
    if next_status(current) == Some(target) {
        Ok(())
    } else {
        Err(AppError::InvalidTransition {
            ticket_id: ticket_id.to_string(),
            current,
            attempted: target,
        })
    }
}

/// An operator action needs an identity with a queue-operating role.
pub fn authorize_operator(identity: Option<CallerIdentity>) -> Result<CallerIdentity, AppError> {
    let identity = identity.ok_or_else(|| {
        AppError::Unauthenticated("Sign in to call or complete tickets".to_string())
    })?;
    if !identity.role.can_operate_queue() {
        return Err(AppError::Forbidden(format!(
            "Role {} cannot operate the queue",
            identity.role.as_str()
        )));
    }
    Ok(identity)
}

/// Completion input check, run before any write.
pub fn completion_service_type(
    required: bool,
    service_type_id: Option<String>,
) -> Result<Option<String>, AppError> {
    let service_type_id = service_type_id.filter(|id| !id.trim().is_empty());
    if required && service_type_id.is_none() {
        return Err(AppError::Validation(
            "Select a service type before completing the ticket".to_string(),
        ));
    }
    Ok(service_type_id)
}

/// Waiting tickets, oldest first. Input order breaks creation-time ties.
pub fn waiting_fifo(tickets: &[Ticket]) -> Vec<&Ticket> {
    let mut waiting: Vec<&Ticket> = tickets
        .iter()
        .filter(|t| t.status == TicketStatus::Waiting)
        .collect();
    waiting.sort_by_key(|t| t.created_at);
    waiting
}

/// Tickets that have been called, most recent call first.
pub fn calls_newest_first(tickets: &[Ticket]) -> Vec<&Ticket> {
    let mut called: Vec<&Ticket> = tickets.iter().filter(|t| t.called_at.is_some()).collect();
    called.sort_by(|a, b| b.called_at.cmp(&a.called_at));
    called
}

/// The attendant's in-service ticket: their most recent call not yet completed.
pub fn current_for<'a>(tickets: &'a [Ticket], attendant_id: &str) -> Option<&'a Ticket> {
    calls_newest_first(tickets).into_iter().find(|t| {
        t.status == TicketStatus::Called && t.attendant_ref.as_deref() == Some(attendant_id)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::{Duration, Utc};

    fn ticket(id: &str, status: TicketStatus, minutes_ago: i64, called_by: Option<&str>) -> Ticket {
        let created_at = Utc::now() - Duration::minutes(60);
        Ticket {
            id: id.to_string(),
            number: format!("#{}", id),
            status,
            created_at,
            called_at: called_by.map(|_| Utc::now() - Duration::minutes(minutes_ago)),
            attendant_ref: called_by.map(str::to_string),
            service_type_ref: None,
        }
    }

    fn caller(role: Role) -> CallerIdentity {
        CallerIdentity {
            id: "acc".to_string(),
            label: "Desk".to_string(),
            desk: None,
            role,
        }
    }

    #[test]
    fn test_only_forward_steps_are_allowed() {
        use TicketStatus::*;
        assert!(ensure_transition("t", Waiting, Called).is_ok());
        assert!(ensure_transition("t", Called, Completed).is_ok());

        for (from, to) in [
            (Waiting, Completed),
            (Called, Waiting),
            (Called, Called),
            (Completed, Waiting),
            (Completed, Called),
            (Completed, Completed),
        ] {
            let err = ensure_transition("t", from, to).unwrap_err();
            assert!(matches!(err, AppError::InvalidTransition { .. }));
        }
    }

    #[test]
    fn test_authorize_operator() {
        assert!(matches!(
            authorize_operator(None),
            Err(AppError::Unauthenticated(_))
        ));
        assert!(matches!(
            authorize_operator(Some(caller(Role::Viewer))),
            Err(AppError::Forbidden(_))
        ));
        assert!(authorize_operator(Some(caller(Role::Attendant))).is_ok());
    }

    #[test]
    fn test_completion_service_type() {
        assert!(matches!(
            completion_service_type(true, None),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            completion_service_type(true, Some(" ".to_string())),
            Err(AppError::Validation(_))
        ));
        assert_eq!(completion_service_type(false, None).unwrap(), None);
        assert_eq!(
            completion_service_type(true, Some("svc".to_string())).unwrap(),
            Some("svc".to_string())
        );
    }

    #[test]
    fn test_current_for_skips_completed_and_other_attendants() {
        let tickets = vec![
            ticket("1", TicketStatus::Completed, 1, Some("a")),
            ticket("2", TicketStatus::Called, 5, Some("a")),
            ticket("3", TicketStatus::Called, 0, Some("b")),
            ticket("4", TicketStatus::Called, 10, Some("a")),
        ];
        assert_eq!(current_for(&tickets, "a").map(|t| t.id.as_str()), Some("2"));
        assert_eq!(current_for(&tickets, "b").map(|t| t.id.as_str()), Some("3"));
        assert!(current_for(&tickets, "c").is_none());
    }

    #[test]
    fn test_waiting_fifo_orders_by_creation() {
        let now = Utc::now();
        let mut late = ticket("late", TicketStatus::Waiting, 0, None);
        late.created_at = now;
        let mut early = ticket("early", TicketStatus::Waiting, 0, None);
        early.created_at = now - Duration::minutes(5);
        let tickets = vec![late, ticket("called", TicketStatus::Called, 1, Some("a")), early];

        let ids: Vec<&str> = waiting_fifo(&tickets).iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late"]);
    }
}
