//! Status machines for bookings, payments, and complaints.
//!
//! Each machine is a transition table keyed by `(current status, event)`. Pairs that are
//! absent from the table are rejected with [`TransitionRejected`] and leave the record
//! untouched.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
}

impl BookingStatus {
    pub const fn label(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Accepted => "accepted",
            BookingStatus::Rejected => "rejected",
            BookingStatus::Completed => "completed",
        }
    }
}

/// Landlord decisions on a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingEvent {
    Accept,
    Reject,
    Complete,
}

impl BookingEvent {
    /// Maps a requested target status onto the event that reaches it. `pending` is the
    /// initial state only and has no event.
    pub fn for_target(status: BookingStatus) -> Option<Self> {
        match status {
            BookingStatus::Accepted => Some(BookingEvent::Accept),
            BookingStatus::Rejected => Some(BookingEvent::Reject),
            BookingStatus::Completed => Some(BookingEvent::Complete),
            BookingStatus::Pending => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            BookingEvent::Accept => "accept",
            BookingEvent::Reject => "reject",
            BookingEvent::Complete => "complete",
        }
    }
}

const BOOKING_TRANSITIONS: &[(BookingStatus, BookingEvent, BookingStatus)] = &[
    (
        BookingStatus::Pending,
        BookingEvent::Accept,
        BookingStatus::Accepted,
    ),
    (
        BookingStatus::Pending,
        BookingEvent::Reject,
        BookingStatus::Rejected,
    ),
    (
        BookingStatus::Accepted,
        BookingEvent::Complete,
        BookingStatus::Completed,
    ),
];

impl BookingStatus {
    pub fn apply(self, event: BookingEvent) -> Result<Self, TransitionRejected> {
        lookup(BOOKING_TRANSITIONS, self, event).ok_or(TransitionRejected {
            machine: "booking",
            from: self.label(),
            event: event.label(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentEvent {
    Complete,
    Fail,
    /// Applied when the booking is accepted so the tenant can pay.
    Reopen,
}

impl PaymentEvent {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentEvent::Complete => "complete",
            PaymentEvent::Fail => "fail",
            PaymentEvent::Reopen => "reopen",
        }
    }
}

const PAYMENT_TRANSITIONS: &[(PaymentStatus, PaymentEvent, PaymentStatus)] = &[
    (
        PaymentStatus::Pending,
        PaymentEvent::Complete,
        PaymentStatus::Completed,
    ),
    (
        PaymentStatus::Failed,
        PaymentEvent::Complete,
        PaymentStatus::Completed,
    ),
    (
        PaymentStatus::Pending,
        PaymentEvent::Fail,
        PaymentStatus::Failed,
    ),
    (
        PaymentStatus::Pending,
        PaymentEvent::Reopen,
        PaymentStatus::Pending,
    ),
    (
        PaymentStatus::Failed,
        PaymentEvent::Reopen,
        PaymentStatus::Pending,
    ),
];

impl PaymentStatus {
    pub fn apply(self, event: PaymentEvent) -> Result<Self, TransitionRejected> {
        lookup(PAYMENT_TRANSITIONS, self, event).ok_or(TransitionRejected {
            machine: "payment",
            from: self.label(),
            event: event.label(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintStatus {
    Pending,
    InProgress,
    Resolved,
    Rejected,
}

impl ComplaintStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ComplaintStatus::Pending => "pending",
            ComplaintStatus::InProgress => "in_progress",
            ComplaintStatus::Resolved => "resolved",
            ComplaintStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintEvent {
    Acknowledge,
    Resolve,
    Reject,
}

impl ComplaintEvent {
    /// Only the closing statuses are reachable through resolution.
    pub fn closing(status: ComplaintStatus) -> Option<Self> {
        match status {
            ComplaintStatus::Resolved => Some(ComplaintEvent::Resolve),
            ComplaintStatus::Rejected => Some(ComplaintEvent::Reject),
            ComplaintStatus::Pending | ComplaintStatus::InProgress => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ComplaintEvent::Acknowledge => "acknowledge",
            ComplaintEvent::Resolve => "resolve",
            ComplaintEvent::Reject => "reject",
        }
    }
}

const COMPLAINT_TRANSITIONS: &[(ComplaintStatus, ComplaintEvent, ComplaintStatus)] = &[
    (
        ComplaintStatus::Pending,
        ComplaintEvent::Acknowledge,
        ComplaintStatus::InProgress,
    ),
    (
        ComplaintStatus::Pending,
        ComplaintEvent::Resolve,
        ComplaintStatus::Resolved,
    ),
    (
        ComplaintStatus::InProgress,
        ComplaintEvent::Resolve,
        ComplaintStatus::Resolved,
    ),
    (
        ComplaintStatus::Pending,
        ComplaintEvent::Reject,
        ComplaintStatus::Rejected,
    ),
    (
        ComplaintStatus::InProgress,
        ComplaintEvent::Reject,
        ComplaintStatus::Rejected,
    ),
];

impl ComplaintStatus {
    pub fn apply(self, event: ComplaintEvent) -> Result<Self, TransitionRejected> {
        lookup(COMPLAINT_TRANSITIONS, self, event).ok_or(TransitionRejected {
            machine: "complaint",
            from: self.label(),
            event: event.label(),
        })
    }
}

fn lookup<S, E>(table: &[(S, E, S)], from: S, event: E) -> Option<S>
where
    S: Copy + PartialEq,
    E: Copy + PartialEq,
{
    table
        .iter()
        .find(|(state, trigger, _)| *state == from && *trigger == event)
        .map(|(_, _, next)| *next)
}

/// A `(status, event)` pair with no entry in its transition table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{machine} cannot {event} from status '{from}'")]
pub struct TransitionRejected {
    pub machine: &'static str,
    pub from: &'static str,
    pub event: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_BOOKING: [BookingStatus; 4] = [
        BookingStatus::Pending,
        BookingStatus::Accepted,
        BookingStatus::Rejected,
        BookingStatus::Completed,
    ];

    #[test]
    fn booking_table_only_allows_forward_landlord_moves() {
        let events = [
            BookingEvent::Accept,
            BookingEvent::Reject,
            BookingEvent::Complete,
        ];
        let mut allowed = Vec::new();
        for status in ALL_BOOKING {
            for event in events {
                if let Ok(next) = status.apply(event) {
                    allowed.push((status, next));
                }
            }
        }

        assert_eq!(
            allowed,
            vec![
                (BookingStatus::Pending, BookingStatus::Accepted),
                (BookingStatus::Pending, BookingStatus::Rejected),
                (BookingStatus::Accepted, BookingStatus::Completed),
            ]
        );
    }

    #[test]
    fn terminal_booking_states_reject_everything() {
        for terminal in [BookingStatus::Rejected, BookingStatus::Completed] {
            let err = terminal
                .apply(BookingEvent::Accept)
                .expect_err("terminal state is locked");
            assert_eq!(err.from, terminal.label());
            assert_eq!(err.machine, "booking");
        }
    }

    #[test]
    fn pending_is_not_a_transition_target() {
        assert_eq!(BookingEvent::for_target(BookingStatus::Pending), None);
        assert_eq!(
            BookingEvent::for_target(BookingStatus::Completed),
            Some(BookingEvent::Complete)
        );
    }

    #[test]
    fn payment_reopen_is_idempotent_for_pending() {
        assert_eq!(
            PaymentStatus::Pending.apply(PaymentEvent::Reopen),
            Ok(PaymentStatus::Pending)
        );
        assert_eq!(
            PaymentStatus::Failed.apply(PaymentEvent::Reopen),
            Ok(PaymentStatus::Pending)
        );
        assert!(PaymentStatus::Completed.apply(PaymentEvent::Reopen).is_err());
    }

    #[test]
    fn completed_payment_cannot_be_charged_twice() {
        let err = PaymentStatus::Completed
            .apply(PaymentEvent::Complete)
            .expect_err("double charge rejected");
        assert_eq!(err.to_string(), "payment cannot complete from status 'completed'");
    }

    #[test]
    fn complaints_close_from_open_states_only() {
        assert_eq!(
            ComplaintStatus::InProgress.apply(ComplaintEvent::Resolve),
            Ok(ComplaintStatus::Resolved)
        );
        assert!(ComplaintStatus::Resolved
            .apply(ComplaintEvent::Reject)
            .is_err());
        assert!(ComplaintStatus::InProgress
            .apply(ComplaintEvent::Acknowledge)
            .is_err());
        assert_eq!(ComplaintEvent::closing(ComplaintStatus::InProgress), None);
    }
}
