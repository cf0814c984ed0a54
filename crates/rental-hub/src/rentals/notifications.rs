//! Post-commit notification dispatch.
//!
//! The service only hands messages to a [`NotificationSink`] after its own write has
//! committed. Sinks swallow and log their failures so an inbox problem never undoes a
//! booking, payment, or review.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::domain::{IdentityId, Listing, OutboundNotification};
use super::repository::{Clock, InboxStore};

/// Fire-and-forget delivery of inbox messages.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: OutboundNotification);
}

/// Writes straight into the inbox store on the caller's thread.
pub struct InlineNotifier<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> InlineNotifier<S>
where
    S: InboxStore,
{
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }
}

impl<S> NotificationSink for InlineNotifier<S>
where
    S: InboxStore,
{
    fn notify(&self, notification: OutboundNotification) {
        let recipient = notification.recipient;
        let title = notification.title.clone();
        if let Err(err) = self.store.insert_notification(notification, self.clock.now()) {
            warn!(%recipient, %title, error = %err, "dropping notification");
        }
    }
}

/// Hands messages to a bounded queue drained by a background task.
#[derive(Clone)]
pub struct QueuedNotifier {
    sender: mpsc::Sender<OutboundNotification>,
}

/// Handle on the task draining a [`QueuedNotifier`]. The task stops once every
/// notifier clone has been dropped.
pub struct NotificationWorker {
    handle: JoinHandle<usize>,
}

impl NotificationWorker {
    /// Waits for the queue to drain and returns how many messages were stored.
    pub async fn join(self) -> usize {
        match self.handle.await {
            Ok(delivered) => delivered,
            Err(err) => {
                warn!(error = %err, "notification worker ended abnormally");
                0
            }
        }
    }
}

impl QueuedNotifier {
    /// Spawns the drain task on the current tokio runtime.
    pub fn spawn<S>(
        store: Arc<S>,
        clock: Arc<dyn Clock>,
        capacity: usize,
    ) -> (Self, NotificationWorker)
    where
        S: InboxStore + 'static,
    {
        let (sender, mut receiver) = mpsc::channel::<OutboundNotification>(capacity.max(1));

        let handle = tokio::spawn(async move {
            let mut delivered = 0usize;
            while let Some(notification) = receiver.recv().await {
                let recipient = notification.recipient;
                match store.insert_notification(notification, clock.now()) {
                    Ok(stored) => {
                        delivered += 1;
                        debug!(%recipient, notification = %stored.id, "notification stored");
                    }
                    Err(err) => warn!(%recipient, error = %err, "dropping notification"),
                }
            }
            delivered
        });

        (Self { sender }, NotificationWorker { handle })
    }
}

impl NotificationSink for QueuedNotifier {
    fn notify(&self, notification: OutboundNotification) {
        if let Err(err) = self.sender.try_send(notification) {
            let reason = match &err {
                mpsc::error::TrySendError::Full(_) => "queue full",
                mpsc::error::TrySendError::Closed(_) => "worker stopped",
            };
            let dropped = err.into_inner();
            warn!(
                recipient = %dropped.recipient,
                title = %dropped.title,
                reason,
                "dropping notification"
            );
        }
    }
}

/// Message templates sent as side effects of rental actions.
pub(crate) struct Notices;

impl Notices {
    pub(crate) fn booking_requested(landlord: IdentityId, listing: &Listing) -> OutboundNotification {
        OutboundNotification::new(
            landlord,
            "New Booking Request",
            format!(
                "A new booking request has been submitted for your property: {}",
                listing.title
            ),
        )
    }

    pub(crate) fn booking_decided(
        tenant: IdentityId,
        listing: &Listing,
        status_label: &str,
    ) -> OutboundNotification {
        OutboundNotification::new(
            tenant,
            "Booking Update",
            format!(
                "Your booking for {} is now {}",
                listing.title, status_label
            ),
        )
    }

    pub(crate) fn payment_received(landlord: IdentityId, listing: &Listing) -> OutboundNotification {
        OutboundNotification::new(
            landlord,
            "Payment Received",
            format!(
                "Payment has been received for booking of {}",
                listing.title
            ),
        )
    }

    pub(crate) fn payment_failed(
        tenant: IdentityId,
        listing: &Listing,
        reason: &str,
    ) -> OutboundNotification {
        OutboundNotification::new(
            tenant,
            "Payment Failed",
            format!("Your payment for {} failed: {}", listing.title, reason),
        )
    }

    pub(crate) fn review_submitted(landlord: IdentityId, listing: &Listing) -> OutboundNotification {
        OutboundNotification::new(
            landlord,
            "New Review",
            format!(
                "A new review has been submitted for your property: {}",
                listing.title
            ),
        )
    }

    pub(crate) fn complaint_filed(landlord: IdentityId, listing: &Listing) -> OutboundNotification {
        OutboundNotification::new(
            landlord,
            "New Complaint",
            format!(
                "A tenant has filed a complaint about your property: {}",
                listing.title
            ),
        )
    }

    pub(crate) fn complaint_closed(
        tenant: IdentityId,
        listing: &Listing,
        status_label: &str,
    ) -> OutboundNotification {
        OutboundNotification::new(
            tenant,
            "Complaint Update",
            format!(
                "Your complaint about {} was marked as {}",
                listing.title, status_label
            ),
        )
    }
}
