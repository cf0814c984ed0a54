use tracing::warn;

use super::RentalService;
use crate::rentals::domain::{IdentityId, Notification, NotificationId};
use crate::rentals::error::RentalError;
use crate::rentals::notifications::NotificationSink;
use crate::rentals::repository::RentalRepository;

impl<R, N> RentalService<R, N>
where
    R: RentalRepository + 'static,
    N: NotificationSink + 'static,
{
    /// The caller's notifications, newest first.
    pub fn inbox(
        &self,
        identity: IdentityId,
        unread_only: bool,
    ) -> Result<Vec<Notification>, RentalError> {
        let mut notifications: Vec<Notification> = self
            .repository
            .notifications_for(identity)?
            .into_iter()
            .filter(|notification| !unread_only || !notification.is_read)
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(notifications)
    }

    pub fn mark_notification_read(
        &self,
        identity: IdentityId,
        notification: NotificationId,
    ) -> Result<Notification, RentalError> {
        let stored = self
            .repository
            .notification(notification)?
            .ok_or_else(|| RentalError::not_found("notification", notification))?;
        if stored.recipient != identity {
            warn!(%identity, %notification, "read receipt by non-recipient");
            return Err(RentalError::unauthorized(
                "only the recipient can mark a notification as read",
            ));
        }
        Ok(self.repository.mark_notification_read(notification)?)
    }
}
