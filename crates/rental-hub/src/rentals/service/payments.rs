use tracing::{info, warn};

use super::RentalService;
use crate::rentals::domain::{Booking, BookingId, IdentityId, Payment};
use crate::rentals::error::RentalError;
use crate::rentals::lifecycle::{BookingStatus, PaymentEvent};
use crate::rentals::notifications::{Notices, NotificationSink};
use crate::rentals::repository::RentalRepository;

impl<R, N> RentalService<R, N>
where
    R: RentalRepository + 'static,
    N: NotificationSink + 'static,
{
    /// Tenant settles the payment of an accepted booking.
    pub fn complete_payment(
        &self,
        identity: IdentityId,
        booking: BookingId,
    ) -> Result<Payment, RentalError> {
        let (booking, payment) = self.payable(identity, booking)?;

        let now = self.clock.now();
        let previous = payment.status;
        let mut settled = payment;
        settled.status = previous.apply(PaymentEvent::Complete)?;
        settled.transaction_id = Some(format!("TXN-{}-{}", booking.id, now.timestamp()));

        let settled = self.repository.update_payment(settled, previous)?;
        info!(
            booking = %booking.id,
            payment = %settled.id,
            transaction = settled.transaction_id.as_deref().unwrap_or_default(),
            "payment completed"
        );

        let listing = self.require_listing(booking.listing)?;
        self.notify_profile(listing.owner, |landlord| {
            Notices::payment_received(landlord, &listing)
        });

        Ok(settled)
    }

    /// Records a declined charge. The tenant may retry with [`Self::complete_payment`].
    pub fn fail_payment(
        &self,
        identity: IdentityId,
        booking: BookingId,
        reason: &str,
    ) -> Result<Payment, RentalError> {
        let (booking, payment) = self.payable(identity, booking)?;

        let previous = payment.status;
        let mut failed = payment;
        failed.status = previous.apply(PaymentEvent::Fail)?;

        let failed = self.repository.update_payment(failed, previous)?;
        let reason = match reason.trim() {
            "" => "declined by payment provider",
            trimmed => trimmed,
        };
        warn!(booking = %booking.id, payment = %failed.id, reason, "payment failed");

        let listing = self.require_listing(booking.listing)?;
        self.notify_profile(booking.tenant, |tenant| {
            Notices::payment_failed(tenant, &listing, reason)
        });

        Ok(failed)
    }

    /// Shared gate: caller is the booking's tenant, the booking is accepted, and a
    /// payment row exists.
    fn payable(
        &self,
        identity: IdentityId,
        booking: BookingId,
    ) -> Result<(Booking, Payment), RentalError> {
        let actor = self.actor(identity)?;
        let booking = self.require_booking(booking)?;
        if !actor.is_tenant_of(&booking) {
            warn!(%identity, booking = %booking.id, "payment attempt by non-tenant");
            return Err(RentalError::unauthorized(
                "only the booking's tenant can make this payment",
            ));
        }
        if booking.status != BookingStatus::Accepted {
            return Err(RentalError::InvalidState(format!(
                "booking {} has not been accepted (status '{}')",
                booking.id,
                booking.status.label()
            )));
        }

        let payment = self
            .repository
            .payment_for_booking(booking.id)?
            .ok_or_else(|| RentalError::not_found("payment for booking", booking.id))?;
        Ok((booking, payment))
    }
}
