use chrono::NaiveDate;
use tracing::{info, warn};

use super::{BookingView, RentalService};
use crate::rentals::actor::Actor;
use crate::rentals::domain::{BookingId, IdentityId, ListingId, NewBooking};
use crate::rentals::error::RentalError;
use crate::rentals::lifecycle::{BookingEvent, BookingStatus, PaymentEvent};
use crate::rentals::notifications::{Notices, NotificationSink};
use crate::rentals::repository::{BookingTransition, RentalRepository};

impl<R, N> RentalService<R, N>
where
    R: RentalRepository + 'static,
    N: NotificationSink + 'static,
{
    /// Request a stay. The booking and its pending payment (priced from the listing)
    /// commit together; the landlord is notified afterwards.
    pub fn create_booking(
        &self,
        identity: IdentityId,
        listing: ListingId,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<BookingView, RentalError> {
        let actor = self.actor(identity)?;
        if !actor.is_tenant() {
            warn!(%identity, listing = %listing, "non-tenant attempted to book");
            return Err(RentalError::unauthorized("only tenants can book properties"));
        }
        let listing = self.require_listing(listing)?;

        if start_date < self.clock.today() {
            return Err(RentalError::validation("start date cannot be in the past"));
        }
        if end_date <= start_date {
            return Err(RentalError::validation("end date must be after start date"));
        }
        if !listing.is_available {
            return Err(RentalError::InvalidState(format!(
                "listing {} is not available for booking",
                listing.id
            )));
        }

        let (booking, payment) = self.repository.create_booking(
            NewBooking {
                listing: listing.id,
                tenant: actor.profile_id(),
                start_date,
                end_date,
            },
            listing.price,
            self.clock.now(),
        )?;
        info!(
            booking = %booking.id,
            payment = %payment.id,
            listing = %listing.id,
            amount = %payment.amount,
            "booking requested"
        );

        self.notify_profile(listing.owner, |landlord| {
            Notices::booking_requested(landlord, &listing)
        });

        Ok(BookingView {
            booking,
            listing_title: listing.title,
            payment: Some(payment),
        })
    }

    /// Landlord decision on a booking, checked against the booking transition table.
    /// Acceptance reopens the paired payment in the same commit.
    pub fn transition_booking(
        &self,
        identity: IdentityId,
        booking: BookingId,
        target: BookingStatus,
    ) -> Result<BookingView, RentalError> {
        let actor = self.actor(identity)?;
        let booking = self.require_booking(booking)?;
        let listing = self.require_listing(booking.listing)?;
        if !actor.is_landlord_of(&listing) {
            warn!(%identity, booking = %booking.id, "booking transition by non-owner");
            return Err(RentalError::unauthorized(
                "only the listing's landlord can update this booking",
            ));
        }

        let event = BookingEvent::for_target(target).ok_or_else(|| {
            RentalError::validation(format!(
                "'{}' is not a valid booking decision",
                target.label()
            ))
        })?;
        let next = booking.status.apply(event).inspect_err(|rejected| {
            warn!(booking = %booking.id, %rejected, "booking transition rejected");
        })?;

        let payment = match event {
            BookingEvent::Accept => match self.repository.payment_for_booking(booking.id)? {
                Some(mut payment) => {
                    payment.status = payment.status.apply(PaymentEvent::Reopen)?;
                    Some(payment)
                }
                None => {
                    warn!(booking = %booking.id, "accepted booking has no payment record");
                    None
                }
            },
            BookingEvent::Reject | BookingEvent::Complete => None,
        };

        let expected_version = booking.version;
        let mut updated = booking;
        updated.status = next;
        updated.updated_at = self.clock.now();

        let committed = self
            .repository
            .commit_booking_transition(BookingTransition {
                booking: updated,
                expected_version,
                payment,
            })?;
        info!(
            booking = %committed.id,
            status = committed.status.label(),
            version = committed.version,
            "booking status updated"
        );

        self.notify_profile(committed.tenant, |tenant| {
            Notices::booking_decided(tenant, &listing, committed.status.label())
        });

        self.booking_view(committed)
    }

    /// Landlord removal of a booking together with its payment.
    pub fn delete_booking(
        &self,
        identity: IdentityId,
        booking: BookingId,
    ) -> Result<(), RentalError> {
        let actor = self.actor(identity)?;
        let booking = self.require_booking(booking)?;
        let listing = self.require_listing(booking.listing)?;
        if !actor.is_landlord_of(&listing) {
            warn!(%identity, booking = %booking.id, "booking delete by non-owner");
            return Err(RentalError::unauthorized(
                "only the listing's landlord can delete this booking",
            ));
        }

        self.repository.delete_booking(booking.id)?;
        info!(booking = %booking.id, "booking deleted");
        Ok(())
    }

    /// Landlords see bookings on their listings, tenants their own; newest first.
    pub fn booking_overview(&self, identity: IdentityId) -> Result<Vec<BookingView>, RentalError> {
        let actor = self.actor(identity)?;
        let mut bookings = match &actor {
            Actor::Landlord(profile) => {
                let owned: Vec<ListingId> = self
                    .repository
                    .listings_owned_by(profile.id)?
                    .into_iter()
                    .map(|listing| listing.id)
                    .collect();
                self.repository.bookings_for_listings(&owned)?
            }
            Actor::Tenant(profile) => self.repository.bookings_for_tenant(profile.id)?,
        };
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        bookings
            .into_iter()
            .map(|booking| self.booking_view(booking))
            .collect()
    }
}
