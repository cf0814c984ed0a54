use tracing::{info, warn};

use super::{require_text, LandlordDashboard, RentalService};
use crate::rentals::actor::Actor;
use crate::rentals::domain::{
    Complaint, ComplaintId, IdentityId, Listing, ListingId, NewComplaint, NewReview, Rating,
    Review,
};
use crate::rentals::error::RentalError;
use crate::rentals::lifecycle::{ComplaintEvent, ComplaintStatus};
use crate::rentals::notifications::{Notices, NotificationSink};
use crate::rentals::repository::RentalRepository;

const MAX_COMPLAINT_TITLE_LEN: usize = 200;

impl<R, N> RentalService<R, N>
where
    R: RentalRepository + 'static,
    N: NotificationSink + 'static,
{
    pub fn submit_review(
        &self,
        identity: IdentityId,
        listing: ListingId,
        rating: u8,
        comment: &str,
    ) -> Result<Review, RentalError> {
        let actor = self.actor(identity)?;
        if !actor.is_tenant() {
            warn!(%identity, %listing, "review by non-tenant");
            return Err(RentalError::unauthorized("only tenants can review properties"));
        }
        let listing = self.require_listing(listing)?;
        let rating = Rating::new(rating).ok_or_else(|| {
            RentalError::validation(format!(
                "rating must be between {} and {}",
                Rating::MIN,
                Rating::MAX
            ))
        })?;
        require_text("comment", comment, None)?;

        let review = self.repository.insert_review(
            NewReview {
                listing: listing.id,
                author: actor.profile_id(),
                rating,
                comment: comment.trim().to_string(),
            },
            self.clock.now(),
        )?;
        info!(review = %review.id, listing = %listing.id, rating = rating.value(), "review submitted");

        self.notify_profile(listing.owner, |landlord| {
            Notices::review_submitted(landlord, &listing)
        });
        Ok(review)
    }

    pub fn submit_complaint(
        &self,
        identity: IdentityId,
        listing: ListingId,
        title: &str,
        description: &str,
    ) -> Result<Complaint, RentalError> {
        let actor = self.actor(identity)?;
        if !actor.is_tenant() {
            warn!(%identity, %listing, "complaint by non-tenant");
            return Err(RentalError::unauthorized("only tenants can file complaints"));
        }
        let listing = self.require_listing(listing)?;
        require_text("title", title, Some(MAX_COMPLAINT_TITLE_LEN))?;
        require_text("description", description, None)?;

        let complaint = self.repository.insert_complaint(
            NewComplaint {
                listing: listing.id,
                tenant: actor.profile_id(),
                title: title.trim().to_string(),
                description: description.trim().to_string(),
            },
            self.clock.now(),
        )?;
        info!(complaint = %complaint.id, listing = %listing.id, "complaint submitted");

        self.notify_profile(listing.owner, |landlord| {
            Notices::complaint_filed(landlord, &listing)
        });
        Ok(complaint)
    }

    /// Landlord starts working on a pending complaint.
    pub fn acknowledge_complaint(
        &self,
        identity: IdentityId,
        complaint: ComplaintId,
    ) -> Result<Complaint, RentalError> {
        let (complaint, _listing) = self.owned_complaint(identity, complaint)?;
        let updated = self.apply_complaint_event(complaint, ComplaintEvent::Acknowledge)?;
        info!(complaint = %updated.id, "complaint acknowledged");
        Ok(updated)
    }

    /// Landlord closes a complaint as `resolved` or `rejected`.
    pub fn resolve_complaint(
        &self,
        identity: IdentityId,
        complaint: ComplaintId,
        target: ComplaintStatus,
    ) -> Result<Complaint, RentalError> {
        let (complaint, listing) = self.owned_complaint(identity, complaint)?;
        let event = ComplaintEvent::closing(target).ok_or_else(|| {
            RentalError::validation(format!(
                "complaints can only be marked resolved or rejected, not '{}'",
                target.label()
            ))
        })?;

        let updated = self.apply_complaint_event(complaint, event)?;
        info!(complaint = %updated.id, status = updated.status.label(), "complaint closed");

        self.notify_profile(updated.tenant, |tenant| {
            Notices::complaint_closed(tenant, &listing, updated.status.label())
        });
        Ok(updated)
    }

    fn owned_complaint(
        &self,
        identity: IdentityId,
        complaint: ComplaintId,
    ) -> Result<(Complaint, Listing), RentalError> {
        let actor = self.actor(identity)?;
        let complaint = self
            .repository
            .complaint(complaint)?
            .ok_or_else(|| RentalError::not_found("complaint", complaint))?;
        let listing = self.require_listing(complaint.listing)?;
        if !actor.is_landlord_of(&listing) {
            warn!(%identity, complaint = %complaint.id, "complaint update by non-owner");
            return Err(RentalError::unauthorized(
                "only the listing's landlord can update this complaint",
            ));
        }
        Ok((complaint, listing))
    }

    fn apply_complaint_event(
        &self,
        complaint: Complaint,
        event: ComplaintEvent,
    ) -> Result<Complaint, RentalError> {
        let previous = complaint.status;
        let mut updated = complaint;
        updated.status = previous.apply(event)?;
        updated.updated_at = self.clock.now();
        Ok(self.repository.update_complaint(updated, previous)?)
    }

    /// Everything a landlord manages, across all owned listings.
    pub fn landlord_dashboard(
        &self,
        identity: IdentityId,
    ) -> Result<LandlordDashboard, RentalError> {
        let actor = self.actor(identity)?;
        let Actor::Landlord(profile) = &actor else {
            return Err(RentalError::unauthorized("landlord access required"));
        };

        let listings = self.repository.listings_owned_by(profile.id)?;
        let mut reviews = Vec::new();
        let mut complaints = Vec::new();
        for listing in &listings {
            reviews.extend(self.repository.reviews_for_listing(listing.id)?);
            complaints.extend(self.repository.complaints_for_listing(listing.id)?);
        }
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        complaints.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let bookings = self.booking_overview(identity)?;

        Ok(LandlordDashboard {
            listings,
            bookings,
            reviews,
            complaints,
        })
    }
}
