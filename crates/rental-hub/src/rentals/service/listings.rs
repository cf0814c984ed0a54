use chrono::Datelike;
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::{require_text, ListingDetail, ListingQuery, RentalService};
use crate::rentals::domain::{IdentityId, ImageId, Listing, ListingDraft, ListingId, ListingImage};
use crate::rentals::error::RentalError;
use crate::rentals::notifications::NotificationSink;
use crate::rentals::repository::RentalRepository;

const MAX_TITLE_LEN: usize = 200;
const EARLIEST_YEAR_BUILT: u16 = 1800;

impl<R, N> RentalService<R, N>
where
    R: RentalRepository + 'static,
    N: NotificationSink + 'static,
{
    /// List a property under the calling landlord. New listings start available with a
    /// placeholder primary image.
    pub fn create_listing(
        &self,
        identity: IdentityId,
        draft: ListingDraft,
    ) -> Result<Listing, RentalError> {
        let actor = self.actor(identity)?;
        if !actor.is_landlord() {
            warn!(%identity, "non-landlord attempted to create a listing");
            return Err(RentalError::unauthorized("only landlords can list properties"));
        }
        self.validate_draft(&draft)?;

        let listing = self
            .repository
            .insert_listing(actor.profile_id(), draft, self.clock.now())?;

        info!(listing = %listing.id, owner = %listing.owner, "listing created");
        Ok(listing)
    }

    fn validate_draft(&self, draft: &ListingDraft) -> Result<(), RentalError> {
        require_text("title", &draft.title, Some(MAX_TITLE_LEN))?;
        require_text("description", &draft.description, None)?;
        require_text("address", &draft.address, None)?;
        if draft.price < Decimal::ZERO {
            return Err(RentalError::validation("price must not be negative"));
        }
        if let Some(year) = draft.year_built {
            let current_year = u16::try_from(self.clock.today().year()).unwrap_or(u16::MAX);
            if !(EARLIEST_YEAR_BUILT..=current_year).contains(&year) {
                return Err(RentalError::validation(format!(
                    "year built must be between {EARLIEST_YEAR_BUILT} and {current_year}"
                )));
            }
        }
        Ok(())
    }

    /// Upload an image for an owned listing. At most one image stays primary.
    pub fn add_listing_image(
        &self,
        identity: IdentityId,
        listing: ListingId,
        blob: Vec<u8>,
        is_primary: bool,
    ) -> Result<ListingImage, RentalError> {
        let actor = self.actor(identity)?;
        let listing = self.require_listing(listing)?;
        if !actor.is_landlord_of(&listing) {
            warn!(%identity, listing = %listing.id, "image upload by non-owner");
            return Err(RentalError::unauthorized(
                "only the listing's landlord can add images",
            ));
        }

        let reference = self.blobs.store(blob)?;
        let image = self
            .repository
            .insert_image(listing.id, reference, is_primary, self.clock.now())?;

        info!(listing = %listing.id, image = %image.id, primary = image.is_primary, "image added");
        Ok(image)
    }

    /// Fetch an uploaded image's bytes. The placeholder has no stored blob.
    pub fn listing_image(
        &self,
        listing: ListingId,
        image: ImageId,
    ) -> Result<(ListingImage, Vec<u8>), RentalError> {
        let record = self
            .repository
            .images(listing)?
            .into_iter()
            .find(|candidate| candidate.id == image)
            .ok_or_else(|| RentalError::not_found("image", image))?;
        if record.image.is_placeholder() {
            return Err(RentalError::not_found("image data", image));
        }
        let bytes = self.blobs.retrieve(&record.image)?;
        Ok((record, bytes))
    }

    pub fn listing_detail(&self, listing: ListingId) -> Result<ListingDetail, RentalError> {
        let listing = self.require_listing(listing)?;
        let images = self.repository.images(listing.id)?;
        let mut reviews = self.repository.reviews_for_listing(listing.id)?;
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let mut complaints = self.repository.complaints_for_listing(listing.id)?;
        complaints.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(ListingDetail {
            listing,
            images,
            reviews,
            complaints,
        })
    }

    /// Available listings matching the query, cheapest first.
    pub fn browse_listings(&self, query: &ListingQuery) -> Result<Vec<Listing>, RentalError> {
        let mut listings: Vec<Listing> = self
            .repository
            .listings()?
            .into_iter()
            .filter(|listing| listing.is_available && query.matches(listing))
            .collect();
        listings.sort_by(|a, b| a.price.cmp(&b.price).then(a.id.cmp(&b.id)));
        Ok(listings)
    }

    /// Booking acceptance never changes availability; landlords toggle it here.
    pub fn set_listing_availability(
        &self,
        identity: IdentityId,
        listing: ListingId,
        available: bool,
    ) -> Result<Listing, RentalError> {
        let actor = self.actor(identity)?;
        let mut listing = self.require_listing(listing)?;
        if !actor.is_landlord_of(&listing) {
            warn!(%identity, listing = %listing.id, "availability change by non-owner");
            return Err(RentalError::unauthorized(
                "only the listing's landlord can change availability",
            ));
        }

        listing.is_available = available;
        listing.updated_at = self.clock.now();
        self.repository.update_listing(listing.clone())?;

        info!(listing = %listing.id, available, "listing availability updated");
        Ok(listing)
    }

    /// Remove an owned listing with its bookings, payments, images, and feedback.
    pub fn delete_listing(
        &self,
        identity: IdentityId,
        listing: ListingId,
    ) -> Result<(), RentalError> {
        let actor = self.actor(identity)?;
        let listing = self.require_listing(listing)?;
        if !actor.is_landlord_of(&listing) {
            warn!(%identity, listing = %listing.id, "listing delete by non-owner");
            return Err(RentalError::unauthorized(
                "only the listing's landlord can delete it",
            ));
        }

        self.repository.delete_listing(listing.id)?;
        info!(listing = %listing.id, "listing deleted");
        Ok(())
    }
}
