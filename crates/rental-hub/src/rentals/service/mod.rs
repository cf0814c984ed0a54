//! Service facade over the rental store.
//!
//! Every public operation resolves the calling actor once, checks its capabilities,
//! commits the core write through the repository, and only then hands notifications to
//! the sink.

mod bookings;
mod feedback;
mod inbox;
mod listings;
mod payments;
mod profiles;

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::{
    Bhk, Booking, BookingId, Complaint, IdentityId, Listing, ListingId, ListingImage,
    ModelType, OutboundNotification, Payment, ProfileId, Review,
};
use super::error::RentalError;
use super::notifications::NotificationSink;
use super::repository::{BlobStore, Clock, RentalRepository, SystemClock};

/// Service composing the repository, blob storage, clock, and notification sink.
pub struct RentalService<R, N> {
    repository: Arc<R>,
    notifier: Arc<N>,
    blobs: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
}

impl<R, N> RentalService<R, N>
where
    R: RentalRepository + 'static,
    N: NotificationSink + 'static,
{
    pub fn new(repository: Arc<R>, notifier: Arc<N>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            repository,
            notifier,
            blobs,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn require_listing(&self, id: ListingId) -> Result<Listing, RentalError> {
        self.repository
            .listing(id)?
            .ok_or_else(|| RentalError::not_found("listing", id))
    }

    fn require_booking(&self, id: BookingId) -> Result<Booking, RentalError> {
        self.repository
            .booking(id)?
            .ok_or_else(|| RentalError::not_found("booking", id))
    }

    fn identity_of(&self, profile: ProfileId) -> Option<IdentityId> {
        match self.repository.profile(profile) {
            Ok(Some(profile)) => Some(profile.identity),
            Ok(None) => {
                warn!(%profile, "no profile to notify");
                None
            }
            Err(err) => {
                warn!(%profile, error = %err, "could not resolve notification recipient");
                None
            }
        }
    }

    /// Post-commit dispatch; a missing recipient only costs the notification.
    fn notify_profile(
        &self,
        profile: ProfileId,
        build: impl FnOnce(IdentityId) -> OutboundNotification,
    ) {
        if let Some(identity) = self.identity_of(profile) {
            self.notifier.notify(build(identity));
        }
    }

    fn booking_view(&self, booking: Booking) -> Result<BookingView, RentalError> {
        let listing_title = self
            .repository
            .listing(booking.listing)?
            .map(|listing| listing.title)
            .unwrap_or_default();
        let payment = self.repository.payment_for_booking(booking.id)?;
        Ok(BookingView {
            booking,
            listing_title,
            payment,
        })
    }
}

/// A booking with the fields a dashboard shows next to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingView {
    pub booking: Booking,
    pub listing_title: String,
    pub payment: Option<Payment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingDetail {
    pub listing: Listing,
    pub images: Vec<ListingImage>,
    pub reviews: Vec<Review>,
    pub complaints: Vec<Complaint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LandlordDashboard {
    pub listings: Vec<Listing>,
    pub bookings: Vec<BookingView>,
    pub reviews: Vec<Review>,
    pub complaints: Vec<Complaint>,
}

/// Optional filters applied when browsing available listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingQuery {
    #[serde(default)]
    pub bhk: Option<Bhk>,
    #[serde(default)]
    pub min_price: Option<Decimal>,
    #[serde(default)]
    pub max_price: Option<Decimal>,
    #[serde(default)]
    pub model_type: Option<ModelType>,
    #[serde(default)]
    pub min_year_built: Option<u16>,
}

impl ListingQuery {
    pub fn matches(&self, listing: &Listing) -> bool {
        self.bhk.map_or(true, |bhk| listing.bhk == bhk)
            && self.min_price.map_or(true, |min| listing.price >= min)
            && self.max_price.map_or(true, |max| listing.price <= max)
            && self
                .model_type
                .map_or(true, |model| listing.model_type == model)
            && self.min_year_built.map_or(true, |year| {
                listing.year_built.is_some_and(|built| built >= year)
            })
    }
}

pub(crate) fn require_text(
    field: &str,
    value: &str,
    max_len: Option<usize>,
) -> Result<(), RentalError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RentalError::validation(format!("{field} must not be empty")));
    }
    if let Some(max) = max_len {
        if trimmed.chars().count() > max {
            return Err(RentalError::validation(format!(
                "{field} must be at most {max} characters"
            )));
        }
    }
    Ok(())
}
