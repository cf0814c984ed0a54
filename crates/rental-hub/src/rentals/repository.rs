use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use super::domain::{
    Booking, BookingId, Complaint, ComplaintId, IdentityId, ImageRef, Listing, ListingDraft,
    ListingId, ListingImage, NewBooking, NewComplaint, NewProfile, NewReview, Notification,
    NotificationId, OutboundNotification, Payment, Profile, ProfileId, Review,
};
use super::lifecycle::{ComplaintStatus, PaymentStatus};

/// Profiles keyed by identity. Removing an identity cascades to everything it owns.
pub trait ProfileStore: Send + Sync {
    fn insert_profile(
        &self,
        profile: NewProfile,
        at: DateTime<Utc>,
    ) -> Result<Profile, RepositoryError>;
    fn profile(&self, id: ProfileId) -> Result<Option<Profile>, RepositoryError>;
    fn profile_by_identity(&self, identity: IdentityId)
        -> Result<Option<Profile>, RepositoryError>;
    fn remove_identity(&self, identity: IdentityId) -> Result<(), RepositoryError>;
}

pub trait ListingStore: Send + Sync {
    /// Writes the listing together with its placeholder primary image.
    fn insert_listing(
        &self,
        owner: ProfileId,
        draft: ListingDraft,
        at: DateTime<Utc>,
    ) -> Result<Listing, RepositoryError>;
    fn listing(&self, id: ListingId) -> Result<Option<Listing>, RepositoryError>;
    fn listings(&self) -> Result<Vec<Listing>, RepositoryError>;
    fn listings_owned_by(&self, owner: ProfileId) -> Result<Vec<Listing>, RepositoryError>;
    fn update_listing(&self, listing: Listing) -> Result<(), RepositoryError>;
    /// Deletes the listing with its images, bookings, payments, reviews, and complaints.
    fn delete_listing(&self, id: ListingId) -> Result<(), RepositoryError>;
    /// Records an image. A primary image demotes the previous primary, and any real
    /// image replaces the placeholder.
    fn insert_image(
        &self,
        listing: ListingId,
        image: ImageRef,
        is_primary: bool,
        at: DateTime<Utc>,
    ) -> Result<ListingImage, RepositoryError>;
    fn images(&self, listing: ListingId) -> Result<Vec<ListingImage>, RepositoryError>;
}

/// A booking status change computed against `expected_version`, committed together
/// with an optional payment update.
#[derive(Debug, Clone)]
pub struct BookingTransition {
    pub booking: Booking,
    pub expected_version: u64,
    pub payment: Option<Payment>,
}

pub trait BookingLedger: Send + Sync {
    /// Writes the booking and its pending payment as one unit.
    fn create_booking(
        &self,
        booking: NewBooking,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> Result<(Booking, Payment), RepositoryError>;
    fn booking(&self, id: BookingId) -> Result<Option<Booking>, RepositoryError>;
    fn bookings_for_tenant(&self, tenant: ProfileId) -> Result<Vec<Booking>, RepositoryError>;
    fn bookings_for_listings(
        &self,
        listings: &[ListingId],
    ) -> Result<Vec<Booking>, RepositoryError>;
    /// Fails with [`RepositoryError::Conflict`] when the stored version moved on.
    fn commit_booking_transition(
        &self,
        transition: BookingTransition,
    ) -> Result<Booking, RepositoryError>;
    /// Deletes the booking and its payment as one unit.
    fn delete_booking(&self, id: BookingId) -> Result<(), RepositoryError>;
    fn payment_for_booking(&self, booking: BookingId) -> Result<Option<Payment>, RepositoryError>;
    /// Compare-and-set on the payment status.
    fn update_payment(
        &self,
        payment: Payment,
        expected: PaymentStatus,
    ) -> Result<Payment, RepositoryError>;
}

pub trait FeedbackStore: Send + Sync {
    fn insert_review(&self, review: NewReview, at: DateTime<Utc>)
        -> Result<Review, RepositoryError>;
    fn reviews_for_listing(&self, listing: ListingId) -> Result<Vec<Review>, RepositoryError>;
    fn insert_complaint(
        &self,
        complaint: NewComplaint,
        at: DateTime<Utc>,
    ) -> Result<Complaint, RepositoryError>;
    fn complaint(&self, id: ComplaintId) -> Result<Option<Complaint>, RepositoryError>;
    fn complaints_for_listing(
        &self,
        listing: ListingId,
    ) -> Result<Vec<Complaint>, RepositoryError>;
    /// Compare-and-set on the complaint status.
    fn update_complaint(
        &self,
        complaint: Complaint,
        expected: ComplaintStatus,
    ) -> Result<Complaint, RepositoryError>;
}

pub trait InboxStore: Send + Sync {
    fn insert_notification(
        &self,
        notification: OutboundNotification,
        at: DateTime<Utc>,
    ) -> Result<Notification, RepositoryError>;
    fn notification(&self, id: NotificationId) -> Result<Option<Notification>, RepositoryError>;
    fn notifications_for(&self, recipient: IdentityId)
        -> Result<Vec<Notification>, RepositoryError>;
    fn mark_notification_read(&self, id: NotificationId) -> Result<Notification, RepositoryError>;
}

/// Storage abstraction so the service can be exercised against any relational backend.
pub trait RentalRepository:
    ProfileStore + ListingStore + BookingLedger + FeedbackStore + InboxStore
{
}

impl<T> RentalRepository for T where
    T: ProfileStore + ListingStore + BookingLedger + FeedbackStore + InboxStore
{
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record was modified concurrently or already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Object storage for uploaded listing images.
pub trait BlobStore: Send + Sync {
    fn store(&self, blob: Vec<u8>) -> Result<ImageRef, BlobError>;
    fn retrieve(&self, reference: &ImageRef) -> Result<Vec<u8>, BlobError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlobError {
    #[error("blob is empty")]
    Empty,
    #[error("blob {0} not found")]
    Missing(String),
    #[error("blob storage unavailable: {0}")]
    Unavailable(String),
}

/// Time source so date validation can be pinned in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Noon UTC on the given day.
    pub fn on(day: NaiveDate) -> Self {
        let noon = day
            .and_hms_opt(12, 0, 0)
            .unwrap_or_default()
            .and_utc();
        Self(noon)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
