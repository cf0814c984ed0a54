use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use axum::response::Response;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use crate::rentals::domain::{
    Bhk, Booking, BookingId, Complaint, ComplaintId, IdentityId, ImageRef, Listing, ListingDraft,
    ListingId, ListingImage, ModelType, NewBooking, NewComplaint, NewProfile, NewReview,
    Notification, NotificationId, OutboundNotification, Payment, Profile, ProfileId, Review, Role,
};
use crate::rentals::lifecycle::{ComplaintStatus, PaymentStatus};
use crate::rentals::memory::{InMemoryBlobStore, InMemoryRentalStore};
use crate::rentals::notifications::NotificationSink;
use crate::rentals::repository::{
    BookingLedger, BookingTransition, Clock, FeedbackStore, FixedClock, InboxStore, ListingStore,
    ProfileStore, RepositoryError,
};
use crate::rentals::service::{BookingView, RentalService};

pub(super) const LANDLORD: IdentityId = IdentityId(100);
pub(super) const TENANT: IdentityId = IdentityId(200);
pub(super) const OTHER_TENANT: IdentityId = IdentityId(300);
pub(super) const OTHER_LANDLORD: IdentityId = IdentityId(400);

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 5, 20).expect("valid date")
}

pub(super) fn clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock::on(today()))
}

pub(super) fn stay() -> (NaiveDate, NaiveDate) {
    (
        NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date"),
        NaiveDate::from_ymd_opt(2025, 6, 10).expect("valid date"),
    )
}

pub(super) fn draft() -> ListingDraft {
    ListingDraft {
        title: "Lakeview 2BHK".to_string(),
        description: "Bright corner unit near the lake".to_string(),
        address: "12 Shore Road".to_string(),
        price: dec!(45000),
        bhk: Bhk::TwoBhk,
        model_type: ModelType::New,
        year_built: Some(2015),
    }
}

/// Sink that keeps every message for later assertions.
#[derive(Default)]
pub(super) struct RecordingSink {
    sent: Mutex<Vec<OutboundNotification>>,
}

impl RecordingSink {
    pub(super) fn sent(&self) -> Vec<OutboundNotification> {
        self.sent.lock().expect("sink mutex poisoned").clone()
    }

    pub(super) fn titles_for(&self, recipient: IdentityId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|message| message.recipient == recipient)
            .map(|message| message.title)
            .collect()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notification: OutboundNotification) {
        self.sent
            .lock()
            .expect("sink mutex poisoned")
            .push(notification);
    }
}

pub(super) type TestService = RentalService<InMemoryRentalStore, RecordingSink>;

pub(super) struct Fixture {
    pub(super) service: Arc<TestService>,
    pub(super) store: Arc<InMemoryRentalStore>,
    pub(super) sink: Arc<RecordingSink>,
    pub(super) blobs: Arc<InMemoryBlobStore>,
    pub(super) landlord: Profile,
    pub(super) tenant: Profile,
    pub(super) listing: Listing,
}

pub(super) type Parts = (
    Arc<TestService>,
    Arc<InMemoryRentalStore>,
    Arc<RecordingSink>,
    Arc<InMemoryBlobStore>,
);

pub(super) fn build_service() -> Parts {
    let store = Arc::new(InMemoryRentalStore::new());
    let sink = Arc::new(RecordingSink::default());
    let blobs = Arc::new(InMemoryBlobStore::default());
    let service = Arc::new(
        RentalService::new(store.clone(), sink.clone(), blobs.clone()).with_clock(clock()),
    );
    (service, store, sink, blobs)
}

/// Landlord with one available listing, plus a registered tenant.
pub(super) fn fixture() -> Fixture {
    let (service, store, sink, blobs) = build_service();
    let landlord = service
        .register_profile(LANDLORD, Role::Landlord, "555-0100", "1 Owner Way")
        .expect("landlord registers");
    let tenant = service
        .register_profile(TENANT, Role::Tenant, "555-0200", "2 Renter Street")
        .expect("tenant registers");
    let listing = service
        .create_listing(LANDLORD, draft())
        .expect("listing created");

    Fixture {
        service,
        store,
        sink,
        blobs,
        landlord,
        tenant,
        listing,
    }
}

impl Fixture {
    pub(super) fn register(&self, identity: IdentityId, role: Role) -> Profile {
        self.service
            .register_profile(identity, role, "555-0999", "9 Side Street")
            .expect("profile registers")
    }

    pub(super) fn request_stay(&self) -> BookingView {
        let (start, end) = stay();
        self.service
            .create_booking(TENANT, self.listing.id, start, end)
            .expect("booking created")
    }

    pub(super) fn accepted_booking(&self) -> BookingView {
        let requested = self.request_stay();
        self.service
            .transition_booking(
                LANDLORD,
                requested.booking.id,
                crate::rentals::lifecycle::BookingStatus::Accepted,
            )
            .expect("booking accepted")
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("body readable");
    serde_json::from_slice(&body).expect("valid json")
}

pub(super) async fn assert_error_kind(response: Response, status: StatusCode, kind: &str) {
    assert_eq!(response.status(), status);
    let payload = read_json_body(response).await;
    assert_eq!(payload["kind"], kind);
    assert!(payload["error"].as_str().is_some());
}

/// Inbox whose writes always fail, for checking that notification trouble never
/// reaches the caller.
pub(super) struct BrokenInbox;

impl InboxStore for BrokenInbox {
    fn insert_notification(
        &self,
        _notification: OutboundNotification,
        _at: DateTime<Utc>,
    ) -> Result<Notification, RepositoryError> {
        Err(RepositoryError::Unavailable("inbox offline".to_string()))
    }

    fn notification(&self, _id: NotificationId) -> Result<Option<Notification>, RepositoryError> {
        Err(RepositoryError::Unavailable("inbox offline".to_string()))
    }

    fn notifications_for(
        &self,
        _recipient: IdentityId,
    ) -> Result<Vec<Notification>, RepositoryError> {
        Err(RepositoryError::Unavailable("inbox offline".to_string()))
    }

    fn mark_notification_read(&self, _id: NotificationId) -> Result<Notification, RepositoryError> {
        Err(RepositoryError::Unavailable("inbox offline".to_string()))
    }
}

/// Repository that is down for every call.
pub(super) struct UnavailableRepository;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl ProfileStore for UnavailableRepository {
    fn insert_profile(&self, _: NewProfile, _: DateTime<Utc>) -> Result<Profile, RepositoryError> {
        offline()
    }

    fn profile(&self, _: ProfileId) -> Result<Option<Profile>, RepositoryError> {
        offline()
    }

    fn profile_by_identity(&self, _: IdentityId) -> Result<Option<Profile>, RepositoryError> {
        offline()
    }

    fn remove_identity(&self, _: IdentityId) -> Result<(), RepositoryError> {
        offline()
    }
}

impl ListingStore for UnavailableRepository {
    fn insert_listing(
        &self,
        _: ProfileId,
        _: ListingDraft,
        _: DateTime<Utc>,
    ) -> Result<Listing, RepositoryError> {
        offline()
    }

    fn listing(&self, _: ListingId) -> Result<Option<Listing>, RepositoryError> {
        offline()
    }

    fn listings(&self) -> Result<Vec<Listing>, RepositoryError> {
        offline()
    }

    fn listings_owned_by(&self, _: ProfileId) -> Result<Vec<Listing>, RepositoryError> {
        offline()
    }

    fn update_listing(&self, _: Listing) -> Result<(), RepositoryError> {
        offline()
    }

    fn delete_listing(&self, _: ListingId) -> Result<(), RepositoryError> {
        offline()
    }

    fn insert_image(
        &self,
        _: ListingId,
        _: ImageRef,
        _: bool,
        _: DateTime<Utc>,
    ) -> Result<ListingImage, RepositoryError> {
        offline()
    }

    fn images(&self, _: ListingId) -> Result<Vec<ListingImage>, RepositoryError> {
        offline()
    }
}

impl BookingLedger for UnavailableRepository {
    fn create_booking(
        &self,
        _: NewBooking,
        _: Decimal,
        _: DateTime<Utc>,
    ) -> Result<(Booking, Payment), RepositoryError> {
        offline()
    }

    fn booking(&self, _: BookingId) -> Result<Option<Booking>, RepositoryError> {
        offline()
    }

    fn bookings_for_tenant(&self, _: ProfileId) -> Result<Vec<Booking>, RepositoryError> {
        offline()
    }

    fn bookings_for_listings(&self, _: &[ListingId]) -> Result<Vec<Booking>, RepositoryError> {
        offline()
    }

    fn commit_booking_transition(&self, _: BookingTransition) -> Result<Booking, RepositoryError> {
        offline()
    }

    fn delete_booking(&self, _: BookingId) -> Result<(), RepositoryError> {
        offline()
    }

    fn payment_for_booking(&self, _: BookingId) -> Result<Option<Payment>, RepositoryError> {
        offline()
    }

    fn update_payment(&self, _: Payment, _: PaymentStatus) -> Result<Payment, RepositoryError> {
        offline()
    }
}

impl FeedbackStore for UnavailableRepository {
    fn insert_review(&self, _: NewReview, _: DateTime<Utc>) -> Result<Review, RepositoryError> {
        offline()
    }

    fn reviews_for_listing(&self, _: ListingId) -> Result<Vec<Review>, RepositoryError> {
        offline()
    }

    fn insert_complaint(
        &self,
        _: NewComplaint,
        _: DateTime<Utc>,
    ) -> Result<Complaint, RepositoryError> {
        offline()
    }

    fn complaint(&self, _: ComplaintId) -> Result<Option<Complaint>, RepositoryError> {
        offline()
    }

    fn complaints_for_listing(&self, _: ListingId) -> Result<Vec<Complaint>, RepositoryError> {
        offline()
    }

    fn update_complaint(
        &self,
        _: Complaint,
        _: ComplaintStatus,
    ) -> Result<Complaint, RepositoryError> {
        offline()
    }
}

impl InboxStore for UnavailableRepository {
    fn insert_notification(
        &self,
        _: OutboundNotification,
        _: DateTime<Utc>,
    ) -> Result<Notification, RepositoryError> {
        offline()
    }

    fn notification(&self, _: NotificationId) -> Result<Option<Notification>, RepositoryError> {
        offline()
    }

    fn notifications_for(&self, _: IdentityId) -> Result<Vec<Notification>, RepositoryError> {
        offline()
    }

    fn mark_notification_read(&self, _: NotificationId) -> Result<Notification, RepositoryError> {
        offline()
    }
}

/// In-memory store whose image writes always fail. Everything else is delegated.
#[derive(Default)]
pub(super) struct ImagelessStore {
    pub(super) inner: InMemoryRentalStore,
}

impl ProfileStore for ImagelessStore {
    fn insert_profile(
        &self,
        profile: NewProfile,
        at: DateTime<Utc>,
    ) -> Result<Profile, RepositoryError> {
        self.inner.insert_profile(profile, at)
    }

    fn profile(&self, id: ProfileId) -> Result<Option<Profile>, RepositoryError> {
        self.inner.profile(id)
    }

    fn profile_by_identity(
        &self,
        identity: IdentityId,
    ) -> Result<Option<Profile>, RepositoryError> {
        self.inner.profile_by_identity(identity)
    }

    fn remove_identity(&self, identity: IdentityId) -> Result<(), RepositoryError> {
        self.inner.remove_identity(identity)
    }
}

impl ListingStore for ImagelessStore {
    fn insert_listing(
        &self,
        owner: ProfileId,
        draft: ListingDraft,
        at: DateTime<Utc>,
    ) -> Result<Listing, RepositoryError> {
        self.inner.insert_listing(owner, draft, at)
    }

    fn listing(&self, id: ListingId) -> Result<Option<Listing>, RepositoryError> {
        self.inner.listing(id)
    }

    fn listings(&self) -> Result<Vec<Listing>, RepositoryError> {
        self.inner.listings()
    }

    fn listings_owned_by(&self, owner: ProfileId) -> Result<Vec<Listing>, RepositoryError> {
        self.inner.listings_owned_by(owner)
    }

    fn update_listing(&self, listing: Listing) -> Result<(), RepositoryError> {
        self.inner.update_listing(listing)
    }

    fn delete_listing(&self, id: ListingId) -> Result<(), RepositoryError> {
        self.inner.delete_listing(id)
    }

    fn insert_image(
        &self,
        _: ListingId,
        _: ImageRef,
        _: bool,
        _: DateTime<Utc>,
    ) -> Result<ListingImage, RepositoryError> {
        Err(RepositoryError::Unavailable("image table offline".to_string()))
    }

    fn images(&self, listing: ListingId) -> Result<Vec<ListingImage>, RepositoryError> {
        self.inner.images(listing)
    }
}

impl BookingLedger for ImagelessStore {
    fn create_booking(
        &self,
        booking: NewBooking,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> Result<(Booking, Payment), RepositoryError> {
        self.inner.create_booking(booking, amount, at)
    }

    fn booking(&self, id: BookingId) -> Result<Option<Booking>, RepositoryError> {
        self.inner.booking(id)
    }

    fn bookings_for_tenant(&self, tenant: ProfileId) -> Result<Vec<Booking>, RepositoryError> {
        self.inner.bookings_for_tenant(tenant)
    }

    fn bookings_for_listings(
        &self,
        listings: &[ListingId],
    ) -> Result<Vec<Booking>, RepositoryError> {
        self.inner.bookings_for_listings(listings)
    }

    fn commit_booking_transition(
        &self,
        transition: BookingTransition,
    ) -> Result<Booking, RepositoryError> {
        self.inner.commit_booking_transition(transition)
    }

    fn delete_booking(&self, id: BookingId) -> Result<(), RepositoryError> {
        self.inner.delete_booking(id)
    }

    fn payment_for_booking(&self, booking: BookingId) -> Result<Option<Payment>, RepositoryError> {
        self.inner.payment_for_booking(booking)
    }

    fn update_payment(
        &self,
        payment: Payment,
        expected: PaymentStatus,
    ) -> Result<Payment, RepositoryError> {
        self.inner.update_payment(payment, expected)
    }
}

impl FeedbackStore for ImagelessStore {
    fn insert_review(
        &self,
        review: NewReview,
        at: DateTime<Utc>,
    ) -> Result<Review, RepositoryError> {
        self.inner.insert_review(review, at)
    }

    fn reviews_for_listing(&self, listing: ListingId) -> Result<Vec<Review>, RepositoryError> {
        self.inner.reviews_for_listing(listing)
    }

    fn insert_complaint(
        &self,
        complaint: NewComplaint,
        at: DateTime<Utc>,
    ) -> Result<Complaint, RepositoryError> {
        self.inner.insert_complaint(complaint, at)
    }

    fn complaint(&self, id: ComplaintId) -> Result<Option<Complaint>, RepositoryError> {
        self.inner.complaint(id)
    }

    fn complaints_for_listing(
        &self,
        listing: ListingId,
    ) -> Result<Vec<Complaint>, RepositoryError> {
        self.inner.complaints_for_listing(listing)
    }

    fn update_complaint(
        &self,
        complaint: Complaint,
        expected: ComplaintStatus,
    ) -> Result<Complaint, RepositoryError> {
        self.inner.update_complaint(complaint, expected)
    }
}

impl InboxStore for ImagelessStore {
    fn insert_notification(
        &self,
        notification: OutboundNotification,
        at: DateTime<Utc>,
    ) -> Result<Notification, RepositoryError> {
        self.inner.insert_notification(notification, at)
    }

    fn notification(&self, id: NotificationId) -> Result<Option<Notification>, RepositoryError> {
        self.inner.notification(id)
    }

    fn notifications_for(
        &self,
        recipient: IdentityId,
    ) -> Result<Vec<Notification>, RepositoryError> {
        self.inner.notifications_for(recipient)
    }

    fn mark_notification_read(&self, id: NotificationId) -> Result<Notification, RepositoryError> {
        self.inner.mark_notification_read(id)
    }
}
