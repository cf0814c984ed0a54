//! In-process relational store.
//!
//! All tables sit behind one mutex, so every trait method is a single all-or-nothing unit:
//! readers never observe a booking without its payment, and cascades run to completion
//! before the lock is released.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::domain::{
    Booking, BookingId, Complaint, ComplaintId, IdentityId, ImageId, ImageRef, Listing,
    ListingDraft, ListingId, ListingImage, NewBooking, NewComplaint, NewProfile, NewReview,
    Notification, NotificationId, OutboundNotification, Payment, PaymentId, Profile, ProfileId,
    Review, ReviewId,
};
use super::lifecycle::{BookingStatus, ComplaintStatus, PaymentStatus};
use super::repository::{
    BlobError, BlobStore, BookingLedger, BookingTransition, FeedbackStore, InboxStore,
    ListingStore, ProfileStore, RepositoryError,
};

#[derive(Debug, Default)]
struct Tables {
    sequence: u64,
    profiles: BTreeMap<ProfileId, Profile>,
    listings: BTreeMap<ListingId, Listing>,
    images: BTreeMap<ImageId, ListingImage>,
    bookings: BTreeMap<BookingId, Booking>,
    payments: BTreeMap<PaymentId, Payment>,
    reviews: BTreeMap<ReviewId, Review>,
    complaints: BTreeMap<ComplaintId, Complaint>,
    notifications: BTreeMap<NotificationId, Notification>,
}

impl Tables {
    /// Ids come from one shared sequence, like a single-database surrogate key space.
    fn next_id(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    fn drop_booking(&mut self, id: BookingId) {
        self.bookings.remove(&id);
        self.payments.retain(|_, payment| payment.booking != id);
    }

    fn drop_listing(&mut self, id: ListingId) {
        let bookings: Vec<BookingId> = self
            .bookings
            .values()
            .filter(|booking| booking.listing == id)
            .map(|booking| booking.id)
            .collect();
        for booking in bookings {
            self.drop_booking(booking);
        }
        self.images.retain(|_, image| image.listing != id);
        self.reviews.retain(|_, review| review.listing != id);
        self.complaints.retain(|_, complaint| complaint.listing != id);
        self.listings.remove(&id);
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryRentalStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryRentalStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store lock poisoned".to_string()))
    }

    /// Total payment rows, used to check that bookings never gain a second payment.
    pub fn payment_count(&self, booking: BookingId) -> Result<usize, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables
            .payments
            .values()
            .filter(|payment| payment.booking == booking)
            .count())
    }
}

impl ProfileStore for InMemoryRentalStore {
    fn insert_profile(
        &self,
        profile: NewProfile,
        at: DateTime<Utc>,
    ) -> Result<Profile, RepositoryError> {
        let mut tables = self.lock()?;
        if tables
            .profiles
            .values()
            .any(|existing| existing.identity == profile.identity)
        {
            return Err(RepositoryError::Conflict);
        }

        let stored = Profile {
            id: ProfileId(tables.next_id()),
            identity: profile.identity,
            role: profile.role,
            phone: profile.phone,
            address: profile.address,
            created_at: at,
        };
        tables.profiles.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn profile(&self, id: ProfileId) -> Result<Option<Profile>, RepositoryError> {
        Ok(self.lock()?.profiles.get(&id).cloned())
    }

    fn profile_by_identity(
        &self,
        identity: IdentityId,
    ) -> Result<Option<Profile>, RepositoryError> {
        Ok(self
            .lock()?
            .profiles
            .values()
            .find(|profile| profile.identity == identity)
            .cloned())
    }

    fn remove_identity(&self, identity: IdentityId) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        tables
            .notifications
            .retain(|_, notification| notification.recipient != identity);

        let Some(profile) = tables
            .profiles
            .values()
            .find(|profile| profile.identity == identity)
            .map(|profile| profile.id)
        else {
            return Ok(());
        };

        let owned: Vec<ListingId> = tables
            .listings
            .values()
            .filter(|listing| listing.owner == profile)
            .map(|listing| listing.id)
            .collect();
        for listing in owned {
            tables.drop_listing(listing);
        }

        let booked: Vec<BookingId> = tables
            .bookings
            .values()
            .filter(|booking| booking.tenant == profile)
            .map(|booking| booking.id)
            .collect();
        for booking in booked {
            tables.drop_booking(booking);
        }

        tables.reviews.retain(|_, review| review.author != profile);
        tables
            .complaints
            .retain(|_, complaint| complaint.tenant != profile);
        tables.profiles.remove(&profile);
        Ok(())
    }
}

impl ListingStore for InMemoryRentalStore {
    fn insert_listing(
        &self,
        owner: ProfileId,
        draft: ListingDraft,
        at: DateTime<Utc>,
    ) -> Result<Listing, RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.profiles.contains_key(&owner) {
            return Err(RepositoryError::NotFound);
        }

        let listing = Listing {
            id: ListingId(tables.next_id()),
            owner,
            title: draft.title,
            description: draft.description,
            address: draft.address,
            price: draft.price,
            bhk: draft.bhk,
            model_type: draft.model_type,
            year_built: draft.year_built,
            is_available: true,
            created_at: at,
            updated_at: at,
        };
        tables.listings.insert(listing.id, listing.clone());
        let placeholder = ListingImage {
            id: ImageId(tables.next_id()),
            listing: listing.id,
            image: ImageRef::placeholder(),
            is_primary: true,
            uploaded_at: at,
        };
        tables.images.insert(placeholder.id, placeholder);
        Ok(listing)
    }

    fn listing(&self, id: ListingId) -> Result<Option<Listing>, RepositoryError> {
        Ok(self.lock()?.listings.get(&id).cloned())
    }

    fn listings(&self) -> Result<Vec<Listing>, RepositoryError> {
        Ok(self.lock()?.listings.values().cloned().collect())
    }

    fn listings_owned_by(&self, owner: ProfileId) -> Result<Vec<Listing>, RepositoryError> {
        Ok(self
            .lock()?
            .listings
            .values()
            .filter(|listing| listing.owner == owner)
            .cloned()
            .collect())
    }

    fn update_listing(&self, listing: Listing) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        match tables.listings.get_mut(&listing.id) {
            Some(slot) => {
                *slot = listing;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn delete_listing(&self, id: ListingId) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.listings.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        tables.drop_listing(id);
        Ok(())
    }

    fn insert_image(
        &self,
        listing: ListingId,
        image: ImageRef,
        is_primary: bool,
        at: DateTime<Utc>,
    ) -> Result<ListingImage, RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.listings.contains_key(&listing) {
            return Err(RepositoryError::NotFound);
        }

        let had_placeholder = tables
            .images
            .values()
            .any(|existing| existing.listing == listing && existing.image.is_placeholder());
        if !image.is_placeholder() {
            tables
                .images
                .retain(|_, existing| !(existing.listing == listing && existing.image.is_placeholder()));
        }

        // The first real image inherits the placeholder's primary slot.
        let has_primary = tables
            .images
            .values()
            .any(|existing| existing.listing == listing && existing.is_primary);
        let is_primary = is_primary || had_placeholder || !has_primary;

        if is_primary {
            for existing in tables.images.values_mut() {
                if existing.listing == listing {
                    existing.is_primary = false;
                }
            }
        }

        let stored = ListingImage {
            id: ImageId(tables.next_id()),
            listing,
            image,
            is_primary,
            uploaded_at: at,
        };
        tables.images.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn images(&self, listing: ListingId) -> Result<Vec<ListingImage>, RepositoryError> {
        Ok(self
            .lock()?
            .images
            .values()
            .filter(|image| image.listing == listing)
            .cloned()
            .collect())
    }
}

impl BookingLedger for InMemoryRentalStore {
    fn create_booking(
        &self,
        booking: NewBooking,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> Result<(Booking, Payment), RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.listings.contains_key(&booking.listing)
            || !tables.profiles.contains_key(&booking.tenant)
        {
            return Err(RepositoryError::NotFound);
        }

        let stored = Booking {
            id: BookingId(tables.next_id()),
            listing: booking.listing,
            tenant: booking.tenant,
            start_date: booking.start_date,
            end_date: booking.end_date,
            status: BookingStatus::Pending,
            version: 1,
            created_at: at,
            updated_at: at,
        };
        let payment = Payment {
            id: PaymentId(tables.next_id()),
            booking: stored.id,
            amount,
            status: PaymentStatus::Pending,
            transaction_id: None,
            payment_date: at,
        };

        tables.bookings.insert(stored.id, stored.clone());
        tables.payments.insert(payment.id, payment.clone());
        Ok((stored, payment))
    }

    fn booking(&self, id: BookingId) -> Result<Option<Booking>, RepositoryError> {
        Ok(self.lock()?.bookings.get(&id).cloned())
    }

    fn bookings_for_tenant(&self, tenant: ProfileId) -> Result<Vec<Booking>, RepositoryError> {
        Ok(self
            .lock()?
            .bookings
            .values()
            .filter(|booking| booking.tenant == tenant)
            .cloned()
            .collect())
    }

    fn bookings_for_listings(
        &self,
        listings: &[ListingId],
    ) -> Result<Vec<Booking>, RepositoryError> {
        Ok(self
            .lock()?
            .bookings
            .values()
            .filter(|booking| listings.contains(&booking.listing))
            .cloned()
            .collect())
    }

    fn commit_booking_transition(
        &self,
        transition: BookingTransition,
    ) -> Result<Booking, RepositoryError> {
        let BookingTransition {
            mut booking,
            expected_version,
            payment,
        } = transition;

        let mut tables = self.lock()?;
        let current = tables
            .bookings
            .get(&booking.id)
            .ok_or(RepositoryError::NotFound)?;
        if current.version != expected_version {
            return Err(RepositoryError::Conflict);
        }
        if let Some(payment) = &payment {
            if payment.booking != booking.id || !tables.payments.contains_key(&payment.id) {
                return Err(RepositoryError::NotFound);
            }
        }

        booking.version = expected_version + 1;
        tables.bookings.insert(booking.id, booking.clone());
        if let Some(payment) = payment {
            tables.payments.insert(payment.id, payment);
        }
        Ok(booking)
    }

    fn delete_booking(&self, id: BookingId) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.bookings.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        tables.drop_booking(id);
        Ok(())
    }

    fn payment_for_booking(&self, booking: BookingId) -> Result<Option<Payment>, RepositoryError> {
        Ok(self
            .lock()?
            .payments
            .values()
            .find(|payment| payment.booking == booking)
            .cloned())
    }

    fn update_payment(
        &self,
        payment: Payment,
        expected: PaymentStatus,
    ) -> Result<Payment, RepositoryError> {
        let mut tables = self.lock()?;
        let slot = tables
            .payments
            .get_mut(&payment.id)
            .ok_or(RepositoryError::NotFound)?;
        if slot.status != expected {
            return Err(RepositoryError::Conflict);
        }
        *slot = payment.clone();
        Ok(payment)
    }
}

impl FeedbackStore for InMemoryRentalStore {
    fn insert_review(
        &self,
        review: NewReview,
        at: DateTime<Utc>,
    ) -> Result<Review, RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.listings.contains_key(&review.listing) {
            return Err(RepositoryError::NotFound);
        }

        let stored = Review {
            id: ReviewId(tables.next_id()),
            listing: review.listing,
            author: review.author,
            rating: review.rating,
            comment: review.comment,
            created_at: at,
        };
        tables.reviews.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn reviews_for_listing(&self, listing: ListingId) -> Result<Vec<Review>, RepositoryError> {
        Ok(self
            .lock()?
            .reviews
            .values()
            .filter(|review| review.listing == listing)
            .cloned()
            .collect())
    }

    fn insert_complaint(
        &self,
        complaint: NewComplaint,
        at: DateTime<Utc>,
    ) -> Result<Complaint, RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.listings.contains_key(&complaint.listing) {
            return Err(RepositoryError::NotFound);
        }

        let stored = Complaint {
            id: ComplaintId(tables.next_id()),
            listing: complaint.listing,
            tenant: complaint.tenant,
            title: complaint.title,
            description: complaint.description,
            status: ComplaintStatus::Pending,
            created_at: at,
            updated_at: at,
        };
        tables.complaints.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn complaint(&self, id: ComplaintId) -> Result<Option<Complaint>, RepositoryError> {
        Ok(self.lock()?.complaints.get(&id).cloned())
    }

    fn complaints_for_listing(
        &self,
        listing: ListingId,
    ) -> Result<Vec<Complaint>, RepositoryError> {
        Ok(self
            .lock()?
            .complaints
            .values()
            .filter(|complaint| complaint.listing == listing)
            .cloned()
            .collect())
    }

    fn update_complaint(
        &self,
        complaint: Complaint,
        expected: ComplaintStatus,
    ) -> Result<Complaint, RepositoryError> {
        let mut tables = self.lock()?;
        let slot = tables
            .complaints
            .get_mut(&complaint.id)
            .ok_or(RepositoryError::NotFound)?;
        if slot.status != expected {
            return Err(RepositoryError::Conflict);
        }
        *slot = complaint.clone();
        Ok(complaint)
    }
}

impl InboxStore for InMemoryRentalStore {
    fn insert_notification(
        &self,
        notification: OutboundNotification,
        at: DateTime<Utc>,
    ) -> Result<Notification, RepositoryError> {
        let mut tables = self.lock()?;
        let stored = Notification {
            id: NotificationId(tables.next_id()),
            recipient: notification.recipient,
            title: notification.title,
            message: notification.message,
            is_read: false,
            created_at: at,
        };
        tables.notifications.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn notification(&self, id: NotificationId) -> Result<Option<Notification>, RepositoryError> {
        Ok(self.lock()?.notifications.get(&id).cloned())
    }

    fn notifications_for(
        &self,
        recipient: IdentityId,
    ) -> Result<Vec<Notification>, RepositoryError> {
        Ok(self
            .lock()?
            .notifications
            .values()
            .filter(|notification| notification.recipient == recipient)
            .cloned()
            .collect())
    }

    fn mark_notification_read(&self, id: NotificationId) -> Result<Notification, RepositoryError> {
        let mut tables = self.lock()?;
        let slot = tables
            .notifications
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        slot.is_read = true;
        Ok(slot.clone())
    }
}

/// Blob storage held in memory, addressed by `property_images/<n>`.
#[derive(Debug, Default, Clone)]
pub struct InMemoryBlobStore {
    blobs: Arc<Mutex<HashMap<ImageRef, Vec<u8>>>>,
}

impl BlobStore for InMemoryBlobStore {
    fn store(&self, blob: Vec<u8>) -> Result<ImageRef, BlobError> {
        if blob.is_empty() {
            return Err(BlobError::Empty);
        }
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| BlobError::Unavailable("blob lock poisoned".to_string()))?;
        let reference = ImageRef(format!("property_images/{}", blobs.len() + 1));
        blobs.insert(reference.clone(), blob);
        Ok(reference)
    }

    fn retrieve(&self, reference: &ImageRef) -> Result<Vec<u8>, BlobError> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|_| BlobError::Unavailable("blob lock poisoned".to_string()))?;
        blobs
            .get(reference)
            .cloned()
            .ok_or_else(|| BlobError::Missing(reference.0.clone()))
    }
}
