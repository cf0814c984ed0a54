//! Rental marketplace core: profiles, listings, bookings with their payments, feedback,
//! and the notification inbox.

pub mod actor;
pub mod domain;
pub mod error;
pub mod lifecycle;
pub mod memory;
pub mod notifications;
pub mod repository;
pub mod router;
pub mod service;

pub use actor::Actor;
pub use domain::*;
pub use error::RentalError;
pub use lifecycle::{
    BookingEvent, BookingStatus, ComplaintEvent, ComplaintStatus, PaymentEvent, PaymentStatus,
    TransitionRejected,
};
pub use memory::{InMemoryBlobStore, InMemoryRentalStore};
pub use notifications::{InlineNotifier, NotificationSink, NotificationWorker, QueuedNotifier};
pub use repository::{
    BlobError, BlobStore, BookingLedger, BookingTransition, Clock, FeedbackStore, FixedClock,
    InboxStore, ListingStore, ProfileStore, RentalRepository, RepositoryError, SystemClock,
};
pub use router::{rental_router, CurrentIdentity, IDENTITY_HEADER};
pub use service::{BookingView, LandlordDashboard, ListingDetail, ListingQuery, RentalService};

#[cfg(test)]
mod tests;
