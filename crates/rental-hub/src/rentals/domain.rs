use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::lifecycle::{BookingStatus, ComplaintStatus, PaymentStatus};

macro_rules! surrogate_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

surrogate_id!(
    /// Stable reference handed out by the identity/session provider.
    IdentityId
);
surrogate_id!(ProfileId);
surrogate_id!(ListingId);
surrogate_id!(ImageId);
surrogate_id!(BookingId);
surrogate_id!(PaymentId);
surrogate_id!(ReviewId);
surrogate_id!(ComplaintId);
surrogate_id!(NotificationId);

/// Application role attached to an identity. Never changes after registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Landlord,
    Tenant,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Landlord => "landlord",
            Role::Tenant => "tenant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub identity: IdentityId,
    pub role: Role,
    pub phone: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

/// Profile fields accepted at registration, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProfile {
    pub identity: IdentityId,
    pub role: Role,
    pub phone: String,
    pub address: String,
}

/// Bedroom-hall-kitchen size class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bhk {
    #[serde(rename = "1BHK")]
    OneBhk,
    #[serde(rename = "2BHK")]
    TwoBhk,
    #[serde(rename = "3BHK")]
    ThreeBhk,
    #[serde(rename = "4BHK")]
    FourBhk,
}

impl Bhk {
    pub const fn label(self) -> &'static str {
        match self {
            Bhk::OneBhk => "1BHK",
            Bhk::TwoBhk => "2BHK",
            Bhk::ThreeBhk => "3BHK",
            Bhk::FourBhk => "4BHK",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    #[default]
    New,
    Old,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub owner: ProfileId,
    pub title: String,
    pub description: String,
    pub address: String,
    pub price: Decimal,
    pub bhk: Bhk,
    pub model_type: ModelType,
    pub year_built: Option<u16>,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Landlord-supplied listing fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingDraft {
    pub title: String,
    pub description: String,
    pub address: String,
    pub price: Decimal,
    pub bhk: Bhk,
    #[serde(default)]
    pub model_type: ModelType,
    #[serde(default)]
    pub year_built: Option<u16>,
}

/// Opaque reference returned by the blob store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(pub String);

pub const PLACEHOLDER_IMAGE: &str = "property_images/default_property.jpg";

impl ImageRef {
    pub fn placeholder() -> Self {
        Self(PLACEHOLDER_IMAGE.to_string())
    }

    pub fn is_placeholder(&self) -> bool {
        self.0 == PLACEHOLDER_IMAGE
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingImage {
    pub id: ImageId,
    pub listing: ListingId,
    pub image: ImageRef,
    pub is_primary: bool,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub listing: ListingId,
    pub tenant: ProfileId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: BookingStatus,
    /// Bumped on every write; updates carry the version they were computed from.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBooking {
    pub listing: ListingId,
    pub tenant: ProfileId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub booking: BookingId,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub payment_date: DateTime<Utc>,
}

/// Star rating restricted to 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Rating::new(value).ok_or_else(|| {
            format!(
                "rating must be between {} and {}, got {value}",
                Rating::MIN,
                Rating::MAX
            )
        })
    }
}

impl From<Rating> for u8 {
    fn from(value: Rating) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub listing: ListingId,
    pub author: ProfileId,
    pub rating: Rating,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReview {
    pub listing: ListingId,
    pub author: ProfileId,
    pub rating: Rating,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Complaint {
    pub id: ComplaintId,
    pub listing: ListingId,
    pub tenant: ProfileId,
    pub title: String,
    pub description: String,
    pub status: ComplaintStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewComplaint {
    pub listing: ListingId,
    pub tenant: ProfileId,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient: IdentityId,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Message waiting to be written to a recipient's inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundNotification {
    pub recipient: IdentityId,
    pub title: String,
    pub message: String,
}

impl OutboundNotification {
    pub fn new(recipient: IdentityId, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            recipient,
            title: title.into(),
            message: message.into(),
        }
    }
}
