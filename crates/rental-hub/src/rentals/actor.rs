use serde::Serialize;

use super::domain::{Booking, IdentityId, Listing, Profile, ProfileId, Role};

/// The authenticated principal behind a request, resolved once per operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", content = "profile", rename_all = "snake_case")]
pub enum Actor {
    Landlord(Profile),
    Tenant(Profile),
}

impl Actor {
    pub fn from_profile(profile: Profile) -> Self {
        match profile.role {
            Role::Landlord => Actor::Landlord(profile),
            Role::Tenant => Actor::Tenant(profile),
        }
    }

    pub fn profile(&self) -> &Profile {
        match self {
            Actor::Landlord(profile) | Actor::Tenant(profile) => profile,
        }
    }

    pub fn profile_id(&self) -> ProfileId {
        self.profile().id
    }

    pub fn identity(&self) -> IdentityId {
        self.profile().identity
    }

    pub fn is_tenant(&self) -> bool {
        matches!(self, Actor::Tenant(_))
    }

    pub fn is_landlord(&self) -> bool {
        matches!(self, Actor::Landlord(_))
    }

    pub fn is_landlord_of(&self, listing: &Listing) -> bool {
        matches!(self, Actor::Landlord(profile) if profile.id == listing.owner)
    }

    pub fn is_tenant_of(&self, booking: &Booking) -> bool {
        matches!(self, Actor::Tenant(profile) if profile.id == booking.tenant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rentals::domain::{Bhk, ListingId};
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn profile(id: u64, role: Role) -> Profile {
        Profile {
            id: ProfileId(id),
            identity: IdentityId(id + 100),
            role,
            phone: "555-0100".to_string(),
            address: "1 Main St".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn role_drives_the_actor_variant() {
        let landlord = Actor::from_profile(profile(1, Role::Landlord));
        let tenant = Actor::from_profile(profile(2, Role::Tenant));

        assert!(landlord.is_landlord() && !landlord.is_tenant());
        assert!(tenant.is_tenant() && !tenant.is_landlord());
        assert_eq!(tenant.identity(), IdentityId(102));
    }

    #[test]
    fn a_tenant_never_owns_a_listing_even_with_a_matching_id() {
        let tenant = Actor::from_profile(profile(7, Role::Tenant));
        let now = Utc::now();
        let listing = Listing {
            id: ListingId(1),
            owner: ProfileId(7),
            title: "Loft".to_string(),
            description: "Bright".to_string(),
            address: "2 Side St".to_string(),
            price: Decimal::new(1000, 0),
            bhk: Bhk::OneBhk,
            model_type: Default::default(),
            year_built: None,
            is_available: true,
            created_at: now,
            updated_at: now,
        };

        assert!(!tenant.is_landlord_of(&listing));
    }
}
