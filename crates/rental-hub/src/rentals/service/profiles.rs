use tracing::{info, warn};

use super::{require_text, RentalService};
use crate::rentals::actor::Actor;
use crate::rentals::domain::{IdentityId, NewProfile, Profile, Role};
use crate::rentals::error::RentalError;
use crate::rentals::notifications::NotificationSink;
use crate::rentals::repository::RentalRepository;

const MAX_PHONE_LEN: usize = 15;

impl<R, N> RentalService<R, N>
where
    R: RentalRepository + 'static,
    N: NotificationSink + 'static,
{
    /// Attach a role and contact details to an identity. One profile per identity.
    pub fn register_profile(
        &self,
        identity: IdentityId,
        role: Role,
        phone: &str,
        address: &str,
    ) -> Result<Profile, RentalError> {
        require_text("phone number", phone, Some(MAX_PHONE_LEN))?;
        require_text("address", address, None)?;

        let profile = self.repository.insert_profile(
            NewProfile {
                identity,
                role,
                phone: phone.trim().to_string(),
                address: address.trim().to_string(),
            },
            self.clock.now(),
        )?;

        info!(%identity, profile = %profile.id, role = role.label(), "profile registered");
        Ok(profile)
    }

    /// Resolve the caller. An identity without a profile holds no role, so it is
    /// refused like any other actor lacking the capability.
    pub fn actor(&self, identity: IdentityId) -> Result<Actor, RentalError> {
        match self.repository.profile_by_identity(identity)? {
            Some(profile) => Ok(Actor::from_profile(profile)),
            None => {
                warn!(%identity, "identity without a profile attempted to act");
                Err(RentalError::unauthorized(
                    "a landlord or tenant profile is required",
                ))
            }
        }
    }

    /// Delete an identity's profile and everything hanging off it.
    pub fn remove_identity(&self, identity: IdentityId) -> Result<(), RentalError> {
        self.repository.remove_identity(identity)?;
        info!(%identity, "identity removed");
        Ok(())
    }
}
