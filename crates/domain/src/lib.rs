//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod access_event;
mod access_grant;
mod device;

pub use access_event::{AccessEvent, AccessMethod, UserIdentifier};
pub use access_grant::{
    AccessGrant, AccessGrantId, AccessGrantParts, AccessGrantStatus, AccessGrantUpdate,
    DurationType, GrantDuration, MAX_GRANT_USERS, MAX_VALID_DURATION, NewAccessGrant,
};
pub use device::Device;
