//! Domain model for company invitations.
//!
//! An invitation moves through a monotone state machine
//! (`pending -> accepted | expired`). Expiry is evaluated lazily when an
//! invitation is read, never by a background sweep.

mod error;
mod ids;
mod invitation;
mod status;
mod token;

pub use error::{InvitationDomainError, ParseInvitationStatusError};
pub use ids::InvitationId;
pub use invitation::{Invitation, IssuedInvitation, PersistedInvitationData};
pub use status::InvitationStatus;
pub use token::{InvitationToken, TOKEN_BYTES, TokenDigest};
