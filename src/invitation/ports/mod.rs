//! Port contracts for invitation persistence.

pub mod repository;

pub use repository::{
    InvitationAcceptance, InvitationRepository, InvitationRepositoryError,
    InvitationRepositoryResult,
};
