//! Application services for the invitation lifecycle.

mod lifecycle;

pub use lifecycle::{
    AcceptInvitationError, InvitationService, IssueInvitationError, ListInvitationsError,
};
