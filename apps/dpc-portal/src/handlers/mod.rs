//! Invitation flow handlers: thin drivers over the invitation state machine
//! and the verification service. A web layer maps these results onto views;
//! the flows own all sequencing and guard logic.

mod ao_invitations;
mod credential_delegates;
mod invitations;

pub use ao_invitations::{AoInvitationError, AoInvitationService};
pub use credential_delegates::{CdInvitationError, CdInvitationService};
pub use invitations::{FlowError, FlowSession, FlowStage, InvitationFlows, Registration};
