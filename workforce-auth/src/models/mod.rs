pub mod company;
pub mod invitation;
pub mod magic_link;
pub mod role;
pub mod session;
pub mod user;

pub use company::Company;
pub use invitation::{Invitation, InvitationState, NewInvitation, INVITATION_TTL_DAYS};
pub use magic_link::{MagicLink, MAGIC_LINK_TTL_MINUTES};
pub use role::Role;
pub use session::{Session, SESSION_TTL_DAYS};
pub use user::{AdminRecord, AuthenticatedUser, CompanyUser, Identity, UserInvitationStatus};
