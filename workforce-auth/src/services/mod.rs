//! Services layer for workforce-auth.
//!
//! Session, magic-link and invitation flows over the [`AuthStore`] and
//! [`EmailProvider`] seams.

pub mod directory;
mod email;
pub mod error;
pub mod invitation;
pub mod magic_link;
pub mod metrics;
pub mod session;
pub mod store;
pub mod token;

pub use directory::{DirectoryEntry, Partition, UserDirectory, LOOKUP_ORDER};
pub use email::{
    EmailProvider, EmailService, InvitationEmail, LogEmailService, MockEmailService, SentEmail,
};
pub use error::ServiceError;
pub use invitation::{AcceptedInvitation, InvitationPreview, InvitationService};
pub use magic_link::{MagicLinkLogin, MagicLinkService, UserProfile};
pub use session::SessionService;
pub use store::{AuthStore, MockStore, MongoStore};
