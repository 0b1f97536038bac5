pub mod magic_link;
pub mod me;

pub use magic_link::{request_magic_link, verify_magic_link};
pub use me::get_me;
