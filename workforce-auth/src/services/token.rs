//! Opaque random tokens for sessions, magic links and invitations.

use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};

pub const SESSION_TOKEN_LENGTH: usize = 64;
pub const MAGIC_LINK_TOKEN_LENGTH: usize = 64;
/// 32 alphanumeric characters carry about 190 bits.
pub const INVITATION_TOKEN_LENGTH: usize = 32;

/// `len` characters drawn uniformly from `[A-Za-z0-9]` using the OS CSPRNG.
pub fn generate_token(len: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

pub fn generate_session_token() -> String {
    generate_token(SESSION_TOKEN_LENGTH)
}

pub fn generate_magic_link_token() -> String {
    generate_token(MAGIC_LINK_TOKEN_LENGTH)
}

pub fn generate_invitation_token() -> String {
    generate_token(INVITATION_TOKEN_LENGTH)
}
