//! HTTP handlers for workforce-auth.

pub mod admin;
pub mod auth;
pub mod employee;
pub mod invitation;
pub mod metrics;

pub use employee::{create_employee, list_employees};
pub use invitation::{accept_invitation, issue_invitation, validate_invitation};
