//! Tenant scoping: a non-admin may only act on their own company's resources.
//!
//! Applied per operation after [`require_role`](super::require_role), against
//! the company that owns the target resource.

use crate::middleware::AuthzError;
use crate::models::AuthenticatedUser;

pub fn require_same_company(user: &AuthenticatedUser, company_id: &str) -> Result<(), AuthzError> {
    if user.is_admin() {
        return Ok(());
    }
    match user.company_id.as_deref() {
        Some(own) if own == company_id => Ok(()),
        _ => {
            tracing::warn!(
                user_id = %user.id,
                target_company = %company_id,
                "Cross-tenant access denied"
            );
            Err(AuthzError::Forbidden)
        }
    }
}
