pub mod auth;
pub mod metrics;
pub mod tenant;

pub use auth::{auth_middleware, require_role, resolve_user, AuthzError, CurrentUser};
pub use metrics::metrics_middleware;
pub use tenant::require_same_company;
