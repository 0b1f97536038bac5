//! Bearer session resolution and role checks.
//!
//! [`auth_middleware`] resolves the caller once per request and stores the
//! result (possibly anonymous) in the request extensions. Handlers pull it out
//! with [`CurrentUser`] and call [`require_role`] before doing anything else.

use service_core::axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;
use thiserror::Error;

use crate::models::{AuthenticatedUser, Role};
use crate::services::ServiceError;
use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthzError {
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("forbidden")]
    Forbidden,
}

impl From<AuthzError> for AppError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Unauthenticated => AppError::Unauthorized(anyhow::anyhow!(err.to_string())),
            AuthzError::Forbidden => AppError::Forbidden(anyhow::anyhow!(err.to_string())),
        }
    }
}

/// Pull the token out of `Bearer <token>`.
///
/// Reads `header_name` first and falls back to `Authorization`. The value must
/// be exactly two whitespace-separated parts; the scheme is case-insensitive.
pub fn extract_bearer_token<'a>(headers: &'a HeaderMap, header_name: &str) -> Option<&'a str> {
    let value = headers
        .get(header_name)
        .or_else(|| headers.get(header::AUTHORIZATION))?
        .to_str()
        .ok()?;

    let mut parts = value.split_whitespace();
    let scheme = parts.next()?;
    let token = parts.next()?;
    if parts.next().is_some() || !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token)
}

/// Resolve the caller behind the request's bearer token, if any.
///
/// Missing or malformed headers and unknown or expired sessions resolve to
/// `None`. So does a session whose email no longer belongs to the user it was
/// opened for.
pub async fn resolve_user(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<AuthenticatedUser>, ServiceError> {
    let Some(token) = extract_bearer_token(headers, &state.config.security.auth_header_name) else {
        return Ok(None);
    };

    let Some(session) = state.sessions.validate(token).await? else {
        return Ok(None);
    };

    let Some(entry) = state.directory.lookup(&session.email).await? else {
        tracing::warn!(session_id = %session.id, "Session owner no longer exists");
        return Ok(None);
    };

    // The address may have moved to another user since the session was opened.
    if entry.identity.id() != session.user_id {
        tracing::warn!(
            session_id = %session.id,
            session_user_id = %session.user_id,
            "Session email now belongs to a different user"
        );
        return Ok(None);
    }

    Ok(Some(AuthenticatedUser::from_identity(
        &entry.identity,
        &session,
    )))
}

/// Resolve the caller and attach a [`CurrentUser`] to the request.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = resolve_user(&state, req.headers()).await?;
    if let Some(user) = &user {
        tracing::Span::current().record("user_id", user.id.as_str());
    }
    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}

/// The resolved caller, `None` for anonymous requests.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<AuthenticatedUser>);

impl CurrentUser {
    /// Shorthand for [`require_role`] on the wrapped user.
    pub fn require(&self, allowed: &[Role]) -> Result<&AuthenticatedUser, AuthzError> {
        require_role(self.0.as_ref(), allowed)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<CurrentUser>().cloned().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "auth middleware did not run for this route"
            ))
        })
    }
}

/// Role gate. Admins pass every check; everyone else must hold a role in
/// `allowed`. Pass the narrowest list the operation needs.
pub fn require_role<'a>(
    user: Option<&'a AuthenticatedUser>,
    allowed: &[Role],
) -> Result<&'a AuthenticatedUser, AuthzError> {
    let user = user.ok_or(AuthzError::Unauthenticated)?;
    if user.role == Role::Admin {
        return Ok(user);
    }
    if !allowed.contains(&user.role) {
        return Err(AuthzError::Forbidden);
    }
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use service_core::axum::http::HeaderValue;

    fn user(role: Role) -> AuthenticatedUser {
        AuthenticatedUser {
            id: "u1".into(),
            email: "u1@acme.test".into(),
            first_name: "U".into(),
            last_name: "One".into(),
            role,
            company_id: Some("c1".into()),
            user_type: role,
        }
    }

    fn role_lists() -> Vec<Vec<Role>> {
        vec![
            vec![],
            vec![Role::Manager],
            vec![Role::Employee],
            vec![Role::Manager, Role::Employee],
            vec![Role::Admin],
        ]
    }

    #[test]
    fn admin_passes_every_role_list() {
        let admin = user(Role::Admin);
        for allowed in role_lists() {
            assert!(require_role(Some(&admin), &allowed).is_ok(), "{:?}", allowed);
        }
    }

    #[test]
    fn non_admin_passes_iff_member() {
        for role in [Role::Manager, Role::Employee] {
            let u = user(role);
            for allowed in role_lists() {
                let result = require_role(Some(&u), &allowed);
                if allowed.contains(&role) {
                    assert!(result.is_ok());
                } else {
                    assert_eq!(result.unwrap_err(), AuthzError::Forbidden);
                }
            }
        }
    }

    #[test]
    fn anonymous_is_unauthenticated() {
        assert_eq!(
            require_role(None, &[Role::Employee]).unwrap_err(),
            AuthzError::Unauthenticated
        );
    }

    fn headers(name: &'static str, value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        let h = headers("authorization", "bEaReR abc123");
        assert_eq!(extract_bearer_token(&h, "authorization"), Some("abc123"));
    }

    #[test]
    fn bearer_must_have_exactly_two_parts() {
        for value in ["Bearer", "Bearer a b", "Basic abc", "abc"] {
            let h = headers("authorization", value);
            assert_eq!(extract_bearer_token(&h, "authorization"), None, "{}", value);
        }
    }

    #[test]
    fn custom_header_wins_then_falls_back() {
        let mut h = headers("x-session-token", "Bearer custom");
        h.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer standard"));
        assert_eq!(extract_bearer_token(&h, "x-session-token"), Some("custom"));

        let h = headers("authorization", "Bearer standard");
        assert_eq!(extract_bearer_token(&h, "x-session-token"), Some("standard"));
    }
}
