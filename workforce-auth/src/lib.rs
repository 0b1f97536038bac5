pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use service_core::axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use service_core::middleware::{
    create_ip_rate_limiter, ip_rate_limit_middleware, request_id_middleware,
    security_headers_middleware, IpRateLimiter, REQUEST_ID_HEADER,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{AuthConfig, SwaggerMode};
use crate::services::{
    AuthStore, EmailProvider, InvitationService, MagicLinkService, SessionService, UserDirectory,
};
use service_core::error::AppError;

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::auth::magic_link::request_magic_link,
        handlers::auth::magic_link::verify_magic_link,
        handlers::auth::me::get_me,
        handlers::invitation::issue_invitation,
        handlers::invitation::validate_invitation,
        handlers::invitation::accept_invitation,
        handlers::employee::create_employee,
        handlers::employee::list_employees,
        handlers::admin::companies::list_companies,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::auth::MagicLinkRequest,
            dtos::auth::MagicLinkRequestResponse,
            dtos::auth::VerifyMagicLinkRequest,
            dtos::invitation::IssueInvitationRequest,
            dtos::invitation::InvitationResponse,
            dtos::employee::CreateEmployeeRequest,
            dtos::employee::CreateEmployeeResponse,
            dtos::employee::EmployeeResponse,
            dtos::admin::CompanyResponse,
            services::MagicLinkLogin,
            services::UserProfile,
            services::InvitationPreview,
            services::AcceptedInvitation,
            models::AuthenticatedUser,
            models::Role,
            models::InvitationState,
            models::UserInvitationStatus,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Magic-link sign-in and the current session"),
        (name = "Invitations", description = "Invitation issue, preview and acceptance"),
        (name = "Employees", description = "Company user provisioning"),
        (name = "Admin", description = "Platform administration"),
        (name = "Observability", description = "Service health and monitoring"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("opaque")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: AuthConfig,
    pub store: Arc<dyn AuthStore>,
    pub email: Arc<dyn EmailProvider>,
    pub directory: UserDirectory,
    pub sessions: SessionService,
    pub magic_links: MagicLinkService,
    pub invitations: InvitationService,
    pub magic_link_rate_limiter: IpRateLimiter,
    pub ip_rate_limiter: IpRateLimiter,
}

impl AppState {
    /// Wire the services over a store and an email provider.
    pub fn new(
        config: AuthConfig,
        store: Arc<dyn AuthStore>,
        email: Arc<dyn EmailProvider>,
    ) -> Self {
        let directory = UserDirectory::new(store.clone());
        let sessions = SessionService::new(store.clone());
        let frontend_url = config.app.frontend_url.clone();

        let magic_links = MagicLinkService::new(
            store.clone(),
            directory.clone(),
            sessions.clone(),
            email.clone(),
            frontend_url.clone(),
        );
        let invitations = InvitationService::new(
            store.clone(),
            directory.clone(),
            sessions.clone(),
            email.clone(),
            frontend_url,
        );

        let magic_link_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.magic_link_attempts,
            config.rate_limit.magic_link_window_seconds,
        );
        let ip_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.global_ip_limit,
            config.rate_limit.global_ip_window_seconds,
        );

        Self {
            config,
            store,
            email,
            directory,
            sessions,
            magic_links,
            invitations,
            magic_link_rate_limiter,
            ip_rate_limiter,
        }
    }
}

/// Health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service and database are reachable"),
        (status = 503, description = "Database unreachable")
    ),
    tag = "Observability"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "healthy",
                "service": state.config.service_name,
                "version": state.config.service_version,
            })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "status": "unhealthy" })),
            )
        }
    }
}

pub async fn build_router(state: AppState) -> Result<Router, AppError> {
    let magic_link_route = Router::new()
        .route(
            "/auth/magic-link",
            post(handlers::auth::request_magic_link),
        )
        .layer(from_fn_with_state(
            state.magic_link_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let mut app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics));

    app = match state.config.swagger.enabled {
        SwaggerMode::Public => {
            app.merge(SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()))
        }
        SwaggerMode::Disabled => app.route(
            "/.well-known/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        ),
    };

    let app = app
        .merge(magic_link_route)
        .route(
            "/auth/magic-link/verify",
            post(handlers::auth::verify_magic_link),
        )
        .route("/auth/me", get(handlers::auth::get_me))
        .route("/invitations", post(handlers::issue_invitation))
        .route("/invitations/:token", get(handlers::validate_invitation))
        .route(
            "/invitations/:token/accept",
            post(handlers::accept_invitation),
        )
        .route("/employees", post(handlers::create_employee))
        .route(
            "/companies/:company_id/employees",
            get(handlers::list_employees),
        )
        .route("/admin/companies", get(handlers::admin::list_companies))
        .route_layer(from_fn(middleware::metrics_middleware))
        .layer(from_fn_with_state(state.clone(), middleware::auth_middleware))
        .with_state(state.clone())
        .layer(from_fn_with_state(
            state.ip_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &service_core::axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri().path(),
                    user_id = tracing::field::Empty,
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer(&state.config)?);

    Ok(app)
}

fn cors_layer(config: &AuthConfig) -> Result<CorsLayer, AppError> {
    let origins = config
        .security
        .allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(origin = %o, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect::<Vec<HeaderValue>>();

    let auth_header = HeaderName::from_bytes(config.security.auth_header_name.as_bytes())
        .map_err(|e| AppError::ConfigError(anyhow::anyhow!("AUTH_HEADER_NAME: {}", e)))?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, auth_header]))
}
