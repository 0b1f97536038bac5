//! Test helper module for workforce-auth integration tests.
//!
//! Builds the real router over `MockStore` and `MockEmailService` and drives it
//! with `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt;
use workforce_auth::{
    build_router,
    config::{
        AppConfig, AuthConfig, Environment, MongoConfig, RateLimitConfig, SecurityConfig,
        SmtpConfig, SwaggerConfig, SwaggerMode,
    },
    models::{AdminRecord, Company, CompanyUser, Role, Session},
    services::{MockEmailService, MockStore, SentEmail},
    AppState,
};

pub const FRONTEND_URL: &str = "http://app.test";

pub const ACME: &str = "company-acme";
pub const GLOBEX: &str = "company-globex";
pub const ADMIN_ID: &str = "admin-1";
pub const ADMIN_EMAIL: &str = "root@platform.test";
pub const MANAGER_ID: &str = "manager-acme";
pub const MANAGER_EMAIL: &str = "mia@acme.test";
pub const GLOBEX_MANAGER_ID: &str = "manager-globex";
pub const GLOBEX_MANAGER_EMAIL: &str = "gus@globex.test";
pub const EMPLOYEE_ID: &str = "employee-acme";
pub const EMPLOYEE_EMAIL: &str = "eve@acme.test";
/// Provisioned without an email address, waiting for an invitation.
pub const NEW_HIRE_ID: &str = "new-hire-acme";

pub fn test_config() -> AuthConfig {
    AuthConfig {
        common: service_core::config::Config::default(),
        environment: Environment::Dev,
        service_name: "workforce-auth-test".to_string(),
        service_version: "0.0.0".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        mongodb: MongoConfig {
            uri: "mongodb://unused".to_string(),
            database: "unused".to_string(),
        },
        smtp: SmtpConfig {
            host: "smtp.test".to_string(),
            port: 587,
            user: String::new(),
            password: String::new(),
            from_email: "noreply@platform.test".to_string(),
            from_name: "Workforce Assessments".to_string(),
            enabled: false,
        },
        app: AppConfig {
            frontend_url: FRONTEND_URL.to_string(),
        },
        security: SecurityConfig {
            allowed_origins: vec![FRONTEND_URL.to_string()],
            auth_header_name: "authorization".to_string(),
        },
        swagger: SwaggerConfig {
            enabled: SwaggerMode::Disabled,
        },
        rate_limit: RateLimitConfig {
            magic_link_attempts: 3,
            magic_link_window_seconds: 900,
            global_ip_limit: 1000,
            global_ip_window_seconds: 60,
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MockStore>,
    pub email: Arc<MockEmailService>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(test_config(), MockEmailService::new()).await
    }

    pub async fn spawn_with_email(email: MockEmailService) -> Self {
        Self::spawn_with(test_config(), email).await
    }

    pub async fn spawn_with(config: AuthConfig, email: MockEmailService) -> Self {
        let store = Arc::new(MockStore::new());
        let email = Arc::new(email);
        seed(&store);

        let state = AppState::new(config, store.clone(), email.clone());
        let router = build_router(state.clone())
            .await
            .expect("Failed to build router");

        Self {
            router,
            state,
            store,
            email,
        }
    }

    /// Open a session for a seeded user and return its bearer token.
    pub async fn login(&self, user_id: &str, user_type: Role, email: &str) -> String {
        self.state
            .sessions
            .create(user_id, user_type, email)
            .await
            .expect("Failed to create session")
            .token
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_ID, Role::Admin, ADMIN_EMAIL).await
    }

    pub async fn manager_token(&self) -> String {
        self.login(MANAGER_ID, Role::Manager, MANAGER_EMAIL).await
    }

    pub async fn employee_token(&self) -> String {
        self.login(EMPLOYEE_ID, Role::Employee, EMPLOYEE_EMAIL).await
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("GET").uri(path);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&body).into_owned())
            })
        };
        (status, value)
    }

    /// Token carried by the link in the most recent email.
    pub fn last_emailed_token(&self) -> String {
        let link = match self.email.sent().last().expect("no email was sent") {
            SentEmail::MagicLink { link, .. } => link.clone(),
            SentEmail::Invitation { email, .. } => email.accept_link.clone(),
        };
        link.rsplit("token=")
            .next()
            .expect("link has no token")
            .to_string()
    }

    pub fn sessions_for(&self, user_id: &str) -> Vec<Session> {
        self.store.sessions_for_user(user_id)
    }
}

fn company_user(id: &str, company_id: &str, email: Option<&str>, role: Role) -> CompanyUser {
    let mut user = CompanyUser::new(
        company_id.to_string(),
        id.split('-').next().unwrap_or(id).to_string(),
        "Tester".to_string(),
        role,
    );
    user.id = id.to_string();
    user.email = email.map(str::to_string);
    user
}

fn seed(store: &MockStore) {
    let now = Utc::now();
    store.seed_company(Company {
        id: ACME.to_string(),
        name: "Acme".to_string(),
        created_at: now,
    });
    store.seed_company(Company {
        id: GLOBEX.to_string(),
        name: "Globex".to_string(),
        created_at: now,
    });
    store.seed_admin(AdminRecord {
        id: ADMIN_ID.to_string(),
        email: ADMIN_EMAIL.to_string(),
        first_name: "Root".to_string(),
        last_name: "Admin".to_string(),
        role: None,
        created_at: now,
    });
    store.seed_company_user(company_user(MANAGER_ID, ACME, Some(MANAGER_EMAIL), Role::Manager));
    store.seed_company_user(company_user(
        GLOBEX_MANAGER_ID,
        GLOBEX,
        Some(GLOBEX_MANAGER_EMAIL),
        Role::Manager,
    ));
    store.seed_company_user(company_user(EMPLOYEE_ID, ACME, Some(EMPLOYEE_EMAIL), Role::Employee));
    store.seed_company_user(company_user(NEW_HIRE_ID, ACME, None, Role::Employee));
}
