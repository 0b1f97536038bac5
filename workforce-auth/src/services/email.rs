use chrono::{DateTime, Utc};
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};
use service_core::axum::async_trait;
use service_core::error::AppError;
use std::sync::Mutex;
use std::time::Duration;

use crate::config::SmtpConfig;
use crate::models::MAGIC_LINK_TTL_MINUTES;

/// Content of an invitation email.
#[derive(Debug, Clone, PartialEq)]
pub struct InvitationEmail {
    pub employee_name: String,
    pub company_name: String,
    pub accept_link: String,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send_magic_link_email(&self, to_email: &str, link: &str) -> Result<(), AppError>;

    async fn send_invitation_email(
        &self,
        to_email: &str,
        invitation: &InvitationEmail,
    ) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct EmailService {
    mailer: SmtpTransport,
    from: Mailbox,
}

impl EmailService {
    pub fn new(config: &SmtpConfig) -> Result<Self, AppError> {
        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let mailer = SmtpTransport::starttls_relay(&config.host)
            .map_err(|e| AppError::EmailError(e.to_string()))?
            .credentials(creds)
            .port(config.port)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        let from = format!("{} <{}>", config.from_name, config.from_email)
            .parse()
            .map_err(|e: lettre::address::AddressError| AppError::ConfigError(e.into()))?;

        tracing::info!(host = %config.host, port = config.port, "Email service initialized");

        Ok(Self { mailer, from })
    }

    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        plain_body: String,
        html_body: String,
    ) -> Result<(), AppError> {
        let to: Mailbox = to_email
            .parse()
            .map_err(|e: lettre::address::AddressError| AppError::BadRequest(e.into()))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(plain_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body),
                    ),
            )?;

        // SmtpTransport is blocking
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::InternalError(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!(subject = %subject, "Email sent successfully");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, subject = %subject, "Failed to send email");
                Err(AppError::EmailError(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl EmailProvider for EmailService {
    async fn send_magic_link_email(&self, to_email: &str, link: &str) -> Result<(), AppError> {
        let html_body = format!(
            r###"<html>
    <body style="font-family: Arial, sans-serif;">
        <h2>Sign in to your assessments</h2>
        <p>Click the button below to sign in. No password needed.</p>
        <p>
            <a href="{link}" style="background-color: #2196F3; color: white; padding: 14px 20px; text-decoration: none; border-radius: 4px;">
                Sign in
            </a>
        </p>
        <p style="color: #666; font-size: 12px;">
            This link expires in {ttl} minutes and works once. If you didn't request it, you can ignore this email.
        </p>
    </body>
</html>
"###,
            link = link,
            ttl = MAGIC_LINK_TTL_MINUTES
        );

        let plain_body = format!(
            "Sign in to your assessments\n\nOpen the following link to sign in:\n\n{}\n\nThis link expires in {} minutes and works once. If you didn't request it, you can ignore this email.",
            link, MAGIC_LINK_TTL_MINUTES
        );

        self.send_email(to_email, "Your sign-in link", plain_body, html_body)
            .await
    }

    async fn send_invitation_email(
        &self,
        to_email: &str,
        invitation: &InvitationEmail,
    ) -> Result<(), AppError> {
        let expires = invitation.expires_at.format("%B %-d, %Y");

        let html_body = format!(
            r###"<html>
    <body style="font-family: Arial, sans-serif;">
        <h2>You're invited to join {company}</h2>
        <p>Hi {name},</p>
        <p>{company} has invited you to take assessments on the platform. Accept the invitation to link this email address to your account:</p>
        <p>
            <a href="{link}" style="background-color: #4CAF50; color: white; padding: 14px 20px; text-decoration: none; border-radius: 4px;">
                Accept invitation
            </a>
        </p>
        <p style="color: #666; font-size: 12px;">
            This invitation is valid until {expires}.
        </p>
    </body>
</html>
"###,
            company = invitation.company_name,
            name = invitation.employee_name,
            link = invitation.accept_link,
            expires = expires
        );

        let plain_body = format!(
            "Hi {},\n\n{} has invited you to take assessments on the platform. Accept the invitation here:\n\n{}\n\nThis invitation is valid until {}.",
            invitation.employee_name, invitation.company_name, invitation.accept_link, expires
        );

        let subject = format!("{} invited you to join", invitation.company_name);
        self.send_email(to_email, &subject, plain_body, html_body)
            .await
    }
}

/// Writes outgoing mail to the log instead of sending it. Used when SMTP is
/// disabled so local deployments can still follow sign-in and invitation links.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEmailService;

#[async_trait]
impl EmailProvider for LogEmailService {
    async fn send_magic_link_email(&self, to_email: &str, link: &str) -> Result<(), AppError> {
        tracing::debug!(to = %to_email, link = %link, "SMTP disabled, magic link not sent");
        Ok(())
    }

    async fn send_invitation_email(
        &self,
        to_email: &str,
        invitation: &InvitationEmail,
    ) -> Result<(), AppError> {
        tracing::debug!(
            to = %to_email,
            company = %invitation.company_name,
            link = %invitation.accept_link,
            "SMTP disabled, invitation not sent"
        );
        Ok(())
    }
}

/// A message captured by [`MockEmailService`].
#[derive(Debug, Clone, PartialEq)]
pub enum SentEmail {
    MagicLink { to: String, link: String },
    Invitation { to: String, email: InvitationEmail },
}

/// Test double that records messages instead of sending them. `failing()`
/// makes every send error.
#[derive(Default)]
pub struct MockEmailService {
    sent: Mutex<Vec<SentEmail>>,
    fail: bool,
}

impl MockEmailService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn record(&self, email: SentEmail) -> Result<(), AppError> {
        if self.fail {
            return Err(AppError::EmailError("mock transport failure".to_string()));
        }
        self.sent
            .lock()
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Mock email mutex poisoned: {}", e)))?
            .push(email);
        Ok(())
    }
}

#[async_trait]
impl EmailProvider for MockEmailService {
    async fn send_magic_link_email(&self, to_email: &str, link: &str) -> Result<(), AppError> {
        self.record(SentEmail::MagicLink {
            to: to_email.to_string(),
            link: link.to_string(),
        })
    }

    async fn send_invitation_email(
        &self,
        to_email: &str,
        invitation: &InvitationEmail,
    ) -> Result<(), AppError> {
        self.record(SentEmail::Invitation {
            to: to_email.to_string(),
            email: invitation.clone(),
        })
    }
}
