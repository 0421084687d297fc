use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::SmtpConfig;
use crate::models::IdentityFor;
use crate::services::ServiceError;

#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Deliver a one-time code. The code must not appear in logs.
    async fn send_verification_code(
        &self,
        to_email: &str,
        code: &str,
        purpose: IdentityFor,
        ttl_minutes: i64,
    ) -> Result<(), ServiceError>;
}

#[derive(Clone)]
pub struct EmailService {
    mailer: SmtpTransport,
    from_email: String,
}

impl EmailService {
    pub fn new(config: &SmtpConfig) -> Result<Self, ServiceError> {
        let mailer = if config.user.is_empty() {
            // Unauthenticated relay (local mail catcher)
            SmtpTransport::builder_dangerous(&config.host)
                .port(config.port)
                .timeout(Some(Duration::from_secs(10)))
                .build()
        } else {
            SmtpTransport::starttls_relay(&config.host)
                .map_err(|e| ServiceError::Email(e.to_string()))?
                .credentials(Credentials::new(config.user.clone(), config.password.clone()))
                .port(config.port)
                .timeout(Some(Duration::from_secs(10)))
                .build()
        };

        tracing::info!(host = %config.host, port = config.port, "Email service initialized");

        Ok(Self {
            mailer,
            from_email: config.from.clone(),
        })
    }

    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        plain_body: String,
        html_body: String,
    ) -> Result<(), ServiceError> {
        let email = Message::builder()
            .from(
                self.from_email
                    .parse()
                    .map_err(|e: lettre::address::AddressError| ServiceError::Email(e.to_string()))?,
            )
            .to(to_email
                .parse()
                .map_err(|e: lettre::address::AddressError| ServiceError::Email(e.to_string()))?)
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
            )
            .map_err(|e| ServiceError::Email(e.to_string()))?;

        // SMTP transport is blocking
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| ServiceError::Internal(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!(to = %to_email, subject = %subject, "Email sent successfully");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, to = %to_email, "Failed to send email");
                Err(ServiceError::Email(e.to_string()))
            }
        }
    }
}

fn subject_for(purpose: IdentityFor) -> &'static str {
    match purpose {
        IdentityFor::PasswordReset => "Your password reset code",
    }
}

#[async_trait]
impl EmailProvider for EmailService {
    async fn send_verification_code(
        &self,
        to_email: &str,
        code: &str,
        purpose: IdentityFor,
        ttl_minutes: i64,
    ) -> Result<(), ServiceError> {
        let html_body = format!(
            r#"<html>
                <body style="font-family: Arial, sans-serif;">
                    <h2>{subject}</h2>
                    <p>Use the code below to continue:</p>
                    <p style="font-size: 28px; letter-spacing: 6px; font-weight: bold;">{code}</p>
                    <p style="color: #666; font-size: 12px;">
                        This code expires in {ttl} minutes. If you didn't request it, please ignore this email.
                    </p>
                </body>
            </html>"#,
            subject = subject_for(purpose),
            code = code,
            ttl = ttl_minutes
        );

        let plain_body = format!(
            "{}\n\nYour code is: {}\n\nThis code expires in {} minutes. If you didn't request it, please ignore this email.",
            subject_for(purpose),
            code,
            ttl_minutes
        );

        self.send_email(to_email, subject_for(purpose), plain_body, html_body)
            .await
    }
}

/// Message captured by [`MockEmailService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub to: String,
    pub code: String,
    pub purpose: IdentityFor,
}

/// Records messages instead of delivering them.
#[derive(Clone, Default)]
pub struct MockEmailService {
    sent: Arc<Mutex<Vec<SentEmail>>>,
}

impl MockEmailService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn last_code_for(&self, to_email: &str) -> Option<String> {
        self.sent()
            .into_iter()
            .rev()
            .find(|m| m.to == to_email)
            .map(|m| m.code)
    }
}

#[async_trait]
impl EmailProvider for MockEmailService {
    async fn send_verification_code(
        &self,
        to_email: &str,
        code: &str,
        purpose: IdentityFor,
        _ttl_minutes: i64,
    ) -> Result<(), ServiceError> {
        self.sent
            .lock()
            .map_err(|_| ServiceError::Email("mock mailbox poisoned".to_string()))?
            .push(SentEmail {
                to: to_email.to_string(),
                code: code.to_string(),
                purpose,
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_service_creation() {
        let config = SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            user: "mailer@example.com".to_string(),
            password: "test_password".to_string(),
            from: "no-reply@example.com".to_string(),
        };

        assert!(EmailService::new(&config).is_ok());
    }

    #[tokio::test]
    async fn mock_records_codes() {
        let mock = MockEmailService::new();
        mock.send_verification_code("a@b.com", "123456", IdentityFor::PasswordReset, 15)
            .await
            .unwrap();

        assert_eq!(mock.last_code_for("a@b.com"), Some("123456".to_string()));
        assert_eq!(mock.last_code_for("c@d.com"), None);
    }
}
