use anyhow::{Context, Result};
use serde_json::json;
use tracing::debug;

/// Credentials for the transactional mail provider.
#[derive(Clone, Debug)]
pub struct MailConfig {
    pub base_url: String,
    pub api_key: String,
    /// Sender address stamped on every message
    pub sender: String,
}

impl MailConfig {
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("MAIL_API_URL").ok()?;
        let api_key = std::env::var("MAIL_API_KEY").ok()?;
        let sender = std::env::var("MAIL_SENDER").ok()?;
        Some(Self {
            base_url,
            api_key,
            sender,
        })
    }
}

/// Thin client for the transactional mail provider. Every send is
/// best-effort: a failure never rolls back database state, callers log
/// and move on.
#[derive(Clone, Debug)]
pub struct MailClient {
    http: reqwest::Client,
    config: Option<MailConfig>,
}

impl MailClient {
    pub fn new(config: Option<MailConfig>) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Notifies an owner that a student asked for details on a listing.
    pub async fn booking_request(
        &self,
        to: &str,
        accommodation_name: &str,
        student_phone: &str,
        message: &str,
    ) -> Result<()> {
        self.send(
            to,
            "New booking request",
            json!({
                "template": "booking_request",
                "accommodation": accommodation_name,
                "student_phone": student_phone,
                "message": message,
            }),
        )
        .await
    }

    /// Notifies an owner that their account has been approved.
    pub async fn owner_approved(&self, to: &str, company_name: Option<&str>) -> Result<()> {
        self.send(
            to,
            "Your owner account is approved",
            json!({
                "template": "owner_approved",
                "company": company_name,
            }),
        )
        .await
    }

    async fn send(&self, to: &str, subject: &str, fields: serde_json::Value) -> Result<()> {
        let Some(config) = self.config.as_ref() else {
            debug!("mail provider not configured, skipping '{}'", subject);
            return Ok(());
        };

        self.http
            .post(format!("{}/v1/send", config.base_url))
            .bearer_auth(&config.api_key)
            .json(&json!({
                "from": config.sender,
                "to": to,
                "subject": subject,
                "fields": fields,
            }))
            .send()
            .await
            .context("mail send request failed")?
            .error_for_status()
            .context("mail provider rejected the message")?;

        Ok(())
    }
}
