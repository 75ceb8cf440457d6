//! Outbound messaging: the send contract plus SMTP and WhatsApp transports

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, Message, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use std::str::FromStr;
use std::time::Duration;

use crate::config::{EmailConfig, WhatsAppConfig};

/// Delivery failure reason; timeouts are ordinary failures with their
/// own message text.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct SendError(pub String);

/// Opaque fallible send. Implementations do not retry; the caller keeps
/// the delivery ledger.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), SendError>;
}

/// SMTP transport
pub struct SmtpMessenger {
    config: EmailConfig,
    timeout: Duration,
}

impl SmtpMessenger {
    pub fn new(config: EmailConfig, timeout: Duration) -> Self {
        Self { config, timeout }
    }

    fn build_message(&self, recipient: &str, subject: &str, body: &str) -> Result<Message, SendError> {
        let from_name = self.config.smtp_from_name.as_deref().unwrap_or("Motriz");
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| SendError(format!("Invalid from address: {}", e)))?;

        let to_mailbox = Mailbox::from_str(recipient)
            .map_err(|e| SendError(format!("Invalid to address: {}", e)))?;

        Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(format!(
                                r#"<html><body><pre>{}</pre></body></html>"#,
                                body.replace('\n', "<br>")
                            )),
                    ),
            )
            .map_err(|e| SendError(format!("Failed to build email: {}", e)))
    }

    fn build_transport(&self) -> Result<SmtpTransport, SendError> {
        let builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| SendError(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port)
        .timeout(Some(self.timeout));

        let builder = if let (Some(username), Some(password)) =
            (&self.config.smtp_username, &self.config.smtp_password)
        {
            builder.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            builder
        };

        Ok(builder.build())
    }
}

#[async_trait]
impl Messenger for SmtpMessenger {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), SendError> {
        let email = self.build_message(recipient, subject, body)?;
        let mailer = self.build_transport()?;
        let timeout = self.timeout;

        // lettre's SMTP transport is blocking; bound it and keep the
        // runtime free.
        let send = tokio::task::spawn_blocking(move || mailer.send(&email));
        match tokio::time::timeout(timeout, send).await {
            Err(_) => Err(SendError(format!(
                "SMTP send timed out after {}s",
                timeout.as_secs()
            ))),
            Ok(Err(e)) => Err(SendError(format!("SMTP task failed: {}", e))),
            Ok(Ok(Err(e))) => Err(SendError(format!("SMTP error: {}", e))),
            Ok(Ok(Ok(_))) => Ok(()),
        }
    }
}

/// WhatsApp Business Cloud API transport
pub struct WhatsAppMessenger {
    config: WhatsAppConfig,
    client: reqwest::Client,
}

impl WhatsAppMessenger {
    pub fn new(config: WhatsAppConfig, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    /// Strip spaces, dashes and a leading plus sign
    fn clean_phone_number(number: &str) -> String {
        number.chars().filter(|c| c.is_ascii_digit()).collect()
    }
}

#[async_trait]
impl Messenger for WhatsAppMessenger {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), SendError> {
        let url = format!(
            "{}/{}/messages",
            self.config.api_url, self.config.phone_number_id
        );
        let to = Self::clean_phone_number(recipient);

        let payload = serde_json::json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "text",
            "text": { "body": format!("{}\n\n{}", subject, body) }
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.access_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| SendError(format!("WhatsApp request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(SendError(format!(
                "WhatsApp API returned {}: {}",
                status, detail
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_phone_number() {
        assert_eq!(WhatsAppMessenger::clean_phone_number("+57 311 555-0134"), "573115550134");
        assert_eq!(WhatsAppMessenger::clean_phone_number("3115550134"), "3115550134");
    }
}
