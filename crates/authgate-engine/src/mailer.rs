//! Outgoing mail.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use authgate_core::EngineError;
use url::Url;

/// A message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    /// Display name of the sender.
    pub sender_name: String,
    /// From address.
    pub from: String,
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub text: String,
    /// Action link embedded in the body.
    pub link: String,
}

impl OutgoingEmail {
    /// The decoded `token` query parameter of the action link, if any.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.link_param("token")
    }

    /// The decoded `email` query parameter of the action link, if any.
    #[must_use]
    pub fn link_email(&self) -> Option<String> {
        self.link_param("email")
    }

    fn link_param(&self, name: &str) -> Option<String> {
        Url::parse(&self.link)
            .ok()?
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }
}

/// Delivers outgoing mail.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one message.
    async fn send(&self, email: OutgoingEmail) -> Result<(), EngineError>;
}

/// Mailer that writes messages to the log instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), EngineError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            link = %email.link,
            "Outgoing email"
        );
        Ok(())
    }
}

/// Mailer that keeps messages in memory.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl MemoryMailer {
    /// Create an empty mailbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages sent so far.
    #[must_use]
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The most recent message sent to `to`.
    #[must_use]
    pub fn last_to(&self, to: &str) -> Option<OutgoingEmail> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|m| m.to == to)
            .cloned()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), EngineError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(to: &str, link: &str) -> OutgoingEmail {
        OutgoingEmail {
            sender_name: "AuthGate".to_string(),
            from: "noreply@example.com".to_string(),
            to: to.to_string(),
            subject: "Confirm your email".to_string(),
            text: String::new(),
            link: link.to_string(),
        }
    }

    #[test]
    fn test_token_from_link() {
        let email = message("a@b.com", "http://x/confirm?email=a%40b.com&token=abc123");
        assert_eq!(email.token().as_deref(), Some("abc123"));
        assert_eq!(email.link_email().as_deref(), Some("a@b.com"));
        assert_eq!(message("a@b.com", "http://x/confirm").token(), None);
        assert_eq!(message("a@b.com", "not a link").token(), None);
    }

    #[test]
    fn test_link_params_are_decoded() {
        let email = message("a+tag@b.com", "http://x/confirm?email=a%2Btag%40b.com&token=t");
        assert_eq!(email.link_email().as_deref(), Some("a+tag@b.com"));
    }

    #[tokio::test]
    async fn test_memory_mailer() {
        let mailer = MemoryMailer::new();
        mailer.send(message("a@b.com", "l1")).await.unwrap();
        mailer.send(message("c@d.com", "l2")).await.unwrap();
        mailer.send(message("a@b.com", "l3")).await.unwrap();

        assert_eq!(mailer.sent().len(), 3);
        assert_eq!(mailer.last_to("a@b.com").unwrap().link, "l3");
        assert!(mailer.last_to("x@y.com").is_none());
    }
}
