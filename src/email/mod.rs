//! Outgoing emails and how they get delivered.
//!
//! Sending is best-effort everywhere: [`Notifier::send`] reports success as a
//! flag and logs failures instead of returning them.

use std::sync::Arc;

use anyhow::Context;
use askama::Template;
use mailgun_v3::email::{self, Message, MessageBody};
use mailgun_v3::{Credentials, EmailAddress};
use tracing::{info, warn};

pub mod account;
pub mod application;
pub mod contact;

pub const ASSOCIATION_NAME: &str = "Nigerian Association of Urological Surgeons";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recipient {
    pub name: Option<String>,
    pub address: String,
}

impl Recipient {
    pub fn named(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            address: address.into(),
        }
    }

    pub fn address(address: impl Into<String>) -> Self {
        Self {
            name: None,
            address: address.into(),
        }
    }
}

pub trait Email: Template {
    /// A short name for the template, used in logs.
    fn kind(&self) -> &'static str;
    fn subject(&self) -> String;
    fn recipient(&self) -> Recipient;
}

/// A rendered email, ready to hand to a [`Mailer`].
#[derive(Clone, Debug)]
pub struct OutgoingEmail {
    pub kind: &'static str,
    pub to: Recipient,
    pub subject: String,
    pub html: String,
}

impl OutgoingEmail {
    pub fn render(email: &impl Email) -> anyhow::Result<Self> {
        Ok(Self {
            kind: email.kind(),
            to: email.recipient(),
            subject: email.subject(),
            html: email.render().context("Failed to render email")?,
        })
    }
}

#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn deliver(&self, email: &OutgoingEmail) -> anyhow::Result<()>;
}

pub struct MailgunMailer {
    credentials: Credentials,
    sender: EmailAddress,
}

impl MailgunMailer {
    pub fn new(token: &str, domain: &str, sender_name: &str, sender_address: &str) -> Self {
        Self {
            credentials: Credentials::new(token, domain),
            sender: EmailAddress::name_address(sender_name, sender_address),
        }
    }
}

#[async_trait::async_trait]
impl Mailer for MailgunMailer {
    async fn deliver(&self, email: &OutgoingEmail) -> anyhow::Result<()> {
        let to = match &email.to.name {
            Some(name) => EmailAddress::name_address(name, &email.to.address),
            None => EmailAddress::address(&email.to.address),
        };
        let message = Message {
            to: vec![to],
            subject: email.subject.clone(),
            body: MessageBody::Html(email.html.clone()),
            ..Default::default()
        };

        email::async_impl::send_email(&self.credentials, &self.sender, message)
            .await
            .map(|_| ())
            .map_err(|err| anyhow::anyhow!("Failed to send email: {err}"))
    }
}

/// Writes emails to the log instead of sending them. Used when no Mailgun
/// token is configured.
pub struct LogMailer;

#[async_trait::async_trait]
impl Mailer for LogMailer {
    async fn deliver(&self, email: &OutgoingEmail) -> anyhow::Result<()> {
        info!(
            kind = email.kind,
            to = %email.to.address,
            subject = %email.subject,
            "email not sent, no mailer configured"
        );

        Ok(())
    }
}

#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    /// Renders and delivers the email. Never fails; returns whether it was sent.
    pub async fn send(&self, email: impl Email + Send) -> bool {
        let message = match OutgoingEmail::render(&email) {
            Ok(message) => message,
            Err(error) => {
                warn!(kind = email.kind(), error = ?error, "failed to render email");
                return false;
            }
        };
        drop(email);

        match self.mailer.deliver(&message).await {
            Ok(()) => true,
            Err(error) => {
                warn!(
                    kind = message.kind,
                    to = %message.to.address,
                    error = ?error,
                    "failed to send email"
                );
                false
            }
        }
    }
}
