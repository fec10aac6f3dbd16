// ==============================================================================
// mailer.rs - Outgoing Email
// ==============================================================================
// Description: Contact-form and welcome emails over SMTP (or logged in dev)
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use askama::Template;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

use crate::config::MailerConfig;
use crate::models::ContactRequest;
use crate::users::User;

// ==============================================================================
// TEMPLATES
// ==============================================================================

const CONTACT_TEXT: &str = "New message from {{name}} <{{email}}>\n\
Received {{received_at}}\n\
\n\
Subject: {{subject}}\n\
\n\
{{message}}\n";

const WELCOME_TEXT: &str = "Hi {{name}},\n\
\n\
Your account ({{email}}) was created on {{created_at}}.\n";

/// HTML part of the contact email; askama escapes every field
#[derive(Template)]
#[template(path = "email/contact.html")]
struct ContactHtml<'a> {
    name: &'a str,
    email: &'a str,
    subject: &'a str,
    message: &'a str,
    received_at: &'a str,
}

#[derive(Template)]
#[template(path = "email/welcome.html")]
struct WelcomeHtml<'a> {
    name: &'a str,
    email: &'a str,
    created_at: &'a str,
}

/// Replace `{{variable}}` placeholders; unknown placeholders are left as-is
pub fn render_template(template: &str, variables: &HashMap<&str, String>) -> String {
    let mut result = template.to_string();

    for (key, value) in variables {
        let placeholder = format!("{{{{{}}}}}", key);
        result = result.replace(&placeholder, value);
    }

    result
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%B %d, %Y at %I:%M %p UTC").to_string()
}

// ==============================================================================
// MESSAGES
// ==============================================================================

/// Transport-independent email
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMail {
    pub to: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

/// Contact-form submission addressed to the configured inbox
pub fn contact_message(
    inbox: &str,
    request: &ContactRequest,
    received_at: DateTime<Utc>,
) -> Result<OutgoingMail, MailError> {
    let name = request.name.trim();
    let email = request.email.trim();
    let subject = request.subject.trim();
    let received_at = format_datetime(&received_at);

    let variables: HashMap<&str, String> = [
        ("name", name.to_string()),
        ("email", email.to_string()),
        ("subject", subject.to_string()),
        ("message", request.message.clone()),
        ("received_at", received_at.clone()),
    ]
    .into_iter()
    .collect();

    let html_body = ContactHtml {
        name,
        email,
        subject,
        message: &request.message,
        received_at: &received_at,
    }
    .render()?;

    Ok(OutgoingMail {
        to: inbox.to_string(),
        reply_to: Some(email.to_string()),
        subject: format!("[Contact] {}", subject),
        text_body: render_template(CONTACT_TEXT, &variables),
        html_body,
    })
}

pub fn welcome_message(user: &User) -> Result<OutgoingMail, MailError> {
    let created_at = format_datetime(&user.created_at);

    let variables: HashMap<&str, String> = [
        ("name", user.name.clone()),
        ("email", user.email.clone()),
        ("created_at", created_at.clone()),
    ]
    .into_iter()
    .collect();

    let html_body = WelcomeHtml {
        name: &user.name,
        email: &user.email,
        created_at: &created_at,
    }
    .render()?;

    Ok(OutgoingMail {
        to: user.email.clone(),
        reply_to: None,
        subject: "Welcome aboard".to_string(),
        text_body: render_template(WELCOME_TEXT, &variables),
        html_body,
    })
}

// ==============================================================================
// TRANSPORTS
// ==============================================================================

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address {address:?}: {source}")]
    Address {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("failed to render template: {0}")]
    Template(#[from] askama::Error),

    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

/// Delivery through an SMTP relay
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn from_config(config: &MailerConfig, host: &str) -> Result<Self> {
        let from = format!("{} <{}>", config.from_name, config.from_email)
            .parse::<Mailbox>()
            .context("Failed to parse from address")?;

        let builder = if config.smtp_use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .with_context(|| format!("Failed to configure SMTP relay {}", host))?
        } else {
            // Plaintext for an internal relay (e.g. local mail bridge)
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        };

        let builder = match (&config.smtp_username, &config.smtp_password) {
            (Some(username), Some(password)) => {
                builder.credentials(Credentials::new(username.clone(), password.clone()))
            }
            _ => builder,
        };

        Ok(Self {
            transport: builder.port(config.smtp_port).build(),
            from,
        })
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse::<Mailbox>().map_err(|source| MailError::Address {
        address: address.to_string(),
        source,
    })
}

/// Assemble a multipart/alternative message
pub fn build_message(from: &Mailbox, mail: &OutgoingMail) -> Result<Message, MailError> {
    let mut builder = Message::builder()
        .from(from.clone())
        .to(parse_mailbox(&mail.to)?)
        .subject(mail.subject.clone());

    if let Some(reply_to) = &mail.reply_to {
        builder = builder.reply_to(parse_mailbox(reply_to)?);
    }

    let message = builder.multipart(
        MultiPart::alternative()
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_PLAIN)
                    .body(mail.text_body.clone()),
            )
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_HTML)
                    .body(mail.html_body.clone()),
            ),
    )?;

    Ok(message)
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let message = build_message(&self.from, &mail)?;

        match self.transport.send(message).await {
            Ok(_) => {
                info!(to = %mail.to, subject = %mail.subject, "email sent");
                Ok(())
            }
            Err(e) => {
                error!(to = %mail.to, "failed to send email: {}", e);
                Err(MailError::Smtp(e))
            }
        }
    }
}

/// Used when no SMTP host is configured; messages are validated and logged
pub struct LogMailer {
    from: Mailbox,
}

impl LogMailer {
    pub fn from_config(config: &MailerConfig) -> Result<Self> {
        let from = format!("{} <{}>", config.from_name, config.from_email)
            .parse::<Mailbox>()
            .context("Failed to parse from address")?;
        Ok(Self { from })
    }
}

#[async_trait]
impl MailTransport for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        build_message(&self.from, &mail)?;
        info!(to = %mail.to, subject = %mail.subject, "SMTP not configured, email logged only");
        Ok(())
    }
}

/// Pick the transport for `config`
pub fn transport_from_config(config: &MailerConfig) -> Result<Arc<dyn MailTransport>> {
    match &config.smtp_host {
        Some(host) => {
            info!("Email delivery via SMTP relay {}:{}", host, config.smtp_port);
            Ok(Arc::new(SmtpMailer::from_config(config, host)?))
        }
        None => Ok(Arc::new(LogMailer::from_config(config)?)),
    }
}

// ==============================================================================
// TESTS
// ==============================================================================
