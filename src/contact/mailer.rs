//! Outbound mail
//!
//! [`MailTransport`] is the seam the contact pipeline sends through. The
//! production implementation, [`Mailer`], wraps either an SMTP relay or the
//! local `sendmail` binary; which one is decided once from configuration.

use crate::config::{MailConfig, SmtpSecurity, TransportKind};
use lettre::address::AddressError;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{
    Address, AsyncSendmailTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub address: String,
    pub name: String,
}

/// A rendered message ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: Recipient,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address '{address}': {source}")]
    Address {
        address: String,
        source: AddressError,
    },

    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("smtp delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("sendmail delivery failed: {0}")]
    Sendmail(#[from] lettre::transport::sendmail::Error),

    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),

    #[error("smtp transport selected but mail.smtp_host is empty")]
    MissingSmtpHost,
}

pub trait MailTransport: Send + Sync {
    fn send(&self, mail: &OutgoingMail) -> impl Future<Output = Result<(), MailError>> + Send;
}

enum Backend {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    Sendmail(AsyncSendmailTransport<Tokio1Executor>),
}

/// Configured transport plus the sender identity
pub struct Mailer {
    backend: Backend,
    from: Mailbox,
    timeout: Duration,
}

/// Resolve `auto` to a concrete transport
pub fn select_transport(cfg: &MailConfig) -> Result<TransportKind, MailError> {
    let has_host = !cfg.smtp_host.trim().is_empty();
    match cfg.transport {
        TransportKind::Auto if has_host => Ok(TransportKind::Smtp),
        TransportKind::Auto => Ok(TransportKind::Sendmail),
        TransportKind::Smtp if !has_host => Err(MailError::MissingSmtpHost),
        kind => Ok(kind),
    }
}

fn parse_address(address: &str) -> Result<Address, MailError> {
    address.parse().map_err(|source| MailError::Address {
        address: address.to_string(),
        source,
    })
}

impl Mailer {
    pub fn from_config(cfg: &MailConfig, from_email: &str, from_name: &str) -> Result<Self, MailError> {
        let timeout = Duration::from_secs(cfg.timeout_secs);
        let from = Mailbox::new(Some(from_name.to_string()), parse_address(from_email)?);

        let backend = match select_transport(cfg)? {
            TransportKind::Smtp => Backend::Smtp(build_smtp(cfg, timeout)?),
            _ => Backend::Sendmail(AsyncSendmailTransport::<Tokio1Executor>::new_with_command(
                cfg.sendmail_command.clone(),
            )),
        };

        Ok(Self {
            backend,
            from,
            timeout,
        })
    }

    pub const fn transport_name(&self) -> &'static str {
        match self.backend {
            Backend::Smtp(_) => "smtp",
            Backend::Sendmail(_) => "sendmail",
        }
    }

    fn build_message(&self, mail: &OutgoingMail) -> Result<Message, MailError> {
        let to = Mailbox::new(Some(mail.to.name.clone()), parse_address(&mail.to.address)?);
        Ok(Message::builder()
            .from(self.from.clone())
            .reply_to(self.from.clone())
            .to(to)
            .subject(mail.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                mail.text.clone(),
                mail.html.clone(),
            ))?)
    }
}

fn build_smtp(
    cfg: &MailConfig,
    timeout: Duration,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
    let host = cfg.smtp_host.trim();
    let builder = match cfg.smtp_security {
        SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(host)?,
        SmtpSecurity::Starttls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?,
        SmtpSecurity::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host),
    };
    let mut builder = builder.port(cfg.smtp_port).timeout(Some(timeout));
    if !cfg.smtp_username.is_empty() {
        builder = builder.credentials(Credentials::new(
            cfg.smtp_username.clone(),
            cfg.smtp_password.clone(),
        ));
    }
    Ok(builder.build())
}

impl MailTransport for Mailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let message = self.build_message(mail)?;
        let delivery = async {
            match &self.backend {
                Backend::Smtp(t) => t.send(message).await.map(|_| ()).map_err(MailError::from),
                Backend::Sendmail(t) => t.send(message).await.map_err(MailError::from),
            }
        };
        tokio::time::timeout(self.timeout, delivery)
            .await
            .map_err(|_| MailError::Timeout(self.timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail_config(transport: TransportKind, host: &str) -> MailConfig {
        MailConfig {
            transport,
            smtp_host: host.to_string(),
            smtp_port: 587,
            smtp_username: String::new(),
            smtp_password: String::new(),
            smtp_security: SmtpSecurity::Starttls,
            sendmail_command: "sendmail".to_string(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_select_transport() {
        let auto_smtp = mail_config(TransportKind::Auto, "mail.example.de");
        let auto_local = mail_config(TransportKind::Auto, " ");
        let forced = mail_config(TransportKind::Sendmail, "mail.example.de");
        let broken = mail_config(TransportKind::Smtp, "");

        assert_eq!(select_transport(&auto_smtp).unwrap(), TransportKind::Smtp);
        assert_eq!(select_transport(&auto_local).unwrap(), TransportKind::Sendmail);
        assert_eq!(select_transport(&forced).unwrap(), TransportKind::Sendmail);
        assert!(matches!(
            select_transport(&broken),
            Err(MailError::MissingSmtpHost)
        ));
    }

    #[test]
    fn test_from_config_rejects_bad_sender() {
        let cfg = mail_config(TransportKind::Sendmail, "");
        let result = Mailer::from_config(&cfg, "not an address", "Site");
        assert!(matches!(result, Err(MailError::Address { .. })));
    }

    #[test]
    fn test_build_message_is_multipart() {
        let cfg = mail_config(TransportKind::Sendmail, "");
        let mailer = Mailer::from_config(&cfg, "noreply@assistara.de", "Assistara").unwrap();
        assert_eq!(mailer.transport_name(), "sendmail");

        let message = mailer
            .build_message(&OutgoingMail {
                to: Recipient {
                    address: "anna@example.de".to_string(),
                    name: "Anna".to_string(),
                },
                subject: "Neue Kontaktanfrage: Bewerbung".to_string(),
                html: "<p>Hallo</p>".to_string(),
                text: "Hallo".to_string(),
            })
            .unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: Neue Kontaktanfrage: Bewerbung"));
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("anna@example.de"));
    }

    #[test]
    fn test_invalid_recipient_is_an_error() {
        let cfg = mail_config(TransportKind::Sendmail, "");
        let mailer = Mailer::from_config(&cfg, "noreply@assistara.de", "Assistara").unwrap();
        let result = mailer.build_message(&OutgoingMail {
            to: Recipient {
                address: "broken".to_string(),
                name: String::new(),
            },
            subject: String::new(),
            html: String::new(),
            text: String::new(),
        });
        assert!(matches!(result, Err(MailError::Address { .. })));
    }
}
