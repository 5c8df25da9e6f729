//! Email sending through the configured SMTP relay.

use anyhow::Context;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use super::{DispatchResult, EmailMessage};
use crate::server_config::cfg;

#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl Mailer {
    pub fn new(transport: AsyncSmtpTransport<Tokio1Executor>, from: Mailbox) -> Self {
        Self { transport, from }
    }

    pub fn from_config() -> anyhow::Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.smtp.host)
            .context("Could not resolve SMTP relay")?
            .port(cfg.smtp.port);
        if !cfg.smtp.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                cfg.smtp.username.clone(),
                cfg.smtp.password.clone(),
            ));
        }

        let from = format!("{} <{}>", cfg.smtp.from_name, cfg.smtp.from_address)
            .parse()
            .context("Could not parse SMTP from address")?;

        Ok(Self::new(builder.build(), from))
    }

    pub async fn send(&self, message: &EmailMessage) -> DispatchResult {
        let to: Mailbox = {
            let addr = match &message.name {
                Some(name) => format!("{} <{}>", name, message.to),
                None => format!("<{}>", message.to),
            };
            match addr.parse() {
                Ok(mailbox) => mailbox,
                Err(e) => {
                    return DispatchResult::failed(
                        "smtp",
                        format!("invalid recipient address {}: {}", message.to, e),
                    )
                }
            }
        };

        let plain = message
            .text
            .clone()
            .unwrap_or_else(|| message.subject.clone());

        let email = match Message::builder()
            .to(to)
            .from(self.from.clone())
            .subject(message.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                plain,
                message.html.clone(),
            )) {
            Ok(email) => email,
            Err(e) => {
                return DispatchResult::failed("smtp", format!("could not build message: {e}"))
            }
        };

        match self.transport.send(email).await {
            Ok(response) => {
                let message_id = response.message().next().map(|s| s.to_string());
                DispatchResult::ok("smtp", message_id)
            }
            Err(e) => DispatchResult::failed("smtp", e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipient_mailbox_parsing() {
        let with_name: Result<Mailbox, _> = "Ada Lovelace <ada@example.com>".parse();
        assert!(with_name.is_ok());

        let bare: Result<Mailbox, _> = "<ada@example.com>".parse();
        assert!(bare.is_ok());

        let invalid: Result<Mailbox, _> = "<not-an-address>".parse();
        assert!(invalid.is_err());
    }
}
