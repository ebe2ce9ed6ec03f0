pub mod templates;

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;

/// Outbound email. Delivery is fire-and-forget: failures are logged and
/// never fail the owning request. Without SMTP configuration the message
/// body is logged locally instead (dev fallback).
#[derive(Clone)]
pub struct Mailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: String,
}

impl Mailer {
    pub fn new(smtp: Option<&SmtpConfig>, from: &str) -> Self {
        let transport = smtp.and_then(|config| {
            let creds = Credentials::new(config.user.clone(), config.pass.clone());
            match AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host) {
                Ok(builder) => {
                    tracing::info!("SMTP configured via {}", config.host);
                    Some(builder.port(config.port).credentials(creds).build())
                }
                Err(e) => {
                    tracing::warn!("SMTP not available: {e}");
                    None
                }
            }
        });

        Self {
            transport,
            from: from.to_string(),
        }
    }

    /// Send the OTP email in the background.
    pub fn send_verification_code(&self, to: String, code: String) {
        let html = templates::render_verification_code(&code);
        self.dispatch(to, "Your Gym Hub verification code".to_string(), html);
    }

    fn dispatch(&self, to: String, subject: String, html: String) {
        let mailer = self.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer.deliver(&to, &subject, &html).await {
                tracing::error!("Failed to send email to {to}: {e}");
            }
        });
    }

    async fn deliver(&self, to: &str, subject: &str, html: &str) -> Result<(), String> {
        let Some(transport) = &self.transport else {
            tracing::info!("[DEV EMAIL] To: {to} | Subject: {subject}\n{html}");
            return Ok(());
        };

        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| format!("Invalid from address: {e}"))?,
            )
            .to(to.parse().map_err(|e| format!("Invalid to address: {e}"))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html.to_string())
            .map_err(|e| format!("Failed to build email: {e}"))?;

        transport
            .send(message)
            .await
            .map_err(|e| format!("Failed to send email: {e}"))?;

        Ok(())
    }
}
