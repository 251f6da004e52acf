use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;
use crate::models::AlertDecision;
use crate::notify::Notifier;
use crate::utils::error::AppError;

pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailNotifier {
    /// Returns None when no sender/recipient is configured; email alerts
    /// are simply off in that case.
    pub fn from_config(config: &SmtpConfig) -> Result<Option<Self>, AppError> {
        let (from_address, to_address) = match (&config.from_address, &config.to_address) {
            (Some(from), Some(to)) => (from.clone(), to.clone()),
            _ => return Ok(None),
        };

        let from: Mailbox = format!("{} <{}>", config.from_name, from_address)
            .parse()
            .map_err(|e| AppError::Internal(format!("invalid from address: {}", e)))?;
        let to: Mailbox = to_address
            .parse()
            .map_err(|e| AppError::Internal(format!("invalid to address: {}", e)))?;

        let mut builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };
        builder = builder.port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Some(Self {
            transport: builder.build(),
            from,
            to,
        }))
    }

    fn format_subject(decision: &AlertDecision) -> String {
        format!("🔔 Price alert: {} at ₹{}", decision.site, decision.price)
    }

    fn format_body(decision: &AlertDecision) -> String {
        let mut body = String::new();

        body.push_str(&format!("Site: {}\n", decision.site));
        body.push_str(&format!("Price: ₹{}\n", decision.price));
        body.push_str(&format!("Why: {}\n", decision.reasons_joined()));

        if let Some(min) = decision.historical_min {
            body.push_str(&format!("Historical low: ₹{}\n", min));
        } else {
            body.push_str("Historical low: none yet\n");
        }

        body.push_str(&format!("\nGrab it: {}\n", decision.product_url));
        body
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn name(&self) -> &str {
        "email"
    }

    async fn notify(&self, decision: &AlertDecision) -> Result<(), AppError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(Self::format_subject(decision))
            .body(Self::format_body(decision))
            .map_err(|e| AppError::Internal(format!("failed to build email: {}", e)))?;

        self.transport.send(message).await?;
        Ok(())
    }
}
