use async_trait::async_trait;
use tracing::{error, info};

use crate::models::AlertDecision;
use crate::utils::error::AppError;

pub mod email;

pub use email::EmailNotifier;

/// Notification boundary. Delivery failure is non-fatal for the cycle.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;
    async fn notify(&self, decision: &AlertDecision) -> Result<(), AppError>;
}

/// Send every decision, logging failures and carrying on; returns how many
/// went out.
pub async fn dispatch_all(notifier: &dyn Notifier, decisions: &[AlertDecision]) -> usize {
    let mut sent = 0;

    for decision in decisions {
        match notifier.notify(decision).await {
            Ok(()) => {
                info!(
                    site = %decision.site,
                    price = %decision.price,
                    "alert sent via {}",
                    notifier.name()
                );
                sent += 1;
            }
            Err(e) => {
                error!(
                    site = %decision.site,
                    "failed to send alert via {}: {}",
                    notifier.name(),
                    e
                );
            }
        }
    }

    sent
}
