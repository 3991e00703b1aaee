//! Outbound run notifications.
//!
//! The original deployments mailed the run report to an operators' list. The
//! library keeps that as a seam: anything that can deliver a subject and a
//! body is a [`Notifier`]. The default sink writes through tracing, which is
//! enough for unattended scheduled runs that aggregate logs.

use tracing::info;

use crate::error::Result;

/// Delivery seam for run reports and failure notices.
pub trait Notifier: Send + Sync {
    fn send_message(&self, subject: &str, body: &str) -> Result<()>;
}

/// Notifier that emits the message into the tracing log.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn send_message(&self, subject: &str, body: &str) -> Result<()> {
        info!(subject = %subject, "notification:\n{}", body);
        Ok(())
    }
}
