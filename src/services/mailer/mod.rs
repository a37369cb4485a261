pub mod mailgun;
pub mod templates;

use async_trait::async_trait;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()>;
}

/// Stand-in when no email credentials are configured.
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, to: &str, subject: &str, _html: &str) -> anyhow::Result<()> {
        tracing::debug!(%to, %subject, "email sending disabled, dropping message");
        Ok(())
    }
}
