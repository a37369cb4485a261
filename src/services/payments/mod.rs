pub mod stripe;

use async_trait::async_trait;
use serde::Serialize;

/// A hosted checkout session created by the payment provider.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSession {
    pub session_id: String,
    pub url: String,
}

/// Settlement state of a checkout session as reported by the provider.
#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub paid: bool,
    /// Provider-side payment reference, present once the session is paid.
    pub payment_ref: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub booking_id: String,
    pub description: String,
    /// Amount in the currency's smallest unit.
    pub amount_cents: i64,
    pub currency: String,
    pub customer_email: String,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> anyhow::Result<CheckoutSession>;

    async fn fetch_session(&self, session_id: &str) -> anyhow::Result<SessionStatus>;
}
