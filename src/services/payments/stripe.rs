use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

use super::{CheckoutRequest, CheckoutSession, PaymentProvider, SessionStatus};

const STRIPE_API: &str = "https://api.stripe.com/v1";

pub struct StripeProvider {
    secret_key: String,
    success_url: String,
    cancel_url: String,
    client: reqwest::Client,
}

impl StripeProvider {
    /// `client_url` is the frontend origin the customer is sent back to.
    pub fn new(secret_key: String, client_url: &str) -> Self {
        Self {
            secret_key,
            success_url: format!(
                "{client_url}/payment/success?session_id={{CHECKOUT_SESSION_ID}}"
            ),
            cancel_url: format!("{client_url}/payment/cancelled"),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Deserialize)]
struct StripeSession {
    id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    payment_status: Option<String>,
    #[serde(default)]
    payment_intent: Option<String>,
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> anyhow::Result<CheckoutSession> {
        let amount = request.amount_cents.to_string();
        let currency = request.currency.to_lowercase();
        let form = [
            ("mode", "payment"),
            ("success_url", self.success_url.as_str()),
            ("cancel_url", self.cancel_url.as_str()),
            ("customer_email", request.customer_email.as_str()),
            ("line_items[0][quantity]", "1"),
            ("line_items[0][price_data][currency]", currency.as_str()),
            ("line_items[0][price_data][unit_amount]", amount.as_str()),
            (
                "line_items[0][price_data][product_data][name]",
                request.description.as_str(),
            ),
            ("metadata[booking_id]", request.booking_id.as_str()),
        ];

        let session: StripeSession = self
            .client
            .post(format!("{STRIPE_API}/checkout/sessions"))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await
            .context("failed to create Stripe checkout session")?
            .error_for_status()
            .context("Stripe API returned error")?
            .json()
            .await
            .context("failed to decode Stripe checkout session")?;

        let url = session
            .url
            .context("Stripe checkout session has no redirect url")?;
        Ok(CheckoutSession {
            session_id: session.id,
            url,
        })
    }

    async fn fetch_session(&self, session_id: &str) -> anyhow::Result<SessionStatus> {
        let session: StripeSession = self
            .client
            .get(format!("{STRIPE_API}/checkout/sessions/{session_id}"))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await
            .context("failed to fetch Stripe checkout session")?
            .error_for_status()
            .context("Stripe API returned error")?
            .json()
            .await
            .context("failed to decode Stripe checkout session")?;

        Ok(SessionStatus {
            paid: session.payment_status.as_deref() == Some("paid"),
            payment_ref: session.payment_intent,
        })
    }
}
