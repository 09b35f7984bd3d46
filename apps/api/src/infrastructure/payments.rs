// Payment checkout through the Stripe HTTP API

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::http::{provider_client, PROVIDER_TIMEOUT};

const STRIPE_CHECKOUT_URL: &str = "https://api.stripe.com/v1/checkout/sessions";

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Payment provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Payment provider rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Everything the gateway needs to open a hosted checkout page for one tour
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    pub success_url: String,
    pub cancel_url: String,
    pub customer_email: String,
    pub client_reference_id: String,
    pub name: String,
    pub description: String,
    pub image: String,
    /// Smallest currency unit (cents)
    pub unit_amount: i64,
    pub currency: String,
    pub quantity: u32,
}

impl CheckoutRequest {
    /// Stripe's bracketed form encoding for a single-line-item session
    fn form_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("mode", "payment".to_string()),
            ("payment_method_types[0]", "card".to_string()),
            ("success_url", self.success_url.clone()),
            ("cancel_url", self.cancel_url.clone()),
            ("customer_email", self.customer_email.clone()),
            ("client_reference_id", self.client_reference_id.clone()),
            ("line_items[0][price_data][currency]", self.currency.clone()),
            ("line_items[0][price_data][unit_amount]", self.unit_amount.to_string()),
            ("line_items[0][price_data][product_data][name]", self.name.clone()),
            (
                "line_items[0][price_data][product_data][description]",
                self.description.clone(),
            ),
            ("line_items[0][price_data][product_data][images][0]", self.image.clone()),
            ("line_items[0][quantity]", self.quantity.to_string()),
        ]
    }
}

/// The part of a created checkout session the browser needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Payment provider port
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError>;
}

#[derive(Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Deserialize)]
struct StripeErrorDetail {
    message: String,
}

pub struct StripeGateway {
    client: Client,
    secret_key: String,
}

impl StripeGateway {
    pub fn new(secret_key: String) -> Self {
        Self {
            client: provider_client(PROVIDER_TIMEOUT),
            secret_key,
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let response = self
            .client
            .post(STRIPE_CHECKOUT_URL)
            .bearer_auth(&self.secret_key)
            .form(&request.form_params())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<StripeErrorBody>(&raw)
                .map(|body| body.error.message)
                .unwrap_or(raw);
            tracing::error!(status = status.as_u16(), "Stripe checkout failed: {}", message);
            return Err(PaymentError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let session: CheckoutSession = response.json().await?;
        tracing::info!(session_id = %session.id, "Created checkout session");
        Ok(session)
    }
}
