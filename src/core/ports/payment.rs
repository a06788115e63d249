use std::collections::HashMap;

use crate::error::Error;

#[derive(Debug, Clone)]
pub struct CustomerCreate {
    pub email: String,
    pub name: String,
    pub organization_id: i32,
}

#[derive(Debug, Clone)]
pub struct CheckoutCreate {
    pub customer_id: String,
    pub price_id: String,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUrl {
    pub id: String,
    pub url: String,
}

/// Events the platform reacts to, already verified and decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    CheckoutCompleted {
        customer_id: Option<String>,
        subscription_id: Option<String>,
        organization_id: Option<i32>,
    },
    SubscriptionUpdated {
        subscription_id: String,
        customer_id: String,
        status: String,
        current_period_end: i64,
    },
    SubscriptionDeleted {
        subscription_id: String,
        customer_id: String,
    },
    PaymentFailed {
        customer_id: String,
    },
    Ignored(String),
}

pub trait PaymentGateway: 'static {
    async fn create_customer(&self, data: CustomerCreate) -> Result<String, Error>;
    async fn create_checkout_session(&self, data: CheckoutCreate) -> Result<SessionUrl, Error>;
    async fn create_portal_session(&self, customer_id: &str, return_url: &str) -> Result<SessionUrl, Error>;
    /// Verifies the signature header against the raw payload and decodes the event.
    fn verify_webhook(&self, payload: &str, signature: &str) -> Result<WebhookEvent, Error>;
}
