use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::stripe::{parse_event, verify_signature};
use crate::core::ports::payment::{CheckoutCreate, CustomerCreate, PaymentGateway, SessionUrl, WebhookEvent};
use crate::error::Error;

/// Answers like Stripe without leaving the process. Webhooks are verified
/// with the real signature scheme.
#[derive(Debug, Clone)]
pub struct FakeGateway {
    webhook_secret: String,
    customers_created: Arc<AtomicUsize>,
}

impl FakeGateway {
    pub fn new(webhook_secret: &str) -> Self {
        Self {
            webhook_secret: webhook_secret.to_owned(),
            customers_created: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn customers_created(&self) -> usize {
        self.customers_created.load(Ordering::SeqCst)
    }
}

impl PaymentGateway for FakeGateway {
    async fn create_customer(&self, data: CustomerCreate) -> Result<String, Error> {
        self.customers_created.fetch_add(1, Ordering::SeqCst);
        Ok(format!("cus_{}", data.organization_id))
    }

    async fn create_checkout_session(&self, data: CheckoutCreate) -> Result<SessionUrl, Error> {
        Ok(SessionUrl {
            id: format!("cs_{}", data.customer_id),
            url: format!("https://checkout.stripe.test/{}/{}", data.customer_id, data.price_id),
        })
    }

    async fn create_portal_session(&self, customer_id: &str, _return_url: &str) -> Result<SessionUrl, Error> {
        Ok(SessionUrl {
            id: format!("bps_{}", customer_id),
            url: format!("https://billing.stripe.test/{}", customer_id),
        })
    }

    fn verify_webhook(&self, payload: &str, signature: &str) -> Result<WebhookEvent, Error> {
        verify_signature(&self.webhook_secret, payload, signature, chrono::Utc::now().timestamp())?;
        parse_event(payload)
    }
}
