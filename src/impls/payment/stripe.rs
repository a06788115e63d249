use std::collections::HashMap;

use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::Sha256;

use crate::core::ports::payment::{CheckoutCreate, CustomerCreate, PaymentGateway, SessionUrl, WebhookEvent};
use crate::error::Error;

const API_BASE: &str = "https://api.stripe.com/v1";
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

/// Checks a `Stripe-Signature` header (`t=<unix>,v1=<hex>[,v1=..]`) against the raw body.
pub fn verify_signature(secret: &str, payload: &str, header: &str, now: i64) -> Result<(), Error> {
    let invalid = |msg: &str| Error::bad_request(format!("invalid webhook signature: {}", msg));
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = Some(v),
            Some(("v1", v)) => signatures.push(v),
            _ => {}
        }
    }
    let timestamp = timestamp.ok_or_else(|| invalid("missing timestamp"))?;
    if signatures.is_empty() {
        return Err(invalid("missing signature"));
    }
    let ts: i64 = timestamp.parse().map_err(|_| invalid("bad timestamp"))?;
    if (now - ts).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(invalid("timestamp outside tolerance"));
    }
    let signed_payload = format!("{}.{}", timestamp, payload);
    let matched = signatures.into_iter().any(|sig| {
        let Ok(expected) = hex::decode(sig) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(signed_payload.as_bytes());
        mac.verify_slice(&expected).is_ok()
    });
    if !matched {
        return Err(invalid("signature mismatch"));
    }
    Ok(())
}

/// Produces a header value `verify_signature` accepts. Used to sign test payloads.
pub fn sign_payload(secret: &str, payload: &str, timestamp: i64) -> Result<String, Error> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| Error::Payment(e.to_string()))?;
    mac.update(format!("{}.{}", timestamp, payload).as_bytes());
    Ok(format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes())))
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    data: RawEventData,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct CheckoutSessionObject {
    customer: Option<String>,
    subscription: Option<String>,
    client_reference_id: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionObject {
    id: String,
    customer: String,
    status: String,
    #[serde(default)]
    current_period_end: i64,
}

#[derive(Debug, Deserialize)]
struct InvoiceObject {
    customer: String,
}

fn object<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, Error> {
    serde_json::from_value(value).map_err(|e| Error::bad_request(format!("malformed webhook object: {}", e)))
}

/// Decodes the event types the platform handles; everything else is `Ignored`.
pub fn parse_event(payload: &str) -> Result<WebhookEvent, Error> {
    let event: RawEvent = serde_json::from_str(payload).map_err(|e| Error::bad_request(format!("malformed webhook event: {}", e)))?;
    let event = match event.kind.as_str() {
        "checkout.session.completed" => {
            let session: CheckoutSessionObject = object(event.data.object)?;
            let organization_id = session
                .metadata
                .get("organization_id")
                .or(session.client_reference_id.as_ref())
                .and_then(|id| id.parse().ok());
            WebhookEvent::CheckoutCompleted {
                customer_id: session.customer,
                subscription_id: session.subscription,
                organization_id,
            }
        }
        "customer.subscription.updated" | "customer.subscription.created" => {
            let sub: SubscriptionObject = object(event.data.object)?;
            WebhookEvent::SubscriptionUpdated {
                subscription_id: sub.id,
                customer_id: sub.customer,
                status: sub.status,
                current_period_end: sub.current_period_end,
            }
        }
        "customer.subscription.deleted" => {
            let sub: SubscriptionObject = object(event.data.object)?;
            WebhookEvent::SubscriptionDeleted {
                subscription_id: sub.id,
                customer_id: sub.customer,
            }
        }
        "invoice.payment_failed" => {
            let invoice: InvoiceObject = object(event.data.object)?;
            WebhookEvent::PaymentFailed { customer_id: invoice.customer }
        }
        _ => WebhookEvent::Ignored(event.kind),
    };
    Ok(event)
}

#[derive(Debug, Deserialize)]
struct IdObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct UrlObject {
    id: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[derive(Debug, Clone)]
pub struct StripeClient {
    api_key: String,
    webhook_secret: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl StripeClient {
    pub fn new(api_key: String, webhook_secret: Option<String>) -> Self {
        Self {
            api_key,
            webhook_secret,
            base_url: API_BASE.to_owned(),
            client: reqwest::Client::new(),
        }
    }

    async fn post_form<T: DeserializeOwned>(&self, path: &str, form: &[(String, String)]) -> Result<T, Error> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .basic_auth(&self.api_key, Option::<&str>::None)
            .form(form)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            if let Ok(err) = serde_json::from_str::<ApiError>(&body) {
                return Err(Error::Payment(err.error.message));
            }
            return Err(Error::Payment(format!("HTTP {}: {}", status, body)));
        }
        serde_json::from_str(&body).map_err(|e| Error::Payment(format!("unexpected response: {}", e)))
    }
}

impl PaymentGateway for StripeClient {
    async fn create_customer(&self, data: CustomerCreate) -> Result<String, Error> {
        let form = vec![
            ("email".to_owned(), data.email),
            ("name".to_owned(), data.name),
            ("metadata[organization_id]".to_owned(), data.organization_id.to_string()),
        ];
        let customer: IdObject = self.post_form("/customers", &form).await?;
        Ok(customer.id)
    }

    async fn create_checkout_session(&self, data: CheckoutCreate) -> Result<SessionUrl, Error> {
        let mut form = vec![
            ("customer".to_owned(), data.customer_id),
            ("mode".to_owned(), "subscription".to_owned()),
            ("success_url".to_owned(), data.success_url),
            ("cancel_url".to_owned(), data.cancel_url),
            ("line_items[0][price]".to_owned(), data.price_id),
            ("line_items[0][quantity]".to_owned(), "1".to_owned()),
        ];
        for (key, value) in data.metadata {
            form.push((format!("metadata[{}]", key), value));
        }
        let session: UrlObject = self.post_form("/checkout/sessions", &form).await?;
        Ok(SessionUrl {
            id: session.id,
            url: session.url,
        })
    }

    async fn create_portal_session(&self, customer_id: &str, return_url: &str) -> Result<SessionUrl, Error> {
        let form = vec![
            ("customer".to_owned(), customer_id.to_owned()),
            ("return_url".to_owned(), return_url.to_owned()),
        ];
        let session: UrlObject = self.post_form("/billing_portal/sessions", &form).await?;
        Ok(SessionUrl {
            id: session.id,
            url: session.url,
        })
    }

    fn verify_webhook(&self, payload: &str, signature: &str) -> Result<WebhookEvent, Error> {
        let secret = self
            .webhook_secret
            .as_deref()
            .ok_or_else(|| Error::bad_request("webhook secret not configured"))?;
        verify_signature(secret, payload, signature, chrono::Utc::now().timestamp())?;
        parse_event(payload)
    }
}
