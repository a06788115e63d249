use std::collections::HashMap;

use chrono::{TimeZone, Utc};
use log::{debug, info, warn};

use super::organization::authorize;
use crate::config::StripeConfig;
use crate::core::models::organization::{Billing, BillingUpdate, Organization, Plan, Role};
use crate::core::ports::payment::{CheckoutCreate, CustomerCreate, PaymentGateway, SessionUrl, WebhookEvent};
use crate::core::ports::repository::{OrganizationCommon, Store, UserCommon};
use crate::error::Error;

fn billing_url(public_url: &str, org_id: i32) -> String {
    format!("{}/organizations/{}/billing", public_url, org_id)
}

/// Subscription states that keep the PRO plan.
pub fn plan_for_status(status: &str) -> Plan {
    match status {
        "active" | "trialing" => Plan::Pro,
        _ => Plan::Free,
    }
}

pub async fn billing<S: Store>(store: &mut S, org_id: i32, uid: i32) -> Result<Billing, Error> {
    let (org, _) = authorize(store, org_id, uid, Role::Member).await?;
    Ok(Billing::from(&org))
}

/// Starts a PRO subscription checkout, creating the customer on first use.
pub async fn checkout<S, P>(store: &mut S, gateway: &P, stripe: &StripeConfig, public_url: &str, org_id: i32, uid: i32) -> Result<SessionUrl, Error>
where
    S: Store,
    P: PaymentGateway,
{
    let (org, _) = authorize(store, org_id, uid, Role::Admin).await?;
    let price_id = stripe
        .pro_price_id
        .clone()
        .filter(|_| stripe.secret_key.is_some())
        .ok_or_else(|| Error::bad_request("billing is not configured"))?;
    let customer_id = match org.stripe_customer_id {
        Some(id) => id,
        None => {
            let user = UserCommon::get(store, uid).await?.ok_or_else(|| Error::not_found("user"))?;
            let id = gateway
                .create_customer(CustomerCreate {
                    email: user.email,
                    name: org.name.clone(),
                    organization_id: org.id,
                })
                .await?;
            OrganizationCommon::update_billing(
                store,
                org.id,
                BillingUpdate {
                    stripe_customer_id: Some(id.clone()),
                    ..Default::default()
                },
            )
            .await?;
            id
        }
    };
    let base = billing_url(public_url, org.id);
    gateway
        .create_checkout_session(CheckoutCreate {
            customer_id,
            price_id,
            success_url: format!("{}?checkout=success", base),
            cancel_url: format!("{}?checkout=cancelled", base),
            metadata: HashMap::from([("organization_id".to_owned(), org.id.to_string())]),
        })
        .await
}

pub async fn portal<S, P>(store: &mut S, gateway: &P, public_url: &str, org_id: i32, uid: i32) -> Result<SessionUrl, Error>
where
    S: Store,
    P: PaymentGateway,
{
    let (org, _) = authorize(store, org_id, uid, Role::Admin).await?;
    let customer_id = org
        .stripe_customer_id
        .ok_or_else(|| Error::bad_request("organization has no billing account"))?;
    gateway.create_portal_session(&customer_id, &billing_url(public_url, org.id)).await
}

async fn find_org<S: Store>(store: &mut S, subscription_id: Option<&str>, customer_id: Option<&str>) -> Result<Option<Organization>, Error> {
    if let Some(sub) = subscription_id {
        if let Some(org) = OrganizationCommon::get_by_subscription(store, sub).await? {
            return Ok(Some(org));
        }
    }
    match customer_id {
        Some(customer) => OrganizationCommon::get_by_customer(store, customer).await,
        None => Ok(None),
    }
}

/// Applies a verified webhook event. Events for unknown organizations are
/// logged and dropped.
pub async fn handle_event<S: Store>(store: &mut S, event: WebhookEvent) -> Result<(), Error> {
    match event {
        WebhookEvent::CheckoutCompleted {
            customer_id,
            subscription_id,
            organization_id,
        } => {
            let org = match organization_id {
                Some(id) => OrganizationCommon::get(store, id).await?,
                None => find_org(store, None, customer_id.as_deref()).await?,
            };
            let Some(org) = org else {
                warn!("checkout completed for unknown organization (customer {:?})", customer_id);
                return Ok(());
            };
            OrganizationCommon::update_billing(
                store,
                org.id,
                BillingUpdate {
                    plan: Some(Plan::Pro),
                    stripe_customer_id: customer_id,
                    stripe_subscription_id: subscription_id,
                    subscription_status: Some("active".into()),
                    current_period_end: None,
                },
            )
            .await?;
            info!("organization {} upgraded to PRO", org.id);
        }
        WebhookEvent::SubscriptionUpdated {
            subscription_id,
            customer_id,
            status,
            current_period_end,
        } => {
            let Some(org) = find_org(store, Some(&subscription_id), Some(&customer_id)).await? else {
                warn!("subscription {} updated for unknown organization", subscription_id);
                return Ok(());
            };
            let plan = plan_for_status(&status);
            OrganizationCommon::update_billing(
                store,
                org.id,
                BillingUpdate {
                    plan: Some(plan),
                    stripe_customer_id: None,
                    stripe_subscription_id: Some(subscription_id),
                    subscription_status: Some(status.clone()),
                    current_period_end: Utc.timestamp_opt(current_period_end, 0).single().filter(|_| current_period_end > 0),
                },
            )
            .await?;
            info!("organization {} subscription {} ({})", org.id, status, plan.as_str());
        }
        WebhookEvent::SubscriptionDeleted { subscription_id, customer_id } => {
            let Some(org) = find_org(store, Some(&subscription_id), Some(&customer_id)).await? else {
                warn!("subscription {} deleted for unknown organization", subscription_id);
                return Ok(());
            };
            OrganizationCommon::update_billing(
                store,
                org.id,
                BillingUpdate {
                    plan: Some(Plan::Free),
                    subscription_status: Some("canceled".into()),
                    ..Default::default()
                },
            )
            .await?;
            info!("organization {} downgraded to FREE", org.id);
        }
        WebhookEvent::PaymentFailed { customer_id } => {
            let Some(org) = find_org(store, None, Some(&customer_id)).await? else {
                warn!("payment failed for unknown customer {}", customer_id);
                return Ok(());
            };
            OrganizationCommon::update_billing(
                store,
                org.id,
                BillingUpdate {
                    subscription_status: Some("past_due".into()),
                    ..Default::default()
                },
            )
            .await?;
            warn!("payment failed for organization {}", org.id);
        }
        WebhookEvent::Ignored(kind) => debug!("ignoring webhook event {}", kind),
    }
    Ok(())
}
