use actix_web::web::{Data, Json, Path};
use actix_web::HttpRequest;
use log::info;

use crate::config::Config;
use crate::context::UserInfo;
use crate::core::models::organization::Billing;
use crate::core::ports::payment::PaymentGateway;
use crate::core::ports::repository::Manager;
use crate::core::services::billing;
use crate::error::Error;
use crate::response::{Received, Url};

pub static SIGNATURE_HEADER: &str = "Stripe-Signature";

pub async fn detail<M: Manager>(me: UserInfo, org_id: Path<(i32,)>, manager: Data<M>) -> Result<Json<Billing>, Error> {
    let org_id = org_id.into_inner().0;
    Ok(Json(billing::billing(&mut manager.db().await?, org_id, me.id).await?))
}

pub async fn checkout<M: Manager, P: PaymentGateway>(
    me: UserInfo,
    org_id: Path<(i32,)>,
    manager: Data<M>,
    gateway: Data<P>,
    config: Data<Config>,
) -> Result<Json<Url>, Error> {
    let org_id = org_id.into_inner().0;
    let session = billing::checkout(&mut manager.db().await?, gateway.get_ref(), &config.stripe, &config.public_url, org_id, me.id).await?;
    Ok(Json(Url { url: session.url }))
}

pub async fn portal<M: Manager, P: PaymentGateway>(
    me: UserInfo,
    org_id: Path<(i32,)>,
    manager: Data<M>,
    gateway: Data<P>,
    config: Data<Config>,
) -> Result<Json<Url>, Error> {
    let org_id = org_id.into_inner().0;
    let session = billing::portal(&mut manager.db().await?, gateway.get_ref(), &config.public_url, org_id, me.id).await?;
    Ok(Json(Url { url: session.url }))
}

/// Takes the raw body: the signature covers its exact bytes.
pub async fn webhook<M: Manager, P: PaymentGateway>(req: HttpRequest, body: String, manager: Data<M>, gateway: Data<P>) -> Result<Json<Received>, Error> {
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::bad_request("missing signature"))?;
    let event = gateway.verify_webhook(&body, signature)?;
    info!("stripe webhook received: {:?}", event);
    billing::handle_event(&mut manager.db().await?, event).await?;
    Ok(Json(Received { received: true }))
}
