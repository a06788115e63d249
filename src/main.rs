use std::time::Duration;

use actix_web::web::Data;
use actix_web::{App, HttpServer};
use log::{info, warn};
use sqlx::postgres::PgPoolOptions;

use commune::config::{Config, StoreKind};
use commune::context::Tokeners;
use commune::core::ports::repository::Manager;
use commune::core::services::widget::{WidgetCache, WIDGET_AUDIENCE};
use commune::error::Error;
use commune::handlers::configure;
use commune::impls::mailer::logging::LogMailer;
use commune::impls::payment::stripe::StripeClient;
use commune::impls::repository::memory::MemManager;
use commune::impls::repository::sqlx::PgSqlxManager;
use commune::impls::tokener::jwt::JWT;
use commune::impls::uploaders::local_storage::LocalStorage;
use commune::middlewares::jwt::SessionMiddleware;

async fn serve<M: Manager + Clone + Send>(config: Config, manager: M) -> Result<(), Error> {
    let storage = LocalStorage::new(&config.upload_path)?;
    let gateway = StripeClient::new(config.stripe.secret_key.clone().unwrap_or_default(), config.stripe.webhook_secret.clone());
    if config.stripe.secret_key.is_none() {
        warn!("STRIPE_SECRET_KEY not set, billing endpoints will refuse checkout");
    }
    let tokeners = Tokeners {
        session: JWT::new(config.jwt_secret.as_bytes().to_vec()),
        widget: JWT::with_audience(config.widget_secret.as_bytes().to_vec(), WIDGET_AUDIENCE),
    };
    let ttl = Duration::from_secs(config.cache_ttl_secs);
    let cache = WidgetCache::new(ttl);
    {
        let cache = cache.clone();
        actix_web::rt::spawn(async move {
            let mut interval = actix_web::rt::time::interval(ttl);
            loop {
                interval.tick().await;
                let purged = cache.purge_expired().await;
                if purged > 0 {
                    log::debug!("purged {} expired cache entries", purged);
                }
            }
        });
    }
    let bind_addr = config.bind_addr.clone();
    info!("listening on {}", bind_addr);
    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(SessionMiddleware::new(config.jwt_secret.as_bytes().to_vec()))
            .app_data(Data::new(config.clone()))
            .app_data(Data::new(manager.clone()))
            .app_data(Data::new(gateway.clone()))
            .app_data(Data::new(LogMailer))
            .app_data(Data::new(storage.clone()))
            .app_data(Data::new(tokeners.clone()))
            .app_data(Data::new(cache.clone()))
            .configure(configure::<M, StripeClient, LogMailer, LocalStorage>)
    })
    .bind(bind_addr)?
    .run()
    .await?;
    Ok(())
}

#[actix_web::main]
async fn main() -> Result<(), Error> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info,actix_web=info")).init();
    let config = Config::from_env()?;
    match config.store {
        StoreKind::Postgres => {
            let url = config.database_url.clone().unwrap_or_default();
            let pool = PgPoolOptions::new().max_connections(config.db_max_connections).connect(&url).await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("connected to postgres, migrations applied");
            serve(config, PgSqlxManager::new(pool)).await
        }
        StoreKind::Memory => {
            warn!("using the in-memory store, data is lost on exit");
            serve(config, MemManager::new()).await
        }
    }
}
