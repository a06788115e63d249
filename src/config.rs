use crate::error::Error;
use std::str::FromStr;

pub static DATABASE_URL: &str = "DATABASE_URL";
pub static JWT_SECRET: &str = "JWT_SECRET";
pub static WIDGET_SECRET: &str = "WIDGET_SECRET";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    Memory,
}

impl FromStr for StoreKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(Error::bad_request(format!("unknown store kind: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StripeConfig {
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub pro_price_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreKind,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub widget_secret: String,
    pub public_url: String,
    pub upload_path: String,
    pub cache_ttl_secs: u64,
    pub stripe: StripeConfig,
}

fn var_or(key: &str, default: &str) -> String {
    dotenv::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_var<T: FromStr>(key: &str, default: T) -> Result<T, Error> {
    match dotenv::var(key) {
        Ok(v) => v.parse().map_err(|_| Error::bad_request(format!("invalid value for {}: {}", key, v))),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        let store: StoreKind = var_or("STORE", "postgres").parse()?;
        let database_url = match store {
            StoreKind::Postgres => Some(dotenv::var(DATABASE_URL)?),
            StoreKind::Memory => dotenv::var(DATABASE_URL).ok(),
        };
        Ok(Self {
            store,
            database_url,
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", 5)?,
            bind_addr: var_or("BIND_ADDR", "0.0.0.0:8000"),
            jwt_secret: dotenv::var(JWT_SECRET)?,
            widget_secret: dotenv::var(WIDGET_SECRET)?,
            public_url: var_or("PUBLIC_URL", "http://localhost:8000").trim_end_matches('/').to_owned(),
            upload_path: var_or("UPLOAD_PATH", "uploads"),
            cache_ttl_secs: parse_var("CACHE_TTL_SECS", 60)?,
            stripe: StripeConfig {
                secret_key: dotenv::var("STRIPE_SECRET_KEY").ok(),
                webhook_secret: dotenv::var("STRIPE_WEBHOOK_SECRET").ok(),
                pro_price_id: dotenv::var("STRIPE_PRICE_PRO").ok(),
            },
        })
    }

    /// Settings for tests and local tooling.
    pub fn for_test() -> Self {
        Self {
            store: StoreKind::Memory,
            database_url: None,
            db_max_connections: 1,
            bind_addr: "127.0.0.1:0".into(),
            jwt_secret: "session-secret".into(),
            widget_secret: "widget-secret".into(),
            public_url: "http://localhost:8000".into(),
            upload_path: std::env::temp_dir().join("commune-uploads").to_string_lossy().into_owned(),
            cache_ttl_secs: 60,
            stripe: StripeConfig {
                secret_key: Some("sk_test".into()),
                webhook_secret: Some("whsec_test".into()),
                pro_price_id: Some("price_pro".into()),
            },
        }
    }
}
