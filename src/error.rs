use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("unauthenticated")]
    Unauthenticated,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("dotenv error: {0}")]
    DotEnv(#[from] dotenv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("multipart error: {0}")]
    Multipart(#[from] actix_multipart::MultipartError),

    #[error("payment provider error: {0}")]
    Payment(String),

    #[error("server error: {0}")]
    Server(#[from] anyhow::Error),
}

impl Error {
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated | Error::Jwt(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) | Error::Database(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            Error::BadRequest(_) | Error::Json(_) | Error::Multipart(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = match self {
            Error::Jwt(_) => "invalid or expired token".to_owned(),
            Error::Database(sqlx::Error::RowNotFound) => "resource not found".to_owned(),
            _ if status.is_server_error() => {
                log::error!("{}", self);
                "internal server error".to_owned()
            }
            _ => self.to_string(),
        };
        HttpResponse::build(status).json(json!({ "error": message }))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn test_status_codes() {
        assert_eq!(Error::Unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::forbidden("nope").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(Error::not_found("post").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(Error::Database(sqlx::Error::RowNotFound).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(Error::bad_request("bad").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::Payment("down".into()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn test_server_errors_hide_details() {
        let resp = Error::Server(anyhow::anyhow!("connection string leaked")).error_response();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "internal server error");
    }

    #[actix_web::test]
    async fn test_client_errors_carry_message() {
        let resp = Error::not_found("post").error_response();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "post not found");
    }
}
