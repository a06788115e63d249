use chrono::{DateTime, Duration, Utc};
use hex::ToHex;
use log::info;
use rand::{thread_rng, Rng};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::core::models::user::{Insert as UserInsert, VerificationToken};
use crate::core::ports::mailer::{Mail, Mailer};
use crate::core::ports::repository::{Store, TxStore, UserCommon, VerificationTokenCommon};
use crate::error::Error;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAGIC_LINK_TTL_HOURS: i64 = 24;
pub const TOKEN_LEN: usize = 32;

const ALPHANUMERIC: &[u8] = b"1234567890abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password);
    hasher.update(salt);
    hasher.finalize().encode_hex()
}

/// Alphanumeric string used for salts and single-use tokens.
pub fn random_string(len: usize) -> String {
    let mut rng = thread_rng();
    (0..len).map(|_| ALPHANUMERIC[rng.gen_range(0..ALPHANUMERIC.len())] as char).collect()
}

pub fn normalize_email(email: &str) -> Result<String, Error> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.') => Ok(email),
        _ => Err(Error::bad_request("invalid email address")),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Signup {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Login {
    pub email: String,
    pub password: String,
}

fn verify_link(public_url: &str, token: &str) -> String {
    format!("{}/auth/verify?token={}", public_url, token)
}

async fn issue_verification_token<S: Store>(store: &mut S, email: &str, now: DateTime<Utc>) -> Result<String, Error> {
    let token = random_string(TOKEN_LEN);
    VerificationTokenCommon::insert(
        store,
        VerificationToken {
            identifier: email.to_owned(),
            token: token.clone(),
            expires_at: now + Duration::hours(MAGIC_LINK_TTL_HOURS),
        },
    )
    .await?;
    Ok(token)
}

/// Creates an unverified account and mails a verification link.
pub async fn signup<T, M>(mut tx: T, mailer: &M, public_url: &str, data: Signup, now: DateTime<Utc>) -> Result<i32, Error>
where
    T: TxStore,
    M: Mailer,
{
    let name = data.name.trim().to_owned();
    if name.is_empty() {
        return Err(Error::bad_request("name must not be empty"));
    }
    let email = normalize_email(&data.email)?;
    if data.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::bad_request(format!("password must be at least {} characters", MIN_PASSWORD_LEN)));
    }
    if UserCommon::get_by_email(&mut tx, &email).await?.is_some() {
        return Err(Error::bad_request("email already registered"));
    }
    let salt = random_string(TOKEN_LEN);
    let id = UserCommon::insert(
        &mut tx,
        UserInsert {
            name,
            email: email.clone(),
            password: Some(hash_password(&data.password, &salt)),
            salt: Some(salt),
            email_verified: false,
        },
    )
    .await?;
    let token = issue_verification_token(&mut tx, &email, now).await?;
    tx.commit().await?;
    info!("user {} signed up", id);
    mailer
        .send(Mail {
            to: email,
            subject: "Verify your email".into(),
            body: format!("Confirm your address: {}", verify_link(public_url, &token)),
        })
        .await?;
    Ok(id)
}

/// Returns the user id when the credentials match.
pub async fn login<S: Store>(store: &mut S, data: Login) -> Result<i32, Error> {
    let email = data.email.trim().to_lowercase();
    let user = UserCommon::get_by_email(store, &email).await?.ok_or(Error::Unauthenticated)?;
    match (&user.password, &user.salt) {
        (Some(hash), Some(salt)) if *hash == hash_password(&data.password, salt) => Ok(user.id),
        _ => Err(Error::Unauthenticated),
    }
}

pub async fn request_magic_link<S, M>(store: &mut S, mailer: &M, public_url: &str, email: &str, now: DateTime<Utc>) -> Result<(), Error>
where
    S: Store,
    M: Mailer,
{
    let email = normalize_email(email)?;
    let token = issue_verification_token(store, &email, now).await?;
    mailer
        .send(Mail {
            to: email,
            subject: "Your sign-in link".into(),
            body: format!("Sign in: {}", verify_link(public_url, &token)),
        })
        .await?;
    Ok(())
}

/// Consumes a verification token, creating the account on first use, and
/// returns the verified user's id. The token is spent even when expired.
pub async fn verify<T: TxStore>(mut tx: T, token: &str, now: DateTime<Utc>) -> Result<i32, Error> {
    let Some(vt) = VerificationTokenCommon::take(&mut tx, token).await? else {
        tx.rollback().await?;
        return Err(Error::bad_request("invalid verification token"));
    };
    if vt.expires_at <= now {
        tx.commit().await?;
        return Err(Error::bad_request("verification token expired"));
    }
    let id = match UserCommon::get_by_email(&mut tx, &vt.identifier).await? {
        Some(user) => user.id,
        None => {
            let name = vt.identifier.split('@').next().unwrap_or_default().to_owned();
            UserCommon::insert(
                &mut tx,
                UserInsert {
                    name,
                    email: vt.identifier.clone(),
                    password: None,
                    salt: None,
                    email_verified: true,
                },
            )
            .await?
        }
    };
    UserCommon::mark_verified(&mut tx, id).await?;
    tx.commit().await?;
    info!("user {} verified {}", id, vt.identifier);
    Ok(id)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::ports::repository::Manager;
    use crate::impls::mailer::memory::MemoryMailer;
    use crate::impls::repository::memory::MemManager;

    const URL: &str = "http://localhost:8000";

    fn signup_data(email: &str, password: &str) -> Signup {
        Signup {
            name: "Ann".into(),
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn test_hash_password_depends_on_salt() {
        assert_eq!(hash_password("secret", "a"), hash_password("secret", "a"));
        assert_ne!(hash_password("secret", "a"), hash_password("secret", "b"));
        assert_eq!(random_string(32).len(), 32);
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email(" Ann@Example.com ").unwrap(), "ann@example.com");
        assert!(normalize_email("ann").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("ann@localhost").is_err());
    }

    #[tokio::test]
    async fn test_signup_then_login() {
        let manager = MemManager::new();
        let mailer = MemoryMailer::default();
        let id = signup(manager.tx().await.unwrap(), &mailer, URL, signup_data("ann@example.com", "password1"), Utc::now())
            .await
            .unwrap();
        let mut db = manager.db().await.unwrap();
        let user = UserCommon::get(&mut db, id).await.unwrap().unwrap();
        assert!(!user.email_verified);
        assert!(mailer.last_token_for("ann@example.com").await.is_some());

        let ok = login(
            &mut db,
            Login {
                email: "ANN@example.com".into(),
                password: "password1".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(ok, id);
        let bad = login(
            &mut db,
            Login {
                email: "ann@example.com".into(),
                password: "wrong-password".into(),
            },
        )
        .await;
        assert!(matches!(bad, Err(Error::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_signup_rejects_duplicates_and_short_passwords() {
        let manager = MemManager::new();
        let mailer = MemoryMailer::default();
        signup(manager.tx().await.unwrap(), &mailer, URL, signup_data("ann@example.com", "password1"), Utc::now())
            .await
            .unwrap();
        let dup = signup(manager.tx().await.unwrap(), &mailer, URL, signup_data("ann@example.com", "password2"), Utc::now()).await;
        assert!(matches!(dup, Err(Error::BadRequest(_))));
        let short = signup(manager.tx().await.unwrap(), &mailer, URL, signup_data("bob@example.com", "short"), Utc::now()).await;
        assert!(matches!(short, Err(Error::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_magic_link_creates_verified_user_once() {
        let manager = MemManager::new();
        let mailer = MemoryMailer::default();
        let now = Utc::now();
        request_magic_link(&mut manager.db().await.unwrap(), &mailer, URL, "new@example.com", now)
            .await
            .unwrap();
        let token = mailer.last_token_for("new@example.com").await.unwrap();
        let id = verify(manager.tx().await.unwrap(), &token, now).await.unwrap();
        let user = UserCommon::get(&mut manager.db().await.unwrap(), id).await.unwrap().unwrap();
        assert!(user.email_verified);
        assert_eq!(user.name, "new");
        let again = verify(manager.tx().await.unwrap(), &token, now).await;
        assert!(matches!(again, Err(Error::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_expired_token_is_consumed() {
        let manager = MemManager::new();
        let mailer = MemoryMailer::default();
        let issued = Utc::now() - Duration::hours(MAGIC_LINK_TTL_HOURS + 1);
        request_magic_link(&mut manager.db().await.unwrap(), &mailer, URL, "late@example.com", issued)
            .await
            .unwrap();
        let token = mailer.last_token_for("late@example.com").await.unwrap();
        assert!(verify(manager.tx().await.unwrap(), &token, Utc::now()).await.is_err());
        let mut db = manager.db().await.unwrap();
        assert!(VerificationTokenCommon::take(&mut db, &token).await.unwrap().is_none());
        assert!(UserCommon::get_by_email(&mut db, "late@example.com").await.unwrap().is_none());
    }
}
