use crate::core::ports::tokener::{Payload, Tokener};
use crate::error::Error;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

#[derive(Debug, Clone)]
pub struct JWT {
    secret: Vec<u8>,
    audience: Option<String>,
}

impl JWT {
    pub fn new(secret: Vec<u8>) -> Self {
        Self { secret, audience: None }
    }

    /// Tokens verified by this instance must carry `aud == audience`.
    pub fn with_audience(secret: Vec<u8>, audience: &str) -> Self {
        Self {
            secret,
            audience: Some(audience.to_owned()),
        }
    }
}

impl<P> Tokener<P> for JWT
where
    P: Payload,
{
    fn gen_token(&self, payload: &P) -> Result<String, Error> {
        let header = Header::new(Algorithm::HS256);
        let key = EncodingKey::from_secret(&self.secret);
        let token = encode(&header, payload, &key)?;
        Ok(token)
    }

    fn verify_token(&self, token: &str) -> Result<P, Error> {
        let key = DecodingKey::from_secret(&self.secret);
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        if let Some(aud) = &self.audience {
            validation.set_audience(&[aud]);
        }
        let payload = decode(token, &key, &validation)?;
        Ok(payload.claims)
    }
}
