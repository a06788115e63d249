use std::sync::Arc;

use tokio::sync::Mutex;

use crate::core::ports::mailer::{Mail, Mailer};
use crate::error::Error;

/// Keeps every sent mail so tests can follow the links in them.
#[derive(Debug, Clone, Default)]
pub struct MemoryMailer {
    sent: Arc<Mutex<Vec<Mail>>>,
}

impl MemoryMailer {
    pub async fn sent(&self) -> Vec<Mail> {
        self.sent.lock().await.clone()
    }

    /// The `token` query parameter of the last mail sent to `to`.
    pub async fn last_token_for(&self, to: &str) -> Option<String> {
        let sent = self.sent.lock().await;
        let mail = sent.iter().rev().find(|m| m.to == to)?;
        let (_, rest) = mail.body.split_once("token=")?;
        Some(rest.split(|c: char| !c.is_ascii_alphanumeric()).next()?.to_owned())
    }
}

impl Mailer for MemoryMailer {
    async fn send(&self, mail: Mail) -> Result<(), Error> {
        self.sent.lock().await.push(mail);
        Ok(())
    }
}
