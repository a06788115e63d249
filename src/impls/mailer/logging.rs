use log::info;

use crate::core::ports::mailer::{Mail, Mailer};
use crate::error::Error;

/// Writes outgoing mail to the log instead of delivering it.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    async fn send(&self, mail: Mail) -> Result<(), Error> {
        info!("mail to {}: {}\n{}", mail.to, mail.subject, mail.body);
        Ok(())
    }
}
