use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

pub trait Mailer: 'static {
    async fn send(&self, mail: Mail) -> Result<(), Error>;
}
