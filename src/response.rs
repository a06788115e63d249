use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Count {
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct Updated {
    pub updated: u64,
}

#[derive(Debug, Serialize)]
pub struct Url {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct Received {
    pub received: bool,
}
