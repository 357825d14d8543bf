use serde::Serialize;

#[derive(Serialize, Debug)]
pub struct Health {
    pub status: &'static str,
}

/// Generic acknowledgement body returned by mutating endpoints.
#[derive(Serialize, Debug)]
pub struct Ack {
    pub success: bool,
}

impl Ack {
    pub fn ok() -> Self { Self { success: true } }
}
