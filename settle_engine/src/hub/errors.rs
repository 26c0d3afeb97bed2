use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum HubError {
    #[error("The connection hub has stopped")]
    Stopped,
    #[error("Could not serialize the message: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for HubError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
