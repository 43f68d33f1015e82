use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Gateway is not configured: {0} is not set")]
    MissingConfiguration(&'static str),
    #[error("Could not authenticate with the gateway: {0}")]
    AuthenticationFailed(String),
    #[error("Request to the gateway failed: {0}")]
    RequestError(String),
    #[error("Gateway responded with error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Could not deserialize gateway response: {0}")]
    JsonError(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Transaction {0} is unknown to the gateway")]
    TransactionNotFound(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GatewayError::JsonError(e.to_string())
        } else {
            GatewayError::RequestError(e.to_string())
        }
    }
}
