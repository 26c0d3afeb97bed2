use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use settle_engine::{ChainError, HubError, MonitorError, SplitError, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("The request conflicts with the current state of the bill. {0}")]
    Conflict(String),
    #[error("The service is temporarily unavailable. {0}")]
    ServiceUnavailable(String),
    #[error("{0}")]
    SplitError(#[from] SplitError),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::SplitError(e) => match e {
                SplitError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
                SplitError::NotFound(_) => StatusCode::NOT_FOUND,
                SplitError::Inconsistent { .. } => StatusCode::CONFLICT,
                SplitError::Incomplete { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            },
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<StoreError> for ServerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::BillNotFound(_) | StoreError::TableNotFound(_) => Self::NoRecordFound(e.to_string()),
            StoreError::BillClosed(_) => Self::Conflict(e.to_string()),
            StoreError::Backend(_) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<MonitorError> for ServerError {
    fn from(e: MonitorError) -> Self {
        match e {
            MonitorError::BillNotFound(_) => Self::NoRecordFound(e.to_string()),
            MonitorError::BillClosed(_) => Self::Conflict(e.to_string()),
            MonitorError::Transient(_) => Self::ServiceUnavailable(e.to_string()),
            MonitorError::Fatal(_) | MonitorError::AlreadyStarted => Self::BackendError(e.to_string()),
        }
    }
}

impl From<ChainError> for ServerError {
    fn from(e: ChainError) -> Self {
        match e {
            ChainError::MalformedEvent(_) => Self::InvalidRequestBody(e.to_string()),
            e if e.is_transient() => Self::ServiceUnavailable(e.to_string()),
            e => Self::BackendError(e.to_string()),
        }
    }
}

impl From<HubError> for ServerError {
    fn from(e: HubError) -> Self {
        match e {
            HubError::Stopped => Self::ServiceUnavailable(e.to_string()),
            HubError::Serialization(_) => Self::BackendError(e.to_string()),
        }
    }
}
