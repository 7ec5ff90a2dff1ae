use senser_core::error::{AssembleError, QueryError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    SQLError(#[from] sqlx::Error),
    #[error(transparent)]
    CacheError(#[from] redis::RedisError),
    #[error(transparent)]
    DocumentError(#[from] mongodb::error::Error),
    #[error("Wide-column query failed: {0}")]
    WideColumnError(std::string::String),
    #[error(transparent)]
    SearchError(#[from] reqwest::Error),
    #[error("Search index answered with status {0}")]
    SearchStatus(u16),
    #[error("Invalid JSON: {0}")]
    Parse(#[from] serde_json::error::Error),
    #[error("{store} timed out on {op}")]
    Timeout {
        store: &'static str,
        op: &'static str,
    },
    #[error("{0} is unreachable")]
    Unreachable(&'static str),
    #[error("Duplicate key: {0}")]
    Duplicate(std::string::String),
}

impl StoreError {
    pub fn wide_column<E: std::fmt::Display>(err: E) -> Self {
        StoreError::WideColumnError(err.to_string())
    }

    /// A concurrent insert hit a unique constraint
    pub fn is_unique_violation(&self) -> bool {
        match self {
            StoreError::SQLError(sqlx::Error::Database(db_err)) => {
                db_err.code().as_deref() == Some("23505")
            }
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Did not found sensor: {0}")]
    NotFound(i32),
    #[error("Sensor with same name already registered: {0}")]
    Conflict(std::string::String),
    #[error("Sensor {0} has an identity but no metadata")]
    InconsistentState(i32),
    #[error("Invalid argument: {0}")]
    InvalidArgument(std::string::String),
    #[error(transparent)]
    Unavailable(#[from] StoreError),
}

impl From<QueryError> for GatewayError {
    fn from(err: QueryError) -> Self {
        GatewayError::InvalidArgument(err.to_string())
    }
}

impl From<AssembleError> for GatewayError {
    fn from(err: AssembleError) -> Self {
        match err {
            AssembleError::IdMismatch(id, _) => GatewayError::InconsistentState(id),
        }
    }
}

impl GatewayError {
    /// Message exposed to callers, never carries backend detail
    pub fn public_message(&self) -> std::string::String {
        match self {
            GatewayError::NotFound(_) | GatewayError::InconsistentState(_) => {
                "Sensor not found".to_owned()
            }
            GatewayError::Conflict(_) => "Sensor with same name already registered".to_owned(),
            GatewayError::InvalidArgument(msg) => msg.clone(),
            GatewayError::Unavailable(_) => "Service unavailable".to_owned(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_query_errors_are_invalid_arguments() {
        let err: GatewayError = QueryError::InvalidBucketWidth("1 fortnight".to_owned()).into();
        assert!(matches!(err, GatewayError::InvalidArgument(_)));
    }

    #[test]
    fn test_public_message_hides_store() {
        let err: GatewayError = StoreError::Timeout {
            store: "cache",
            op: "get",
        }
        .into();
        assert_eq!("Service unavailable", err.public_message());
        assert_eq!(
            "Sensor not found",
            GatewayError::InconsistentState(3).public_message()
        );
    }
}
