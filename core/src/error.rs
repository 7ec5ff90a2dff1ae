use std::error;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum QueryError {
    InvalidBucketWidth(std::string::String),
    InvalidExpression(std::string::String),
    InvalidField(std::string::String),
    InvalidSearchMode(std::string::String),
    InvalidRange(std::string::String),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            QueryError::InvalidBucketWidth(msg) => write!(f, "Invalid bucket width: {}", msg),
            QueryError::InvalidExpression(msg) => write!(f, "Invalid query expression: {}", msg),
            QueryError::InvalidField(msg) => write!(f, "Invalid search field: {}", msg),
            QueryError::InvalidSearchMode(msg) => write!(f, "Invalid search mode: {}", msg),
            QueryError::InvalidRange(msg) => write!(f, "Invalid range: {}", msg),
        }
    }
}

impl error::Error for QueryError {}

#[derive(Debug, Clone, PartialEq)]
pub enum AssembleError {
    /// Identity and metadata disagree on the sensor id
    IdMismatch(i32, i32),
}

impl fmt::Display for AssembleError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AssembleError::IdMismatch(identity, metadata) => write!(
                f,
                "identity {} cannot be merged with metadata {}",
                identity, metadata
            ),
        }
    }
}

impl error::Error for AssembleError {}
