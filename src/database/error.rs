use std::fmt::{self, Display};

use serde::Serialize;
use warp::http::StatusCode;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    InternalServerError,
}

impl ErrorKind {
    pub fn new(self, info: &str) -> Error {
        Error {
            kind: self,
            field: None,
            info: info.to_string(),
        }
    }

    pub fn default(self) -> Error {
        let info = match self {
            ErrorKind::InvalidRequest => "Invalid request",
            ErrorKind::Unauthorized => "Authentication credentials were not provided",
            ErrorKind::Forbidden => "You don't have permission to perform this action",
            ErrorKind::NotFound => "Not found",
            ErrorKind::Conflict => "Already exists",
            ErrorKind::InternalServerError => "Internal server error",
        };
        self.new(info)
    }

    /// "Already exists" style conflicts answer 400, like every other client mistake.
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::InvalidRequest | ErrorKind::Conflict => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Request-scoped failure. Nothing produced here is fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{info}")]
pub struct Error {
    pub kind: ErrorKind,
    pub field: Option<String>,
    pub info: String,
}

impl Error {
    /// Binds the error to a request field.
    pub fn on(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            field: self.field.clone(),
            errors: self.info.clone(),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct ErrorBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub errors: String,
}

impl warp::reject::Reject for Error {}

#[derive(Debug)]
pub struct QueryError {
    kind: ErrorKind,
    info: String,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self {
            kind: ErrorKind::InternalServerError,
            info,
        }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) => {
                if e.is_unique_violation() {
                    log::trace!("> Unique violation {:?}", e.constraint());
                    Self {
                        kind: ErrorKind::Conflict,
                        info: String::from("Already exists"),
                    }
                } else if e.is_check_violation() {
                    log::trace!("> Check violation {:?}", e.constraint());
                    Self {
                        kind: ErrorKind::Conflict,
                        info: format!(
                            "Constraint violated: {}",
                            e.constraint().unwrap_or("check")
                        ),
                    }
                } else if e.is_foreign_key_violation() {
                    Self {
                        kind: ErrorKind::InvalidRequest,
                        info: String::from("Referenced object does not exist"),
                    }
                } else {
                    Self::new(format!("{e}"))
                }
            }
            sqlx::Error::RowNotFound => Self {
                kind: ErrorKind::NotFound,
                info: String::from("Not found"),
            },
            sqlx::Error::PoolTimedOut => Self::new(String::from("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(String::from("Pool closed")),
            sqlx::Error::WorkerCrashed => Self::new(String::from("Worker crashed")),
            sqlx::Error::Migrate(e) => Self::new(format!("{e}")),
            e => Self::new(format!("{e}")),
        }
    }
}

impl From<QueryError> for Error {
    fn from(value: QueryError) -> Self {
        if value.kind == ErrorKind::InternalServerError {
            log::error!("> Query failed: {}", value.info);
        }
        value.kind.new(&value.info)
    }
}

#[derive(Debug)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl From<TypeError> for Error {
    fn from(value: TypeError) -> Self {
        ErrorKind::InvalidRequest.new(&value.info)
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for TypeError {}
