//! Mapping of registry outcomes onto HTTP status codes.

use std::fmt;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use validator::ValidationErrors;

use crate::db::StoreError;
use crate::registry::RegistryError;

/// Error body detail: a plain message or per-field validation errors.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Detail {
    Message(String),
    Fields(ValidationErrors),
}

impl fmt::Display for Detail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Detail::Message(message) => f.write_str(message),
            Detail::Fields(errors) => write!(f, "{errors}"),
        }
    }
}

impl From<String> for Detail {
    fn from(message: String) -> Self {
        Detail::Message(message)
    }
}

impl From<ValidationErrors> for Detail {
    fn from(errors: ValidationErrors) -> Self {
        Detail::Fields(errors)
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(Detail),

    #[error("{0}")]
    Unprocessable(Detail),

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    detail: &'a Detail,
}

#[derive(Serialize)]
struct MessageBody<'a> {
    detail: &'a str,
}

impl ApiError {
    /// Create requests report every rejection, validation included, as 400.
    pub fn rejected_create(err: RegistryError) -> Self {
        match err {
            RegistryError::Validation(errors) => ApiError::BadRequest(errors.into()),
            other => other.into(),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(_) => ApiError::NotFound(err.to_string()),
            RegistryError::AlreadyExists(_)
            | RegistryError::InvalidSortField(_)
            | RegistryError::InvalidSortOrder(_) => ApiError::BadRequest(err.to_string().into()),
            RegistryError::Validation(errors) => ApiError::Unprocessable(errors.into()),
            RegistryError::Store(source) => ApiError::Storage(source),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut response = HttpResponse::build(self.status_code());
        match self {
            ApiError::NotFound(message) => response.json(MessageBody { detail: message }),
            ApiError::BadRequest(detail) | ApiError::Unprocessable(detail) => {
                response.json(ErrorBody { detail })
            }
            ApiError::Storage(source) => {
                error!(error = %source, "patient storage failure");
                response.json(MessageBody {
                    detail: "internal storage error",
                })
            }
        }
    }
}
