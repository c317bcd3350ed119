use actix_web::body::BoxBody;
use actix_web::error::BlockingError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, FilmorateError>;

#[derive(thiserror::Error, Debug)]
pub enum FilmorateError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("An unspecified internal error ocurred: {0}")]
    InternalError(#[from] anyhow::Error),
    #[error("A database error ocurred: {0}")]
    DatabaseError(#[from] diesel::result::Error),
    #[error("An unspecified internal error ocurred")]
    BlockingError(#[from] BlockingError),
}

impl FilmorateError {
    pub fn validation(message: impl Into<String>) -> Self {
        FilmorateError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        FilmorateError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        FilmorateError::Conflict(message.into())
    }

    fn get_error_code(&self) -> String {
        match self {
            FilmorateError::Validation(_) => "VE-00400".to_string(),
            FilmorateError::NotFound(_) => "NF-00404".to_string(),
            FilmorateError::Conflict(_) => "CF-00409".to_string(),
            FilmorateError::InternalError(_) => "IE-00500".to_string(),
            FilmorateError::DatabaseError(_) => "DE-00500".to_string(),
            FilmorateError::BlockingError(_) => "BE-00500".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub message: String,
    pub status: u16,
    pub timestamp: NaiveDateTime,
    pub internal_code: String,
}

impl From<&FilmorateError> for ErrorResponse {
    fn from(value: &FilmorateError) -> Self {
        Self {
            message: value.to_string(),
            status: value.status_code().as_u16(),
            timestamp: chrono::Utc::now().naive_utc(),
            internal_code: value.get_error_code(),
        }
    }
}

impl ResponseError for FilmorateError {
    fn status_code(&self) -> StatusCode {
        match &self {
            FilmorateError::Validation(_) => StatusCode::BAD_REQUEST,
            FilmorateError::NotFound(_) => StatusCode::NOT_FOUND,
            FilmorateError::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse<BoxBody> {
        if self.status_code().is_server_error() {
            log::error!("{}", self);
        }
        HttpResponse::build(self.status_code()).json(ErrorResponse::from(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_kinds_to_statuses() {
        assert_eq!(
            FilmorateError::validation("bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            FilmorateError::not_found("gone").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            FilmorateError::conflict("twice").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            FilmorateError::from(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn response_body_carries_message_and_code() {
        let err = FilmorateError::not_found("Film not found");
        let body = ErrorResponse::from(&err);
        assert_eq!(body.message, "Film not found");
        assert_eq!(body.status, 404);
        assert_eq!(body.internal_code, "NF-00404");
    }
}
