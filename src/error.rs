use axum::{
    Json,
    extract::{
        FromRequest,
        multipart::{MultipartError, MultipartRejection},
        rejection::{FormRejection, JsonRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::{db::StorageError, registry::intake::ValidationError, remote::RemoteServiceError};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    PayloadTooLarge(String),

    /// `message` is what the client sees; `source` only reaches the logs.
    #[error("{message}")]
    Storage {
        message: &'static str,
        #[source]
        source: StorageError,
    },

    #[error(transparent)]
    RemoteService(#[from] RemoteServiceError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Request bodies that could not be read. Oversized ones keep their 413.
    pub fn rejected(status: StatusCode, message: String) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(message)
        } else {
            Self::BadRequest(message)
        }
    }

    pub fn status(&self) -> StatusCode {
        use AppError::*;
        match self {
            Validation(_) | BadRequest(_) => StatusCode::BAD_REQUEST,
            NotFound(_) => StatusCode::NOT_FOUND,
            PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Storage { .. } | RemoteService(_) | Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::Storage { message, source } => {
                error!("{message}: {source}");
                message.to_string()
            }
            AppError::RemoteService(err) => {
                error!("remote service failure: {err}");
                err.to_string()
            }
            AppError::Internal(err) => {
                error!("{err}\n\n{}", err.backtrace());
                "Internal server error".to_owned()
            }
            other => other.to_string(),
        };

        (self.status(), Json(json!({ "message": message }))).into_response()
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        Self::rejected(err.status(), format!("Malformed form data: {}", err.body_text()))
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::rejected(rejection.status(), rejection.body_text())
    }
}

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        Self::rejected(rejection.status(), rejection.body_text())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::rejected(rejection.status(), rejection.body_text())
    }
}

/// `Json` whose rejections answer with the usual `{"message"}` body.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// Attaches the client-facing message to a failed store call.
pub trait StorageContext<T> {
    fn storage_failure(self, message: &'static str) -> AppResult<T>;
}

impl<T> StorageContext<T> for Result<T, StorageError> {
    fn storage_failure(self, message: &'static str) -> AppResult<T> {
        self.map_err(|source| AppError::Storage { message, source })
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use serde::Deserialize;
    use serde_json::Value;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Birthday {
        #[allow(dead_code)]
        date_of_birth: String,
    }

    async fn extract(body: &'static str) -> Result<JsonBody<Birthday>, AppError> {
        let request = Request::put("/api/admin")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        JsonBody::<Birthday>::from_request(request, &()).await
    }

    #[tokio::test]
    async fn json_rejections_become_json_messages() {
        let err = extract(r#"{"date_of_birth": 19900723}"#).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));

        assert!(extract(r#"{"date_of_birth": "1990-07-23"}"#).await.is_ok());
    }

    #[test]
    fn oversized_bodies_keep_their_status() {
        let err = AppError::rejected(StatusCode::PAYLOAD_TOO_LARGE, "length limit exceeded".to_owned());
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let err = AppError::rejected(StatusCode::UNPROCESSABLE_ENTITY, "bad field".to_owned());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
