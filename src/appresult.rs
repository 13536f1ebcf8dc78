use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde::Serialize;

use crate::error::DrawError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    error: ErrorBody<'a>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    invalid: Option<&'a [String]>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(err) = self.0.downcast_ref::<DrawError>() {
            if let DrawError::Storage(source) = err {
                tracing::error!(error = %source, "storage failure");
            }
            let body = ErrorEnvelope {
                error: ErrorBody {
                    code: err.code(),
                    message: err.to_string(),
                    invalid: err.invalid_emails(),
                },
            };
            return (err.status(), Json(body)).into_response();
        }

        tracing::error!(error = ?self.0, "request failed");
        let body = ErrorEnvelope {
            error: ErrorBody {
                code: "internal_error",
                message: self.0.to_string(),
                invalid: None,
            },
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
