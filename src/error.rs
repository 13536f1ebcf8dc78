use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

/// Everything a pick or a room draw can refuse with.
#[derive(Debug, Error)]
pub enum DrawError {
    #[error("this caller has already picked")]
    AlreadyPicked,

    #[error("there is nobody to pick from")]
    NoParticipants,

    #[error("{0}")]
    InvalidInput(String),

    #[error("invalid email addresses: {}", .0.join(", "))]
    InvalidEmail(Vec<String>),

    #[error("room {0} not found")]
    NotFound(Uuid),

    #[error("room is no longer active")]
    NotActive,

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl DrawError {
    pub fn code(&self) -> &'static str {
        use DrawError::*;
        match self {
            AlreadyPicked => "already_picked",
            NoParticipants => "no_participants",
            InvalidInput(_) => "invalid_input",
            InvalidEmail(_) => "invalid_email",
            NotFound(_) => "not_found",
            NotActive => "not_active",
            Storage(_) => "storage_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        use DrawError::*;
        match self {
            AlreadyPicked | NoParticipants | NotActive => StatusCode::CONFLICT,
            InvalidInput(_) | InvalidEmail(_) => StatusCode::BAD_REQUEST,
            NotFound(_) => StatusCode::NOT_FOUND,
            Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Addresses rejected by [`DrawError::InvalidEmail`], if that's what this is.
    pub fn invalid_emails(&self) -> Option<&[String]> {
        match self {
            DrawError::InvalidEmail(invalid) => Some(invalid),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let errors = [
            DrawError::AlreadyPicked,
            DrawError::NoParticipants,
            DrawError::InvalidInput("x".into()),
            DrawError::InvalidEmail(vec![]),
            DrawError::NotFound(Uuid::nil()),
            DrawError::NotActive,
            DrawError::Storage(sqlx::Error::RowNotFound),
        ];
        let mut codes: Vec<_> = errors.iter().map(DrawError::code).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn invalid_email_message_lists_every_address() {
        let err = DrawError::InvalidEmail(vec!["a".into(), "b@".into()]);
        assert_eq!(err.to_string(), "invalid email addresses: a, b@");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
