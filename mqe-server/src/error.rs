//! Error types for mqe-server
//!
//! `ValidationError` is produced by the Validation Engine, `ProtocolError` by
//! every command/query of the meeting engine, and `ApiError` maps both onto
//! HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use mqe_common::Phase;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Structural problems with a submission payload
///
/// Always surfaced verbatim to the caller; nothing is coerced or corrected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} = {value} is outside [{min}, {max}]")]
    ScoreOutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Incomplete contribution set: {0}")]
    IncompleteContributionSet(String),

    #[error("Evaluation does not cover participants/tasks: {missing:?}")]
    IncompleteEvaluationSet { missing: Vec<Uuid> },

    #[error("Participant {0} listed more than once")]
    DuplicateParticipant(Uuid),

    #[error("Participants may not evaluate themselves or their own task")]
    SelfEvaluationNotAllowed,

    #[error("Deadline {deadline} is before {today}")]
    InvalidDeadline { deadline: NaiveDate, today: NaiveDate },

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("User {0} is not a participant of this meeting")]
    UnknownParticipant(Uuid),

    #[error("Task by {0} is not open for evaluation by this participant")]
    TaskNotEvaluable(Uuid),
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::ScoreOutOfRange { .. } => "SCORE_OUT_OF_RANGE",
            ValidationError::IncompleteContributionSet(_) => "INCOMPLETE_CONTRIBUTION_SET",
            ValidationError::IncompleteEvaluationSet { .. } => "INCOMPLETE_EVALUATION_SET",
            ValidationError::DuplicateParticipant(_) => "DUPLICATE_PARTICIPANT",
            ValidationError::SelfEvaluationNotAllowed => "SELF_EVALUATION_NOT_ALLOWED",
            ValidationError::InvalidDeadline { .. } => "INVALID_DEADLINE",
            ValidationError::MissingField(_) => "MISSING_FIELD",
            ValidationError::UnknownParticipant(_) => "UNKNOWN_PARTICIPANT",
            ValidationError::TaskNotEvaluable(_) => "TASK_NOT_EVALUABLE",
        }
    }
}

/// Errors of the meeting protocol
///
/// Every mutating operation that returns one of these has had no effect.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Only the meeting creator may perform this action")]
    NotCreator,

    #[error("Caller is not a participant of this meeting")]
    NotAParticipant,

    #[error("Meeting is finished; submissions are closed")]
    MeetingFinished,

    #[error("Meeting is already finished")]
    AlreadyFinished,

    #[error("Meeting has not reached phase {requested} (current: {current})")]
    PhaseNotReached { requested: Phase, current: Phase },

    #[error("Cannot move meeting from {from} to {to}")]
    InvalidTransition { from: Phase, to: Phase },

    #[error("Meeting is not finished yet")]
    MeetingNotFinished,

    #[error("Only the task author may edit this task")]
    NotTaskAuthor,

    #[error("Not found: {0}")]
    NotFound(String),

    /// Uniqueness violation (e.g. a taken username)
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] mqe_common::Error),
}

impl From<sqlx::Error> for ProtocolError {
    fn from(e: sqlx::Error) -> Self {
        ProtocolError::Storage(mqe_common::Error::Database(e))
    }
}

impl ProtocolError {
    pub fn code(&self) -> &'static str {
        match self {
            ProtocolError::NotCreator => "NOT_CREATOR",
            ProtocolError::NotAParticipant => "NOT_A_PARTICIPANT",
            ProtocolError::MeetingFinished => "MEETING_FINISHED",
            ProtocolError::AlreadyFinished => "ALREADY_FINISHED",
            ProtocolError::PhaseNotReached { .. } => "PHASE_NOT_REACHED",
            ProtocolError::InvalidTransition { .. } => "INVALID_TRANSITION",
            ProtocolError::MeetingNotFinished => "MEETING_NOT_FINISHED",
            ProtocolError::NotTaskAuthor => "NOT_TASK_AUTHOR",
            ProtocolError::NotFound(_) => "NOT_FOUND",
            ProtocolError::Conflict(_) => "CONFLICT",
            ProtocolError::Validation(e) => e.code(),
            ProtocolError::Storage(_) => "STORAGE_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ProtocolError::NotCreator
            | ProtocolError::NotAParticipant
            | ProtocolError::NotTaskAuthor => StatusCode::FORBIDDEN,
            ProtocolError::MeetingFinished
            | ProtocolError::AlreadyFinished
            | ProtocolError::PhaseNotReached { .. }
            | ProtocolError::InvalidTransition { .. }
            | ProtocolError::MeetingNotFinished
            | ProtocolError::Conflict(_) => StatusCode::CONFLICT,
            ProtocolError::NotFound(_) => StatusCode::NOT_FOUND,
            ProtocolError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ProtocolError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Result type for meeting engine operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Protocol rejection or storage failure
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Missing or malformed caller identity (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::Protocol(ProtocolError::Validation(e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            ApiError::Protocol(err) => {
                if let ProtocolError::Storage(inner) = err {
                    tracing::error!(error = %inner, "Storage failure while handling request");
                }
                (err.status(), err.code(), err.to_string())
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_codes_pass_through() {
        let err: ProtocolError = ValidationError::SelfEvaluationNotAllowed.into();
        assert_eq!(err.code(), "SELF_EVALUATION_NOT_ALLOWED");
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_authorization_errors_are_forbidden() {
        assert_eq!(ProtocolError::NotCreator.status(), StatusCode::FORBIDDEN);
        assert_eq!(ProtocolError::NotAParticipant.status(), StatusCode::FORBIDDEN);
        assert_eq!(ProtocolError::NotTaskAuthor.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_state_errors_are_conflicts() {
        let errors = [
            ProtocolError::MeetingFinished,
            ProtocolError::AlreadyFinished,
            ProtocolError::MeetingNotFinished,
            ProtocolError::PhaseNotReached {
                requested: Phase::TaskPlanning,
                current: Phase::EmotionalEvaluation,
            },
            ProtocolError::InvalidTransition {
                from: Phase::TaskPlanning,
                to: Phase::EmotionalEvaluation,
            },
        ];
        for err in errors {
            assert_eq!(err.status(), StatusCode::CONFLICT, "{}", err.code());
        }
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        use http_body_util::BodyExt;

        let response = ApiError::from(ProtocolError::NotCreator).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "NOT_CREATOR");
        assert!(body["error"]["message"].is_string());
    }
}
