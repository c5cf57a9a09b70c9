use axum::{Json, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, FixedOffset, Utc};
use engine::EngineError;

use api_types::ErrorBody;
pub use server::{ServerState, router, run, run_with_listener, spawn_with_listener};

mod installments;
mod loans;
mod members;
mod savings;
mod server;

pub enum ServerError {
    Engine(EngineError),
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_)
        | EngineError::InvalidTransition(_)
        | EngineError::AlreadyPaid(_) => StatusCode::CONFLICT,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::InvalidInput(_)
        | EngineError::InvalidCursor(_)
        | EngineError::InsufficientBalance(_)
        | EngineError::InsufficientPayment(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn kind_for_engine_error(err: &EngineError) -> &'static str {
    match err {
        EngineError::KeyNotFound(_) => "not_found",
        EngineError::ExistingKey(_) => "conflict",
        EngineError::InvalidInput(_) | EngineError::InvalidCursor(_) => "invalid_input",
        EngineError::InsufficientBalance(_) => "insufficient_balance",
        EngineError::InsufficientPayment(_) => "insufficient_payment",
        EngineError::AlreadyPaid(_) => "already_paid",
        EngineError::InvalidTransition(_) => "invalid_transition",
        EngineError::Database(_) => "storage_failure",
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => {
            tracing::warn!("request rejected: {other}");
            other.to_string()
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let ServerError::Engine(err) = self;
        let status = status_for_engine_error(&err);
        let kind = kind_for_engine_error(&err);
        let error = message_for_engine_error(err);

        (
            status,
            Json(ErrorBody {
                error,
                kind: kind.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

/// Normalizes a client timestamp to UTC.
fn to_utc(value: Option<DateTime<FixedOffset>>) -> Option<DateTime<Utc>> {
    value.map(|ts| ts.with_timezone(&Utc))
}
