//! Request body helpers.

use axum::{Json, extract::rejection::JsonRejection};

use crate::errors::{AdminError, Result};

/// Unwrap a JSON body, reporting malformed input as a validation error
pub(crate) fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AdminError::Validation(rejection.body_text()))
}
