use core::str::FromStr;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::Response,
};

use orgdir_core::DomainError;

use crate::app::errors;

/// Unwrap a JSON body, turning any rejection into a 400 in the usual error shape.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| errors::json_error(StatusCode::BAD_REQUEST, "invalid_body", rejection.body_text()))
}

/// Parse a path identifier, answering 400 when it is malformed.
pub fn parse_id<T>(raw: &str) -> Result<T, Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse::<T>()
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string()))
}
