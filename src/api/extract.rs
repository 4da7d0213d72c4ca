//! Request extractors whose rejections are [`ShopError`]s, so malformed input
//! answers with the same field-keyed 400 body as any other invalid payload.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use std::error::Error as _;

use crate::{ShopError, NON_FIELD_ERRORS};

/// JSON request body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ShopError))]
pub struct Payload<T>(pub T);

/// Path parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ShopError))]
pub struct Id<T>(pub T);

/// Query-string filters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ShopError))]
pub struct Filter<T>(pub T);

impl From<JsonRejection> for ShopError {
    fn from(rejection: JsonRejection) -> Self {
        match &rejection {
            JsonRejection::JsonDataError(e) => {
                let detail = e.source().map_or_else(|| e.body_text(), |source| source.to_string());
                let (field, message) = field_error(&detail);
                ShopError::invalid(&field, message)
            }
            _ => ShopError::invalid(NON_FIELD_ERRORS, rejection.body_text()),
        }
    }
}

impl From<PathRejection> for ShopError {
    fn from(rejection: PathRejection) -> Self { ShopError::invalid("id", rejection.body_text()) }
}

impl From<QueryRejection> for ShopError {
    fn from(rejection: QueryRejection) -> Self { ShopError::invalid(NON_FIELD_ERRORS, rejection.body_text()) }
}

/// Splits a deserializer message of the form `path: message` into its field
/// key and message; a missing field is keyed by the field itself.
fn field_error(detail: &str) -> (String, String) {
    let (path, message) = match detail.split_once(": ") {
        Some((path, message)) if !path.is_empty() && !path.contains(char::is_whitespace) => (Some(path), message),
        _ => (None, detail),
    };
    let missing = message.strip_prefix("missing field `").and_then(|rest| rest.split_once('`')).map(|(name, _)| name);
    match (path, missing) {
        (Some(path), Some(name)) => (format!("{path}.{name}"), "this field is required".into()),
        (None, Some(name)) => (name.to_string(), "this field is required".into()),
        (Some(path), None) => (path.to_string(), message.to_string()),
        (None, None) => (NON_FIELD_ERRORS.to_string(), detail.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_error_keys() {
        assert_eq!(
            field_error("positions[0].product_id: UUID parsing failed at line 1 column 30"),
            ("positions[0].product_id".into(), "UUID parsing failed at line 1 column 30".into())
        );
        assert_eq!(field_error("missing field `title` at line 1 column 2").0, "title");
        assert_eq!(field_error("positions[0]: missing field `amount` at line 1 column 9").0, "positions[0].amount");
        assert_eq!(field_error("invalid type: integer `1`, expected a map").0, NON_FIELD_ERRORS);
    }
}
