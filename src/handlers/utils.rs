// handlers/utils.rs - Request parsing helpers shared by all handlers

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path,
    },
    Json,
};
use uuid::Uuid;

use crate::error::ApiError;

/// Unwrap a JSON body taken as `Result` so guards can run before parsing
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::invalid_json(rejection.body_text()))
}

/// Unwrap a UUID path segment, 400 in the envelope when malformed
pub fn path_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

/// Required field, 400 when absent
pub fn required<T>(value: Option<T>, field: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::bad_request(format!("Missing required field: {}", field)))
}

/// Required string field, 400 when absent or blank
pub fn required_str(value: Option<String>, field: &str) -> Result<String, ApiError> {
    match value {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(ApiError::bad_request(format!("Missing required field: {}", field))),
    }
}

/// Parse a required enum-like field, 400 when absent or unknown
pub fn required_parse<T: std::str::FromStr>(value: Option<String>, field: &str) -> Result<T, ApiError>
where
    T::Err: std::fmt::Display,
{
    let raw = required_str(value, field)?;
    raw.parse::<T>()
        .map_err(|e| ApiError::bad_request(format!("Invalid {}: {}", field, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    #[test]
    fn blank_strings_count_as_missing() {
        assert!(required_str(Some("  ".to_string()), "name").is_err());
        assert_eq!(required_str(Some(" Acme ".to_string()), "name").unwrap(), "Acme");

        let err = required::<u8>(None, "plan").unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.message(), "Missing required field: plan");
    }

    #[test]
    fn parses_enum_fields() {
        let role: Role = required_parse(Some("Admin".to_string()), "role").unwrap();
        assert_eq!(role, Role::Admin);

        let err = required_parse::<Role>(Some("owner".to_string()), "role").unwrap_err();
        assert_eq!(err.status_code(), 400);
    }
}
