use crate::{errors::ServiceError, ApiResponse};
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

/// Handler result for endpoints that create a resource
pub type CreatedResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ServiceError>;

/// Standard created response
pub fn created<T>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}

/// `text/csv` download with an attachment file name
pub fn csv_attachment(file_name: &str, body: String) -> Response {
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", file_name))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    (
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/csv; charset=utf-8"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}

/// Raw bytes served inline with their stored content type
pub fn inline_document(file_name: &str, content_type: &str, bytes: Vec<u8>) -> Response {
    let content_type = HeaderValue::from_str(content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let sanitized: String = file_name
        .chars()
        .filter(|c| !c.is_control() && *c != '"')
        .collect();
    let disposition = HeaderValue::from_str(&format!("inline; filename=\"{}\"", sanitized))
        .unwrap_or_else(|_| HeaderValue::from_static("inline"));
    (
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}

/// Splits a comma separated query value into trimmed, non-empty parts
pub fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Parses `asc`/`desc`; anything else is a client error
pub fn parse_sort_order(raw: Option<&str>) -> Result<bool, ServiceError> {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") | Some("asc") => Ok(false),
        Some("desc") => Ok(true),
        Some(other) => Err(ServiceError::BadRequest(format!(
            "unsupported sort_order '{}'; expected asc or desc",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_order_parsing() {
        assert!(!parse_sort_order(None).unwrap());
        assert!(!parse_sort_order(Some("ASC")).unwrap());
        assert!(parse_sort_order(Some("desc")).unwrap());
        assert!(parse_sort_order(Some("sideways")).is_err());
    }

    #[test]
    fn list_splitting() {
        assert_eq!(split_list(Some(" a, ,b ")), vec!["a", "b"]);
        assert!(split_list(None).is_empty());
    }

    #[test]
    fn csv_attachment_headers() {
        let response = csv_attachment("inventory.csv", "a,b\n".to_string());
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"inventory.csv\""
        );
    }
}
