use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use smbridge_auth::Notice;

/// Response header carrying one recoverable notice per value.
pub const NOTICE_HEADER: HeaderName = HeaderName::from_static("x-smbridge-notice");

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// `302 Found` to `location`.
pub fn redirect(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "invalid_redirect",
            "redirect target is not a valid header value",
        ),
    }
}

/// Attach notices to the response; ones that cannot be a header value are logged only.
pub fn append_notices(response: &mut Response, notices: &[Notice]) {
    for notice in notices {
        let message = notice.to_string();
        match HeaderValue::from_str(&message) {
            Ok(value) => {
                response.headers_mut().append(NOTICE_HEADER, value);
            }
            Err(_) => tracing::warn!(notice = %message, "notice not representable as header"),
        }
    }
}
