use std::time::Duration;

use chrono::{DateTime, Utc};
use intake_protocol::ExceptionResponse;
use intake_session::ApiError;
use reqwest::header::RETRY_AFTER;

/// Longest raw body excerpt kept in an error message.
const MAX_BODY_EXCERPT: usize = 512;

/// Parses a `Retry-After` value: delay seconds or an HTTP date.
///
/// Dates in the past yield a zero delay.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}

/// Converts a non-success response into an [`ApiError`].
pub(crate) async fn error_from_response(resp: reqwest::Response) -> ApiError {
    let status = resp.status().as_u16();
    let retry_after = resp
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| parse_retry_after(v, Utc::now()));
    let body = resp.text().await.unwrap_or_default();

    ApiError::Status {
        status,
        message: describe_body(&body),
        retry_after,
    }
}

/// Summarises an error body: the exception details if the body is an
/// exception response, else a truncated excerpt.
fn describe_body(body: &str) -> String {
    if let Ok(exception) = serde_json::from_str::<ExceptionResponse>(body) {
        let summary = exception.summary();
        if !summary.is_empty() {
            return summary;
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    match trimmed.char_indices().nth(MAX_BODY_EXCERPT) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

/// Maps a transport-level `reqwest` failure.
pub(crate) fn transport_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout(e.to_string())
    } else if e.is_decode() {
        ApiError::Decode(e.to_string())
    } else {
        ApiError::Connect(e.to_string())
    }
}
