//! Error categorization.
//!
//! This module maps transport failures and HTTP status codes onto `ErrorType`.

use reqwest::StatusCode;

use super::types::ErrorType;

/// Categorizes an HTTP status that ended a chain without a redirect or success.
pub fn categorize_status(status: StatusCode) -> ErrorType {
    match status.as_u16() {
        403 => ErrorType::HttpRequestBotDetectionError,
        404 => ErrorType::HttpRequestNotFound,
        crate::config::HTTP_STATUS_TOO_MANY_REQUESTS => ErrorType::HttpRequestTooManyRequests,
        _ if status.is_server_error() => ErrorType::HttpRequestServerError,
        _ => ErrorType::HttpRequestErrorStatus,
    }
}

/// Categorizes a `reqwest::Error` into an `ErrorType`.
///
/// # Arguments
///
/// * `error` - The `reqwest::Error` to categorize
///
/// # Returns
///
/// The appropriate `ErrorType` for the error.
pub fn categorize_reqwest_error(error: &reqwest::Error) -> ErrorType {
    if let Some(status) = error.status() {
        return categorize_status(status);
    }

    if error.is_builder() {
        ErrorType::HttpRequestBuilderError
    } else if error.is_timeout() {
        ErrorType::HttpRequestTimeoutError
    } else if error.is_connect() {
        ErrorType::HttpRequestConnectError
    } else if error.is_body() || error.is_decode() {
        ErrorType::HttpRequestBodyError
    } else {
        ErrorType::HttpRequestOtherError
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_status_common_codes() {
        assert_eq!(
            categorize_status(StatusCode::FORBIDDEN),
            ErrorType::HttpRequestBotDetectionError
        );
        assert_eq!(
            categorize_status(StatusCode::NOT_FOUND),
            ErrorType::HttpRequestNotFound
        );
        assert_eq!(
            categorize_status(StatusCode::TOO_MANY_REQUESTS),
            ErrorType::HttpRequestTooManyRequests
        );
        assert_eq!(
            categorize_status(StatusCode::BAD_GATEWAY),
            ErrorType::HttpRequestServerError
        );
        assert_eq!(
            categorize_status(StatusCode::GONE),
            ErrorType::HttpRequestErrorStatus
        );
    }

    #[tokio::test]
    async fn test_categorize_connect_error() {
        // Port 9 (discard) on loopback is closed on test machines
        let client = reqwest::Client::new();
        let error = client
            .head("http://127.0.0.1:9/")
            .send()
            .await
            .expect_err("connection should be refused");
        let kind = categorize_reqwest_error(&error);
        assert!(
            kind == ErrorType::HttpRequestConnectError || kind == ErrorType::HttpRequestOtherError,
            "unexpected category {:?}",
            kind
        );
    }

    #[test]
    fn test_categorize_builder_error() {
        let client = reqwest::Client::new();
        let error = client
            .get("not a url")
            .build()
            .expect_err("invalid URL should fail to build");
        assert_eq!(
            categorize_reqwest_error(&error),
            ErrorType::HttpRequestBuilderError
        );
    }
}
