//! PSK-based authentication and caller identity.
//!
//! Three layers, checked independently:
//! - `x-api-key` (or a bearer token) gates the whole API,
//! - `x-account-id` names the calling account for operator actions,
//! - `x-admin-key` guards account provisioning.
//!
//! Key comparisons are constant-time to mitigate timing attacks.

use axum::{
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use subtle::ConstantTimeEq;

use crate::config::Config;
use crate::errors::{codes, AppError, AppErrorWithRevision, ErrorDetails, ErrorResponse};
use crate::models::CallerIdentity;
use crate::AppState;

/// Header name for the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Header naming the calling account.
pub const ACCOUNT_HEADER: &str = "x-account-id";

/// Header carrying the provisioning key.
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// PSK authentication layer function that takes the expected PSK as a parameter.
pub async fn psk_auth_layer(
    expected_psk: Option<String>,
    request: Request,
    next: Next,
) -> Response {
    // If no PSK is configured, allow all requests (dev mode)
    let Some(expected) = expected_psk else {
        return next.run(request).await;
    };

    let provided = header_value(request.headers(), API_KEY_HEADER).or_else(|| {
        request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(|s| s.to_string())
    });

    match provided {
        Some(key) if constant_time_compare(&key, &expected) => next.run(request).await,
        Some(_) => unauthorized_response("Invalid API key"),
        None => unauthorized_response("Missing or invalid API key"),
    }
}

/// Check the provisioning key. Without a configured key, provisioning is
/// unavailable rather than open.
pub fn require_admin_key(headers: &HeaderMap, config: &Config) -> Result<(), AppError> {
    let Some(expected) = config.admin_psk.as_deref() else {
        return Err(AppError::Configuration(
            "QUEUE_ADMIN_PSK is not set; account provisioning is disabled".to_string(),
        ));
    };

    match header_value(headers, ADMIN_KEY_HEADER) {
        Some(key) if constant_time_compare(&key, expected) => Ok(()),
        _ => Err(AppError::Unauthorized("Missing or invalid admin key".to_string())),
    }
}

/// The account performing the request, if it named an active one.
///
/// Unknown, inactive or profile-less accounts extract as `Caller(None)`;
/// handlers decide whether that is acceptable.
pub struct Caller(pub Option<CallerIdentity>);

impl FromRequestParts<AppState> for Caller {
    type Rejection = AppErrorWithRevision;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(account_id) = header_value(&parts.headers, ACCOUNT_HEADER) else {
            return Ok(Caller(None));
        };

        match state.repo.get_account(&account_id).await {
            Ok(account) => Ok(Caller(account.and_then(|a| a.identity()))),
            Err(error) => Err(AppErrorWithRevision {
                error,
                revision_id: 0,
            }),
        }
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|s| s.to_string())
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorResponse {
        success: false,
        error: ErrorDetails {
            code: codes::UNAUTHORIZED.to_string(),
            message: message.to_string(),
            details: None,
        },
        revision_id: 0,
    };

    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn config(admin_psk: Option<&str>) -> Config {
        Config {
            admin_psk: admin_psk.map(str::to_string),
            ..Config::default()
        }
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("test-key-123", "test-key-123"));
        assert!(!constant_time_compare("test-key-123", "test-key-124"));
        assert!(!constant_time_compare("short", "much-longer-key"));
        assert!(constant_time_compare("", ""));
    }

    #[test]
    fn test_admin_key_without_configuration() {
        let err = require_admin_key(&HeaderMap::new(), &config(None)).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
        assert_eq!(err.message(), crate::errors::CONFIGURATION_MESSAGE);
    }

    #[test]
    fn test_admin_key_must_match() {
        let mut headers = HeaderMap::new();
        assert!(matches!(
            require_admin_key(&headers, &config(Some("s3cret"))),
            Err(AppError::Unauthorized(_))
        ));

        headers.insert(ADMIN_KEY_HEADER, HeaderValue::from_static("wrong"));
        assert!(require_admin_key(&headers, &config(Some("s3cret"))).is_err());

        headers.insert(ADMIN_KEY_HEADER, HeaderValue::from_static("s3cret"));
        assert!(require_admin_key(&headers, &config(Some("s3cret"))).is_ok());
    }
}
