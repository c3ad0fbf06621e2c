//! Extracts the opaque per-request user identity.
//!
//! Authentication and session management are out of scope (§1): the acting user is
//! supplied by whatever sits in front of this service, as a header.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;

pub const USER_HEADER: &str = "x-user-id";

/// The acting user for one request. Every `Store` call is scoped by this.
pub struct UserId(pub String);

impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_HEADER)
            .ok_or_else(|| (StatusCode::BAD_REQUEST, format!("missing {USER_HEADER} header")))?;
        let user = value
            .to_str()
            .map_err(|_| (StatusCode::BAD_REQUEST, format!("invalid {USER_HEADER} header")))?;
        if user.is_empty() {
            return Err((StatusCode::BAD_REQUEST, format!("empty {USER_HEADER} header")));
        }
        Ok(UserId(user.to_string()))
    }
}
