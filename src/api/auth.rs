use async_trait::async_trait;
use axum::http::{header::AUTHORIZATION, request::Parts, HeaderMap};
use base64::{engine::general_purpose::STANDARD, Engine};

use super::ApiError;
use crate::cache::Credentials;

/// Credentials taken from an `Authorization: Basic ...` header.
#[derive(Debug)]
pub struct BasicAuth(pub Credentials);

#[async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for BasicAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        credentials_from_headers(&parts.headers)
            .map(Self)
            .ok_or(ApiError::MissingCredentials)
    }
}

fn credentials_from_headers(headers: &HeaderMap) -> Option<Credentials> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    // passwords may contain ':', usernames may not
    let (username, password) = decoded.split_once(':')?;
    Some(Credentials::new(username, password))
}
