//! Caller identity as forwarded by the upstream auth layer.
//!
//! The gateway in front of this service authenticates users and passes
//! `X-User-Id` / `X-User-Role`. When `API_KEY` is configured the gateway must
//! also present it as a bearer token, so the headers cannot be forged by
//! anything that reaches the service directly.

use super::response::ApiError;
use super::AppState;
use crate::error::LocalizationError;
use crate::security::{bearer_token, constant_time_compare};
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("admin") {
            Self::Admin
        } else {
            Self::User
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub role: Role,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Resolve the caller, enforcing the shared gateway token when one is set
pub fn identify(headers: &HeaderMap, api_key: Option<&str>) -> Result<Identity, LocalizationError> {
    if let Some(expected) = api_key {
        let presented = header_str(headers, AUTHORIZATION.as_str()).and_then(bearer_token);
        match presented {
            Some(token) if constant_time_compare(token, expected) => {}
            _ => return Err(LocalizationError::Unauthorized),
        }
    }

    let user_id = header_str(headers, USER_ID_HEADER).ok_or(LocalizationError::Unauthorized)?;
    let role = header_str(headers, USER_ROLE_HEADER)
        .map(Role::parse)
        .unwrap_or(Role::User);

    Ok(Identity {
        user_id: user_id.to_string(),
        role,
    })
}

/// Extractor for admin-only handlers: 401 without an identity, 403 for
/// non-admin callers.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Identity);

impl AdminUser {
    pub fn id(&self) -> &str {
        &self.0.user_id
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let identity = identify(&parts.headers, state.api_key.as_deref())?;
        if identity.role != Role::Admin {
            return Err(LocalizationError::Forbidden.into());
        }
        Ok(Self(identity))
    }
}
