/*!
 * # Authentication Module
 *
 * HTTP Basic authentication for the cart API.
 *
 * The middleware decodes the `Authorization` header into [`Credentials`],
 * hands them to the configured [`Authenticator`], and stores the resulting
 * [`AuthUser`] in the request extensions. Handlers take `AuthUser` as an
 * extractor and pass its id to the cart service as the owner.
 */

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::Engine as _;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

use crate::{errors::ServiceError, AppState};

/// Name and password pair taken from a Basic header
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub name: String,
    pub password: String,
}

impl Credentials {
    pub fn new(name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), AuthError> {
        if self.name.trim().is_empty() {
            return Err(AuthError::MissingUserName);
        }
        if self.password.is_empty() {
            return Err(AuthError::MissingPassword);
        }
        Ok(())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("name", &self.name)
            .field("password", &"***")
            .finish()
    }
}

/// Authenticated principal resolved from credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i64,
    pub name: String,
}

/// Resolves credentials to a principal.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, credentials: Credentials) -> Result<AuthUser, AuthError>;
}

/// Fixed user directory: known names get their configured id, everyone
/// else gets the fallback id. Passwords are only checked for presence.
#[derive(Debug, Clone)]
pub struct DirectoryAuthenticator {
    users: HashMap<String, i64>,
    fallback_id: i64,
}

impl DirectoryAuthenticator {
    pub fn new(users: HashMap<String, i64>, fallback_id: i64) -> Self {
        Self { users, fallback_id }
    }
}

impl Default for DirectoryAuthenticator {
    fn default() -> Self {
        let users = [("test".to_string(), 1), ("hacker".to_string(), 2)]
            .into_iter()
            .collect();
        Self::new(users, 3)
    }
}

#[async_trait]
impl Authenticator for DirectoryAuthenticator {
    async fn authenticate(&self, credentials: Credentials) -> Result<AuthUser, AuthError> {
        credentials.validate()?;

        let user_id = self
            .users
            .get(&credentials.name)
            .copied()
            .unwrap_or(self.fallback_id);

        Ok(AuthUser {
            user_id,
            name: credentials.name,
        })
    }
}

/// Authentication error types
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Unsupported authentication scheme")]
    UnsupportedScheme,

    #[error("Malformed basic credentials")]
    MalformedCredentials,

    #[error("no user name provided")]
    MissingUserName,

    #[error("no password provided")]
    MissingPassword,
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        ServiceError::Unauthorized(err.to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        debug!(reason = %self, "authentication failed");
        ServiceError::from(self).into_response()
    }
}

/// Parses `Authorization: Basic <base64(name:password)>`.
///
/// The decoded payload is split on the first `:`, so passwords may
/// themselves contain colons.
pub fn parse_basic_auth(headers: &HeaderMap) -> Result<Credentials, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingAuth)?
        .to_str()
        .map_err(|_| AuthError::MalformedCredentials)?;

    let (scheme, encoded) = value
        .split_once(' ')
        .ok_or(AuthError::UnsupportedScheme)?;
    if scheme != "Basic" {
        return Err(AuthError::UnsupportedScheme);
    }

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|_| AuthError::MalformedCredentials)?;
    let payload = String::from_utf8(decoded).map_err(|_| AuthError::MalformedCredentials)?;

    let (name, password) = payload
        .split_once(':')
        .ok_or(AuthError::MalformedCredentials)?;

    Ok(Credentials::new(name, password))
}

/// Authentication middleware for the `/v1` routes
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let credentials = match parse_basic_auth(request.headers()) {
        Ok(credentials) => credentials,
        Err(e) => return e.into_response(),
    };

    match state.authenticator.authenticate(credentials).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}
