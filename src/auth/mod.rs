use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderName},
};
use log::debug;
use uuid::Uuid;

use crate::logs::AppError;
use crate::AppState;

pub const DEFAULT_IDENTITY_HEADER: &str = "x-user-id";

#[derive(Debug, PartialEq, Eq)]
pub enum AuthError {
    MissingCredential,
    InvalidCredential,
}

impl AuthError {
    pub fn message(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "Missing identity credential",
            AuthError::InvalidCredential => "Invalid identity credential",
        }
    }
}

/// Resolves the caller identity of an incoming request.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, parts: &Parts) -> Result<Uuid, AuthError>;
}

/// Trusts a header set by the gateway that verified the caller's token.
pub struct HeaderIdentityResolver {
    header: HeaderName,
}

impl HeaderIdentityResolver {
    pub fn new(header: &str) -> Result<Self, anyhow::Error> {
        let header = match HeaderName::try_from(header) {
            Ok(h) => h,
            Err(e) => {
                return Err(anyhow::Error::msg(format!(
                    "Invalid identity header {:?}: {}",
                    header, e
                )))
            }
        };
        Ok(Self { header })
    }
}

#[async_trait]
impl IdentityResolver for HeaderIdentityResolver {
    async fn resolve(&self, parts: &Parts) -> Result<Uuid, AuthError> {
        let value = parts
            .headers
            .get(&self.header)
            .ok_or(AuthError::MissingCredential)?;
        let raw = value.to_str().map_err(|_| AuthError::InvalidCredential)?;
        Uuid::parse_str(raw.trim()).map_err(|_| AuthError::InvalidCredential)
    }
}

/// Identity of the authenticated caller.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        match state.identity.resolve(parts).await {
            Ok(user_id) => Ok(Caller(user_id)),
            Err(e) => {
                debug!("rejecting {} {}: {:?}", parts.method, parts.uri, e);
                Err(AppError::Unauthorized(e.message()))
            }
        }
    }
}
