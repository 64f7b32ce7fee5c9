use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::{jwt::JwtKeys, permissions::Actor};
use crate::error::AppError;

/// Extracts and validates the bearer token, yielding the acting user.
pub struct AuthUser(pub Actor);

/// Like [`AuthUser`], but anonymous requests pass through as `None`.
pub struct MaybeAuthUser(pub Option<Actor>);

fn bearer_token(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(header) = parts.headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = header
        .to_str()
        .map_err(|_| AppError::Unauthenticated("invalid Authorization header"))?;
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(Some)
        .ok_or(AppError::Unauthenticated("invalid auth scheme"))
}

fn actor_from_token(keys: &JwtKeys, token: &str) -> Result<Actor, AppError> {
    match keys.verify_access(token) {
        Ok(claims) => Ok(Actor {
            id: claims.sub,
            role: claims.role,
        }),
        Err(e) => {
            warn!(error = %e, "invalid or expired token");
            Err(AppError::Unauthenticated("invalid or expired token"))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?
            .ok_or(AppError::Unauthenticated("missing Authorization header"))?;
        let keys = JwtKeys::from_ref(state);
        actor_from_token(&keys, token).map(AuthUser)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            Some(token) => {
                let keys = JwtKeys::from_ref(state);
                actor_from_token(&keys, token).map(|actor| MaybeAuthUser(Some(actor)))
            }
            None => Ok(MaybeAuthUser(None)),
        }
    }
}
