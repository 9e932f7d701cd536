use axum::{extract::FromRequestParts, http::header, http::request::Parts};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Claims of the externally issued access token. The identity provider owns
/// registration, login and token minting; this service only verifies the
/// signature and reads subject + role.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Sales,
    Technician,
    Customer,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "admin" => Some(Role::Admin),
            "sales" => Some(Role::Sales),
            "technician" => Some(Role::Technician),
            "customer" => Some(Role::Customer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

pub fn ensure_role(user: &AuthUser, role: Role) -> Result<(), AppError> {
    if user.role != role {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, Role::Admin)
}

/// Staff-only surfaces (inventory views) admit admin and sales roles.
pub fn ensure_staff(user: &AuthUser) -> Result<(), AppError> {
    match user.role {
        Role::Admin | Role::Sales => Ok(()),
        _ => Err(AppError::Forbidden),
    }
}

fn auth_user_from_parts(parts: &Parts) -> Result<AuthUser, AppError> {
    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or(AppError::Unauthorized)?;

    let auth_str = auth_header.to_str().map_err(|_| AppError::Unauthorized)?;

    if !auth_str.starts_with("Bearer ") {
        return Err(AppError::Unauthorized);
    }
    let token = auth_str.trim_start_matches("Bearer ").trim();

    let secret = std::env::var("JWT_SECRET")
        .map_err(|_| AppError::Internal(anyhow::anyhow!("JWT_SECRET is not set")))?;

    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?;

    let user_id = Uuid::parse_str(&decoded.claims.sub).map_err(|_| AppError::Unauthorized)?;
    let role = Role::parse(&decoded.claims.role).ok_or(AppError::Forbidden)?;

    Ok(AuthUser { user_id, role })
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        auth_user_from_parts(parts)
    }
}

/// Cart routes accept either an authenticated user or an anonymous session.
/// Resolution order: bearer token, `x-session-id` header, `session_id` cookie.
/// Supplying neither is a caller error.
#[derive(Debug, Clone)]
pub enum ShopperIdentity {
    User(Uuid),
    Session(String),
}

fn session_from_cookie(parts: &Parts) -> Option<String> {
    let cookies = parts.headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == "session_id" && !value.is_empty()).then(|| value.to_string())
    })
}

impl<S> FromRequestParts<S> for ShopperIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if parts.headers.contains_key(header::AUTHORIZATION) {
            let user = auth_user_from_parts(parts)?;
            return Ok(ShopperIdentity::User(user.user_id));
        }

        if let Some(session) = parts
            .headers
            .get("x-session-id")
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
        {
            return Ok(ShopperIdentity::Session(session.to_string()));
        }

        if let Some(session) = session_from_cookie(parts) {
            return Ok(ShopperIdentity::Session(session));
        }

        Err(AppError::Validation(
            "a user token or session id is required".into(),
        ))
    }
}
