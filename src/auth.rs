use axum::{
    extract::{FromRequestParts, Json},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::env;
use std::future::Future;

use crate::error::AppError;

const AUTH_COOKIE_NAME: &str = "auth_token";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Donor,
    Recipient,
    Ngo,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Donor => "donor",
            Role::Recipient => "recipient",
            Role::Ngo => "ngo",
        }
    }
}

// Claims for our JWT. `sub` is the actor's profile id in its role table.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: i64,
    exp: usize,
    role: Role,
    name: String,
}

#[derive(Deserialize)]
pub struct DevLoginRequest {
    username: String,
    password: String,
    actor_id: i64,
    role: Role,
}

#[derive(Serialize)]
pub struct AuthResponse {
    token: String,
    actor_id: i64,
    role: Role,
}

/// Any authenticated actor, whatever the role.
pub struct AuthenticatedUser {
    pub actor_id: i64,
    pub role: Role,
    pub name: String,
}

/// An actor that must hold the NGO role. Status transitions and triage
/// actions require this precondition before the lifecycle code runs.
pub struct NgoActor {
    pub ngo_id: i64,
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync + 'static,
{
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            let token = extract_token_from_headers(&parts.headers)
                .ok_or_else(|| AppError::Authorization("missing auth token".to_string()))?;
            let claims = decode_claims(&token)?;
            Ok(AuthenticatedUser {
                actor_id: claims.sub,
                role: claims.role,
                name: claims.name,
            })
        }
    }
}

impl<S> FromRequestParts<S> for NgoActor
where
    S: Send + Sync + 'static,
{
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            let token = extract_token_from_headers(&parts.headers)
                .ok_or_else(|| AppError::Authorization("missing auth token".to_string()))?;
            let claims = decode_claims(&token)?;
            if claims.role != Role::Ngo {
                return Err(AppError::Authorization(format!(
                    "requires the ngo role, token carries {}",
                    claims.role.as_str()
                )));
            }
            Ok(NgoActor { ngo_id: claims.sub })
        }
    }
}

fn decode_claims(token: &str) -> Result<Claims, AppError> {
    let secret = env::var("JWT_SECRET").map_err(|_| {
        tracing::error!("JWT_SECRET not set");
        AppError::Authorization("server auth misconfigured".to_string())
    })?;

    let mut validation = Validation::default();
    validation.validate_exp = true;

    let token_data =
        decode::<Claims>(token, &DecodingKey::from_secret(secret.as_ref()), &validation).map_err(
            |e| {
                tracing::warn!("Token error: {}", e);
                AppError::Authorization("invalid token".to_string())
            },
        )?;
    Ok(token_data.claims)
}

pub fn validate_token_str(token: &str) -> Result<(), AppError> {
    decode_claims(token).map(|_| ())
}

pub async fn dev_login(Json(payload): Json<DevLoginRequest>) -> impl IntoResponse {
    let env_mode = env::var("RUST_ENV").unwrap_or_else(|_| "development".to_string());
    // Only allow dev login in development and if explicitly enabled
    if env_mode == "production" || env::var("ALLOW_DEV_LOGIN").unwrap_or_default() != "true" {
        return (StatusCode::FORBIDDEN, "Dev login disabled").into_response();
    }

    let dev_user = env::var("DEV_USERNAME").unwrap_or_else(|_| "admin".to_string());
    let dev_pass = env::var("DEV_PASSWORD").unwrap_or_else(|_| "password".to_string());

    if dev_pass == "password" {
        tracing::warn!("Default DEV_PASSWORD is not allowed");
        return (StatusCode::FORBIDDEN, "Dev login misconfigured").into_response();
    }

    if payload.username != dev_user || payload.password != dev_pass {
        return (StatusCode::UNAUTHORIZED, "Invalid credentials").into_response();
    }

    match create_jwt(payload.actor_id, payload.role, &payload.username) {
        Ok(token) => {
            let cookie = build_auth_cookie(&token);
            let body = AuthResponse {
                token,
                actor_id: payload.actor_id,
                role: payload.role,
            };
            let mut response = Json(body).into_response();
            response
                .headers_mut()
                .insert(header::SET_COOKIE, HeaderValue::from_str(&cookie).unwrap());
            response
        }
        Err(e) => {
            tracing::error!("JWT creation failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to create token").into_response()
        }
    }
}

pub async fn logout() -> impl IntoResponse {
    let cookie = clear_auth_cookie();
    let mut response = (StatusCode::OK, "OK").into_response();
    response
        .headers_mut()
        .insert(header::SET_COOKIE, HeaderValue::from_str(&cookie).unwrap());
    response
}

pub async fn me(user: AuthenticatedUser) -> impl IntoResponse {
    Json(serde_json::json!({
        "actor_id": user.actor_id,
        "role": user.role,
        "name": user.name,
    }))
}

pub fn create_jwt(actor_id: i64, role: Role, name: &str) -> anyhow::Result<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::days(1))
        .expect("valid timestamp")
        .timestamp();

    let claims = Claims {
        sub: actor_id,
        exp: expiration as usize,
        role,
        name: name.to_string(),
    };

    let secret = env::var("JWT_SECRET")
        .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable not set"))?;
    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref()))?;

    Ok(token)
}

pub fn extract_token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        if let Some(token) = auth_header.strip_prefix("Bearer ") {
            return Some(token.to_string());
        }
    }

    if let Some(cookie_header) = headers.get(header::COOKIE).and_then(|h| h.to_str().ok()) {
        for cookie in cookie_header.split(';') {
            let cookie = cookie.trim();
            if let Some((k, v)) = cookie.split_once('=') {
                if k == AUTH_COOKIE_NAME {
                    return Some(v.to_string());
                }
            }
        }
    }
    None
}

fn build_auth_cookie(token: &str) -> String {
    let secure = env::var("RUST_ENV").unwrap_or_else(|_| "development".to_string()) == "production";
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age=86400",
        AUTH_COOKIE_NAME, token
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn clear_auth_cookie() -> String {
    let secure = env::var("RUST_ENV").unwrap_or_else(|_| "development".to_string()) == "production";
    let mut cookie = format!(
        "{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0",
        AUTH_COOKIE_NAME
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jwt_round_trips_role_and_actor() {
        std::env::set_var("JWT_SECRET", "test-secret");
        let token = create_jwt(42, Role::Ngo, "Helping Hands").expect("create jwt");
        let claims = decode_claims(&token).expect("decode");
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.role, Role::Ngo);
        assert_eq!(claims.name, "Helping Hands");
    }

    #[test]
    fn garbage_token_is_rejected() {
        std::env::set_var("JWT_SECRET", "test-secret");
        assert!(validate_token_str("not-a-token").is_err());
    }
}
