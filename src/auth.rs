//! Credentials and principal resolution.
//!
//! Sessions are stateless: a signed, time-bounded JWT carries the user id,
//! and every protected handler resolves it back to a full user document
//! through the [`AuthUser`] extractor.

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use mongodb::bson::{doc, oid::ObjectId};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    models::{Role, User},
    state::AppState,
};

const TOKEN_TTL_SECS: i64 = 60 * 60 * 24 * 30;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Hex user id.
    pub sub: String,
    pub exp: i64,
}

pub fn hash_password(raw: &str) -> Result<String, AppError> {
    Ok(hash(raw, DEFAULT_COST)?)
}

pub fn verify_password(raw: &str, hashed: &str) -> Result<bool, AppError> {
    Ok(verify(raw, hashed)?)
}

pub fn issue_token(user_id: &ObjectId, secret: &str) -> Result<String, AppError> {
    let claims = Claims {
        sub: user_id.to_hex(),
        exp: Utc::now().timestamp() + TOKEN_TTL_SECS,
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

/// Verifies signature and expiry, yielding the user id the token was issued
/// for. Any defect (bad signature, expired, malformed id) is `Unauthorized`.
pub fn verify_token(token: &str, secret: &str) -> Result<ObjectId, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?;

    ObjectId::parse_str(&data.claims.sub).map_err(|_| AppError::Unauthorized)
}

pub fn require_admin(user: &User) -> Result<(), AppError> {
    match user.role {
        Role::Admin => Ok(()),
        Role::User => Err(AppError::Forbidden),
    }
}

/// The acting principal, loaded from the `Authorization: Bearer` header.
pub struct AuthUser(pub User);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AppError::Unauthorized)?;

        let user_id = verify_token(token, &state.config.jwt_secret)?;

        // A token for a deleted account no longer authenticates anyone.
        let user = state
            .users()
            .find_one(doc! { "_id": user_id })
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(AuthUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_password_roundtrip() {
        let hashed = hash_password("hunter42").unwrap();
        assert_ne!(hashed, "hunter42");
        assert!(verify_password("hunter42", &hashed).unwrap());
        assert!(!verify_password("wrong", &hashed).unwrap());
    }

    #[test]
    fn test_token_roundtrip() {
        let id = ObjectId::new();
        let token = issue_token(&id, SECRET).unwrap();
        assert_eq!(verify_token(&token, SECRET).unwrap(), id);
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(matches!(
            verify_token("not-a-token", SECRET),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue_token(&ObjectId::new(), SECRET).unwrap();
        assert!(matches!(
            verify_token(&token, "other-secret"),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let claims = Claims {
            sub: ObjectId::new().to_hex(),
            exp: Utc::now().timestamp() - 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            verify_token(&token, SECRET),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn test_require_admin() {
        let mut user = User::new(
            "a".to_string(),
            "a@b.c".to_string(),
            "hash".to_string(),
            "blue".to_string(),
        );
        assert!(matches!(require_admin(&user), Err(AppError::Forbidden)));

        user.role = Role::Admin;
        assert!(require_admin(&user).is_ok());
    }
}
