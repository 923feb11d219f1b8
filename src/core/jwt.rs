use axum::http::StatusCode;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub static DEFAULT_SECRET_KEY: &str = "DEFAULT_JWT_SECRET";

/// Token payload. The token only points at a server-side session; the
/// user record itself is reloaded on every request.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sid: Uuid,
    pub uid: i64,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug)]
pub enum JwtError {
    InvalidToken,
    TokenCreation,
    TokenExpired,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::InvalidToken => write!(f, "Invalid session token"),
            JwtError::TokenCreation => write!(f, "Failed to create session token"),
            JwtError::TokenExpired => write!(f, "Session token has expired"),
        }
    }
}

impl std::error::Error for JwtError {}

impl From<JwtError> for StatusCode {
    fn from(error: JwtError) -> Self {
        match error {
            JwtError::InvalidToken => StatusCode::UNAUTHORIZED,
            JwtError::TokenCreation => StatusCode::INTERNAL_SERVER_ERROR,
            JwtError::TokenExpired => StatusCode::UNAUTHORIZED,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(error: jsonwebtoken::errors::Error) -> Self {
        match error.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::TokenExpired,
            _ => JwtError::InvalidToken,
        }
    }
}

pub fn create_token(
    sid: Uuid,
    uid: i64,
    ttl: Duration,
    jwt_secret: &str,
) -> Result<String, JwtError> {
    let now = Utc::now();
    let expire_time = now + ttl;

    let claims = Claims {
        sid,
        uid,
        exp: expire_time.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .map_err(|_| JwtError::TokenCreation)
}

pub fn verify_token(token: &str, jwt_secret: &str) -> Result<Claims, JwtError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        let sid = Uuid::new_v4();
        let token = create_token(sid, 42, Duration::hours(1), "secret").unwrap();
        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.sid, sid);
        assert_eq!(claims.uid, 42);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = create_token(Uuid::new_v4(), 1, Duration::hours(1), "secret").unwrap();
        assert!(matches!(
            verify_token(&token, "other"),
            Err(JwtError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token() {
        // beyond the default 60s leeway
        let token = create_token(Uuid::new_v4(), 1, Duration::minutes(-5), "secret").unwrap();
        assert!(matches!(
            verify_token(&token, "secret"),
            Err(JwtError::TokenExpired)
        ));
    }
}
