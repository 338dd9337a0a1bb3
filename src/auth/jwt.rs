//! Identity claim issuance and verification.
//!
//! Claims carry only the subject id plus timestamps. Role is deliberately
//! absent: the auth middleware re-fetches the user record on every request,
//! so a stale or forged role claim never reaches an access decision.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: Uuid,
    /// Issued-at unix seconds.
    pub iat: i64,
    /// Expiration unix seconds.
    pub exp: i64,
}

/// Issue a signed claim for a user, valid for `ttl_days`.
pub fn issue(secret: &str, ttl_days: i64, user_id: Uuid) -> jsonwebtoken::errors::Result<String> {
    let now = Utc::now();
    let exp = now + Duration::days(ttl_days.max(1));
    let claims = Claims {
        sub: user_id,
        iat: now.timestamp(),
        exp: exp.timestamp(),
    };
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Verify a token and return its claims.
pub fn verify(token: &str, secret: &str) -> jsonwebtoken::errors::Result<Claims> {
    let token_data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_subject() {
        let user_id = Uuid::new_v4();
        let token = issue("secret", 7, user_id).unwrap();
        let claims = verify(&token, "secret").unwrap();
        assert_eq!(claims.sub, user_id);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn rejects_wrong_secret() {
        let token = issue("secret", 7, Uuid::new_v4()).unwrap();
        assert!(verify(&token, "other-secret").is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(verify("not-a-token", "secret").is_err());
    }
}
