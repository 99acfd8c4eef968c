/**
 * Session Token Verification
 *
 * Credential issuance lives with the external auth service; this core only
 * verifies the HS256 bearer tokens that service hands out and resolves
 * them to a user id. `create_token` implements the issuer's contract for
 * tests and tooling.
 */

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at time (Unix timestamp)
    pub iat: u64,
}

/// Get JWT secret from environment
fn jwt_secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| {
        tracing::warn!("JWT_SECRET not set, using development default");
        "dev-secret-change-in-production".to_string()
    })
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

/// Create a token for a user. Matches what the external issuer produces;
/// used by tests and local tooling.
pub fn create_token(user_id: Uuid) -> Result<String, jsonwebtoken::errors::Error> {
    let now = unix_now();
    let claims = Claims {
        sub: user_id.to_string(),
        // Token expires in 7 days, matching the issuer's cookie lifetime.
        exp: now + 7 * 24 * 60 * 60,
        iat: now,
    };
    let key = EncodingKey::from_secret(jwt_secret().as_ref());
    encode(&Header::default(), &claims, &key)
}

/// Verify and decode a token.
pub fn verify_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let key = DecodingKey::from_secret(jwt_secret().as_ref());
    let token_data = decode::<Claims>(token, &key, &Validation::default())?;
    Ok(token_data.claims)
}

/// Resolve a token to the user id it was issued for.
pub fn user_id_from_token(token: &str) -> CoreResult<Uuid> {
    let claims = verify_token(token)
        .map_err(|e| CoreError::unauthorized(format!("Token verification failed: {e}")))?;
    Uuid::parse_str(&claims.sub)
        .map_err(|e| CoreError::unauthorized(format!("Invalid user ID in token: {e}")))
}
