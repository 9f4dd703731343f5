use jsonwebtoken::{self, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::Role;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JwtClaims {
    /// Parent account id. Play-mode tokens carry the id of the parent that issued them.
    pub sub: String,
    /// Display name of the parent account.
    pub name: String,
    pub jti: String,
    pub exp: i64,
    pub role: Role,
    pub child_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("invalid token: {0}")]
    Decode(String),
    #[error("encoding failed: {0}")]
    Encode(String),
}

pub fn decode_and_verify(token: &str, secret: &[u8]) -> Result<JwtClaims, JwtError> {
    let key = DecodingKey::from_secret(secret);
    let validation = Validation::new(Algorithm::HS256);
    jsonwebtoken::decode::<JwtClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| JwtError::Decode(e.to_string()))
}

pub fn encode(claims: &JwtClaims, secret: &[u8]) -> Result<String, JwtError> {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| JwtError::Encode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: Role, child_id: Option<&str>) -> JwtClaims {
        JwtClaims {
            sub: "parent-1".into(),
            name: "Pat".into(),
            jti: "jti-1".into(),
            // far future so validation does not reject it
            exp: 4_102_444_800,
            role,
            child_id: child_id.map(str::to_string),
        }
    }

    #[test]
    fn signed_token_verifies_with_same_secret() {
        let c = claims(Role::Child, Some("kid-1"));
        let token = encode(&c, b"secret").unwrap();
        let back = decode_and_verify(&token, b"secret").unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = encode(&claims(Role::Parent, None), b"secret").unwrap();
        assert!(decode_and_verify(&token, b"other").is_err());
    }
}
