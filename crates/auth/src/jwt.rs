//! HS256 access token validation.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use crate::{JwtClaims, TokenValidationError, validate_claims};

/// Decode, verify and time-check an access token.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError>;
}

/// Shared-secret (HS256) validator.
pub struct Hs256JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: Vec<u8>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // The time window lives in `issued_at`/`expires_at` and is checked by
        // `validate_claims`, not in the registered `exp` claim.
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::new();

        Self {
            key: DecodingKey::from_secret(&secret),
            validation,
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError> {
        let data = decode::<JwtClaims>(token, &self.key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "rejected access token");
            TokenValidationError::Malformed(e.to_string())
        })?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use storefront_core::UserId;

    use crate::Role;

    fn mint(secret: &str, expires_in: Duration) -> (String, JwtClaims) {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: UserId::new(),
            roles: vec![Role::ADMIN],
            issued_at: now - Duration::seconds(1),
            expires_at: now + expires_in,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();
        (token, claims)
    }

    #[test]
    fn valid_token_round_trips_claims() {
        let v = Hs256JwtValidator::new(b"s3cret".to_vec());
        let (token, claims) = mint("s3cret", Duration::minutes(5));
        assert_eq!(v.validate(&token, Utc::now()).unwrap(), claims);
    }

    #[test]
    fn wrong_secret_and_expiry_are_rejected() {
        let v = Hs256JwtValidator::new(b"s3cret".to_vec());
        let (token, _) = mint("other", Duration::minutes(5));
        assert!(matches!(
            v.validate(&token, Utc::now()),
            Err(TokenValidationError::Malformed(_))
        ));

        let (token, _) = mint("s3cret", Duration::minutes(5));
        let later = Utc::now() + Duration::minutes(10);
        assert_eq!(v.validate(&token, later), Err(TokenValidationError::Expired));
    }
}
