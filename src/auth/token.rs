use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::config::JwtConfig;
use crate::error::{AppError, AuthError};

/// Represents the claims encoded within a session token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Identifier of the authenticated user.
    pub user_id: i64,
    /// Username at the time the token was issued.
    pub username: String,
    /// Issuer configured for this deployment.
    pub iss: String,
    /// Issued at (seconds since epoch).
    pub iat: i64,
    /// Not before (seconds since epoch).
    pub nbf: i64,
    /// Expiration (seconds since epoch).
    pub exp: i64,
}

impl Claims {
    /// Checks the time window of the claims at `now`.
    ///
    /// The token is valid through the second named by `exp`. When several
    /// checks fail, expiry is reported first.
    pub fn check_times(&self, now: DateTime<Utc>) -> Result<(), AuthError> {
        let now = now.timestamp();
        if now > self.exp {
            return Err(AuthError::TokenExpired);
        }
        if now < self.nbf {
            return Err(AuthError::TokenNotYetValid);
        }
        if now < self.iat {
            return Err(AuthError::TokenInvalid);
        }
        Ok(())
    }
}

/// Issues and validates HS256 session tokens.
///
/// Holds only the signing keys, the issuer and the token lifetime, all fixed at
/// construction. Tokens are never stored or revoked server-side.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    lifetime: Duration,
}

impl TokenService {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            lifetime: config.lifetime,
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Issues a token for the user, valid from now for the configured lifetime.
    pub fn issue(&self, user_id: i64, username: &str) -> Result<String, AppError> {
        self.issue_at(user_id, username, Utc::now())
    }

    /// Issues a token as if the current time were `now`.
    pub fn issue_at(
        &self,
        user_id: i64,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let claims = Claims {
            user_id,
            username: username.to_string(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: now
                .checked_add_signed(self.lifetime)
                .ok_or_else(|| AppError::Internal("Token lifetime overflows the clock".into()))?
                .timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Validates a token against the current time.
    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        self.validate_at(token, Utc::now())
    }

    /// Validates a token as if the current time were `now`.
    ///
    /// Structure, signature and time window are checked in that order, and the
    /// first failing step decides the single error returned.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        check_structure(token)?;
        let claims = self.verify_signature(token)?;
        claims.check_times(now)?;
        Ok(claims)
    }

    /// Verifies signature, algorithm and issuer, then decodes the typed claims.
    /// Time fields are left to `Claims::check_times`.
    pub fn verify_signature(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.required_spec_claims = HashSet::new();
        validation.set_issuer(&[self.issuer.as_str()]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Utf8(_) => {
                    AuthError::TokenMalformed
                }
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
                _ => AuthError::TokenInvalid,
            })
    }
}

/// Rejects anything that is not three base64url segments whose first two
/// decode to JSON objects. The algorithm and signature are not looked at.
fn check_structure(token: &str) -> Result<(), AuthError> {
    let segments: Vec<&str> = token.split('.').collect();
    let [header, payload, _signature] = segments.as_slice() else {
        return Err(AuthError::TokenMalformed);
    };

    for segment in [header, payload] {
        let bytes = URL_SAFE_NO_PAD
            .decode(segment)
            .map_err(|_| AuthError::TokenMalformed)?;
        match serde_json::from_slice::<serde_json::Value>(&bytes) {
            Ok(serde_json::Value::Object(_)) => {}
            _ => return Err(AuthError::TokenMalformed),
        }
    }
    Ok(())
}

/// Extracts the token from an `Authorization` header value.
/// The `Bearer ` prefix is optional and matched case-insensitively.
pub fn bearer_token(header_value: &str) -> &str {
    let value = header_value.trim();
    match value.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("bearer ") => value[7..].trim_start(),
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    const SECRET: &str = "test_secret_for_token_service";

    fn service() -> TokenService {
        TokenService::new(&JwtConfig {
            secret: SECRET.to_string(),
            issuer: "todolist".to_string(),
            lifetime: Duration::hours(24),
        })
    }

    fn issued_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 5, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_round_trip_preserves_claims() {
        let service = service();
        let token = service.issue_at(42, "alice", issued_at()).unwrap();
        let claims = service.validate_at(&token, issued_at()).unwrap();

        assert_eq!(
            claims,
            Claims {
                user_id: 42,
                username: "alice".to_string(),
                iss: "todolist".to_string(),
                iat: issued_at().timestamp(),
                nbf: issued_at().timestamp(),
                exp: (issued_at() + Duration::hours(24)).timestamp(),
            }
        );
    }

    #[test]
    fn test_expiry_boundary() {
        let service = service();
        let token = service.issue_at(1, "bob", issued_at()).unwrap();
        let lifetime = service.lifetime();

        let just_before = issued_at() + lifetime - Duration::seconds(1);
        assert!(service.validate_at(&token, just_before).is_ok());

        let just_after = issued_at() + lifetime + Duration::seconds(1);
        assert_eq!(
            service.validate_at(&token, just_after),
            Err(AuthError::TokenExpired)
        );
    }

    #[test]
    fn test_not_yet_valid() {
        let service = service();
        let token = service.issue_at(1, "bob", issued_at()).unwrap();
        let earlier = issued_at() - Duration::seconds(5);
        assert_eq!(
            service.validate_at(&token, earlier),
            Err(AuthError::TokenNotYetValid)
        );
    }

    #[test]
    fn test_malformed_tokens() {
        let service = service();
        for token in ["", "invalid.token.string", "abc", "a.b", "not a jwt at all"] {
            assert_eq!(
                service.validate_at(token, issued_at()),
                Err(AuthError::TokenMalformed),
                "token {token:?}"
            );
        }
    }

    #[test]
    fn test_unsigned_token_is_invalid() {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let claims = Claims {
            user_id: 1,
            username: "mallory".to_string(),
            iss: "todolist".to_string(),
            iat: issued_at().timestamp(),
            nbf: issued_at().timestamp(),
            exp: (issued_at() + Duration::hours(1)).timestamp(),
        };
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
        let token = format!("{}.{}.", header, payload);

        assert_eq!(
            service().validate_at(&token, issued_at()),
            Err(AuthError::TokenInvalid)
        );
    }

    #[test]
    fn test_non_object_segments_are_malformed() {
        let number = URL_SAFE_NO_PAD.encode("42");
        let object = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256"}"#);
        for token in [
            format!("{}.{}.sig", number, object),
            format!("{}.{}.sig", object, number),
            format!("{}.{}.sig.extra", object, object),
        ] {
            assert_eq!(
                service().validate_at(&token, issued_at()),
                Err(AuthError::TokenMalformed),
                "token {token:?}"
            );
        }
    }

    #[test]
    fn test_lifetime_overflow_is_an_error() {
        let service = TokenService::new(&JwtConfig {
            secret: SECRET.to_string(),
            issuer: "todolist".to_string(),
            lifetime: Duration::days(200_000_000),
        });
        assert!(matches!(
            service.issue_at(1, "bob", issued_at()),
            Err(AppError::Internal(_))
        ));
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let other = TokenService::new(&JwtConfig {
            secret: "a_completely_different_secret".to_string(),
            issuer: "todolist".to_string(),
            lifetime: Duration::hours(24),
        });
        let token = other.issue_at(1, "mallory", issued_at()).unwrap();
        assert_eq!(
            service().validate_at(&token, issued_at()),
            Err(AuthError::TokenInvalid)
        );
    }

    #[test]
    fn test_wrong_issuer_is_invalid() {
        let other = TokenService::new(&JwtConfig {
            secret: SECRET.to_string(),
            issuer: "someone-else".to_string(),
            lifetime: Duration::hours(24),
        });
        let token = other.issue_at(1, "mallory", issued_at()).unwrap();
        assert_eq!(
            service().validate_at(&token, issued_at()),
            Err(AuthError::TokenInvalid)
        );
    }

    #[test]
    fn test_wrong_algorithm_is_invalid() {
        let claims = Claims {
            user_id: 1,
            username: "mallory".to_string(),
            iss: "todolist".to_string(),
            iat: issued_at().timestamp(),
            nbf: issued_at().timestamp(),
            exp: (issued_at() + Duration::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert_eq!(
            service().validate_at(&token, issued_at()),
            Err(AuthError::TokenInvalid)
        );
    }

    #[test]
    fn test_unreadable_claims_are_invalid() {
        #[derive(Serialize)]
        struct Partial {
            username: String,
            iss: String,
        }
        let token = encode(
            &Header::new(Algorithm::HS256),
            &Partial {
                username: "mallory".to_string(),
                iss: "todolist".to_string(),
            },
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert_eq!(
            service().validate_at(&token, issued_at()),
            Err(AuthError::TokenInvalid)
        );
    }

    #[test]
    fn test_expired_token_issued_in_the_past() {
        let service = service();
        let token = service
            .issue_at(2, "carol", Utc::now() - Duration::hours(48))
            .unwrap();
        assert_eq!(service.validate(&token), Err(AuthError::TokenExpired));
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), "abc.def.ghi");
        assert_eq!(bearer_token("bearer abc.def.ghi"), "abc.def.ghi");
        assert_eq!(bearer_token("BEARER  abc.def.ghi"), "abc.def.ghi");
        assert_eq!(bearer_token("abc.def.ghi"), "abc.def.ghi");
        assert_eq!(bearer_token("Bearer"), "Bearer");
    }
}
