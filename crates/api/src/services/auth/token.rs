//! Signed, time-limited bearer tokens.
//!
//! Format: `base64url(json claims) "." base64url(hmac-sha256(payload part))`,
//! both parts unpadded. Claims carry the user id, role, and expiry as a unix
//! timestamp.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use catalog_core::{Role, UserId};

type HmacSha256 = Hmac<Sha256>;

/// Longest token accepted before any decoding.
const MAX_TOKEN_LEN: usize = 1024;

/// Token verification failures. All map to 401.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("bad token signature")]
    BadSignature,

    #[error("token expired")]
    Expired,

    #[error("invalid signing key")]
    Key,
}

/// Identity attached to an authenticated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "sub")]
    pub user_id: UserId,
    pub role: Role,
    /// Expiry, seconds since the unix epoch.
    pub exp: i64,
}

impl Claims {
    /// Whether the token has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

/// Issues and verifies bearer tokens with a shared secret.
pub struct TokenService {
    secret: SecretString,
    ttl: Duration,
}

impl TokenService {
    #[must_use]
    pub const fn new(secret: SecretString, ttl: Duration) -> Self {
        Self { secret, ttl }
    }

    /// Issue a token for `user_id` valid for the configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Key` if the signing key is unusable.
    pub fn issue(&self, user_id: UserId, role: Role) -> Result<String, TokenError> {
        self.issue_at(user_id, role, Utc::now())
    }

    fn issue_at(
        &self,
        user_id: UserId,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            user_id,
            role,
            exp: (now + self.ttl).timestamp(),
        };
        let payload = serde_json::to_vec(&claims).map_err(|_| TokenError::Malformed)?;
        let payload_part = URL_SAFE_NO_PAD.encode(payload);

        let mut mac = self.mac()?;
        mac.update(payload_part.as_bytes());
        let signature_part = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{payload_part}.{signature_part}"))
    }

    /// Verify a token's signature and expiry and return its claims.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Malformed`, `TokenError::BadSignature`, or
    /// `TokenError::Expired`.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        if token.len() > MAX_TOKEN_LEN {
            return Err(TokenError::Malformed);
        }
        let (payload_part, signature_part) =
            token.split_once('.').ok_or(TokenError::Malformed)?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature_part)
            .map_err(|_| TokenError::Malformed)?;
        let mut mac = self.mac()?;
        mac.update(payload_part.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_part)
            .map_err(|_| TokenError::Malformed)?;
        let claims: Claims = serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;

        if claims.is_expired_at(now) {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| TokenError::Key)
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn service(secret: &str) -> TokenService {
        TokenService::new(SecretString::from(secret.to_owned()), Duration::hours(24))
    }

    #[test]
    fn test_issue_then_verify() {
        let tokens = service("k3P9vLq2Xw8ZrT5mN1bY7cJ4hF6dS0aE");
        let token = tokens.issue(UserId::new(42), Role::Admin).unwrap();

        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.user_id, UserId::new(42));
        assert_eq!(claims.role, Role::Admin);
    }

    #[test]
    fn test_rejects_other_secret() {
        let token = service("k3P9vLq2Xw8ZrT5mN1bY7cJ4hF6dS0aE")
            .issue(UserId::new(1), Role::Customer)
            .unwrap();
        let err = service("Zq8Wm2Lx5Rt1Vn7Kp4Hj9Gf3Dc6Bs0Ay")
            .verify(&token)
            .unwrap_err();
        assert_eq!(err, TokenError::BadSignature);
    }

    #[test]
    fn test_rejects_tampered_payload() {
        let tokens = service("k3P9vLq2Xw8ZrT5mN1bY7cJ4hF6dS0aE");
        let token = tokens.issue(UserId::new(1), Role::Customer).unwrap();
        let (_, signature) = token.split_once('.').unwrap();

        let forged_claims = Claims {
            user_id: UserId::new(1),
            role: Role::Admin,
            exp: i64::MAX,
        };
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());
        let forged = format!("{forged_payload}.{signature}");

        assert_eq!(tokens.verify(&forged).unwrap_err(), TokenError::BadSignature);
    }

    #[test]
    fn test_rejects_expired() {
        let tokens = service("k3P9vLq2Xw8ZrT5mN1bY7cJ4hF6dS0aE");
        let issued_at = Utc::now() - Duration::hours(25);
        let token = tokens
            .issue_at(UserId::new(1), Role::Customer, issued_at)
            .unwrap();
        assert_eq!(tokens.verify(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn test_rejects_garbage() {
        let tokens = service("k3P9vLq2Xw8ZrT5mN1bY7cJ4hF6dS0aE");
        assert_eq!(tokens.verify("").unwrap_err(), TokenError::Malformed);
        assert_eq!(tokens.verify("abc").unwrap_err(), TokenError::Malformed);
        assert_eq!(tokens.verify("a.b!").unwrap_err(), TokenError::Malformed);
        assert_eq!(
            tokens.verify(&"x".repeat(2000)).unwrap_err(),
            TokenError::Malformed
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", service("k3P9vLq2Xw8ZrT5mN1bY7cJ4hF6dS0aE"));
        assert!(!debug.contains("k3P9"));
    }
}
