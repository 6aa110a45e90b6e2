//! Access token signing and verification.

use std::time::Duration;

use authgate_core::{DecodedToken, EngineError, TokenData};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::RngCore;

/// Signs and verifies HS256 access tokens.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
}

impl TokenIssuer {
    /// Create an issuer with a secret key.
    ///
    /// The secret should be at least 32 bytes.
    #[must_use]
    pub fn new(secret: &[u8], access_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl,
        }
    }

    /// Create an issuer from a hex-encoded secret.
    ///
    /// # Errors
    ///
    /// Returns error if hex decoding fails.
    pub fn from_hex_secret(hex_secret: &str, access_ttl: Duration) -> Result<Self, EngineError> {
        let secret = hex::decode(hex_secret)
            .map_err(|e| EngineError::Internal(format!("Invalid hex secret: {e}")))?;
        Ok(Self::new(&secret, access_ttl))
    }

    /// Generate a random 256-bit secret key.
    #[must_use]
    pub fn generate_secret() -> [u8; 32] {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        bytes
    }

    /// Generate a random secret as hex string.
    #[must_use]
    pub fn generate_hex_secret() -> String {
        hex::encode(Self::generate_secret())
    }

    /// Issue an access token for `user_id`, embedding `roles` under `data`.
    ///
    /// # Errors
    ///
    /// Returns error if token encoding fails.
    pub fn issue(&self, user_id: &str, roles: Vec<String>) -> Result<String, EngineError> {
        let now = Utc::now();
        let exp = now + chrono::Duration::from_std(self.access_ttl).unwrap_or_default();

        let claims = DecodedToken {
            sub: user_id.to_string(),
            data: TokenData { roles },
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        self.sign(&claims)
    }

    pub(crate) fn sign(&self, claims: &DecodedToken) -> Result<String, EngineError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| EngineError::Internal(format!("Token encoding failed: {e}")))
    }

    /// Verify signature and expiry.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidAccessToken`] if the token is malformed,
    /// tampered with or expired.
    pub fn verify(&self, token: &str) -> Result<DecodedToken, EngineError> {
        self.decode_with(token, true)
    }

    /// Verify signature only. Used when exchanging an expired access token
    /// for a new one.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidAccessToken`] if the token is malformed
    /// or tampered with.
    pub fn verify_ignoring_expiry(&self, token: &str) -> Result<DecodedToken, EngineError> {
        self.decode_with(token, false)
    }

    fn decode_with(&self, token: &str, validate_exp: bool) -> Result<DecodedToken, EngineError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = validate_exp;

        decode::<DecodedToken>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| EngineError::InvalidAccessToken(e.to_string()))
    }

    /// Generate an opaque random token (refresh, confirmation, reset).
    #[must_use]
    pub fn random_token() -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl", &self.access_ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_issuer() -> TokenIssuer {
        TokenIssuer::new(&TokenIssuer::generate_secret(), Duration::from_secs(900))
    }

    #[test]
    fn test_generate_secret() {
        let secret1 = TokenIssuer::generate_secret();
        let secret2 = TokenIssuer::generate_secret();
        assert_ne!(secret1, secret2);
        assert_eq!(TokenIssuer::generate_hex_secret().len(), 64);
    }

    #[test]
    fn test_issue_and_verify() {
        let issuer = create_issuer();
        let token = issuer
            .issue("user_123", vec!["admin".to_string()])
            .unwrap();

        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.sub, "user_123");
        assert_eq!(claims.data.roles, vec!["admin".to_string()]);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_expired_token() {
        let issuer = create_issuer();
        let now = Utc::now().timestamp();
        let token = issuer
            .sign(&DecodedToken {
                sub: "user_123".to_string(),
                data: TokenData::default(),
                iat: now - 120,
                exp: now - 60,
            })
            .unwrap();

        assert!(matches!(
            issuer.verify(&token),
            Err(EngineError::InvalidAccessToken(_))
        ));
        assert_eq!(issuer.verify_ignoring_expiry(&token).unwrap().sub, "user_123");
    }

    #[test]
    fn test_foreign_secret_rejected() {
        let token = create_issuer().issue("user_123", Vec::new()).unwrap();
        assert!(create_issuer().verify(&token).is_err());
        assert!(create_issuer().verify_ignoring_expiry(&token).is_err());
    }

    #[test]
    fn test_invalid_token() {
        let issuer = create_issuer();
        assert!(issuer.verify("invalid.token.here").is_err());
        assert!(issuer.verify("").is_err());
    }

    #[test]
    fn test_hex_secret() {
        let hex_secret = TokenIssuer::generate_hex_secret();
        let issuer = TokenIssuer::from_hex_secret(&hex_secret, Duration::from_secs(60)).unwrap();
        let token = issuer.issue("user_123", Vec::new()).unwrap();
        assert!(issuer.verify(&token).is_ok());

        assert!(TokenIssuer::from_hex_secret("not-hex", Duration::from_secs(60)).is_err());
    }
}
