use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::modules::utils::time::get_current_timestamp;
use crate::{TOKEN_CLOCK_SKEW_SECS, TOKEN_DURATION_SECS};

/// Claims carried by a session token.
///
/// `sub` is the user id, `unique_name` the display username and `jti` the
/// revocation key. `jti` is optional on the wire so that a token minted
/// without one can still be validated (and will then fail logout with a
/// missing-session error rather than a signature error).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub unique_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    pub iss: String,
    pub aud: String,
    pub exp: u64,
    pub nbf: u64,
    pub iat: u64,
}

impl SessionClaims {
    /// The numeric user id from the subject claim, if well-formed
    pub fn user_id(&self) -> Option<u64> {
        self.sub.parse().ok()
    }
}

/// A freshly minted session token together with its metadata
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: u64,
    pub token_id: String,
}

/// Mints and validates HMAC-signed session tokens.
///
/// The signing algorithm is pinned to HS256 on both paths; an unsigned or
/// differently-signed token can never validate.
pub struct TokenIssuer {
    issuer: String,
    audience: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenIssuer {
    /// Create an issuer for the given issuer/audience pair and shared secret
    pub fn new(issuer: &str, audience: &str, secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = TOKEN_CLOCK_SKEW_SECS;
        validation.validate_nbf = true;
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);

        Self {
            issuer: issuer.to_string(),
            audience: audience.to_string(),
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Issue a token for a user.
    ///
    /// Every call mints a fresh random token id; expiry is a fixed two hours
    /// from now, with not-before anchored at issue time.
    pub fn issue(
        &self,
        user_id: u64,
        username: &str,
    ) -> Result<IssuedToken, jsonwebtoken::errors::Error> {
        let token_id = Uuid::new_v4().simple().to_string();
        let now = get_current_timestamp();
        let expires_at = now + TOKEN_DURATION_SECS;

        let claims = SessionClaims {
            sub: user_id.to_string(),
            unique_name: username.to_string(),
            jti: Some(token_id.clone()),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            exp: expires_at,
            nbf: now,
            iat: now,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(IssuedToken {
            token,
            expires_at,
            token_id,
        })
    }

    /// Validate a token's signature, issuer, audience, expiry and not-before
    /// (with a small clock-skew allowance) and return its claims
    pub fn decode(&self, token: &str) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }
}
