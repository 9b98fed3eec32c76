use super::flow::AuthError;
use super::tokens::{SessionClaims, TokenIssuer};
use crate::modules::store::Store;

/// Gate every authenticated request through two independent checks:
/// cryptographic validation of the token, then a revocation-registry lookup
/// keyed by the token id. Both must pass before any claim is trusted; a
/// revoked token is rejected even though its signature and expiry are still
/// valid.
pub fn authenticate_request(
    token: &str,
    issuer: &TokenIssuer,
    store: &Store,
) -> Result<SessionClaims, AuthError> {
    let claims = issuer
        .decode(token)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

    if let Some(jti) = claims.jti.as_deref() {
        if store.is_revoked(jti) {
            return Err(AuthError::TokenRevoked);
        }
    }

    Ok(claims)
}
