use serde::Serialize;

use super::password::verify_password;
use super::tokens::{SessionClaims, TokenIssuer};
use crate::modules::store::{Store, StoreError};
use crate::modules::utils::logging::log_auth_event;
use crate::modules::utils::time::get_current_timestamp;
use crate::{LOCKOUT_DURATION_SECS, MAX_FAILED_LOGINS};

/// Failures surfaced by login, logout and the request gate
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("account temporarily locked, try again later")]
    AccountLocked { until: u64 },
    #[error("invalid or expired token: {0}")]
    InvalidToken(String),
    #[error("token has been revoked")]
    TokenRevoked,
    #[error("no session context to log out")]
    MissingSession,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Successful login payload: the bearer token and its expiry.
/// The token id is not exposed beyond what the token itself encodes.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: u64,
}

/// Orchestrates credential verification, the lockout state machine, token
/// issuance and token revocation. Wired explicitly from its collaborators;
/// never touches balances.
pub struct AuthService<'a> {
    store: &'a Store,
    issuer: &'a TokenIssuer,
}

impl<'a> AuthService<'a> {
    pub fn new(store: &'a Store, issuer: &'a TokenIssuer) -> Self {
        Self { store, issuer }
    }

    /// Attempt a login and, on success, issue a session token.
    ///
    /// Lockout rules: while locked, every attempt is rejected regardless of
    /// the password and the counter does not move. A wrong password
    /// increments the counter; the fifth consecutive failure locks the
    /// account for ten minutes and resets the counter to zero. A correct
    /// password clears both fields.
    pub fn login(&self, username: &str, password: &str) -> Result<LoginResponse, AuthError> {
        let now = get_current_timestamp();

        let mut user = match self.store.find_user_by_username(username) {
            Some(user) => user,
            None => {
                log_auth_event("login", username, false, Some("unknown user"));
                return Err(AuthError::InvalidCredentials);
            }
        };

        if let Some(until) = user.locked_until(now) {
            log_auth_event("login", username, false, Some("account locked"));
            return Err(AuthError::AccountLocked { until });
        }

        if !verify_password(password, &user.password_hash) {
            user.failed_login_count += 1;
            if user.failed_login_count >= MAX_FAILED_LOGINS {
                user.lockout_until = Some(now + LOCKOUT_DURATION_SECS);
                user.failed_login_count = 0;
            }
            // The rejection stands even if the bookkeeping write fails; a
            // lost increment only weakens brute-force accounting.
            if let Err(e) = self.store.save_user_auth(&user) {
                log::error!("failed to persist lockout bookkeeping for {}: {}", user.id, e);
            }
            log_auth_event("login", username, false, Some("bad password"));
            return Err(AuthError::InvalidCredentials);
        }

        user.failed_login_count = 0;
        user.lockout_until = None;
        self.store.save_user_auth(&user)?;

        let issued = self
            .issuer
            .issue(user.id, &user.username)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        log_auth_event("login", username, true, None);

        Ok(LoginResponse {
            token: issued.token,
            expires_at: issued.expires_at,
        })
    }

    /// Terminate the session described by an already-authenticated token's
    /// claims by revoking its token id.
    ///
    /// The claims must come from the request gate, not from re-parsing a raw
    /// token string. Revocation is idempotent.
    pub fn logout(&self, claims: &SessionClaims) -> Result<(), AuthError> {
        let jti = claims.jti.as_deref().ok_or(AuthError::MissingSession)?;
        if claims.exp == 0 {
            return Err(AuthError::MissingSession);
        }

        let now = get_current_timestamp();
        let newly_revoked = self.store.revoke_token(jti, claims.exp, now)?;
        log_auth_event(
            "logout",
            &claims.unique_name,
            true,
            (!newly_revoked).then_some("already revoked"),
        );
        Ok(())
    }
}
