use serde::{Deserialize, Serialize};

use super::money::Money;

/// Represents a single account with credentials, balance and lockout state
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: u64,
    pub username: String,            // Original username as entered (for display)
    pub username_normalized: String, // Lowercase version for lookups and comparisons
    pub password_hash: String,       // Self-describing PBKDF2 digest
    pub balance: Money,
    pub lockout_until: Option<u64>, // Unix timestamp; None means not locked
    pub failed_login_count: u32,
    pub version: u64, // Bumped on every mutation; guards against lost updates
    pub created_at: u64,
}

impl User {
    /// The instant the active lockout ends, if the account is locked right
    /// now. A stored lockout timestamp in the past no longer counts.
    pub fn locked_until(&self, current_time: u64) -> Option<u64> {
        self.lockout_until.filter(|&until| current_time < until)
    }
}

/// Append-only ledger entry recording one successful debit
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Payment {
    pub id: u64,
    pub user_id: u64,
    pub amount: Money,
    pub timestamp: u64,
}

/// Denylist entry for a session token identifier.
///
/// Carries the token's own expiry so the entry can be garbage-collected once
/// the token would no longer validate anyway.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RevokedToken {
    pub jti: String,
    pub expires_at: u64,
    pub revoked_at: u64,
}

impl RevokedToken {
    /// True once the underlying token has passed its natural expiry
    pub fn is_expired(&self, current_time: u64) -> bool {
        self.expires_at < current_time
    }
}
