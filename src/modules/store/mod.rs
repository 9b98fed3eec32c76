pub mod model;
pub mod money;

// Re-export the main types
pub use model::{Payment, RevokedToken, User};
pub use money::{Money, MoneyParseError};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::modules::utils::time::get_current_timestamp;

/// Errors surfaced by the credential store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("user not found")]
    UserNotFound,
    #[error("username already exists")]
    DuplicateUsername,
    #[error("row version conflict")]
    VersionConflict,
    #[error("store io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("store snapshot corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// The full persisted dataset: users, the payment ledger and the
/// token revocation registry
#[derive(Serialize, Deserialize, Default)]
struct StoreState {
    users: HashMap<u64, User>,
    payments: Vec<Payment>,
    revoked_tokens: HashMap<String, RevokedToken>,
    next_user_id: u64,
    next_payment_id: u64,
}

/// Credential store backed by a JSON snapshot on disk.
///
/// All cross-request coordination happens through the internal lock; callers
/// never hold locks of their own. Reads hand out row snapshots carrying the
/// version observed, and balance writes are accepted only if that version is
/// still current (`commit_charge`). Lockout bookkeeping writes are
/// deliberately last-writer-wins (`save_user_auth`).
pub struct Store {
    path: Option<PathBuf>,
    state: Mutex<StoreState>,
}

impl Store {
    /// Open the store file, loading the existing snapshot if present.
    ///
    /// A corrupt snapshot is an error, not a fresh store: silently starting
    /// over would discard balances and the payment ledger.
    pub fn open(path: &Path) -> Result<Store, StoreError> {
        let state = if path.exists() {
            let data = std::fs::read_to_string(path)?;
            serde_json::from_str(&data)?
        } else {
            StoreState::default()
        };
        Ok(Store {
            path: Some(path.to_path_buf()),
            state: Mutex::new(state),
        })
    }

    /// Create a store with no backing file (used by tests and dry runs)
    pub fn open_in_memory() -> Store {
        Store {
            path: None,
            state: Mutex::new(StoreState::default()),
        }
    }

    /// Create a new user with a unique username and an opening balance
    pub fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        balance: Money,
    ) -> Result<User, StoreError> {
        let original_username = username.trim().to_string();
        let username_normalized = original_username.to_lowercase();

        let mut state = self.state.lock();
        if state
            .users
            .values()
            .any(|u| u.username_normalized == username_normalized)
        {
            return Err(StoreError::DuplicateUsername);
        }

        state.next_user_id += 1;
        let user = User {
            id: state.next_user_id,
            username: original_username,
            username_normalized,
            password_hash: password_hash.to_string(),
            balance,
            lockout_until: None,
            failed_login_count: 0,
            version: 1,
            created_at: get_current_timestamp(),
        };
        state.users.insert(user.id, user.clone());

        if let Err(e) = self.persist(&state) {
            state.users.remove(&user.id);
            state.next_user_id -= 1;
            return Err(e);
        }
        Ok(user)
    }

    /// Look up a user by id, returning a snapshot carrying its row version
    pub fn get_user(&self, id: u64) -> Option<User> {
        self.state.lock().users.get(&id).cloned()
    }

    /// Look up a user by (case-insensitive) username
    pub fn find_user_by_username(&self, username: &str) -> Option<User> {
        let normalized = username.trim().to_lowercase();
        self.state
            .lock()
            .users
            .values()
            .find(|u| u.username_normalized == normalized)
            .cloned()
    }

    /// Persist the lockout bookkeeping fields of a user.
    ///
    /// Last-writer-wins: no version check is performed, because a lost
    /// failed-login increment cannot corrupt money. The row version is still
    /// bumped so any in-flight charge snapshot is invalidated.
    pub fn save_user_auth(&self, user: &User) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let row = state
            .users
            .get_mut(&user.id)
            .ok_or(StoreError::UserNotFound)?;
        let previous = (row.failed_login_count, row.lockout_until, row.version);

        row.failed_login_count = user.failed_login_count;
        row.lockout_until = user.lockout_until;
        row.version += 1;

        if let Err(e) = self.persist(&state) {
            let row = state.users.get_mut(&user.id).expect("row existed above");
            (row.failed_login_count, row.lockout_until, row.version) = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Overwrite a user's balance outside the charge path.
    ///
    /// Provisioning-only operation (seeding / topping up an account); the
    /// version bump makes it race-safe against concurrent charges.
    pub fn set_balance(&self, user_id: u64, balance: Money) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let row = state
            .users
            .get_mut(&user_id)
            .ok_or(StoreError::UserNotFound)?;
        let previous = (row.balance, row.version);

        row.balance = balance;
        row.version += 1;

        if let Err(e) = self.persist(&state) {
            let row = state.users.get_mut(&user_id).expect("row existed above");
            (row.balance, row.version) = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Atomically commit a debit: write the new balance and append exactly
    /// one payment row, or do neither.
    ///
    /// The write is accepted only if the row version still matches the one
    /// captured when the caller read the balance; a concurrent mutation that
    /// won the race surfaces as `VersionConflict` and leaves no trace.
    pub fn commit_charge(
        &self,
        user_id: u64,
        expected_version: u64,
        new_balance: Money,
        amount: Money,
        now: u64,
    ) -> Result<Payment, StoreError> {
        let mut state = self.state.lock();
        let row = state
            .users
            .get_mut(&user_id)
            .ok_or(StoreError::UserNotFound)?;
        if row.version != expected_version {
            return Err(StoreError::VersionConflict);
        }
        let previous = (row.balance, row.version);

        row.balance = new_balance;
        row.version += 1;

        state.next_payment_id += 1;
        let payment = Payment {
            id: state.next_payment_id,
            user_id,
            amount,
            timestamp: now,
        };
        state.payments.push(payment.clone());

        if let Err(e) = self.persist(&state) {
            // Roll the whole scope back: no balance change, no orphan row
            state.payments.pop();
            state.next_payment_id -= 1;
            let row = state.users.get_mut(&user_id).expect("row existed above");
            (row.balance, row.version) = previous;
            return Err(e);
        }
        Ok(payment)
    }

    /// All ledger entries recorded for a user, oldest first
    pub fn payments_for_user(&self, user_id: u64) -> Vec<Payment> {
        self.state
            .lock()
            .payments
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Check whether a token identifier has been revoked
    pub fn is_revoked(&self, jti: &str) -> bool {
        self.state.lock().revoked_tokens.contains_key(jti)
    }

    /// Add a token identifier to the revocation registry.
    ///
    /// Idempotent: revoking an already-revoked id is a no-op. Returns true
    /// if a new entry was recorded.
    pub fn revoke_token(&self, jti: &str, expires_at: u64, now: u64) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        if state.revoked_tokens.contains_key(jti) {
            return Ok(false);
        }
        state.revoked_tokens.insert(
            jti.to_string(),
            RevokedToken {
                jti: jti.to_string(),
                expires_at,
                revoked_at: now,
            },
        );

        if let Err(e) = self.persist(&state) {
            state.revoked_tokens.remove(jti);
            return Err(e);
        }
        Ok(true)
    }

    /// Drop registry entries whose tokens have expired on their own.
    /// Housekeeping only; returns the number of entries removed.
    pub fn purge_expired_revocations(&self, now: u64) -> Result<usize, StoreError> {
        let mut state = self.state.lock();
        let before = state.revoked_tokens.len();
        state.revoked_tokens.retain(|_, entry| !entry.is_expired(now));
        let removed = before - state.revoked_tokens.len();
        if removed > 0 {
            self.persist(&state)?;
        }
        Ok(removed)
    }

    /// Write the snapshot to disk atomically (write-new then rename-over),
    /// so a crash mid-write can never leave a truncated store file
    fn persist(&self, state: &StoreState) -> Result<(), StoreError> {
        let path = match &self.path {
            Some(path) => path,
            None => return Ok(()),
        };
        let data = serde_json::to_string_pretty(state)?;

        let parent = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(data.as_bytes())?;
        tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn new_user(store: &Store, name: &str, cents: i64) -> User {
        store
            .create_user(name, "digest", Money::from_cents(cents))
            .unwrap()
    }

    #[test]
    fn test_username_uniqueness() {
        let store = Store::open_in_memory();
        new_user(&store, "Alice", 800);

        // Same name, different case and padding, still a duplicate
        let result = store.create_user(" alice ", "digest", Money::ZERO);
        assert!(matches!(result, Err(StoreError::DuplicateUsername)));

        let found = store.find_user_by_username("ALICE").unwrap();
        assert_eq!(found.username, "Alice");
        assert_eq!(found.version, 1);
    }

    #[test]
    fn test_save_user_auth_is_last_writer_wins() {
        let store = Store::open_in_memory();
        let user = new_user(&store, "alice", 800);

        let mut first = user.clone();
        first.failed_login_count = 2;
        let mut second = user.clone();
        second.failed_login_count = 1;

        // Both writes started from version 1; both are accepted
        store.save_user_auth(&first).unwrap();
        store.save_user_auth(&second).unwrap();

        let row = store.get_user(user.id).unwrap();
        assert_eq!(row.failed_login_count, 1);
        assert_eq!(row.version, 3); // each write still bumps the version
    }

    #[test]
    fn test_commit_charge_success_and_ledger() {
        let store = Store::open_in_memory();
        let user = new_user(&store, "alice", 800);

        let amount = Money::from_cents(110);
        let new_balance = user.balance.checked_sub(amount).unwrap();
        let payment = store
            .commit_charge(user.id, user.version, new_balance, amount, 42)
            .unwrap();

        assert_eq!(payment.user_id, user.id);
        assert_eq!(payment.amount, amount);
        assert_eq!(payment.timestamp, 42);

        let row = store.get_user(user.id).unwrap();
        assert_eq!(row.balance.to_string(), "6.90");
        assert_eq!(row.version, 2);
        assert_eq!(store.payments_for_user(user.id).len(), 1);
    }

    #[test]
    fn test_commit_charge_stale_version_leaves_no_trace() {
        let store = Store::open_in_memory();
        let user = new_user(&store, "alice", 800);

        // Another mutation wins the race after our snapshot was taken
        store.set_balance(user.id, Money::from_cents(500)).unwrap();

        let result = store.commit_charge(
            user.id,
            user.version,
            Money::from_cents(690),
            Money::from_cents(110),
            42,
        );
        assert!(matches!(result, Err(StoreError::VersionConflict)));

        let row = store.get_user(user.id).unwrap();
        assert_eq!(row.balance.cents(), 500);
        assert!(store.payments_for_user(user.id).is_empty());
    }

    #[test]
    fn test_commit_charge_unknown_user() {
        let store = Store::open_in_memory();
        let result = store.commit_charge(99, 1, Money::ZERO, Money::from_cents(110), 0);
        assert!(matches!(result, Err(StoreError::UserNotFound)));
    }

    #[test]
    fn test_revocation_is_idempotent() {
        let store = Store::open_in_memory();

        assert!(!store.is_revoked("jti-1"));
        assert!(store.revoke_token("jti-1", 1_000, 500).unwrap());
        assert!(store.is_revoked("jti-1"));

        // Second revocation is a no-op, not an error
        assert!(!store.revoke_token("jti-1", 1_000, 600).unwrap());
        assert!(store.is_revoked("jti-1"));
    }

    #[test]
    fn test_purge_expired_revocations() {
        let store = Store::open_in_memory();
        store.revoke_token("old", 100, 50).unwrap();
        store.revoke_token("live", 10_000, 50).unwrap();

        let removed = store.purge_expired_revocations(5_000).unwrap();
        assert_eq!(removed, 1);
        assert!(!store.is_revoked("old"));
        assert!(store.is_revoked("live"));
    }

    #[test]
    fn test_reload_from_disk_preserves_everything() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");

        let user_id;
        {
            let store = Store::open(&path).unwrap();
            let user = new_user(&store, "alice", 800);
            user_id = user.id;
            store
                .commit_charge(
                    user.id,
                    user.version,
                    Money::from_cents(690),
                    Money::from_cents(110),
                    42,
                )
                .unwrap();
            store.revoke_token("jti-1", 1_000, 500).unwrap();
        }

        let reloaded = Store::open(&path).unwrap();
        let user = reloaded.get_user(user_id).unwrap();
        assert_eq!(user.balance.to_string(), "6.90");
        assert_eq!(user.version, 2);
        assert_eq!(reloaded.payments_for_user(user_id).len(), 1);
        assert!(reloaded.is_revoked("jti-1"));

        // Ids keep advancing after a reload instead of colliding
        let other = reloaded
            .create_user("bob", "digest", Money::ZERO)
            .unwrap();
        assert!(other.id > user_id);
    }

    #[test]
    fn test_corrupt_snapshot_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(Store::open(&path), Err(StoreError::Corrupt(_))));
    }
}
