use crate::modules::store::{Money, Store, StoreError};
use crate::modules::utils::logging::log_payment_event;
use crate::modules::utils::time::get_current_timestamp;

/// Failures surfaced by the charge transaction.
///
/// `Conflict` is the only retryable variant; the caller decides whether to
/// retry, the transaction itself never does.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("user not found")]
    UserNotFound,
    #[error("insufficient balance")]
    InsufficientFunds,
    #[error("concurrent payment detected, please retry")]
    Conflict,
    #[error(transparent)]
    Store(StoreError),
}

/// Outcome of a successful charge
#[derive(Debug, Clone)]
pub struct Receipt {
    pub payment_id: u64,
    pub new_balance: Money,
    pub timestamp: u64,
}

/// Executes the fixed-amount debit against the credential store.
/// Never touches tokens; authentication happens at the gate.
pub struct PaymentService<'a> {
    store: &'a Store,
    charge_amount: Money,
}

impl<'a> PaymentService<'a> {
    pub fn new(store: &'a Store, charge_amount: Money) -> Self {
        Self {
            store,
            charge_amount,
        }
    }

    /// Debit the configured charge amount from a user's balance.
    ///
    /// Read-check-debit-record as one atomic unit: the balance snapshot
    /// carries the row version, and the commit is accepted only if that
    /// version is still current. Either the balance write and exactly one
    /// ledger entry both land, or neither does.
    pub fn charge(&self, user_id: u64) -> Result<Receipt, PaymentError> {
        let user = self
            .store
            .get_user(user_id)
            .ok_or(PaymentError::UserNotFound)?;

        if user.balance < self.charge_amount {
            log_payment_event("charge", user_id, self.charge_amount, false, Some("insufficient"));
            return Err(PaymentError::InsufficientFunds);
        }
        // Exact in cents; the two-decimal rounding rule cannot drift here
        let new_balance = user
            .balance
            .checked_sub(self.charge_amount)
            .ok_or(PaymentError::InsufficientFunds)?;

        let now = get_current_timestamp();
        let payment = self
            .store
            .commit_charge(user_id, user.version, new_balance, self.charge_amount, now)
            .map_err(|e| match e {
                StoreError::VersionConflict => PaymentError::Conflict,
                StoreError::UserNotFound => PaymentError::UserNotFound,
                other => PaymentError::Store(other),
            })?;

        log_payment_event("charge", user_id, self.charge_amount, true, None);
        Ok(Receipt {
            payment_id: payment.id,
            new_balance,
            timestamp: payment.timestamp,
        })
    }
}
