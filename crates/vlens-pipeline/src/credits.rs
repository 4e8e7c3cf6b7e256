//! Credit ledger seam and an in-memory implementation.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use thiserror::Error;

/// Ledger failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Insufficient credits: required {required}, available {available}")]
    InsufficientFunds { required: u32, available: u64 },

    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

/// External credit ledger.
#[async_trait]
pub trait CreditLedger: Send + Sync {
    /// Current balance of `user_id`.
    async fn get_balance(&self, user_id: &str) -> Result<u64, LedgerError>;

    /// Deduct `amount` and return the new balance.
    ///
    /// Repeating a debit with the same `idempotency_key` charges once and
    /// returns the current balance.
    async fn debit(&self, user_id: &str, amount: u32, idempotency_key: &str) -> Result<u64, LedgerError>;
}

#[derive(Debug, Default)]
struct LedgerState {
    balances: HashMap<String, u64>,
    applied: HashSet<String>,
}

/// Process-local ledger for the binary's local mode and tests.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger with one funded user.
    pub fn with_balance(user_id: impl Into<String>, balance: u64) -> Self {
        let ledger = Self::new();
        ledger.set_balance(user_id, balance);
        ledger
    }

    pub fn set_balance(&self, user_id: impl Into<String>, balance: u64) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .balances
            .insert(user_id.into(), balance);
    }

    pub fn balance(&self, user_id: &str) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .balances
            .get(user_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl CreditLedger for InMemoryLedger {
    async fn get_balance(&self, user_id: &str) -> Result<u64, LedgerError> {
        Ok(self.balance(user_id))
    }

    async fn debit(&self, user_id: &str, amount: u32, idempotency_key: &str) -> Result<u64, LedgerError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let available = state.balances.get(user_id).copied().unwrap_or(0);

        if state.applied.contains(idempotency_key) {
            return Ok(available);
        }
        if available < u64::from(amount) {
            return Err(LedgerError::InsufficientFunds {
                required: amount,
                available,
            });
        }

        let remaining = available - u64::from(amount);
        state.balances.insert(user_id.to_string(), remaining);
        state.applied.insert(idempotency_key.to_string());
        Ok(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_debit_and_idempotency() {
        let ledger = InMemoryLedger::with_balance("u1", 10);
        assert_eq!(ledger.debit("u1", 4, "job-1").await, Ok(6));
        assert_eq!(ledger.debit("u1", 4, "job-1").await, Ok(6));
        assert_eq!(ledger.debit("u1", 4, "job-2").await, Ok(2));
        assert_eq!(ledger.get_balance("u1").await, Ok(2));
    }

    #[tokio::test]
    async fn test_insufficient_funds() {
        let ledger = InMemoryLedger::with_balance("u1", 3);
        assert_eq!(
            ledger.debit("u1", 4, "job-1").await,
            Err(LedgerError::InsufficientFunds {
                required: 4,
                available: 3
            })
        );
        assert_eq!(ledger.balance("u1"), 3);
        assert_eq!(ledger.get_balance("nobody").await, Ok(0));
    }
}
