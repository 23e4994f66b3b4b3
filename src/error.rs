// SPDX-License-Identifier: AGPL-3.0-only
//! Token operation errors.
//!
//! Every failure is synchronous and atomic: the engine validates all
//! preconditions before mutating anything, so a returned error
//! guarantees balances, unlock dates, set membership and the mode flag
//! are exactly as they were before the call.

use thiserror::Error;

/// Error during token operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Non-owner calling an owner-only operation
    #[error("unauthorized: {caller} is not the contract owner")]
    Unauthorized { caller: String },

    /// Outbound transfer blocked by an unexpired lock while the
    /// destination is not on the receiver allow-list
    #[error("transfers from {account} are locked until {unlock_date}")]
    Locked { account: String, unlock_date: u64 },

    /// Administrative or query operation attempted after the one-way
    /// transition to the unlocked mode
    #[error("transfer locking has been permanently disabled")]
    LockingDisabled,

    /// Redundant stop-locking call
    #[error("transfer locking is already disabled")]
    AlreadyDisabled,

    #[error("insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: u128, need: u128 },

    #[error("insufficient allowance: have {have}, need {need}")]
    InsufficientAllowance { have: u128, need: u128 },

    #[error("arithmetic overflow")]
    Overflow,

    /// Construction-time metadata validation failure
    #[error("invalid token metadata: {0}")]
    InvalidMetadata(String),
}

/// Result type for token operations
pub type TokenResult<T> = Result<T, TokenError>;
