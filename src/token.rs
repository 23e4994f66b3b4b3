// SPDX-License-Identifier: AGPL-3.0-only
//! # EMU Token State Machine
//!
//! The whole system is one state machine over one data store: an
//! account ledger (balances + allowances) combined with per-account
//! unlock dates, two owner-managed allow-lists and a one-way global
//! locking mode.
//!
//! ## Architecture
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  EmuToken                                                    │
//! │  ┌──────────┐ ┌───────────┐ ┌──────────────┐ ┌────────────┐ │
//! │  │ Balances │ │ Allowances│ │ Unlock dates │ │ Allow-lists│ │
//! │  │ addr→u128│ │ (o,s)→u128│ │ addr→u64     │ │ senders    │ │
//! │  │          │ │           │ │ 0 = unlocked │ │ receivers  │ │
//! │  └──────────┘ └───────────┘ └──────────────┘ └────────────┘ │
//! │            mode: Locking (initial) → Unlocked (terminal)     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Locking rules (active only in `Locking` mode)
//! - Outbound: a sender whose unlock date lies in the future may only
//!   transfer to addresses on the receiver allow-list.
//! - Inbound: a transfer from an allowed sender to an account with
//!   zero prior balance stamps the recipient with `now + 40 days`;
//!   to an account with standing balance it leaves the date alone.
//!   A transfer from any other holder stamps the recipient with `now`,
//!   overriding any earlier future lock.
//!
//! The caller identity and the current time are injected by the
//! embedding runtime; the engine never reads a clock itself.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{TokenError, TokenResult};
use crate::LOCK_DURATION_SECS;

// ─────────────────────────────────────────────────────────────
// TOKEN METADATA
// ─────────────────────────────────────────────────────────────

/// Token metadata, fixed at construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenMetadata {
    /// Human-readable name (e.g. "EMU Token")
    pub name: String,
    /// Ticker symbol (e.g. "EMU"), max 8 characters
    pub symbol: String,
    /// Decimal places for display
    pub decimals: u8,
    /// Total supply in atomic units (minted to the owner, never changes)
    #[serde(with = "crate::u128_str")]
    pub total_supply: u128,
}

impl TokenMetadata {
    /// Validate metadata fields.
    pub fn validate(&self) -> TokenResult<()> {
        if self.name.is_empty() || self.name.len() > 64 {
            return Err(TokenError::InvalidMetadata(
                "name must be 1-64 characters".to_string(),
            ));
        }
        if self.symbol.is_empty() || self.symbol.len() > 8 {
            return Err(TokenError::InvalidMetadata(
                "symbol must be 1-8 characters".to_string(),
            ));
        }
        if self.decimals > 18 {
            return Err(TokenError::InvalidMetadata(
                "decimals must be 0-18".to_string(),
            ));
        }
        if self.total_supply == 0 {
            return Err(TokenError::InvalidMetadata(
                "total supply must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────
// LOCKING MODE
// ─────────────────────────────────────────────────────────────

/// Global locking mode. One-way: `Locking` → `Unlocked`, fired exactly
/// once by `stop_locking_transfers`. In `Unlocked` every administrative
/// and lock-query operation fails permanently and transfers degrade to
/// unrestricted ledger moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockingMode {
    Locking,
    Unlocked,
}

// ─────────────────────────────────────────────────────────────
// EVENTS
// ─────────────────────────────────────────────────────────────

/// Events emitted by successful mutations, for indexing by the
/// embedding runtime. Drained via [`EmuToken::drain_events`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum EmuEvent {
    /// Emitted on transfer / transfer_from
    Transfer {
        from: String,
        to: String,
        #[serde(with = "crate::u128_str")]
        amount: u128,
    },
    /// Emitted on approve
    Approval {
        owner: String,
        spender: String,
        #[serde(with = "crate::u128_str")]
        amount: u128,
    },
    /// Emitted whenever an account's unlock date is written, either by
    /// transfer propagation or by the administrative override
    UnlockDateSet { account: String, unlock_date: u64 },
    /// Emitted on the one-way transition to the unlocked mode
    LockingStopped,
}

// ─────────────────────────────────────────────────────────────
// TOKEN STATE
// ─────────────────────────────────────────────────────────────

/// In-memory EMU token state.
///
/// The embedding runtime serializes calls: each method executes to
/// completion as a single atomic unit, so no internal synchronization
/// is needed. All maps are BTree collections for deterministic
/// iteration and serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmuToken {
    pub metadata: TokenMetadata,
    /// Privileged address fixed at construction
    owner: String,
    /// addr → balance in atomic units (absent = 0)
    pub balances: BTreeMap<String, u128>,
    /// owner → spender → allowance. Nested maps keep JSON-serializable
    /// string keys while staying deterministic.
    pub allowances: BTreeMap<String, BTreeMap<String, u128>>,
    /// addr → unlock date, Unix seconds (absent or 0 = already unlocked)
    unlock_dates: BTreeMap<String, u64>,
    /// Addresses whose outgoing transfers impose the 40-day lock on
    /// first-time recipients. Contains the owner at construction.
    allowed_senders: BTreeSet<String>,
    /// Addresses that are valid destinations even from a locked sender
    allowed_receivers: BTreeSet<String>,
    mode: LockingMode,
    /// Events emitted since the last drain. Transient, not state.
    #[serde(skip)]
    events: Vec<EmuEvent>,
}

impl EmuToken {
    /// Create a new token: `total_supply` is minted to `owner`, the
    /// sender allow-list starts as `{owner}`, the receiver allow-list
    /// starts empty, and locking is enabled.
    pub fn new(
        name: &str,
        symbol: &str,
        decimals: u8,
        total_supply: u128,
        owner: &str,
    ) -> TokenResult<Self> {
        let metadata = TokenMetadata {
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals,
            total_supply,
        };
        metadata.validate()?;
        if owner.is_empty() {
            return Err(TokenError::InvalidMetadata(
                "owner address must not be empty".to_string(),
            ));
        }

        let mut balances = BTreeMap::new();
        balances.insert(owner.to_string(), total_supply);

        let mut allowed_senders = BTreeSet::new();
        allowed_senders.insert(owner.to_string());

        Ok(Self {
            metadata,
            owner: owner.to_string(),
            balances,
            allowances: BTreeMap::new(),
            unlock_dates: BTreeMap::new(),
            allowed_senders,
            allowed_receivers: BTreeSet::new(),
            mode: LockingMode::Locking,
            events: Vec::new(),
        })
    }

    /// Canonical EMU deployment: the full supply minted to `owner`
    /// with the standard 18-decimal metadata.
    pub fn deploy(owner: &str) -> TokenResult<Self> {
        Self::new("EMU Token", "EMU", 18, crate::TOTAL_SUPPLY_UNITS, owner)
    }

    // ── Unrestricted queries ──

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn total_supply(&self) -> u128 {
        self.metadata.total_supply
    }

    /// Balance of `account` in atomic units. Fresh accounts are 0.
    pub fn balance_of(&self, account: &str) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Allowance granted by `owner` to `spender`.
    pub fn allowance(&self, owner: &str, spender: &str) -> u128 {
        self.allowances
            .get(owner)
            .and_then(|per_spender| per_spender.get(spender))
            .copied()
            .unwrap_or(0)
    }

    /// Whether lock enforcement is still active. Readable by anyone in
    /// either mode.
    pub fn locking_transfers(&self) -> bool {
        self.mode == LockingMode::Locking
    }

    /// Drain the events emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<EmuEvent> {
        std::mem::take(&mut self.events)
    }

    // ── Transfers ──

    /// Transfer `amount` from the caller to `to`.
    pub fn transfer(&mut self, caller: &str, to: &str, amount: u128, now: u64) -> TokenResult<()> {
        self.execute_transfer(caller, to, amount, now)
    }

    /// Transfer `amount` from `from` to `to` on behalf of the caller,
    /// consuming the caller's allowance from `from`.
    pub fn transfer_from(
        &mut self,
        caller: &str,
        from: &str,
        to: &str,
        amount: u128,
        now: u64,
    ) -> TokenResult<()> {
        let allowed = self.allowance(from, caller);
        if allowed < amount {
            return Err(TokenError::InsufficientAllowance {
                have: allowed,
                need: amount,
            });
        }
        self.execute_transfer(from, to, amount, now)?;
        // Consume allowance only after the transfer committed
        self.allowances
            .entry(from.to_string())
            .or_default()
            .insert(caller.to_string(), allowed - amount);
        Ok(())
    }

    /// Approve `spender` to spend up to `amount` on behalf of the
    /// caller. Standard bookkeeping, available in either mode.
    pub fn approve(&mut self, caller: &str, spender: &str, amount: u128) -> TokenResult<()> {
        self.allowances
            .entry(caller.to_string())
            .or_default()
            .insert(spender.to_string(), amount);
        self.events.push(EmuEvent::Approval {
            owner: caller.to_string(),
            spender: spender.to_string(),
            amount,
        });
        Ok(())
    }

    /// Shared debit/credit/lock-propagation triad. Validates every
    /// precondition before the first mutation so failures are atomic.
    fn execute_transfer(&mut self, from: &str, to: &str, amount: u128, now: u64) -> TokenResult<()> {
        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return Err(TokenError::InsufficientBalance {
                have: from_balance,
                need: amount,
            });
        }

        // Outbound restriction: a still-locked sender may only reach
        // allow-listed destinations. unlock date 0 never trips this.
        if self.mode == LockingMode::Locking {
            let unlock_date = self.unlock_date(from);
            if now < unlock_date && !self.allowed_receivers.contains(to) {
                return Err(TokenError::Locked {
                    account: from.to_string(),
                    unlock_date,
                });
            }
        }

        // Snapshot before the credit: the first-receipt rule keys off
        // the recipient's pre-transfer balance, never the post state.
        let to_balance_before = self.balance_of(to);
        to_balance_before
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;

        // All validations passed — commit the debit/credit pair
        {
            let bal = self.balances.entry(from.to_string()).or_insert(0);
            *bal -= amount;
        }
        {
            let bal = self.balances.entry(to.to_string()).or_insert(0);
            *bal = bal.saturating_add(amount);
        }

        // Inbound propagation
        if self.mode == LockingMode::Locking {
            if self.allowed_senders.contains(from) {
                if to_balance_before == 0 {
                    // First-ever receipt: one-time vesting lock
                    self.set_unlock_date(to, now.saturating_add(LOCK_DURATION_SECS));
                }
                // Standing balance: unlock date left unchanged
            } else {
                // Mixing already-liquid funds makes the whole balance
                // liquid as of now, overriding any earlier future lock
                self.set_unlock_date(to, now);
            }
        }

        self.events.push(EmuEvent::Transfer {
            from: from.to_string(),
            to: to.to_string(),
            amount,
        });
        Ok(())
    }

    // ── Allow-list administration (owner-only, Locking mode only) ──

    /// Add `address` to the sender allow-list. Idempotent.
    pub fn add_allowed_sender_address(&mut self, caller: &str, address: &str) -> TokenResult<()> {
        self.require_owner(caller)?;
        self.require_locking()?;
        self.allowed_senders.insert(address.to_string());
        Ok(())
    }

    /// Remove `address` from the sender allow-list. Idempotent; the
    /// owner may remove itself, after which its transfers reset
    /// recipients' unlock dates to `now` like any other holder's.
    pub fn remove_allowed_sender_address(&mut self, caller: &str, address: &str) -> TokenResult<()> {
        self.require_owner(caller)?;
        self.require_locking()?;
        self.allowed_senders.remove(address);
        Ok(())
    }

    /// Add `address` to the receiver allow-list. Idempotent.
    pub fn add_allowed_receiver_address(&mut self, caller: &str, address: &str) -> TokenResult<()> {
        self.require_owner(caller)?;
        self.require_locking()?;
        self.allowed_receivers.insert(address.to_string());
        Ok(())
    }

    /// Remove `address` from the receiver allow-list. Idempotent.
    pub fn remove_allowed_receiver_address(
        &mut self,
        caller: &str,
        address: &str,
    ) -> TokenResult<()> {
        self.require_owner(caller)?;
        self.require_locking()?;
        self.allowed_receivers.remove(address);
        Ok(())
    }

    /// Current sender allow-list membership (owner-only). Membership is
    /// a set; the returned order carries no meaning.
    pub fn allowed_sender_addresses(&self, caller: &str) -> TokenResult<Vec<String>> {
        self.require_owner(caller)?;
        self.require_locking()?;
        Ok(self.allowed_senders.iter().cloned().collect())
    }

    /// Current receiver allow-list membership (owner-only).
    pub fn allowed_receiver_addresses(&self, caller: &str) -> TokenResult<Vec<String>> {
        self.require_owner(caller)?;
        self.require_locking()?;
        Ok(self.allowed_receivers.iter().cloned().collect())
    }

    // ── Lock administration (owner-only, Locking mode only) ──

    /// Permanently disable lock enforcement and every administrative
    /// operation. Irreversible; a second call fails.
    pub fn stop_locking_transfers(&mut self, caller: &str) -> TokenResult<()> {
        self.require_owner(caller)?;
        if self.mode == LockingMode::Unlocked {
            return Err(TokenError::AlreadyDisabled);
        }
        self.mode = LockingMode::Unlocked;
        self.events.push(EmuEvent::LockingStopped);
        Ok(())
    }

    /// Unlock date of any account (owner-only). 0 means already
    /// unlocked.
    pub fn unlock_date_of(&self, caller: &str, account: &str) -> TokenResult<u64> {
        self.require_owner(caller)?;
        self.require_locking()?;
        Ok(self.unlock_date(account))
    }

    /// The caller's own unlock date. Readable by any account while
    /// locking is enabled, by nobody afterward.
    pub fn my_unlock_date(&self, caller: &str) -> TokenResult<u64> {
        self.require_locking()?;
        Ok(self.unlock_date(caller))
    }

    /// Manual override of an account's unlock date (owner-only): a past
    /// value unlocks immediately, a future value (re-)locks.
    pub fn update_unlock_date(
        &mut self,
        caller: &str,
        account: &str,
        new_unlock_date: u64,
    ) -> TokenResult<()> {
        self.require_owner(caller)?;
        self.require_locking()?;
        self.set_unlock_date(account, new_unlock_date);
        Ok(())
    }

    // ── Internal helpers ──

    fn unlock_date(&self, account: &str) -> u64 {
        self.unlock_dates.get(account).copied().unwrap_or(0)
    }

    fn set_unlock_date(&mut self, account: &str, unlock_date: u64) {
        self.unlock_dates.insert(account.to_string(), unlock_date);
        self.events.push(EmuEvent::UnlockDateSet {
            account: account.to_string(),
            unlock_date,
        });
    }

    fn require_owner(&self, caller: &str) -> TokenResult<()> {
        if caller != self.owner {
            return Err(TokenError::Unauthorized {
                caller: caller.to_string(),
            });
        }
        Ok(())
    }

    fn require_locking(&self) -> TokenResult<()> {
        match self.mode {
            LockingMode::Locking => Ok(()),
            LockingMode::Unlocked => Err(TokenError::LockingDisabled),
        }
    }
}

// ─────────────────────────────────────────────────────────────
// TESTS
// ─────────────────────────────────────────────────────────────
