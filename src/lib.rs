// SPDX-License-Identifier: AGPL-3.0-only
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// EMU TOKEN - LEDGER & LOCK ENGINE
//
// Fungible token ledger with an allow-list gated transfer-locking
// state machine. Balances, allowances, per-account unlock dates and a
// one-way global locking mode, enforced atomically per call.
// All financial arithmetic uses u128 atomic units (no floating-point).
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

// Typed errors for every violated precondition
pub mod error;
// EmuToken state machine: ledger, locks, admin surface, events
pub mod token;
// Serde-tagged action ABI: validation + execute dispatch
pub mod action;

pub use action::{execute, validate_action, EmuAction, EmuResponse};
pub use error::{TokenError, TokenResult};
pub use token::{EmuEvent, EmuToken, LockingMode, TokenMetadata};

/// Duration of the vesting lock applied to a first-time recipient of an
/// allowed-sender transfer: 40 days in seconds.
pub const LOCK_DURATION_SECS: u64 = 40 * 86_400;

/// 1 EMU = 10^18 atomic units (conventional 18-decimal fungible token)
pub const UNITS_PER_EMU: u128 = 1_000_000_000_000_000_000;

/// Total supply minted to the owner at construction: 100,000,000 EMU
pub const TOTAL_SUPPLY_UNITS: u128 = 100_000_000 * UNITS_PER_EMU;

// ─────────────────────────────────────────────────────────────
// u128 ↔ String serialization (JSON doesn't support 128-bit integers)
// ─────────────────────────────────────────────────────────────

pub(crate) mod u128_str {
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(val: &u128, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&val.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u128, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<u128>().map_err(serde::de::Error::custom)
    }
}
