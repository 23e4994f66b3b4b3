// SPDX-License-Identifier: AGPL-3.0-only
//! # EMU Action ABI
//!
//! Serde-tagged call surface for driving the token engine with
//! JSON-serialized requests from an embedding runtime. Each call
//! carries the verified caller address and the environment timestamp;
//! [`execute`] dispatches to the typed [`EmuToken`] methods and folds
//! the outcome into an [`EmuResponse`] envelope with any events
//! emitted during the call.
//!
//! [`validate_action`] performs the surface checks (empty addresses,
//! zero amounts) a node applies before forwarding a request; the
//! engine's own precondition checks remain authoritative.

use serde::{Deserialize, Serialize};

use crate::error::TokenError;
use crate::token::{EmuEvent, EmuToken};

// ─────────────────────────────────────────────────────────────
// ACTIONS
// ─────────────────────────────────────────────────────────────

/// Every operation the engine exposes, as a tagged request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum EmuAction {
    /// Transfer `amount` tokens from the caller to `to`.
    Transfer {
        to: String,
        #[serde(with = "crate::u128_str")]
        amount: u128,
    },

    /// Approve `spender` to spend up to `amount` on behalf of the caller.
    Approve {
        spender: String,
        #[serde(with = "crate::u128_str")]
        amount: u128,
    },

    /// Transfer `amount` from `from` to `to`, consuming the caller's
    /// allowance.
    TransferFrom {
        from: String,
        to: String,
        #[serde(with = "crate::u128_str")]
        amount: u128,
    },

    // ── Read-only queries ──
    /// Return balance of `account` in atomic units.
    BalanceOf { account: String },

    /// Return allowance granted by `owner` to `spender`.
    AllowanceOf { owner: String, spender: String },

    /// Return total supply in atomic units.
    TotalSupply,

    /// Return full token metadata.
    TokenInfo,

    /// Return whether lock enforcement is still active.
    LockingTransfers,

    // ── Lock administration (owner-only, while locking is enabled) ──
    AddAllowedSenderAddress { address: String },
    RemoveAllowedSenderAddress { address: String },
    AddAllowedReceiverAddress { address: String },
    RemoveAllowedReceiverAddress { address: String },

    /// Return the sender allow-list membership.
    AllowedSenderAddresses,

    /// Return the receiver allow-list membership.
    AllowedReceiverAddresses,

    /// Permanently disable lock enforcement.
    StopLockingTransfers,

    /// Return `account`'s unlock date.
    UnlockDateOf { account: String },

    /// Return the caller's own unlock date (any caller).
    MyUnlockDate,

    /// Override `account`'s unlock date.
    UpdateUnlockDate { account: String, unlock_date: u64 },
}

// ─────────────────────────────────────────────────────────────
// RESPONSE
// ─────────────────────────────────────────────────────────────

/// Standard response envelope from an action dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmuResponse {
    pub success: bool,
    /// JSON-encoded return data (balance, unlock date, address lists, ...)
    #[serde(default)]
    pub data: Option<String>,
    /// Human-readable message
    pub message: String,
    /// Events emitted during this call
    #[serde(default)]
    pub events: Vec<EmuEvent>,
}

impl EmuResponse {
    fn ok(data: Option<String>, message: String, events: Vec<EmuEvent>) -> Self {
        Self {
            success: true,
            data,
            message,
            events,
        }
    }

    fn fail(err: TokenError) -> Self {
        Self {
            success: false,
            data: None,
            message: err.to_string(),
            events: Vec::new(),
        }
    }
}

// ─────────────────────────────────────────────────────────────
// VALIDATION
// ─────────────────────────────────────────────────────────────

/// Validate an action's surface shape before dispatch.
pub fn validate_action(action: &EmuAction) -> Result<(), String> {
    match action {
        EmuAction::Transfer { to, amount } => {
            if to.is_empty() {
                return Err("Transfer: recipient address is empty".to_string());
            }
            if *amount == 0 {
                return Err("Transfer: amount must be > 0".to_string());
            }
            Ok(())
        }
        EmuAction::Approve { spender, .. } => {
            if spender.is_empty() {
                return Err("Approve: spender address is empty".to_string());
            }
            Ok(())
        }
        EmuAction::TransferFrom { from, to, amount } => {
            if from.is_empty() || to.is_empty() {
                return Err("TransferFrom: addresses must not be empty".to_string());
            }
            if *amount == 0 {
                return Err("TransferFrom: amount must be > 0".to_string());
            }
            Ok(())
        }
        EmuAction::BalanceOf { account } | EmuAction::UnlockDateOf { account } => {
            if account.is_empty() {
                return Err("account address is empty".to_string());
            }
            Ok(())
        }
        EmuAction::AllowanceOf { owner, spender } => {
            if owner.is_empty() || spender.is_empty() {
                return Err("AllowanceOf: addresses must not be empty".to_string());
            }
            Ok(())
        }
        EmuAction::AddAllowedSenderAddress { address }
        | EmuAction::RemoveAllowedSenderAddress { address }
        | EmuAction::AddAllowedReceiverAddress { address }
        | EmuAction::RemoveAllowedReceiverAddress { address } => {
            if address.is_empty() {
                return Err("allow-list address is empty".to_string());
            }
            Ok(())
        }
        EmuAction::UpdateUnlockDate { account, .. } => {
            if account.is_empty() {
                return Err("UpdateUnlockDate: account address is empty".to_string());
            }
            Ok(())
        }
        EmuAction::TotalSupply
        | EmuAction::TokenInfo
        | EmuAction::LockingTransfers
        | EmuAction::AllowedSenderAddresses
        | EmuAction::AllowedReceiverAddresses
        | EmuAction::StopLockingTransfers
        | EmuAction::MyUnlockDate => Ok(()),
    }
}

// ─────────────────────────────────────────────────────────────
// DISPATCH
// ─────────────────────────────────────────────────────────────

/// Execute an action against the token. `caller` is the verified
/// address injected by the runtime, `now` the environment timestamp in
/// Unix seconds.
pub fn execute(token: &mut EmuToken, caller: &str, action: EmuAction, now: u64) -> EmuResponse {
    match action {
        EmuAction::Transfer { to, amount } => match token.transfer(caller, &to, amount, now) {
            Ok(()) => EmuResponse::ok(
                None,
                format!("Transferred {} to {}", amount, to),
                token.drain_events(),
            ),
            Err(e) => EmuResponse::fail(e),
        },

        EmuAction::Approve { spender, amount } => match token.approve(caller, &spender, amount) {
            Ok(()) => EmuResponse::ok(
                None,
                format!("Approved {} for {}", amount, spender),
                token.drain_events(),
            ),
            Err(e) => EmuResponse::fail(e),
        },

        EmuAction::TransferFrom { from, to, amount } => {
            match token.transfer_from(caller, &from, &to, amount, now) {
                Ok(()) => EmuResponse::ok(
                    None,
                    format!("Transferred {} from {} to {}", amount, from, to),
                    token.drain_events(),
                ),
                Err(e) => EmuResponse::fail(e),
            }
        }

        EmuAction::BalanceOf { account } => {
            let balance = token.balance_of(&account);
            EmuResponse::ok(
                Some(balance.to_string()),
                format!("Balance: {}", balance),
                Vec::new(),
            )
        }

        EmuAction::AllowanceOf { owner, spender } => {
            let allowance = token.allowance(&owner, &spender);
            EmuResponse::ok(
                Some(allowance.to_string()),
                format!("Allowance: {}", allowance),
                Vec::new(),
            )
        }

        EmuAction::TotalSupply => EmuResponse::ok(
            Some(token.total_supply().to_string()),
            "Total supply".to_string(),
            Vec::new(),
        ),

        EmuAction::TokenInfo => EmuResponse::ok(
            Some(serde_json::to_string(&token.metadata).unwrap_or_else(|_| "{}".to_string())),
            "Token info".to_string(),
            Vec::new(),
        ),

        EmuAction::LockingTransfers => {
            let locking = token.locking_transfers();
            EmuResponse::ok(
                Some(locking.to_string()),
                format!("Locking transfers: {}", locking),
                Vec::new(),
            )
        }

        EmuAction::AddAllowedSenderAddress { address } => {
            match token.add_allowed_sender_address(caller, &address) {
                Ok(()) => EmuResponse::ok(
                    None,
                    format!("Added allowed sender {}", address),
                    token.drain_events(),
                ),
                Err(e) => EmuResponse::fail(e),
            }
        }

        EmuAction::RemoveAllowedSenderAddress { address } => {
            match token.remove_allowed_sender_address(caller, &address) {
                Ok(()) => EmuResponse::ok(
                    None,
                    format!("Removed allowed sender {}", address),
                    token.drain_events(),
                ),
                Err(e) => EmuResponse::fail(e),
            }
        }

        EmuAction::AddAllowedReceiverAddress { address } => {
            match token.add_allowed_receiver_address(caller, &address) {
                Ok(()) => EmuResponse::ok(
                    None,
                    format!("Added allowed receiver {}", address),
                    token.drain_events(),
                ),
                Err(e) => EmuResponse::fail(e),
            }
        }

        EmuAction::RemoveAllowedReceiverAddress { address } => {
            match token.remove_allowed_receiver_address(caller, &address) {
                Ok(()) => EmuResponse::ok(
                    None,
                    format!("Removed allowed receiver {}", address),
                    token.drain_events(),
                ),
                Err(e) => EmuResponse::fail(e),
            }
        }

        EmuAction::AllowedSenderAddresses => match token.allowed_sender_addresses(caller) {
            Ok(addrs) => EmuResponse::ok(
                Some(serde_json::to_string(&addrs).unwrap_or_else(|_| "[]".to_string())),
                format!("{} allowed senders", addrs.len()),
                Vec::new(),
            ),
            Err(e) => EmuResponse::fail(e),
        },

        EmuAction::AllowedReceiverAddresses => match token.allowed_receiver_addresses(caller) {
            Ok(addrs) => EmuResponse::ok(
                Some(serde_json::to_string(&addrs).unwrap_or_else(|_| "[]".to_string())),
                format!("{} allowed receivers", addrs.len()),
                Vec::new(),
            ),
            Err(e) => EmuResponse::fail(e),
        },

        EmuAction::StopLockingTransfers => match token.stop_locking_transfers(caller) {
            Ok(()) => EmuResponse::ok(
                None,
                "Transfer locking permanently disabled".to_string(),
                token.drain_events(),
            ),
            Err(e) => EmuResponse::fail(e),
        },

        EmuAction::UnlockDateOf { account } => match token.unlock_date_of(caller, &account) {
            Ok(date) => EmuResponse::ok(
                Some(date.to_string()),
                format!("Unlock date: {}", date),
                Vec::new(),
            ),
            Err(e) => EmuResponse::fail(e),
        },

        EmuAction::MyUnlockDate => match token.my_unlock_date(caller) {
            Ok(date) => EmuResponse::ok(
                Some(date.to_string()),
                format!("Unlock date: {}", date),
                Vec::new(),
            ),
            Err(e) => EmuResponse::fail(e),
        },

        EmuAction::UpdateUnlockDate {
            account,
            unlock_date,
        } => match token.update_unlock_date(caller, &account, unlock_date) {
            Ok(()) => EmuResponse::ok(
                None,
                format!("Unlock date of {} set to {}", account, unlock_date),
                token.drain_events(),
            ),
            Err(e) => EmuResponse::fail(e),
        },
    }
}

// ─────────────────────────────────────────────────────────────
// TESTS
// ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: &str = "0xOwner000000000000000000000000000000000";
    const RECIPIENT: &str = "0xRecipient00000000000000000000000000000";

    const NOW: u64 = 1_700_000_000;

    fn make_token() -> EmuToken {
        EmuToken::new("EMU Token", "EMU", 18, 1_000_000, OWNER).unwrap()
    }

    // ── Validation ──

    #[test]
    fn test_validate_transfer() {
        assert!(validate_action(&EmuAction::Transfer {
            to: RECIPIENT.to_string(),
            amount: 100,
        })
        .is_ok());
    }

    #[test]
    fn test_validate_transfer_zero_amount() {
        assert!(validate_action(&EmuAction::Transfer {
            to: RECIPIENT.to_string(),
            amount: 0,
        })
        .is_err());
    }

    #[test]
    fn test_validate_transfer_empty_to() {
        assert!(validate_action(&EmuAction::Transfer {
            to: String::new(),
            amount: 100,
        })
        .is_err());
    }

    #[test]
    fn test_validate_empty_allow_list_address() {
        assert!(validate_action(&EmuAction::AddAllowedSenderAddress {
            address: String::new(),
        })
        .is_err());
    }

    #[test]
    fn test_validate_nullary_actions() {
        assert!(validate_action(&EmuAction::TotalSupply).is_ok());
        assert!(validate_action(&EmuAction::StopLockingTransfers).is_ok());
        assert!(validate_action(&EmuAction::MyUnlockDate).is_ok());
    }

    // ── Dispatch ──

    #[test]
    fn test_execute_transfer_success() {
        let mut token = make_token();
        let resp = execute(
            &mut token,
            OWNER,
            EmuAction::Transfer {
                to: RECIPIENT.to_string(),
                amount: 100,
            },
            NOW,
        );
        assert!(resp.success);
        assert_eq!(token.balance_of(RECIPIENT), 100);
        // Transfer + first-receipt lock stamp
        assert_eq!(resp.events.len(), 2);
    }

    #[test]
    fn test_execute_transfer_failure_envelope() {
        let mut token = make_token();
        let resp = execute(
            &mut token,
            RECIPIENT,
            EmuAction::Transfer {
                to: OWNER.to_string(),
                amount: 100,
            },
            NOW,
        );
        assert!(!resp.success);
        assert!(resp.message.contains("insufficient balance"));
        assert!(resp.events.is_empty());
    }

    #[test]
    fn test_execute_queries() {
        let mut token = make_token();
        let resp = execute(
            &mut token,
            RECIPIENT,
            EmuAction::BalanceOf {
                account: OWNER.to_string(),
            },
            NOW,
        );
        assert_eq!(resp.data, Some("1000000".to_string()));

        let resp = execute(&mut token, RECIPIENT, EmuAction::LockingTransfers, NOW);
        assert_eq!(resp.data, Some("true".to_string()));

        let resp = execute(&mut token, RECIPIENT, EmuAction::MyUnlockDate, NOW);
        assert!(resp.success);
        assert_eq!(resp.data, Some("0".to_string()));
    }

    #[test]
    fn test_execute_owner_query_unauthorized() {
        let mut token = make_token();
        let resp = execute(&mut token, RECIPIENT, EmuAction::AllowedSenderAddresses, NOW);
        assert!(!resp.success);
        assert!(resp.message.contains("unauthorized"));
    }

    #[test]
    fn test_execute_stop_then_admin_fails() {
        let mut token = make_token();
        let resp = execute(&mut token, OWNER, EmuAction::StopLockingTransfers, NOW);
        assert!(resp.success);
        assert!(resp.events.contains(&EmuEvent::LockingStopped));

        let resp = execute(
            &mut token,
            OWNER,
            EmuAction::UnlockDateOf {
                account: RECIPIENT.to_string(),
            },
            NOW,
        );
        assert!(!resp.success);
        assert!(resp.message.contains("permanently disabled"));
    }

    #[test]
    fn test_token_info_data() {
        let mut token = make_token();
        let resp = execute(&mut token, RECIPIENT, EmuAction::TokenInfo, NOW);
        assert!(resp.success);
        let meta: crate::token::TokenMetadata =
            serde_json::from_str(resp.data.as_ref().unwrap()).unwrap();
        assert_eq!(meta.symbol, "EMU");
        assert_eq!(meta.total_supply, 1_000_000);
    }

    // ── Serialization ──

    #[test]
    fn test_action_json_roundtrip() {
        let action = EmuAction::TransferFrom {
            from: OWNER.to_string(),
            to: RECIPIENT.to_string(),
            amount: 42_000,
        };
        let json = serde_json::to_string(&action).unwrap();
        assert!(json.contains("\"action\":\"TransferFrom\""));
        assert!(json.contains("\"42000\""));
        let decoded: EmuAction = serde_json::from_str(&json).unwrap();
        if let EmuAction::TransferFrom { from, to, amount } = decoded {
            assert_eq!(from, OWNER);
            assert_eq!(to, RECIPIENT);
            assert_eq!(amount, 42_000);
        } else {
            panic!("Wrong variant");
        }
    }

    #[test]
    fn test_event_json_roundtrip() {
        let event = EmuEvent::UnlockDateSet {
            account: RECIPIENT.to_string(),
            unlock_date: NOW,
        };
        let json = serde_json::to_string(&event).unwrap();
        let decoded: EmuEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, event);
    }
}
