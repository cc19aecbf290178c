// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy::primitives::Address;
use thiserror::Error;
use tracing::warn;

/// Coarse category used to decide how a failure is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Cancellation,
    Network,
    Wallet,
    Contract,
    Validation,
}

/// Something the user can do about a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remedy {
    SwitchChain(u64),
    AddFunds,
    RequestGrant,
    Retry,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("Request was rejected in the wallet")]
    Cancelled,

    #[error("{0}")]
    Validation(String),

    #[error("Wallet is on chain {actual} but chain {expected} is required")]
    WrongNetwork { expected: u64, actual: u64 },

    #[error("Connected account changed from {before} to {after}")]
    AccountChanged { before: Address, after: Address },

    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Not authorized to decrypt: {0}")]
    AccessDenied(String),

    #[error("Contract error: {}", reason.as_deref().unwrap_or(detail))]
    Contract {
        reason: Option<String>,
        detail: String,
    },
}

impl FlowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FlowError::Cancelled => ErrorKind::Cancellation,
            FlowError::Validation(_) => ErrorKind::Validation,
            FlowError::WrongNetwork { .. }
            | FlowError::AccountChanged { .. }
            | FlowError::InsufficientFunds(_)
            | FlowError::Wallet(_) => ErrorKind::Wallet,
            FlowError::Network(_) => ErrorKind::Network,
            FlowError::AccessDenied(_) | FlowError::Contract { .. } => ErrorKind::Contract,
        }
    }

    pub fn remedy(&self) -> Option<Remedy> {
        match self {
            FlowError::WrongNetwork { expected, .. } => Some(Remedy::SwitchChain(*expected)),
            FlowError::InsufficientFunds(_) => Some(Remedy::AddFunds),
            FlowError::AccessDenied(_) => Some(Remedy::RequestGrant),
            FlowError::Network(_) | FlowError::AccountChanged { .. } => Some(Remedy::Retry),
            _ => None,
        }
    }

    /// Whether re-running the whole flow may succeed without user action
    pub fn is_retryable(&self) -> bool {
        matches!(self, FlowError::Network(_))
    }

    /// One sentence for the user. Cancellations are silent.
    pub fn user_message(&self) -> Option<String> {
        let msg = match self {
            FlowError::Cancelled => return None,
            FlowError::Validation(reason) => reason.clone(),
            FlowError::WrongNetwork { expected, .. } => {
                format!("Please switch your wallet to chain {expected} and try again.")
            }
            FlowError::AccountChanged { .. } => {
                "Your wallet account changed, please start again.".to_string()
            }
            FlowError::InsufficientFunds(_) => {
                "Insufficient funds to pay for this transaction.".to_string()
            }
            FlowError::Wallet(_) => "The wallet could not complete the request.".to_string(),
            FlowError::Network(_) => {
                "Network error, please check your connection and try again.".to_string()
            }
            FlowError::AccessDenied(_) => {
                "You need to unlock these results before they can be decrypted.".to_string()
            }
            FlowError::Contract {
                reason: Some(reason),
                ..
            } => format!("Transaction failed: {reason}."),
            FlowError::Contract { reason: None, .. } => {
                "Transaction failed, please try again.".to_string()
            }
        };
        Some(msg)
    }

    /// Map a raw collaborator error onto the taxonomy. `fallback` is used when nothing in the
    /// message is recognised.
    pub fn classify(err: &anyhow::Error, fallback: ErrorKind) -> FlowError {
        if let Some(flow) = err.downcast_ref::<FlowError>() {
            return flow.clone();
        }
        let detail = format!("{err:#}");
        let lower = detail.to_lowercase();

        if lower.contains("user rejected")
            || lower.contains("user denied")
            || lower.contains("rejected by user")
        {
            return FlowError::Cancelled;
        }
        if lower.contains("insufficient funds") {
            return FlowError::InsufficientFunds(detail);
        }
        if lower.contains("wrong network") || lower.contains("chain mismatch") {
            return FlowError::Wallet(detail);
        }
        if lower.contains("execution reverted") || lower.contains("revert") {
            return FlowError::Contract {
                reason: revert_reason(&detail),
                detail,
            };
        }
        if lower.contains("not authorized")
            || lower.contains("not allowed to decrypt")
            || lower.contains("access denied")
        {
            return FlowError::AccessDenied(detail);
        }
        if lower.contains("gas") {
            return FlowError::Contract {
                reason: None,
                detail,
            };
        }
        // whole words only: addresses and hashes in the text must not match
        let is_network_word = |w: &str| {
            matches!(
                w,
                "timeout" | "fetch" | "connect" | "connection" | "network" | "408"
            )
        };
        if lower.contains("timed out")
            || lower
                .split(|c: char| !c.is_ascii_alphanumeric())
                .any(is_network_word)
        {
            return FlowError::Network(detail);
        }

        match fallback {
            ErrorKind::Cancellation => FlowError::Cancelled,
            ErrorKind::Network => FlowError::Network(detail),
            ErrorKind::Wallet => FlowError::Wallet(detail),
            ErrorKind::Validation => FlowError::Validation(detail),
            ErrorKind::Contract => FlowError::Contract {
                reason: None,
                detail,
            },
        }
    }

    /// Classify and log the raw error. The raw text never reaches [`Self::user_message`].
    pub fn from_collaborator(step: &str, err: anyhow::Error, fallback: ErrorKind) -> FlowError {
        let flow = Self::classify(&err, fallback);
        match flow.kind() {
            ErrorKind::Cancellation => warn!(step, "cancelled by user"),
            kind => warn!(step, ?kind, error = %format!("{err:#}"), "flow step failed"),
        }
        flow
    }
}

/// Extract the reason from messages like `execution reverted: Already voted`
fn revert_reason(detail: &str) -> Option<String> {
    let lower = detail.to_lowercase();
    let idx = lower.find("execution reverted:")?;
    let rest = &detail[idx + "execution reverted:".len()..];
    let reason: String = rest
        .trim_start()
        .chars()
        .take_while(|c| !matches!(c, '"' | ',' | '\n' | ')'))
        .collect();
    let reason = reason.trim().trim_end_matches('.').to_string();
    (!reason.is_empty()).then_some(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn classify(msg: &str) -> FlowError {
        FlowError::classify(&anyhow!(msg.to_string()), ErrorKind::Contract)
    }

    #[test]
    fn test_rejection_is_silent() {
        let err = classify("MetaMask Tx Signature: User rejected the request.");
        assert_eq!(err, FlowError::Cancelled);
        assert_eq!(err.kind(), ErrorKind::Cancellation);
        assert!(err.user_message().is_none());
    }

    #[test]
    fn test_heuristics() {
        assert_eq!(
            classify("insufficient funds for gas * price + value").kind(),
            ErrorKind::Wallet
        );
        assert_eq!(
            classify("insufficient funds for gas * price + value").remedy(),
            Some(Remedy::AddFunds)
        );
        assert_eq!(classify("wrong network").kind(), ErrorKind::Wallet);
        assert_eq!(classify("request timed out").kind(), ErrorKind::Network);
        assert_eq!(classify("HTTP 408").kind(), ErrorKind::Network);
        assert!(classify("Failed to fetch").is_retryable());
        assert_eq!(classify("intrinsic gas too low").kind(), ErrorKind::Contract);
        assert_eq!(
            classify("user 0xabc is not authorized to decrypt handle").remedy(),
            Some(Remedy::RequestGrant)
        );
    }

    #[test]
    fn test_revert_reason_is_extracted() {
        let err = classify("server returned an error response: execution reverted: Already voted, data: \"0x\"");
        assert_eq!(
            err,
            FlowError::Contract {
                reason: Some("Already voted".to_string()),
                detail: "server returned an error response: execution reverted: Already voted, data: \"0x\"".to_string(),
            }
        );
        assert_eq!(
            err.user_message().as_deref(),
            Some("Transaction failed: Already voted.")
        );
    }

    #[test]
    fn test_fallback_kind_applies() {
        let err = FlowError::classify(&anyhow!("boom"), ErrorKind::Network);
        assert_eq!(err, FlowError::Network("boom".to_string()));
    }

    #[test]
    fn test_flow_errors_pass_through() {
        let err = anyhow::Error::new(FlowError::WrongNetwork {
            expected: 11155111,
            actual: 1,
        });
        let flow = FlowError::classify(&err, ErrorKind::Contract);
        assert_eq!(flow.remedy(), Some(Remedy::SwitchChain(11155111)));
        assert!(flow.user_message().unwrap().contains("11155111"));
    }

    #[test]
    fn test_hex_digits_do_not_look_like_http_status() {
        let msg = "nonce too low: account 0x4087c3e1f2a1b2c3d4e5f60718293a4b5c6d7e8f";
        let err = FlowError::classify(&anyhow!(msg.to_string()), ErrorKind::Wallet);
        assert_eq!(err, FlowError::Wallet(msg.to_string()));
        assert!(!err.is_retryable());

        assert_eq!(classify("status code: 408").kind(), ErrorKind::Network);
        assert_eq!(classify("error sending request: connection refused").kind(), ErrorKind::Network);
        assert_eq!(classify("tx 0x408abc failed").kind(), ErrorKind::Contract);
    }

    #[test]
    fn test_revert_wins_over_access_phrases() {
        let err = classify("execution reverted: Not authorized");
        assert_eq!(
            err,
            FlowError::Contract {
                reason: Some("Not authorized".to_string()),
                detail: "execution reverted: Not authorized".to_string(),
            }
        );
        assert_eq!(err.remedy(), None);
    }
}
