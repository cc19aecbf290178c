// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

//! Conversions between ether-denominated fee strings and integer wei.
//!
//! Fees are shown with [`DISPLAY_DECIMALS`] places. Parsing is exact and refuses extra precision
//! instead of truncating it. Formatting rounds up, so a displayed fee parsed back is never below
//! the on-chain amount.

use alloy::primitives::{
    utils::{format_units, parse_units},
    U256,
};
use thiserror::Error;

/// Decimals of the chain's native unit
pub const WEI_DECIMALS: u8 = 18;

/// Decimal places used when presenting fees
pub const DISPLAY_DECIMALS: u32 = 3;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum UnitsError {
    #[error("Fee amount is empty")]
    Empty,
    #[error("Fee amount '{0}' must not be negative")]
    Negative(String),
    #[error("Fee amount '{0}' has more than {DISPLAY_DECIMALS} decimal places")]
    TooPrecise(String),
    #[error("Fee amount '{0}' is not a decimal number")]
    Malformed(String),
}

fn display_step() -> U256 {
    U256::from(10u64).pow(U256::from(WEI_DECIMALS as u32 - DISPLAY_DECIMALS))
}

/// Parse a display amount such as `"0.001"` into wei without any rounding.
pub fn parse_fee(display: &str) -> Result<U256, UnitsError> {
    let amount = display.trim();
    if amount.is_empty() {
        return Err(UnitsError::Empty);
    }
    if amount.starts_with('-') {
        return Err(UnitsError::Negative(amount.to_string()));
    }

    let (whole, frac) = amount.split_once('.').unwrap_or((amount, ""));
    let digits_only = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && frac.is_empty()) || !digits_only(whole) || !digits_only(frac) {
        return Err(UnitsError::Malformed(amount.to_string()));
    }
    if frac.len() > DISPLAY_DECIMALS as usize {
        return Err(UnitsError::TooPrecise(amount.to_string()));
    }

    let whole = if whole.is_empty() { "0" } else { whole };
    let normalized = if frac.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{frac}")
    };
    let parsed = parse_units(&normalized, WEI_DECIMALS)
        .map_err(|_| UnitsError::Malformed(amount.to_string()))?;
    Ok(parsed.into())
}

/// Present a wei amount with [`DISPLAY_DECIMALS`] places, rounding any remainder up.
pub fn format_fee(wei: U256) -> String {
    let step = display_step();
    let mut steps = wei / step;
    if wei % step != U256::ZERO {
        steps += U256::from(1u8);
    }

    let scale = U256::from(10u64).pow(U256::from(DISPLAY_DECIMALS));
    let whole = steps / scale;
    let frac = steps % scale;
    format!(
        "{}.{:0width$}",
        whole,
        frac.to::<u64>(),
        width = DISPLAY_DECIMALS as usize
    )
}

/// Full precision ether string, for logs
pub fn format_ether(wei: U256) -> String {
    format_units(wei, WEI_DECIMALS).unwrap_or_else(|_| format!("{wei} wei"))
}
