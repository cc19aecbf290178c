// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use std::str::FromStr;

use alloy::primitives::Address;
use url::Url;

/// Url argument validated at parse time
#[derive(Clone, Debug)]
pub struct ValidUrl(Url);

impl FromStr for ValidUrl {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ValidUrl(Url::parse(s)?))
    }
}

impl From<ValidUrl> for String {
    fn from(value: ValidUrl) -> Self {
        value.0.to_string()
    }
}

/// Checksummed or lowercase 0x address argument
#[derive(Clone, Copy, Debug)]
pub struct ValidAddress(pub Address);

impl FromStr for ValidAddress {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ValidAddress(s.parse()?))
    }
}

impl From<ValidAddress> for Address {
    fn from(value: ValidAddress) -> Self {
        value.0
    }
}
