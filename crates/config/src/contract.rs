// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy::primitives::Address;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Hash, Eq, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Contract {
    Full { address: String },
    AddressOnly(String),
}

impl Contract {
    pub fn address_str(&self) -> &str {
        match self {
            Contract::Full { address, .. } => address,
            Contract::AddressOnly(v) => v,
        }
    }

    pub fn address(&self) -> Result<Address> {
        self.address_str()
            .parse()
            .with_context(|| format!("Invalid contract address '{}'", self.address_str()))
    }
}

/// Deployed contracts the client talks to on one chain. All are optional so a config can carry
/// only what a given command needs.
#[derive(Debug, Clone, Default, Hash, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SealedContracts {
    pub private_vote: Option<Contract>,
    pub rating_factory: Option<Contract>,
    pub rating_item: Option<Contract>,
    /// Verifying contract of the EIP-712 domain used for user decryption requests
    pub decryption_verifier: Option<Contract>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_forms() -> Result<()> {
        let yaml = r#"
private_vote: "0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0"
rating_factory:
  address: "0xCf7Ed3AccA5a467e9e704C703E8D87F634fB0Fc9"
"#;
        let contracts: SealedContracts = serde_yaml::from_str(yaml)?;
        let vote = contracts.private_vote.unwrap();
        assert!(matches!(vote, Contract::AddressOnly(_)));
        assert_eq!(
            vote.address()?,
            "0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0".parse::<Address>()?
        );
        let factory = contracts.rating_factory.unwrap();
        assert!(matches!(factory, Contract::Full { .. }));
        assert_eq!(
            factory.address()?,
            "0xCf7Ed3AccA5a467e9e704C703E8D87F634fB0Fc9".parse::<Address>()?
        );
        assert!(contracts.rating_item.is_none());
        Ok(())
    }

    #[test]
    fn test_bad_address() {
        let c = Contract::AddressOnly("0xnope".to_string());
        assert!(c.address().is_err());
    }
}
