// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::chain_config::ChainConfig;
use crate::load_config::{find_in_parent, resolve_config_path};
use crate::yaml::load_yaml_with_env;
use anyhow::{anyhow, bail, Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use path_clean::clean;
use serde::{Deserialize, Serialize};
use std::{env, path::PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "sealed.config.yaml";
pub const DEFAULT_GRANT_CACHE_NAME: &str = "grants.json";
pub const DEFAULT_REVEAL_FEE: &str = "0.0005";
pub const ENV_PREFIX: &str = "SEALED_";

/// Fees the contracts do not expose through a view function
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct FeeConfig {
    /// Fee attached to `allowAllTo` on rating items, in ether
    pub reveal_fee: String,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            reveal_fee: DEFAULT_REVEAL_FEE.to_string(),
        }
    }
}

/// The config as written on disk before a chain has been selected
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UnscopedAppConfig {
    /// Name of the chain to use when `--chain` is not given. Falls back to the first chain.
    chain: Option<String>,
    chains: Vec<ChainConfig>,
    fees: FeeConfig,
    /// Ask the wallet to switch networks instead of failing on a chain mismatch
    auto_switch_chain: bool,
    /// Local advisory cache of observed decryption grants. Relative paths resolve against
    /// `data_dir`.
    grant_cache_file: PathBuf,
    /// Defaults to `~/.local/share/sealed`
    data_dir: Option<PathBuf>,
    /// Open Telemetry collector grpc endpoint. Eg. http://localhost:4317
    otel: Option<String>,
    /// The config file as resolved. Set by the loader, not by users.
    found_config_file: Option<PathBuf>,
}

impl Default for UnscopedAppConfig {
    fn default() -> Self {
        Self {
            chain: None,
            chains: vec![],
            fees: FeeConfig::default(),
            auto_switch_chain: false,
            grant_cache_file: PathBuf::from(DEFAULT_GRANT_CACHE_NAME),
            data_dir: None,
            otel: None,
            found_config_file: None,
        }
    }
}

impl UnscopedAppConfig {
    /// Select the active chain and resolve paths
    pub fn into_scoped(self, default_data_dir: &PathBuf) -> Result<AppConfig> {
        let chain = match &self.chain {
            Some(name) => self
                .chains
                .iter()
                .find(|c| &c.name == name)
                .cloned()
                .ok_or_else(|| anyhow!("Chain '{}' is not defined under `chains`", name))?,
            None => match self.chains.first() {
                Some(c) => c.clone(),
                None => bail!("No chains configured. Add at least one entry under `chains`."),
            },
        };

        let data_dir = self.data_dir.clone().unwrap_or(default_data_dir.clone());
        let grant_cache_file = if self.grant_cache_file.is_absolute() {
            self.grant_cache_file.clone()
        } else {
            clean(data_dir.join(&self.grant_cache_file))
        };

        Ok(AppConfig {
            chain,
            fees: self.fees,
            auto_switch_chain: self.auto_switch_chain,
            grant_cache_file,
            otel: self.otel,
            config_file: self.found_config_file,
        })
    }
}

/// The config actually used throughout the app
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    chain: ChainConfig,
    fees: FeeConfig,
    auto_switch_chain: bool,
    grant_cache_file: PathBuf,
    otel: Option<String>,
    config_file: Option<PathBuf>,
}

impl AppConfig {
    pub fn chain(&self) -> &ChainConfig {
        &self.chain
    }

    pub fn fees(&self) -> &FeeConfig {
        &self.fees
    }

    pub fn auto_switch_chain(&self) -> bool {
        self.auto_switch_chain
    }

    pub fn grant_cache_file(&self) -> &PathBuf {
        &self.grant_cache_file
    }

    pub fn otel(&self) -> Option<String> {
        self.otel.clone()
    }

    pub fn config_file(&self) -> Option<&PathBuf> {
        self.config_file.as_ref()
    }
}

/// Values passed on the command line that win over file and env
#[derive(Default, Serialize, Deserialize, Clone, Debug)]
struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    chain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    otel: Option<String>,
    found_config_file: Option<PathBuf>,
}

/// Load the config at `config_file`, or the nearest `sealed.config.yaml`, or the one in the OS
/// config dir. Layers: defaults, yaml, `SEALED_*` env, cli.
pub fn load_config(
    config_file: Option<String>,
    chain: Option<String>,
    otel: Option<String>,
) -> Result<AppConfig> {
    let cli_file = config_file.map(PathBuf::from);
    let resolved = resolve_config_path(
        find_in_parent,
        &env::current_dir()?,
        &OsDirs::config_dir(),
        DEFAULT_CONFIG_NAME,
        cli_file.as_deref(),
    );

    let loaded_yaml = load_yaml_with_env(&resolved).context("Configuration file not found")?;

    let config: UnscopedAppConfig =
        Figment::from(Serialized::defaults(UnscopedAppConfig::default()))
            .merge(Yaml::string(&loaded_yaml))
            .merge(Env::prefixed(ENV_PREFIX).only(&["chain", "auto_switch_chain", "otel"]))
            .merge(Serialized::defaults(CliOverrides {
                chain,
                otel,
                found_config_file: Some(resolved),
            }))
            .extract()
            .context("Could not parse configuration")?;

    config.into_scoped(&OsDirs::data_dir())
}

pub struct OsDirs;

impl OsDirs {
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sealed")
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sealed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::RpcAuth;
    use figment::Jail;

    const CONFIG: &str = r#"
chain: "hardhat"
auto_switch_chain: true
data_dir: "/mydata/sealed"
fees:
  reveal_fee: "0.001"
chains:
  - name: "sepolia"
    rpc_url: "https://rpc.sepolia.example"
    chain_id: 11155111
    relayer_url: "https://relayer.testnet.example"
    contracts:
      rating_factory:
        address: "0xCf7Ed3AccA5a467e9e704C703E8D87F634fB0Fc9"
  - name: "hardhat"
    rpc_url: "http://localhost:8545"
    rpc_auth:
      type: "Bearer"
      credentials: "token"
    chain_id: 31337
    contracts:
      private_vote: "0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0"
"#;

    #[test]
    fn test_scoping_selects_named_chain() -> Result<()> {
        let unscoped: UnscopedAppConfig = serde_yaml::from_str(CONFIG)?;
        let config = unscoped.into_scoped(&PathBuf::from("/default/data"))?;
        assert_eq!(config.chain().name, "hardhat");
        assert_eq!(config.chain().chain_id, 31337);
        assert_eq!(
            config.chain().rpc_auth,
            RpcAuth::Bearer("token".to_string())
        );
        assert!(config.auto_switch_chain());
        assert_eq!(config.fees().reveal_fee, "0.001");
        assert_eq!(
            config.grant_cache_file(),
            &PathBuf::from("/mydata/sealed/grants.json")
        );
        Ok(())
    }

    #[test]
    fn test_defaults_to_first_chain() -> Result<()> {
        let mut unscoped: UnscopedAppConfig = serde_yaml::from_str(CONFIG)?;
        unscoped.chain = None;
        unscoped.data_dir = None;
        let config = unscoped.into_scoped(&PathBuf::from("/default/data"))?;
        assert_eq!(config.chain().name, "sepolia");
        assert_eq!(
            config.grant_cache_file(),
            &PathBuf::from("/default/data/grants.json")
        );
        Ok(())
    }

    #[test]
    fn test_unknown_chain_fails() {
        let mut unscoped: UnscopedAppConfig = serde_yaml::from_str(CONFIG).unwrap();
        unscoped.chain = Some("mainnet".to_string());
        let err = unscoped
            .into_scoped(&PathBuf::from("/default/data"))
            .unwrap_err();
        assert!(err.to_string().contains("mainnet"));
    }

    #[test]
    fn test_load_with_env_and_cli_overrides() {
        Jail::expect_with(|jail| {
            jail.create_file(DEFAULT_CONFIG_NAME, CONFIG)?;
            jail.set_env("SEALED_AUTO_SWITCH_CHAIN", "false");

            let config = load_config(None, Some("sepolia".to_string()), None)
                .map_err(|e| e.to_string())?;
            assert_eq!(config.chain().name, "sepolia");
            assert!(!config.auto_switch_chain());
            assert_eq!(
                config.config_file().map(|p| p.ends_with(DEFAULT_CONFIG_NAME)),
                Some(true)
            );
            Ok(())
        });
    }

    #[test]
    fn test_file_not_found() -> Result<()> {
        let Err(err) = load_config(Some("/nope".to_string()), None, None) else {
            bail!("error expected");
        };
        let Some(e) = err.downcast_ref::<std::io::Error>() else {
            bail!("io error expected");
        };
        assert_eq!(e.kind(), std::io::ErrorKind::NotFound);
        Ok(())
    }
}
