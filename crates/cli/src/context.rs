// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy::primitives::{Address, U256};
use anyhow::{Context as _, Result};
use sealed_config::validation::ValidAddress;
use sealed_config::AppConfig;
use sealed_evm_helpers::{load_signer_from_env, EthProvider, ProviderConfig};
use sealed_flows::evm::{EvmPrivateVote, EvmRatingFactory, EvmRatingItem, LocalWallet};
use sealed_flows::relayer::RelayerClient;
use sealed_flows::{
    Catalog, ChainPolicy, DecryptFlow, FlowStatus, GrantCache, ScoreDomain, StatusTracker,
    SubmitFlow,
};
use sealed_utils::parse_fee;
use std::sync::Arc;
use tracing::{info, warn};

pub const PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";

/// Everything a command needs to talk to the configured chain
pub struct Context {
    pub config: AppConfig,
    pub provider: EthProvider,
    wallet: Option<Arc<LocalWallet>>,
}

impl Context {
    /// Connect with the key in `PRIVATE_KEY`
    pub async fn signing(config: &AppConfig) -> Result<Self> {
        let chain = config.chain();
        let signer = load_signer_from_env(PRIVATE_KEY_ENV)?;
        let provider = ProviderConfig::new(chain.rpc()?, chain.rpc_auth.clone())
            .create_signer_provider(&signer)
            .await?;
        let wallet = LocalWallet::new(provider.clone(), signer, chain.decryption_verifier()?);
        Ok(Self {
            config: config.clone(),
            provider,
            wallet: Some(Arc::new(wallet)),
        })
    }

    /// Connect without a wallet. Enough for listing and fee lookups.
    pub async fn read_only(config: &AppConfig) -> Result<Self> {
        let chain = config.chain();
        let provider = ProviderConfig::new(chain.rpc()?, chain.rpc_auth.clone())
            .create_readonly_provider()
            .await?;
        Ok(Self {
            config: config.clone(),
            provider,
            wallet: None,
        })
    }

    pub fn wallet(&self) -> Result<Arc<LocalWallet>> {
        self.wallet
            .clone()
            .context("This command needs a wallet. Set PRIVATE_KEY.")
    }

    pub fn policy(&self) -> ChainPolicy {
        ChainPolicy::from(&self.config)
    }

    pub fn reveal_fee(&self) -> Result<U256> {
        let raw = &self.config.fees().reveal_fee;
        parse_fee(raw).with_context(|| format!("Invalid fees.reveal_fee '{raw}'"))
    }

    /// Open the poll at `address`, or the configured one
    pub async fn poll(&self, address: Option<ValidAddress>) -> Result<EvmPrivateVote> {
        let address = match address {
            Some(address) => address.into(),
            None => self.config.chain().private_vote()?,
        };
        EvmPrivateVote::connect(&self.provider, address).await
    }

    /// Open a rating item. The score range comes from the factory listing when the item is
    /// listed there, otherwise the default 1..=5.
    pub async fn rating_item(
        &self,
        catalog: &Catalog<EvmRatingFactory, LocalWallet>,
        address: Address,
    ) -> Result<EvmRatingItem> {
        let domain = match catalog.find(address).await {
            Ok(item) => item.domain,
            Err(e) => {
                warn!("Using default score range for {address}: {e}");
                ScoreDomain::default()
            }
        };
        self.open_rating_item(address, domain)
    }

    pub fn open_rating_item(&self, address: Address, domain: ScoreDomain) -> Result<EvmRatingItem> {
        EvmRatingItem::new(&self.provider, address, domain, self.reveal_fee()?)
    }

    pub fn item_address(&self, item: Option<ValidAddress>) -> Result<Address> {
        match item {
            Some(item) => Ok(item.into()),
            None => self.config.chain().rating_item(),
        }
    }

    fn relayer(&self) -> Result<Arc<RelayerClient>> {
        Ok(Arc::new(RelayerClient::new(
            self.config.chain().relayer_url()?,
        )?))
    }

    pub fn submit_flow(&self) -> Result<SubmitFlow<RelayerClient, LocalWallet>> {
        let flow = SubmitFlow::new(self.relayer()?, self.wallet()?, self.policy());
        follow(flow.status());
        Ok(flow)
    }

    pub fn decrypt_flow(&self) -> Result<DecryptFlow<RelayerClient, LocalWallet>> {
        let cache = Arc::new(GrantCache::open(self.config.grant_cache_file()));
        let flow = DecryptFlow::new(self.relayer()?, self.wallet()?, self.policy(), cache);
        follow(flow.status());
        Ok(flow)
    }

    /// Catalog over the configured factory, or `factory` when given. Without a wallet it can only
    /// list and search.
    pub fn catalog(
        &self,
        factory: Option<Address>,
    ) -> Result<Catalog<EvmRatingFactory, LocalWallet>> {
        let address = match factory {
            Some(address) => address,
            None => self.config.chain().rating_factory()?,
        };
        let registry = Arc::new(EvmRatingFactory::new(&self.provider, address)?);
        let catalog = match &self.wallet {
            Some(wallet) => Catalog::new(registry, wallet.clone(), self.policy()),
            None => Catalog::read_only(registry, self.policy()),
        };
        follow(catalog.status());
        Ok(catalog)
    }
}

/// Log every status change of a flow until the flow is dropped
fn follow(status: &StatusTracker) {
    let mut rx = status.subscribe();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let current = *rx.borrow_and_update();
            if current != FlowStatus::Idle {
                info!("{}", current);
            }
        }
    });
}
