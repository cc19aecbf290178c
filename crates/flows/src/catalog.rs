// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{
    domain::ScoreDomain,
    error::{ErrorKind, FlowError},
    fee::with_fee,
    guard::{ensure_chain, recheck, wallet_account, ChainPolicy},
    status::{FlowStatus, StatusTracker},
    traits::{ItemRegistry, TxOutcome, Wallet},
};
use alloy::primitives::Address;
use futures::future::try_join_all;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument};

/// A rating item as listed by the factory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    pub id: u64,
    pub address: Address,
    pub creator: Address,
    pub domain: ScoreDomain,
    pub name: String,
    pub description: String,
    pub promoted: bool,
    /// Unix seconds
    pub promote_expiry: u64,
}

impl CatalogItem {
    pub fn is_promoted_at(&self, now: u64) -> bool {
        self.promoted && self.promote_expiry > now
    }
}

/// Parameters for a new rating item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub name: String,
    pub description: String,
    pub min: u8,
    pub max: u8,
}

impl NewItem {
    pub fn validate(&self) -> Result<(), FlowError> {
        if self.name.trim().is_empty() {
            return Err(FlowError::Validation("Item name must not be empty".to_string()));
        }
        if self.min >= self.max {
            return Err(FlowError::Validation(format!(
                "Minimum score {} must be below maximum {}",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Cached view of a factory's items plus the fee-gated writes on it
pub struct Catalog<R: ?Sized, W: ?Sized> {
    registry: Arc<R>,
    wallet: Option<Arc<W>>,
    policy: ChainPolicy,
    status: StatusTracker,
    items: RwLock<Vec<CatalogItem>>,
}

impl<R, W> Catalog<R, W>
where
    R: ItemRegistry + ?Sized,
    W: Wallet + ?Sized,
{
    pub fn new(registry: Arc<R>, wallet: Arc<W>, policy: ChainPolicy) -> Self {
        Self::build(registry, Some(wallet), policy)
    }

    /// A catalog that can list and search but not create or promote
    pub fn read_only(registry: Arc<R>, policy: ChainPolicy) -> Self {
        Self::build(registry, None, policy)
    }

    fn build(registry: Arc<R>, wallet: Option<Arc<W>>, policy: ChainPolicy) -> Self {
        Self {
            registry,
            wallet,
            policy,
            status: StatusTracker::new(),
            items: RwLock::new(vec![]),
        }
    }

    fn wallet(&self) -> Result<&W, FlowError> {
        self.wallet
            .as_deref()
            .ok_or_else(|| FlowError::Wallet("No wallet connected".to_string()))
    }

    pub fn status(&self) -> &StatusTracker {
        &self.status
    }

    /// Reload every item from the factory
    #[instrument(skip_all, fields(factory = %self.registry.address()))]
    pub async fn refresh(&self) -> Result<Vec<CatalogItem>, FlowError> {
        let count = self
            .registry
            .items_count()
            .await
            .map_err(|e| FlowError::from_collaborator("items_count", e, ErrorKind::Network))?;
        let items = try_join_all((0..count).map(|id| self.registry.item(id)))
            .await
            .map_err(|e| FlowError::from_collaborator("item", e, ErrorKind::Network))?;
        info!(count, "catalog loaded");
        *self.items.write().await = items.clone();
        Ok(items)
    }

    pub async fn items(&self) -> Vec<CatalogItem> {
        self.items.read().await.clone()
    }

    /// Items whose name contains `query`, ignoring case
    pub async fn search(&self, query: &str) -> Vec<CatalogItem> {
        let query = query.trim().to_lowercase();
        self.items
            .read()
            .await
            .iter()
            .filter(|item| query.is_empty() || item.name.to_lowercase().contains(&query))
            .cloned()
            .collect()
    }

    pub async fn find(&self, address: Address) -> Result<CatalogItem, FlowError> {
        let cached = self
            .items
            .read()
            .await
            .iter()
            .find(|i| i.address == address)
            .cloned();
        if let Some(item) = cached {
            return Ok(item);
        }
        self.refresh()
            .await?
            .into_iter()
            .find(|i| i.address == address)
            .ok_or_else(|| FlowError::Validation(format!("Item {address} is not listed")))
    }

    /// Create an item, paying the factory's current creation fee
    pub async fn create_item(&self, item: NewItem) -> Result<TxOutcome, FlowError> {
        item.validate()?;
        let wallet = self.wallet()?;
        let guard = self.status.begin();
        ensure_chain(wallet, &self.policy, &guard).await?;
        let sender = wallet_account(wallet).await?;

        guard.set(FlowStatus::ReadingFee);
        let (guard, item_ref) = (&guard, &item);
        let outcome = with_fee(
            || self.registry.creation_fee(),
            |fee| async move {
                recheck(wallet, &self.policy, sender).await?;
                guard.set(FlowStatus::AwaitingConfirmation);
                self.registry.create_item(item_ref, fee).await
            },
        )
        .await?;
        info!(name = %item.name, tx = %outcome.tx_hash, "item created");
        Ok(outcome)
    }

    /// Promote the item at `address`, paying the factory's current promotion fee
    pub async fn promote(&self, address: Address) -> Result<TxOutcome, FlowError> {
        let wallet = self.wallet()?;
        let id = self.find(address).await?.id;
        let guard = self.status.begin();
        ensure_chain(wallet, &self.policy, &guard).await?;
        let sender = wallet_account(wallet).await?;

        guard.set(FlowStatus::ReadingFee);
        let guard = &guard;
        let outcome = with_fee(
            || self.registry.promote_fee(),
            |fee| async move {
                recheck(wallet, &self.policy, sender).await?;
                guard.set(FlowStatus::AwaitingConfirmation);
                self.registry.promote_item(id, fee).await
            },
        )
        .await?;
        info!(id, tx = %outcome.tx_hash, "item promoted");
        Ok(outcome)
    }
}
