// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

//! Local memory of grants this client has sent.
//!
//! Entries are a hint for the UI only. Nothing here is checked against the chain, and a
//! missing or stale entry never blocks a decryption attempt.

use alloy::primitives::Address;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};
use tracing::{debug, warn};

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    grants: BTreeMap<String, bool>,
}

pub struct GrantCache {
    path: Option<PathBuf>,
    entries: Mutex<BTreeMap<String, bool>>,
}

impl GrantCache {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// Open the cache at `path`. An unreadable file is treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match read_file(&path) {
            Ok(file) => file.grants,
            Err(e) => {
                if path.exists() {
                    warn!(path = %path.display(), error = %e, "ignoring unreadable grant cache");
                }
                BTreeMap::new()
            }
        };
        Self {
            path: Some(path),
            entries: Mutex::new(entries),
        }
    }

    pub fn key(chain_id: u64, contract: Address, account: Address) -> String {
        format!("grant:{chain_id}:{contract}:{account}")
    }

    pub fn is_granted(&self, chain_id: u64, contract: Address, account: Address) -> bool {
        let key = Self::key(chain_id, contract, account);
        self.entries
            .lock()
            .map(|e| e.get(&key).copied().unwrap_or(false))
            .unwrap_or(false)
    }

    /// Remember a grant. Persisting is best effort: failures are logged and otherwise ignored.
    pub fn record_granted(&self, chain_id: u64, contract: Address, account: Address) {
        let key = Self::key(chain_id, contract, account);
        let snapshot = match self.entries.lock() {
            Ok(mut entries) => {
                entries.insert(key.clone(), true);
                entries.clone()
            }
            Err(_) => return,
        };
        debug!(key, "grant recorded");
        if let Some(path) = &self.path {
            if let Err(e) = write_file(path, snapshot) {
                warn!(path = %path.display(), error = %e, "could not persist grant cache");
            }
        }
    }
}

fn read_file(path: &Path) -> Result<CacheFile> {
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw).context("grant cache is not valid JSON")
}

fn write_file(path: &Path, grants: BTreeMap<String, bool>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(&CacheFile { grants })?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
