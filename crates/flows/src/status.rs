// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use std::{
    collections::VecDeque,
    fmt,
    sync::{Arc, Mutex},
};
use tokio::sync::watch;
use tracing::debug;

const HISTORY_LEN: usize = 32;

/// What a flow is currently waiting on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStatus {
    Idle,
    SwitchingNetwork,
    Encrypting,
    AwaitingConfirmation,
    ReadingFee,
    Granting,
    AwaitingReadSignature,
    Decrypting,
}

impl fmt::Display for FlowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FlowStatus::Idle => "",
            FlowStatus::SwitchingNetwork => "Switching network...",
            FlowStatus::Encrypting => "Encrypting...",
            FlowStatus::AwaitingConfirmation => "Submitting transaction...",
            FlowStatus::ReadingFee => "Reading fee...",
            FlowStatus::Granting => "Requesting access...",
            FlowStatus::AwaitingReadSignature => "Waiting for signature...",
            FlowStatus::Decrypting => "Decrypting...",
        };
        f.write_str(s)
    }
}

/// Publishes the status of one flow. Cloning shares the same channel.
#[derive(Clone)]
pub struct StatusTracker {
    tx: Arc<watch::Sender<FlowStatus>>,
    history: Arc<Mutex<VecDeque<FlowStatus>>>,
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusTracker {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(FlowStatus::Idle);
        Self {
            tx: Arc::new(tx),
            history: Arc::new(Mutex::new(VecDeque::with_capacity(HISTORY_LEN))),
        }
    }

    pub fn current(&self) -> FlowStatus {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<FlowStatus> {
        self.tx.subscribe()
    }

    pub fn set(&self, status: FlowStatus) {
        let previous = self.tx.send_replace(status);
        if previous != status {
            debug!(from = ?previous, to = ?status, "status");
        }
        if let Ok(mut history) = self.history.lock() {
            if history.len() == HISTORY_LEN {
                history.pop_front();
            }
            history.push_back(status);
        }
    }

    /// Most recent transitions, oldest first
    pub fn recent(&self) -> Vec<FlowStatus> {
        self.history
            .lock()
            .map(|h| h.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Returns a guard that puts the tracker back to [`FlowStatus::Idle`] when dropped, whichever
    /// way the flow exits.
    pub fn begin(&self) -> StatusGuard {
        StatusGuard {
            tracker: self.clone(),
        }
    }
}

#[must_use]
pub struct StatusGuard {
    tracker: StatusTracker,
}

impl StatusGuard {
    pub fn set(&self, status: FlowStatus) {
        self.tracker.set(status);
    }
}

impl Drop for StatusGuard {
    fn drop(&mut self) {
        self.tracker.set(FlowStatus::Idle);
    }
}
