// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

//! Per-score counts shown next to a rating item.
//!
//! Submitted scores are encrypted, so the client cannot learn the real distribution until it
//! decrypts. After sending a rating it bumps its own bucket locally and flags the view as
//! provisional. The next confirmed set of counts replaces the local increments.

use crate::{domain::ScoreDomain, error::FlowError};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaderboardRow {
    pub score: u32,
    pub count: u64,
    /// Part of `count` not yet confirmed
    pub provisional: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardView {
    pub rows: Vec<LeaderboardRow>,
    pub is_provisional: bool,
}

impl LeaderboardView {
    pub fn total(&self) -> u64 {
        self.rows.iter().map(|r| r.count).sum()
    }
}

pub struct Leaderboard {
    domain: ScoreDomain,
    confirmed: Vec<u64>,
    provisional: Vec<u64>,
}

impl Leaderboard {
    pub fn new(domain: ScoreDomain) -> Self {
        Self {
            domain,
            confirmed: vec![0; domain.width()],
            provisional: vec![0; domain.width()],
        }
    }

    fn bucket(&self, score: u32) -> Result<usize, FlowError> {
        let score = self.domain.validate(score)?;
        Ok((score - self.domain.min) as usize)
    }

    /// Count a score that has been sent but not yet reconciled
    pub fn record_provisional(&mut self, score: u32) -> Result<(), FlowError> {
        let idx = self.bucket(score)?;
        self.provisional[idx] += 1;
        debug!(score, "provisional leaderboard increment");
        Ok(())
    }

    /// Replace all counts with confirmed ones, dropping every provisional increment
    pub fn reconcile(&mut self, confirmed: Vec<u64>) -> Result<(), FlowError> {
        if confirmed.len() != self.domain.width() {
            return Err(FlowError::Validation(format!(
                "Expected {} buckets for {}, got {}",
                self.domain.width(),
                self.domain,
                confirmed.len()
            )));
        }
        self.confirmed = confirmed;
        self.provisional.iter_mut().for_each(|p| *p = 0);
        Ok(())
    }

    pub fn view(&self) -> LeaderboardView {
        let rows = (self.domain.min..=self.domain.max)
            .zip(self.confirmed.iter().zip(&self.provisional))
            .map(|(score, (confirmed, provisional))| LeaderboardRow {
                score,
                count: confirmed + provisional,
                provisional: *provisional,
            })
            .collect();
        LeaderboardView {
            rows,
            is_provisional: self.provisional.iter().any(|p| *p > 0),
        }
    }
}
