// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

//! Client-side orchestration for confidential votes and ratings on an FHEVM chain.
//!
//! The cryptography lives elsewhere. This crate sequences the calls around it: validate a score,
//! encrypt it for one `(contract, submitter)` pair, submit it, and later obtain a decryption grant
//! and read the aggregates back.

pub mod catalog;
pub mod decrypt;
pub mod domain;
pub mod error;
pub mod evm;
pub mod fee;
pub mod grant_cache;
mod guard;
pub mod handle;
pub mod leaderboard;
pub mod relayer;
pub mod status;
pub mod submit;
pub mod traits;

#[cfg(test)]
mod fakes;

pub use catalog::*;
pub use decrypt::*;
pub use domain::*;
pub use error::*;
pub use fee::*;
pub use guard::ChainPolicy;
pub use grant_cache::*;
pub use handle::*;
pub use leaderboard::*;
pub use status::*;
pub use submit::*;
pub use traits::*;
