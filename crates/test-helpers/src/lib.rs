// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

pub mod contracts;
pub mod fhevm;
mod harness;
pub mod wallet;

pub use contracts::*;
pub use fhevm::*;
pub use harness::*;
pub use wallet::*;
