// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

pub use sealed_flows as flows;
pub use sealed_utils::units;

#[cfg(feature = "config")]
pub use sealed_config as config;

#[cfg(feature = "evm")]
pub use sealed_evm_helpers as evm_helpers;
