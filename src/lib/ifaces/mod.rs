// SPDX-License-Identifier: Apache-2.0

mod bond;
mod bridge;
mod vlan;

pub use bond::{BondConfig, BondMode, BondOption};
pub use bridge::{BridgeConfig, BridgeOption};
pub use vlan::VlanConfig;
