// SPDX-License-Identifier: Apache-2.0

//! Compile versioned network configuration into OS native files.
//!
//! A v1 (ordered command list) or v2 (netplan style device map) network
//! configuration is interpreted into one canonical [NetworkState], which a
//! [Renderer] turns into files for ifupdown, sysconfig, netplan,
//! NetworkManager or systemd-networkd. An [Activator] then brings the
//! rendered configuration live.

mod activator;
mod deserializer;
mod dns;
mod error;
mod files;
mod iface;
mod ifaces;
mod interpreter;
mod ip;
mod net_state;
mod pipeline;
mod renderer;
mod route;
mod selection;
mod subnet;
mod subp;


pub use crate::activator::{
    select_activator, Activator, ActivatorKind, IfUpDownActivator,
    NetplanActivator, NetworkManagerActivator, NetworkdActivator,
};
pub use crate::dns::DnsConfig;
pub use crate::error::{ErrorKind, NetCfgError, ProcessError};
pub use crate::files::target_path;
pub use crate::iface::{DhcpOverrides, Interface, InterfaceType};
pub use crate::ifaces::{
    BondConfig, BondMode, BondOption, BridgeConfig, BridgeOption, VlanConfig,
};
pub use crate::interpreter::{parse_net_config, ParseOptions};
pub use crate::ip::{
    ipv4_mask_to_net_prefix, ipv6_mask_to_net_prefix, net_prefix_to_ipv4_mask,
    net_prefix_to_ipv6_mask, AddressFamily,
};
pub use crate::net_state::NetworkState;
pub use crate::pipeline::{
    apply_network_config, apply_network_config_with_probe, ApplyOptions,
    ApplyResult,
};
pub use crate::renderer::{
    select_renderer, EniOptions, EniRenderer, NetplanOptions,
    NetplanRenderer, NetworkManagerOptions, NetworkManagerRenderer,
    NetworkdOptions, NetworkdRenderer, RenderContext, RenderedFile, Renderer,
    RendererKind, RendererOptions, SysconfigFlavor, SysconfigOptions,
    SysconfigRenderer,
};
pub use crate::route::Route;
pub use crate::selection::{parse_priority, search, Backend, SystemProbe};
pub use crate::subnet::{Control, Subnet, SubnetType};
pub use crate::subp::{CommandRunner, SystemRunner};
