// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{deserializer::parse_bool_str, ErrorKind, NetCfgError};

/// Scalar bridge options. STP and the per-port values are stored separately
/// in [BridgeConfig].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum BridgeOption {
    AgeingTime,
    Priority,
    ForwardDelay,
    HelloTime,
    MaxAge,
    Gcint,
    MaxWait,
    WaitPort,
}

impl BridgeOption {
    pub const ALL: [Self; 8] = [
        Self::AgeingTime,
        Self::Priority,
        Self::ForwardDelay,
        Self::HelloTime,
        Self::MaxAge,
        Self::Gcint,
        Self::MaxWait,
        Self::WaitPort,
    ];

    /// bridge-utils-interfaces key.
    pub fn eni_name(&self) -> &'static str {
        match self {
            Self::AgeingTime => "bridge_ageing",
            Self::Priority => "bridge_bridgeprio",
            Self::ForwardDelay => "bridge_fd",
            Self::HelloTime => "bridge_hello",
            Self::MaxAge => "bridge_maxage",
            Self::Gcint => "bridge_gcint",
            Self::MaxWait => "bridge_maxwait",
            Self::WaitPort => "bridge_waitport",
        }
    }

    /// netplan has no counterpart of the ifupdown only options.
    pub fn netplan_name(&self) -> Option<&'static str> {
        match self {
            Self::AgeingTime => Some("ageing-time"),
            Self::Priority => Some("priority"),
            Self::ForwardDelay => Some("forward-delay"),
            Self::HelloTime => Some("hello-time"),
            Self::MaxAge => Some("max-age"),
            Self::Gcint | Self::MaxWait | Self::WaitPort => None,
        }
    }

    pub(crate) fn from_v1_key(key: &str) -> Option<Self> {
        let key = key.replace('-', "_");
        Self::ALL.iter().find(|o| o.eni_name() == key).copied()
    }

    pub(crate) fn from_netplan_key(key: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .find(|o| o.netplan_name() == Some(key))
            .copied()
    }
}

impl std::fmt::Display for BridgeOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.eni_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub struct BridgeConfig {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stp: Option<bool>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<BridgeOption, String>,
    /// Port name to STP path cost.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub path_cost: BTreeMap<String, u32>,
    /// Port name to STP port priority.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub port_priority: BTreeMap<String, u32>,
}

impl BridgeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one ifupdown style parameter. Returns `false` when the key is
    /// not a bridge parameter at all.
    pub(crate) fn set_v1_param(
        &mut self,
        key: &str,
        value: &str,
    ) -> Result<bool, NetCfgError> {
        match key.replace('-', "_").as_str() {
            "bridge_stp" => {
                self.stp = Some(parse_bool_str(value).ok_or_else(|| {
                    NetCfgError::new(
                        ErrorKind::InvalidCommand,
                        format!("Invalid bridge_stp value {value}"),
                    )
                })?);
            }
            "bridge_pathcost" => {
                self.path_cost.extend(parse_port_values(key, value)?);
            }
            "bridge_portprio" => {
                self.port_priority.extend(parse_port_values(key, value)?);
            }
            _ => match BridgeOption::from_v1_key(key) {
                Some(opt) => {
                    self.options.insert(opt, value.trim().to_string());
                }
                None => return Ok(false),
            },
        }
        Ok(true)
    }
}

// `eth0 50 eth1 75` into {eth0: 50, eth1: 75}
fn parse_port_values(
    key: &str,
    value: &str,
) -> Result<Vec<(String, u32)>, NetCfgError> {
    let items: Vec<&str> = value.split_whitespace().collect();
    if items.len() % 2 != 0 {
        return Err(NetCfgError::new(
            ErrorKind::InvalidCommand,
            format!("Expecting port and value pairs for {key}, got {value}"),
        ));
    }
    let mut ret = Vec::new();
    for pair in items.chunks(2) {
        let v = pair[1].parse::<u32>().map_err(|e| {
            NetCfgError::new(
                ErrorKind::InvalidCommand,
                format!("Invalid {key} value {}: {e}", pair[1]),
            )
        })?;
        ret.push((pair[0].to_string(), v));
    }
    Ok(ret)
}
