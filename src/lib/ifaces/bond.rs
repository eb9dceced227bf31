// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{ErrorKind, NetCfgError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum BondMode {
    #[serde(rename = "balance-rr", alias = "0")]
    /// You can use integer 0 for deserializing to this mode.
    RoundRobin,
    #[serde(rename = "active-backup", alias = "1")]
    ActiveBackup,
    #[serde(rename = "balance-xor", alias = "2")]
    XOR,
    #[serde(rename = "broadcast", alias = "3")]
    Broadcast,
    #[serde(rename = "802.3ad", alias = "4")]
    LACP,
    #[serde(rename = "balance-tlb", alias = "5")]
    TLB,
    #[serde(rename = "balance-alb", alias = "6")]
    ALB,
}

impl std::fmt::Display for BondMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::RoundRobin => "balance-rr",
                Self::ActiveBackup => "active-backup",
                Self::XOR => "balance-xor",
                Self::Broadcast => "broadcast",
                Self::LACP => "802.3ad",
                Self::TLB => "balance-tlb",
                Self::ALB => "balance-alb",
            }
        )
    }
}

impl std::str::FromStr for BondMode {
    type Err = NetCfgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.trim().to_string()))
            .map_err(|_| {
                NetCfgError::new(
                    ErrorKind::InvalidCommand,
                    format!("Invalid bond mode {s}"),
                )
            })
    }
}

/// Bonding driver options understood by every backend. The variant names
/// follow the kernel sysfs attribute names.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum BondOption {
    AdSelect,
    ArpInterval,
    ArpIpTarget,
    ArpValidate,
    Downdelay,
    FailOverMac,
    LacpRate,
    Miimon,
    MinLinks,
    Mode,
    NumGratArp,
    Primary,
    PrimaryReselect,
    Updelay,
    XmitHashPolicy,
}

impl BondOption {
    pub const ALL: [Self; 15] = [
        Self::AdSelect,
        Self::ArpInterval,
        Self::ArpIpTarget,
        Self::ArpValidate,
        Self::Downdelay,
        Self::FailOverMac,
        Self::LacpRate,
        Self::Miimon,
        Self::MinLinks,
        Self::Mode,
        Self::NumGratArp,
        Self::Primary,
        Self::PrimaryReselect,
        Self::Updelay,
        Self::XmitHashPolicy,
    ];

    /// Kernel sysfs attribute name, also used by `BONDING_OPTS` of sysconfig.
    pub fn sysfs_name(&self) -> &'static str {
        match self {
            Self::AdSelect => "ad_select",
            Self::ArpInterval => "arp_interval",
            Self::ArpIpTarget => "arp_ip_target",
            Self::ArpValidate => "arp_validate",
            Self::Downdelay => "downdelay",
            Self::FailOverMac => "fail_over_mac",
            Self::LacpRate => "lacp_rate",
            Self::Miimon => "miimon",
            Self::MinLinks => "min_links",
            Self::Mode => "mode",
            Self::NumGratArp => "num_grat_arp",
            Self::Primary => "primary",
            Self::PrimaryReselect => "primary_reselect",
            Self::Updelay => "updelay",
            Self::XmitHashPolicy => "xmit_hash_policy",
        }
    }

    /// ifupdown key, e.g. `bond-xmit-hash-policy`.
    pub fn eni_name(&self) -> String {
        format!("bond-{}", self.sysfs_name().replace('_', "-"))
    }

    /// Key under `parameters` of a netplan bond.
    pub fn netplan_name(&self) -> &'static str {
        match self {
            Self::AdSelect => "ad-select",
            Self::ArpInterval => "arp-interval",
            Self::ArpIpTarget => "arp-ip-targets",
            Self::ArpValidate => "arp-validate",
            Self::Downdelay => "down-delay",
            Self::FailOverMac => "fail-over-mac-policy",
            Self::LacpRate => "lacp-rate",
            Self::Miimon => "mii-monitor-interval",
            Self::MinLinks => "min-links",
            Self::Mode => "mode",
            Self::NumGratArp => "gratuitous-arp",
            Self::Primary => "primary",
            Self::PrimaryReselect => "primary-reselect-policy",
            Self::Updelay => "up-delay",
            Self::XmitHashPolicy => "transmit-hash-policy",
        }
    }

    /// Accept `bond-mode`, `bond_mode` or plain `mode` style keys.
    pub(crate) fn from_v1_key(key: &str) -> Option<Self> {
        let key = key
            .strip_prefix("bond-")
            .or_else(|| key.strip_prefix("bond_"))
            .unwrap_or(key)
            .replace('-', "_");
        Self::ALL.iter().find(|o| o.sysfs_name() == key).copied()
    }

    pub(crate) fn from_netplan_key(key: &str) -> Option<Self> {
        // netplan accepted this misspelling for a long time
        if key == "gratuitious-arp" {
            return Some(Self::NumGratArp);
        }
        Self::ALL.iter().find(|o| o.netplan_name() == key).copied()
    }

    pub(crate) fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::ArpInterval
                | Self::Downdelay
                | Self::Miimon
                | Self::MinLinks
                | Self::NumGratArp
                | Self::Updelay
        )
    }
}

impl std::fmt::Display for BondOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.sysfs_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[non_exhaustive]
pub struct BondConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<BondMode>,
    /// Options other than `mode`, values kept in their textual form. The
    /// `arp_ip_target` value is a comma separated address list.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<BondOption, String>,
}

impl BondConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set(
        &mut self,
        opt: BondOption,
        value: &str,
    ) -> Result<(), NetCfgError> {
        let value = value.trim();
        if opt == BondOption::Mode {
            self.mode = Some(value.parse()?);
            return Ok(());
        }
        if opt.is_numeric() && value.parse::<u32>().is_err() {
            return Err(NetCfgError::new(
                ErrorKind::InvalidCommand,
                format!("Bond option {opt} expects an integer, got {value}"),
            ));
        }
        let value = if opt == BondOption::ArpIpTarget {
            value
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .collect::<Vec<&str>>()
                .join(",")
        } else {
            value.to_string()
        };
        self.options.insert(opt, value);
        Ok(())
    }

    pub fn get(&self, opt: BondOption) -> Option<String> {
        if opt == BondOption::Mode {
            self.mode.map(|m| m.to_string())
        } else {
            self.options.get(&opt).cloned()
        }
    }

    /// Every option including `mode`, in sysfs name order.
    pub fn iter(&self) -> impl Iterator<Item = (BondOption, String)> + '_ {
        BondOption::ALL
            .iter()
            .filter_map(move |o| self.get(*o).map(|v| (*o, v)))
    }
}
