// SPDX-License-Identifier: Apache-2.0

use std::net::IpAddr;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::{ip::IpNetwork, AddressFamily, ErrorKind, NetCfgError};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[non_exhaustive]
/// Static route. Netmask is derived from `prefix` on demand.
pub struct Route {
    pub(crate) destination: IpNetwork,
    pub(crate) gateway: Option<IpAddr>,
    pub(crate) metric: Option<u32>,
}

impl Route {
    pub(crate) fn new(
        network: &str,
        prefix: Option<&str>,
        netmask: Option<&str>,
        gateway: Option<&str>,
        metric: Option<u32>,
    ) -> Result<Self, NetCfgError> {
        let destination = IpNetwork::normalize(network, prefix, netmask)?;
        let gateway = match gateway.map(str::trim) {
            Some(g) if !g.is_empty() => Some(IpAddr::from_str(g).map_err(
                |e| {
                    NetCfgError::new(
                        ErrorKind::InvalidCommand,
                        format!("Invalid route gateway {g}: {e}"),
                    )
                },
            )?),
            _ => None,
        };
        if let Some(gw) = gateway.as_ref() {
            if gw.is_ipv6() != destination.addr.is_ipv6() {
                return Err(NetCfgError::new(
                    ErrorKind::InvalidCommand,
                    format!(
                        "Route {destination} gateway {gw} is not in the \
                        same address family"
                    ),
                ));
            }
        }
        Ok(Self {
            destination,
            gateway,
            metric,
        })
    }

    /// Destination address without prefix.
    pub fn network(&self) -> String {
        self.destination.addr.to_string()
    }

    pub fn prefix(&self) -> u8 {
        self.destination.prefix
    }

    /// Dotted quad netmask for IPv4 routes.
    pub fn netmask(&self) -> Option<String> {
        self.destination.netmask()
    }

    pub fn gateway(&self) -> Option<String> {
        self.gateway.map(|g| g.to_string())
    }

    pub fn metric(&self) -> Option<u32> {
        self.metric
    }

    pub fn family(&self) -> AddressFamily {
        self.destination.family()
    }

    /// True when destination covers the whole address space of its family,
    /// no matter whether it came in as `0.0.0.0/0` or network plus netmask.
    pub fn is_default(&self) -> bool {
        self.destination.prefix == 0
    }

    pub(crate) fn cidr(&self) -> String {
        self.destination.to_string()
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.destination)?;
        if let Some(gw) = self.gateway.as_ref() {
            write!(f, " via {gw}")?;
        }
        if let Some(m) = self.metric {
            write!(f, " metric {m}")?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct RouteShow {
    network: String,
    prefix: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    netmask: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gateway: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metric: Option<u32>,
}

impl Serialize for Route {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        RouteShow {
            network: self.network(),
            prefix: self.prefix(),
            netmask: self.netmask(),
            gateway: self.gateway(),
            metric: self.metric,
        }
        .serialize(serializer)
    }
}
