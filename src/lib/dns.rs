// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[non_exhaustive]
/// DNS resolver configuration, either global or attached to a subnet or
/// interface.
pub struct DnsConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nameservers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub search: Vec<String>,
}

impl DnsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nameservers.is_empty() && self.search.is_empty()
    }

    /// Append without duplicating entries, keeping first-seen order.
    pub(crate) fn extend(&mut self, nameservers: &[String], search: &[String]) {
        for ns in nameservers {
            if !self.nameservers.contains(ns) {
                self.nameservers.push(ns.clone());
            }
        }
        for s in search {
            if !self.search.contains(s) {
                self.search.push(s.clone());
            }
        }
    }
}
