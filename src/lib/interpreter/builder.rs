// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use crate::{
    AddressFamily, DnsConfig, ErrorKind, Interface, InterfaceType,
    NetCfgError, NetworkState, Route,
};

/// Accumulates interfaces, routes and DNS while commands are interpreted.
/// Every mutation checks the model invariants, so a [NetworkState] coming out
/// of [NetworkStateBuilder::build] never needs validating again.
#[derive(Debug, Default)]
pub(crate) struct NetworkStateBuilder {
    interfaces: Vec<Interface>,
    routes: Vec<Route>,
    dns: DnsConfig,
    // Description of the first default route seen per family
    default_routes: HashMap<AddressFamily, String>,
}

impl NetworkStateBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn iface_index(&self, name: &str) -> Option<usize> {
        self.interfaces.iter().position(|i| i.name == name)
    }

    pub(crate) fn get_iface(&self, name: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    /// Check an interface before it is committed with [Self::add_iface],
    /// so a failing command leaves the builder untouched.
    pub(crate) fn validate_iface(
        &self,
        iface: &Interface,
    ) -> Result<(), NetCfgError> {
        if let Some(cur) = self.get_iface(&iface.name) {
            if !cur.placeholder {
                return Err(NetCfgError::new(
                    ErrorKind::ConfigConflict,
                    format!(
                        "Interface {} is declared more than once",
                        iface.name
                    ),
                ));
            }
            if let (Some(cur_bond), Some(new_bond)) =
                (cur.bond_master.as_deref(), iface.bond_master.as_deref())
            {
                if cur_bond != new_bond {
                    return Err(NetCfgError::new(
                        ErrorKind::ConfigConflict,
                        format!(
                            "Interface {} is member of both bond \
                            {cur_bond} and {new_bond}",
                            iface.name
                        ),
                    ));
                }
            }
        }
        for (family, domain, overrides) in [
            (
                AddressFamily::IPv4,
                iface.dhcp4_domain.as_ref(),
                iface.dhcp4_overrides.as_ref(),
            ),
            (
                AddressFamily::IPv6,
                iface.dhcp6_domain.as_ref(),
                iface.dhcp6_overrides.as_ref(),
            ),
        ] {
            if domain.is_some()
                && overrides.and_then(|o| o.use_domains.as_ref()).is_some()
            {
                let ver = match family {
                    AddressFamily::IPv4 => 4,
                    AddressFamily::IPv6 => 6,
                };
                return Err(NetCfgError::new(
                    ErrorKind::ConfigConflict,
                    format!(
                        "Device {} sets both dhcp{ver}domain and \
                        dhcp{ver}-overrides.use-domains",
                        iface.name
                    ),
                ));
            }
        }
        let mut seen = self.default_routes.clone();
        for subnet in iface.subnets.iter() {
            for route in subnet.routes.iter() {
                check_default_route(
                    &mut seen,
                    route,
                    &format!("interface {}", iface.name),
                )?;
            }
        }
        Ok(())
    }

    /// Store an interface, filling in the placeholder of the same name if
    /// any.
    pub(crate) fn add_iface(
        &mut self,
        mut iface: Interface,
    ) -> Result<(), NetCfgError> {
        self.validate_iface(&iface)?;
        for subnet in iface.subnets.iter() {
            for route in subnet.routes.iter() {
                check_default_route(
                    &mut self.default_routes,
                    route,
                    &format!("interface {}", iface.name),
                )?;
            }
        }
        match self.iface_index(&iface.name) {
            Some(idx) => {
                let placeholder = &self.interfaces[idx];
                if iface.bond_master.is_none() {
                    iface.bond_master = placeholder.bond_master.clone();
                }
                log::debug!(
                    "Interface {} is no longer a placeholder",
                    iface.name
                );
                self.interfaces[idx] = iface;
            }
            None => self.interfaces.push(iface),
        }
        Ok(())
    }

    /// Bond and bridge members nobody declared yet become physical
    /// placeholders.
    pub(crate) fn ensure_iface(&mut self, name: &str) {
        if self.iface_index(name).is_none() {
            log::debug!("Creating placeholder physical interface {name}");
            let mut iface = Interface::new(name, InterfaceType::Physical);
            iface.placeholder = true;
            self.interfaces.push(iface);
        }
    }

    pub(crate) fn set_bond_master(
        &mut self,
        member: &str,
        bond_name: &str,
    ) -> Result<(), NetCfgError> {
        self.ensure_iface(member);
        if let Some(iface) =
            self.interfaces.iter_mut().find(|i| i.name == member)
        {
            match iface.bond_master.as_deref() {
                Some(cur) if cur != bond_name => {
                    return Err(NetCfgError::new(
                        ErrorKind::ConfigConflict,
                        format!(
                            "Interface {member} is member of both bond \
                            {cur} and {bond_name}"
                        ),
                    ));
                }
                _ => iface.bond_master = Some(bond_name.to_string()),
            }
        }
        Ok(())
    }

    pub(crate) fn add_route(
        &mut self,
        route: Route,
    ) -> Result<(), NetCfgError> {
        check_default_route(
            &mut self.default_routes,
            &route,
            "global routes",
        )?;
        self.routes.push(route);
        Ok(())
    }

    /// Append resolver settings globally, or to the named interface when
    /// given.
    pub(crate) fn add_dns(
        &mut self,
        iface_name: Option<&str>,
        nameservers: &[String],
        search: &[String],
    ) {
        match iface_name.and_then(|n| {
            self.interfaces.iter_mut().find(|i| i.name == n)
        }) {
            Some(iface) => iface.dns.extend(nameservers, search),
            None => {
                if let Some(n) = iface_name {
                    log::warn!(
                        "Nameserver bound to unknown interface {n}, \
                        treating as global"
                    );
                }
                self.dns.extend(nameservers, search)
            }
        }
    }

    /// Every `bond_master` must name a bond of this state.
    fn check_bond_masters(&self) -> Result<(), NetCfgError> {
        for iface in self.interfaces.iter() {
            if let Some(bond_name) = iface.bond_master.as_deref() {
                match self.get_iface(bond_name) {
                    Some(bond) if bond.iface_type == InterfaceType::Bond => (),
                    Some(other) => {
                        return Err(NetCfgError::new(
                            ErrorKind::InvalidCommand,
                            format!(
                                "Interface {} declares bond master \
                                {bond_name} which is a {} interface",
                                iface.name, other.iface_type
                            ),
                        ));
                    }
                    None => {
                        return Err(NetCfgError::new(
                            ErrorKind::InvalidCommand,
                            format!(
                                "Interface {} declares bond master \
                                {bond_name} which is not defined",
                                iface.name
                            ),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    pub(crate) fn build(
        self,
        version: u8,
        v2_config: Option<serde_json::Value>,
    ) -> Result<NetworkState, NetCfgError> {
        self.check_bond_masters()?;
        Ok(NetworkState {
            version,
            interfaces: self.interfaces,
            routes: self.routes,
            dns: self.dns,
            v2_config,
        })
    }
}

fn check_default_route(
    seen: &mut HashMap<AddressFamily, String>,
    route: &Route,
    owner: &str,
) -> Result<(), NetCfgError> {
    if !route.is_default() {
        return Ok(());
    }
    let desc = format!("{route} of {owner}");
    if let Some(existing) = seen.get(&route.family()) {
        return Err(NetCfgError::new(
            ErrorKind::ConfigConflict,
            format!(
                "Only one {} default route is allowed, got {existing} and \
                {desc}",
                route.family()
            ),
        ));
    }
    seen.insert(route.family(), desc);
    Ok(())
}
