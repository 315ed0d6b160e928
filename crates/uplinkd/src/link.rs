//! Low-level network interface queries
//!
//! Both queries fail closed: any error from the OS is reported as "not
//! available" rather than propagated, so a flapping or vanished interface
//! can never crash the monitor or the connection loop.

use std::net::Ipv4Addr;

use nix::net::if_::InterfaceFlags;

/// Whether the named interface currently has an operational link.
///
/// Requires both IFF_UP and IFF_RUNNING; a missing interface or a failed
/// query counts as down.
pub fn is_operational(name: &str) -> bool {
    let addrs = match nix::ifaddrs::getifaddrs() {
        Ok(addrs) => addrs,
        Err(e) => {
            tracing::debug!("getifaddrs failed: {}", e);
            return false;
        }
    };

    let required = InterfaceFlags::IFF_UP | InterfaceFlags::IFF_RUNNING;
    addrs
        .filter(|ifa| ifa.interface_name == name)
        .any(|ifa| ifa.flags.contains(required))
}

/// First IPv4 address assigned to the named interface, if any.
pub fn local_ipv4(name: &str) -> Option<Ipv4Addr> {
    let addrs = match nix::ifaddrs::getifaddrs() {
        Ok(addrs) => addrs,
        Err(e) => {
            tracing::debug!("getifaddrs failed: {}", e);
            return None;
        }
    };

    addrs
        .filter(|ifa| ifa.interface_name == name)
        .filter_map(|ifa| ifa.address)
        .find_map(|addr| addr.as_sockaddr_in().map(|sin| sin.ip()))
}
