//! Host bind-address discovery.

use std::net::Ipv4Addr;

use systemstat::{IpAddr, Platform, System};

/// First IPv4 address of a wireless interface (`wl*`), falling back to any
/// non-loopback IPv4 when the host has no addressed wireless interface.
/// Returns `None` when nothing usable is found.
pub fn wireless_ipv4() -> Option<Ipv4Addr> {
    let sys = System::new();
    let networks = match sys.networks() {
        Ok(networks) => networks,
        Err(e) => {
            log::warn!("failed to enumerate network interfaces, {e:?}");
            return None;
        }
    };

    let mut fallback = None;
    for netif in networks.values() {
        for addrs in &netif.addrs {
            if let IpAddr::V4(addr) = &addrs.addr {
                if addr.is_loopback() {
                    continue;
                }
                if netif.name.starts_with("wl") {
                    return Some(*addr);
                }
                fallback.get_or_insert(*addr);
            }
        }
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wireless_ipv4() {
        // Host-dependent; only the invariant is checkable.
        if let Some(addr) = wireless_ipv4() {
            assert!(!addr.is_loopback());
        }
    }
}
