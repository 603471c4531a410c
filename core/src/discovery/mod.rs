//! mDNS service advertisement
//!
//! Advertising is optional: when registration fails (no multicast route,
//! unusual network setup) the node stays fully functional, because the
//! discovery request/response path on the sync socket is the fallback.

use std::collections::HashMap;
use std::net::IpAddr;

use mdns_sd::{ServiceDaemon, ServiceInfo};

use crate::protocol::constants::{PROTOCOL_VERSION, SERVICE_TYPE};
use crate::{Error, Result};

/// Advertises this node as a discoverable network service record.
pub struct Advertiser {
    daemon: ServiceDaemon,
    fullname: String,
}

impl Advertiser {
    /// Register the service record for others to browse.
    pub fn register(instance_name: &str, platform: &str, port: u16) -> Result<Self> {
        let daemon = ServiceDaemon::new().map_err(|e| Error::Discovery(e.to_string()))?;

        let mut properties = HashMap::new();
        properties.insert("platform".to_string(), platform.to_string());
        properties.insert("version".to_string(), PROTOCOL_VERSION.to_string());

        let host = format!(
            "{}.local.",
            hostname::get()
                .map(|h| h.to_string_lossy().to_string())
                .unwrap_or_else(|_| "nexusclip".to_string())
        );

        let service = ServiceInfo::new(
            SERVICE_TYPE,
            instance_name,
            &host,
            &get_local_ips()[..],
            port,
            properties,
        )
        .map_err(|e| Error::Discovery(e.to_string()))?;

        let fullname = service.get_fullname().to_string();
        daemon
            .register(service)
            .map_err(|e| Error::Discovery(e.to_string()))?;

        tracing::info!("registered mDNS service: {}", fullname);
        Ok(Self { daemon, fullname })
    }

    /// Unregister the record and shut the daemon down.
    pub fn shutdown(self) {
        if let Err(e) = self.daemon.unregister(&self.fullname) {
            tracing::warn!("mDNS unregister failed: {}", e);
        }
        let _ = self.daemon.shutdown();
    }
}

/// Get local IP addresses (non-loopback)
pub fn get_local_ips() -> Vec<IpAddr> {
    let mut ips = Vec::new();

    if let Ok(interfaces) = get_if_addrs::get_if_addrs() {
        for iface in interfaces {
            if !iface.is_loopback() {
                ips.push(iface.ip());
            }
        }
    }

    ips
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_local_ips_excludes_loopback() {
        for ip in get_local_ips() {
            assert!(!ip.is_loopback());
        }
    }
}
