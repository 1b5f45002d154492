use crate::commands::stop::AliasManager;
use crate::error::BoxError;
use crate::process::{run_cmd, run_cmd_output};
use std::net::Ipv4Addr;

/// Loopback alias management through the host's network tools.
pub struct HostNet;

impl HostNet {
    fn loopback_listing(&self) -> Result<String, BoxError> {
        if cfg!(target_os = "macos") {
            run_cmd_output("ifconfig", &["lo0"])
        } else {
            run_cmd_output("ip", &["-o", "-4", "addr", "show", "dev", "lo"])
        }
    }

    fn remove_alias(&self, ip: &str) -> Result<(), BoxError> {
        log::info!("Removing loopback alias {}...", ip);
        if cfg!(target_os = "macos") {
            run_cmd("sudo", &["-n", "ifconfig", "lo0", "-alias", ip])
        } else {
            let cidr = format!("{}/32", ip);
            run_cmd("sudo", &["-n", "ip", "addr", "del", &cidr, "dev", "lo"])
        }
    }
}

impl AliasManager for HostNet {
    fn remove_loopback_aliases(&self, director_ip: &str, router_ip: &str) -> Result<(), BoxError> {
        let ips = distinct_ips(director_ip, router_ip);
        for ip in &ips {
            ip.parse::<Ipv4Addr>()
                .map_err(|_| format!("invalid IP address '{}'", ip))?;
        }

        let listing = self.loopback_listing()?;
        let mut first_err = None;
        for ip in ips {
            if !alias_is_bound(&listing, ip) {
                log::debug!("Loopback alias {} is not present", ip);
                continue;
            }
            if let Err(err) = self.remove_alias(ip) {
                log::warn!("Failed to remove loopback alias {}: {}", ip, err);
                first_err.get_or_insert(err);
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// The director and router addresses with duplicates removed, in order.
fn distinct_ips<'a>(director_ip: &'a str, router_ip: &'a str) -> Vec<&'a str> {
    let mut ips = vec![director_ip];
    if router_ip != director_ip {
        ips.push(router_ip);
    }
    ips
}

/// Whether `ip` appears as an `inet` address in `ifconfig`/`ip addr` output.
fn alias_is_bound(listing: &str, ip: &str) -> bool {
    listing.lines().any(|line| {
        let mut words = line.split_whitespace();
        while let Some(word) = words.next() {
            if word == "inet" {
                if let Some(addr) = words.next() {
                    if addr.split('/').next() == Some(ip) {
                        return true;
                    }
                }
            }
        }
        false
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_alias_in_ifconfig_output() {
        let listing = "lo0: flags=8049<UP,LOOPBACK,RUNNING,MULTICAST> mtu 16384\n\
            \tinet 127.0.0.1 netmask 0xff000000\n\
            \tinet 10.245.0.2 netmask 0xffffffff\n";
        assert!(alias_is_bound(listing, "10.245.0.2"));
        assert!(!alias_is_bound(listing, "10.144.0.34"));
    }

    #[test]
    fn detects_alias_in_ip_addr_output() {
        let listing = "1: lo    inet 127.0.0.1/8 scope host lo\n\
            1: lo    inet 10.144.0.34/32 scope global lo\n";
        assert!(alias_is_bound(listing, "10.144.0.34"));
        assert!(!alias_is_bound(listing, "10.144.0.3"));
    }

    #[test]
    fn shared_director_and_router_ip_is_removed_once() {
        assert_eq!(distinct_ips("10.245.0.2", "10.245.0.2"), vec!["10.245.0.2"]);
        assert_eq!(
            distinct_ips("10.245.0.2", "10.144.0.34"),
            vec!["10.245.0.2", "10.144.0.34"]
        );
    }

    #[test]
    fn rejects_invalid_addresses_before_running_commands() {
        let err = HostNet
            .remove_loopback_aliases("10.245.0.2", "not-an-ip")
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid IP address 'not-an-ip'");
    }
}
