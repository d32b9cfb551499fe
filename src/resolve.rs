use crate::ping_error::{PingError, PingResult};
use dns_lookup::AddrInfoHints;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};

/// A resolved ping target.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Target {
    /// Canonical name when the resolver reports one, otherwise the host as given.
    pub name: String,
    pub addr: Ipv4Addr,
}

pub fn resolve(host: &str) -> PingResult<Target> {
    // Try to parse the host as a literal address first.
    if let Ok(addr) = host.parse::<Ipv4Addr>() {
        return Ok(Target { name: host.to_string(), addr });
    }

    let failure = |message: String| PingError::Resolution { host: host.to_string(), message };
    let hints = AddrInfoHints { address: libc::AF_INET, flags: libc::AI_CANONNAME, ..AddrInfoHints::default() };
    let addr_infos = dns_lookup::getaddrinfo(Some(host), None, Some(hints))
        .map_err(|e| failure(io::Error::from(e).to_string()))?;

    let mut canonical_name: Option<String> = None;
    for addr_info in addr_infos {
        let addr_info = addr_info.map_err(|e| failure(e.to_string()))?;
        if canonical_name.is_none() {
            canonical_name = addr_info.canonname;
        }
        if let SocketAddr::V4(socket_addr) = addr_info.sockaddr {
            let target = Target { name: canonical_name.unwrap_or_else(|| host.to_string()), addr: *socket_addr.ip() };
            tracing::debug!("resolved {} to {} ({})", host, target.addr, target.name);
            return Ok(target);
        }
    }
    Err(failure("no IPv4 address".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_address_is_used_as_is() {
        let target = resolve("192.0.2.7").unwrap();
        assert_eq!(Target { name: "192.0.2.7".to_string(), addr: Ipv4Addr::new(192, 0, 2, 7) }, target);
    }

    #[test]
    fn localhost_resolves_to_loopback() {
        let target = resolve("localhost").unwrap();
        assert!(target.addr.is_loopback());
    }

    #[test]
    fn invalid_name_fails_with_resolution_error() {
        let err = resolve("does-not-exist.invalid").unwrap_err();
        assert!(matches!(err, PingError::Resolution { ref host, .. } if host == "does-not-exist.invalid"));
    }
}
