//! Conversion between [`Multiaddr`] and the `SocketAddr` quinn wants.
//!
//! Only `/ip4/.../udp/<port>/quic-v1` and `/ip6/.../udp/<port>/quic-v1` are
//! accepted, per §4.F; anything else - DNS names, bare `/quic` without the
//! `-v1` suffix, missing components - is `UnsupportedAddress`.

use crate::error::QuicError;
use libp2prs_multiaddr::{Multiaddr, Protocol};
use std::net::{IpAddr, SocketAddr};

pub fn multiaddr_to_socketaddr(addr: &Multiaddr) -> Result<SocketAddr, QuicError> {
    let mut iter = addr.iter();
    let ip = match iter.next() {
        Some(Protocol::Ip4(ip)) => IpAddr::V4(ip),
        Some(Protocol::Ip6(ip)) => IpAddr::V6(ip),
        _ => return Err(QuicError::UnsupportedAddress(addr.to_string())),
    };
    let port = match iter.next() {
        Some(Protocol::Udp(port)) => port,
        _ => return Err(QuicError::UnsupportedAddress(addr.to_string())),
    };
    match iter.next() {
        Some(Protocol::QuicV1) => {}
        _ => return Err(QuicError::UnsupportedAddress(addr.to_string())),
    }
    Ok(SocketAddr::new(ip, port))
}

pub fn socketaddr_to_multiaddr(addr: SocketAddr) -> Multiaddr {
    let mut m = Multiaddr::empty();
    match addr.ip() {
        IpAddr::V4(ip) => m.push(Protocol::Ip4(ip)),
        IpAddr::V6(ip) => m.push(Protocol::Ip6(ip)),
    }
    m.push(Protocol::Udp(addr.port()));
    m.push(Protocol::QuicV1);
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn accepts_ip4_udp_quic_v1() {
        let addr = Multiaddr::from_str("/ip4/127.0.0.1/udp/4001/quic-v1").unwrap();
        let sock = multiaddr_to_socketaddr(&addr).unwrap();
        assert_eq!(sock.port(), 4001);
        assert_eq!(socketaddr_to_multiaddr(sock), addr);
    }

    #[test]
    fn rejects_plain_quic() {
        let addr = Multiaddr::from_str("/ip4/127.0.0.1/udp/4001/quic").unwrap();
        assert!(multiaddr_to_socketaddr(&addr).is_err());
    }

    #[test]
    fn rejects_tcp() {
        let addr = Multiaddr::from_str("/ip4/127.0.0.1/tcp/4001").unwrap();
        assert!(multiaddr_to_socketaddr(&addr).is_err());
    }
}
