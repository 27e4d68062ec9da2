//! Typed, composable peer addresses.
//!
//! A [`Multiaddr`] is a byte buffer holding a sequence of [`Protocol`]
//! components (`/ip4/1.2.3.4/tcp/4001`, `/dns4/example.com/udp/4001/quic-v1`,
//! ...). Parsing and serializing both directions - text and binary - are
//! exact inverses of each other: `Multiaddr::from_str(&m.to_string()) == m`
//! and `Multiaddr::try_from(m.to_vec()) == m`.

mod error;
pub mod protocol;

pub use error::{Error, Result};
pub use protocol::Protocol;

use std::{
    convert::TryFrom,
    fmt,
    iter::FromIterator,
    str::FromStr,
};

/// Which kind of path a [`Multiaddr`] represents, derived purely from its
/// component sequence (no DNS resolution, no socket probing).
///
/// Ordering of the derivation rules matters: a `Multiaddr` ending in
/// `/p2p-circuit` is always `Relay`, even if it also contains an IP
/// component, because the circuit relay hop dominates the path's actual
/// on-wire behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathKind {
    /// Resolves directly to an `ip4`/`ip6` (optionally via `dns*`) address.
    Ip,
    /// Ends in a `/p2p-circuit` component.
    Relay,
    /// A hole-punch candidate: carries an IP/DNS component but is otherwise
    /// unreachable without coordinated simultaneous dialing. Callers of
    /// `Multiaddr::path_kind` that want this distinction mark it explicitly;
    /// the multiaddr form alone cannot distinguish `HolePunch` from `Ip`.
    HolePunch,
    /// A `/memory/*` address: valid only within the current process.
    Local,
    /// Anything else - a component sequence this crate does not recognize
    /// as any of the above.
    Unknown,
}

/// A typed, composable peer address: an ordered sequence of [`Protocol`]
/// components stored as their concatenated binary encoding.
#[derive(PartialEq, Eq, Clone, Hash, PartialOrd, Ord, Default)]
pub struct Multiaddr {
    bytes: Vec<u8>,
}

impl fmt::Debug for Multiaddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string())
    }
}

impl fmt::Display for Multiaddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for p in self.iter() {
            p.fmt(f)?;
        }
        Ok(())
    }
}

impl Multiaddr {
    /// Creates an empty `Multiaddr`.
    pub fn empty() -> Self {
        Multiaddr { bytes: Vec::new() }
    }

    /// Creates a `Multiaddr` with room for `n` bytes before it needs to
    /// reallocate.
    pub fn with_capacity(n: usize) -> Self {
        Multiaddr { bytes: Vec::with_capacity(n) }
    }

    /// Returns the length, in bytes, of the binary representation.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns the binary representation of this address.
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    /// Appends a component to the end of this address.
    pub fn push(&mut self, p: Protocol<'_>) {
        let mut w = std::io::Cursor::new(&mut self.bytes);
        w.set_position(w.get_ref().len() as u64);
        p.write_bytes(&mut w).expect("writing to a Vec<u8> never fails");
    }

    /// Pops the last component off this address, if any.
    pub fn pop<'a>(&mut self) -> Option<Protocol<'a>> {
        let mut slice = &self.bytes[..];
        if slice.is_empty() {
            return None;
        }
        let mut last_start = 0;
        loop {
            let (p, rest) = Protocol::from_bytes(slice).ok()?;
            if rest.is_empty() {
                self.bytes.truncate(last_start);
                return Some(p.acquire());
            }
            last_start = self.bytes.len() - rest.len();
            slice = rest;
        }
    }

    /// Returns an iterator over the components of this address.
    pub fn iter(&self) -> Iter<'_> {
        Iter(&self.bytes)
    }

    /// Returns the number of components in this address.
    pub fn protocol_count(&self) -> usize {
        self.iter().count()
    }

    /// Concatenates `self` and `other`'s components into a new `Multiaddr`.
    pub fn encapsulate<T: Into<Multiaddr>>(&self, other: T) -> Multiaddr {
        let mut out = self.clone();
        out.bytes.extend(other.into().bytes);
        out
    }

    /// Derives the [`PathKind`] of this address from its component
    /// sequence. See [`PathKind`] for the derivation rules.
    pub fn path_kind(&self) -> PathKind {
        let components: Vec<Protocol<'_>> = self.iter().collect();
        if components.is_empty() {
            return PathKind::Unknown;
        }
        if components.iter().any(|p| matches!(p, Protocol::P2pCircuit)) {
            return PathKind::Relay;
        }
        if components.iter().any(|p| matches!(p, Protocol::Memory(_))) {
            return PathKind::Local;
        }
        let has_routable = components.iter().any(|p| {
            matches!(
                p,
                Protocol::Ip4(_)
                    | Protocol::Ip6(_)
                    | Protocol::Dns(_)
                    | Protocol::Dns4(_)
                    | Protocol::Dns6(_)
                    | Protocol::Dnsaddr(_)
            )
        });
        if has_routable {
            return PathKind::Ip;
        }
        PathKind::Unknown
    }
}

/// An iterator over the [`Protocol`] components of a [`Multiaddr`].
#[derive(Clone)]
pub struct Iter<'a>(&'a [u8]);

impl<'a> Iterator for Iter<'a> {
    type Item = Protocol<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.0.is_empty() {
            return None;
        }
        let (p, rest) = Protocol::from_bytes(self.0).expect("Multiaddr's own bytes always decode");
        self.0 = rest;
        Some(p)
    }
}

impl FromStr for Multiaddr {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        let mut parts = input.split('/');
        if Some("") != parts.next() {
            return Err(Error::InvalidMultiaddr);
        }

        let mut writer = Vec::new();
        let mut parts = parts.peekable();

        while parts.peek().is_some() {
            let p = Protocol::from_str_parts(&mut parts)?;
            p.write_bytes(&mut writer).expect("writing to a Vec<u8> never fails");
        }

        Ok(Multiaddr { bytes: writer })
    }
}

impl TryFrom<Vec<u8>> for Multiaddr {
    type Error = Error;

    fn try_from(bytes: Vec<u8>) -> Result<Self> {
        // validate: the whole buffer must decode as a clean run of protocols.
        let mut slice = &bytes[..];
        while !slice.is_empty() {
            let (_, rest) = Protocol::from_bytes(slice)?;
            slice = rest;
        }
        Ok(Multiaddr { bytes })
    }
}

impl<'a> From<Protocol<'a>> for Multiaddr {
    fn from(p: Protocol<'a>) -> Self {
        let mut bytes = Vec::new();
        p.write_bytes(&mut bytes).expect("writing to a Vec<u8> never fails");
        Multiaddr { bytes }
    }
}

impl<'a> FromIterator<Protocol<'a>> for Multiaddr {
    fn from_iter<T: IntoIterator<Item = Protocol<'a>>>(iter: T) -> Self {
        let mut writer = Vec::new();
        for p in iter {
            p.write_bytes(&mut writer).expect("writing to a Vec<u8> never fails");
        }
        Multiaddr { bytes: writer }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_round_trip() {
        let addrs = [
            "/ip4/127.0.0.1/tcp/4001",
            "/ip4/127.0.0.1/udp/4001/quic",
            "/ip4/127.0.0.1/udp/4001/quic-v1",
            "/ip6/::1/tcp/4001",
            "/dns4/example.com/tcp/443/wss",
            "/memory/123456",
            "/ip4/1.2.3.4/tcp/4001/p2p-circuit",
        ];
        for a in addrs {
            let m: Multiaddr = a.parse().expect("parses");
            assert_eq!(m.to_string(), a, "round trip for {}", a);
        }
    }

    #[test]
    fn binary_round_trip() {
        let m: Multiaddr = "/ip4/127.0.0.1/udp/4001/quic-v1".parse().unwrap();
        let bytes = m.to_vec();
        let back = Multiaddr::try_from(bytes).unwrap();
        assert_eq!(m, back);
    }

    #[test]
    fn memory_is_local() {
        let m: Multiaddr = "/memory/123456".parse().unwrap();
        assert_eq!(m.path_kind(), PathKind::Local);
    }

    #[test]
    fn circuit_is_relay_even_with_ip() {
        let m: Multiaddr = "/ip4/1.2.3.4/tcp/4001/p2p-circuit".parse().unwrap();
        assert_eq!(m.path_kind(), PathKind::Relay);
    }

    #[test]
    fn bare_ip_is_ip() {
        let m: Multiaddr = "/ip4/1.2.3.4/tcp/4001".parse().unwrap();
        assert_eq!(m.path_kind(), PathKind::Ip);
    }

    #[test]
    fn empty_is_unknown() {
        assert_eq!(Multiaddr::empty().path_kind(), PathKind::Unknown);
    }

    #[test]
    fn pop_reverses_push() {
        let mut m = Multiaddr::empty();
        m.push(Protocol::Ip4("1.2.3.4".parse().unwrap()));
        m.push(Protocol::Tcp(4001));
        assert_eq!(m.pop(), Some(Protocol::Tcp(4001)));
        assert_eq!(m.pop(), Some(Protocol::Ip4("1.2.3.4".parse().unwrap())));
        assert_eq!(m.pop(), None);
    }

    #[test]
    fn rejects_garbage() {
        assert!("not-a-multiaddr".parse::<Multiaddr>().is_err());
        assert!(Multiaddr::try_from(vec![0xff, 0xff, 0xff, 0xff]).is_err());
    }
}
