use crate::PeerId;
use libp2prs_multiaddr::Multiaddr;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Addresses known for each peer. The traversal engine's `Context` exposes
/// `known_addresses(peer)` backed by one of these; nothing else in this
/// crate is a peer store (discovery, expiry policy, and persistence are
/// out of scope here).
#[derive(Default)]
pub struct AddrBook {
    pub book: HashMap<PeerId, SmallVec<[Multiaddr; 4]>>,
}

impl fmt::Debug for AddrBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AddrBook").field(&self.book).finish()
    }
}

impl AddrBook {
    pub fn add_addr(&mut self, peer_id: &PeerId, addr: Multiaddr, _ttl: Duration) {
        if let Some(entry) = self.book.get_mut(peer_id) {
            if !entry.contains(&addr) {
                entry.push(addr);
            }
        } else {
            self.book.insert(peer_id.clone(), SmallVec::from_vec(vec![addr]));
        }
    }

    pub fn del_peer(&mut self, peer_id: &PeerId) {
        self.book.remove(peer_id);
    }

    pub fn get_addr(&self, peer_id: &PeerId) -> Option<&SmallVec<[Multiaddr; 4]>> {
        self.book.get(peer_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addr_book_basic() {
        let mut ab = AddrBook::default();
        let peer_id = PeerId::random();

        ab.add_addr(&peer_id, "/memory/123456".parse().unwrap(), Duration::from_secs(1));
        ab.add_addr(&peer_id, "/memory/654321".parse().unwrap(), Duration::from_secs(1));
        let addrs = ab.get_addr(&peer_id).unwrap();
        assert_eq!(addrs.len(), 2);

        ab.add_addr(&peer_id, "/memory/654321".parse().unwrap(), Duration::from_secs(1));
        let addrs = ab.get_addr(&peer_id).unwrap();
        assert_eq!(addrs.len(), 2);

        ab.del_peer(&peer_id);
        assert!(ab.get_addr(&peer_id).is_none());
    }
}
