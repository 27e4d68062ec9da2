use libp2prs_core::PeerId;
use libp2prs_multiaddr::{Multiaddr, PathKind};

/// A dial candidate a [`crate::mechanism::Mechanism`] offers the engine for
/// a given target peer. `score` is a mechanism-local heuristic in `[0, 1]`;
/// it only matters relative to other candidates the *same* run produced.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub mechanism_id: String,
    pub target_peer: PeerId,
    pub address: Option<Multiaddr>,
    pub path_kind: PathKind,
    pub score: f64,
}

impl Candidate {
    pub fn new(mechanism_id: impl Into<String>, target_peer: PeerId, address: Option<Multiaddr>, path_kind: PathKind, score: f64) -> Self {
        Candidate { mechanism_id: mechanism_id.into(), target_peer, address, path_kind, score }
    }
}

/// Merges candidates gathered from multiple mechanisms, dropping later
/// duplicates (by mechanism id + target + address + path kind) while
/// preserving first-seen order; the policy reorders the result anyway, so
/// "first seen" has no semantic meaning beyond determinism.
pub fn dedupe(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let key = (candidate.mechanism_id.clone(), candidate.target_peer.clone(), candidate.address.clone(), candidate.path_kind);
        if seen.insert(key) {
            out.push(candidate);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupe_drops_exact_repeats_but_keeps_distinct_ones() {
        let peer = PeerId::random();
        let addr: Multiaddr = "/ip4/10.0.0.1/udp/4001/quic-v1".parse().unwrap();
        let a = Candidate::new("direct", peer.clone(), Some(addr.clone()), PathKind::Ip, 1.0);
        let b = a.clone();
        let c = Candidate::new("relay", peer, Some(addr), PathKind::Relay, 0.1);

        let out = dedupe(vec![a, b, c]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn dedupe_ignores_score_differences() {
        let peer = PeerId::random();
        let a = Candidate::new("direct", peer.clone(), None, PathKind::Ip, 1.0);
        let mut b = a.clone();
        b.score = 0.4;
        assert_eq!(dedupe(vec![a, b]).len(), 1);
    }
}
