//! Candidate ordering and fallback rules, split out from the engine so a
//! caller can swap in a different ordering without touching the gather/dial
//! loop.

use crate::candidate::Candidate;
use crate::context::Context;
use libp2prs_core::error::CoreError;

/// Deterministic ordering and escalation rules the engine consults between
/// gathering candidates and dialing them.
pub trait Policy<C: Context>: Send + Sync {
    /// Orders `candidates` for serial, stop-at-first-success dialing.
    fn order(&self, candidates: Vec<Candidate>, context: &C) -> Vec<Candidate>;

    /// Whether a failed `candidate` should be followed by trying the next
    /// one, or the whole dial should fail immediately with `error`.
    fn should_fallback(&self, error: &CoreError, candidate: &Candidate, context: &C) -> bool;

    fn box_clone(&self) -> Box<dyn Policy<C>>;
}

impl<C: Context> Clone for Box<dyn Policy<C>> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// `path-kind priority (local < ip < holePunch < relay < unknown), then
/// score descending, then has-address before no-address, then mechanismID
/// ascending` - spec §4.G, verbatim.
fn path_kind_rank(kind: libp2prs_multiaddr::PathKind) -> u8 {
    use libp2prs_multiaddr::PathKind::*;
    match kind {
        Local => 0,
        Ip => 1,
        HolePunch => 2,
        Relay => 3,
        Unknown => 4,
    }
}

/// The default ordering and fallback policy described in spec §4.G.
#[derive(Clone, Default)]
pub struct DefaultPolicy;

impl<C: Context> Policy<C> for DefaultPolicy {
    fn order(&self, mut candidates: Vec<Candidate>, _context: &C) -> Vec<Candidate> {
        candidates.sort_by(|a, b| {
            path_kind_rank(a.path_kind)
                .cmp(&path_kind_rank(b.path_kind))
                .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal))
                .then_with(|| b.address.is_some().cmp(&a.address.is_some()))
                .then_with(|| a.mechanism_id.cmp(&b.mechanism_id))
        });
        candidates
    }

    fn should_fallback(&self, error: &CoreError, _candidate: &Candidate, _context: &C) -> bool {
        !matches!(error, CoreError::ConnectionLimitReached)
    }

    fn box_clone(&self) -> Box<dyn Policy<C>> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use async_trait::async_trait;
    use libp2prs_core::PeerId;
    use libp2prs_multiaddr::{Multiaddr, PathKind};

    struct NullContext;

    #[async_trait]
    impl Context for NullContext {
        type Output = ();

        fn known_addresses(&self, _peer: &PeerId) -> Vec<Multiaddr> {
            Vec::new()
        }

        fn can_dial(&self, _addr: &Multiaddr) -> bool {
            true
        }

        async fn dial_address(&self, _addr: &Multiaddr) -> Result<Self::Output, CoreError> {
            Ok(())
        }
    }

    #[test]
    fn orders_relay_direct_holepunch_example_from_spec() {
        let peer = PeerId::random();
        let r: Multiaddr = "/ip4/1.1.1.1/udp/1/quic-v1".parse().unwrap();
        let d: Multiaddr = "/ip4/2.2.2.2/udp/2/quic-v1".parse().unwrap();
        let h: Multiaddr = "/ip4/3.3.3.3/udp/3/quic-v1".parse().unwrap();

        let candidates = vec![
            Candidate::new("relay", peer.clone(), Some(r.clone()), PathKind::Relay, 0.1),
            Candidate::new("direct", peer.clone(), Some(d.clone()), PathKind::Ip, 1.0),
            Candidate::new("hole-punch", peer, Some(h.clone()), PathKind::HolePunch, 0.5),
        ];

        let ordered = DefaultPolicy.order(candidates, &NullContext);
        let addrs: Vec<_> = ordered.iter().map(|c| c.address.clone().unwrap()).collect();
        assert_eq!(addrs, vec![d, h, r]);
    }

    #[test]
    fn ties_break_on_mechanism_id_ascending() {
        let peer = PeerId::random();
        let a = Candidate::new("zzz", peer.clone(), None, PathKind::Ip, 1.0);
        let b = Candidate::new("aaa", peer, None, PathKind::Ip, 1.0);

        let ordered = DefaultPolicy.order(vec![a, b], &NullContext);
        assert_eq!(ordered[0].mechanism_id, "aaa");
    }

    #[test]
    fn connection_limit_reached_is_fatal_not_a_fallback() {
        let peer = PeerId::random();
        let c = Candidate::new("direct", peer, None, PathKind::Ip, 1.0);
        assert!(!DefaultPolicy.should_fallback(&CoreError::ConnectionLimitReached, &c, &NullContext));
        assert!(DefaultPolicy.should_fallback(&CoreError::NoCandidate, &c, &NullContext));
    }
}
