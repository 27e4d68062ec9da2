//! Candidate-producing strategies, modeled as a capability trait in the same
//! shape as `libp2prs_core::routing::Routing`: an `id`/behavior contract plus
//! a `box_clone` so a `TraversalEngine` can hold a heterogeneous,
//! cloneable `Vec<Box<dyn Mechanism<C>>>` without generics leaking into
//! callers that just want to register mechanisms.

use crate::candidate::Candidate;
use crate::context::Context;
use async_trait::async_trait;
use libp2prs_core::error::CoreError;
use libp2prs_core::PeerId;
use libp2prs_multiaddr::PathKind;

/// A strategy for producing dial candidates for a target peer, and for
/// turning one of its own candidates into a connection attempt.
#[async_trait]
pub trait Mechanism<C: Context>: Send + Sync {
    /// Stable identifier used for candidate dedup and the policy's
    /// lexicographic tie-break (e.g. `"direct"`, `"relay"`, `"hole-punch"`).
    fn id(&self) -> &'static str;

    fn path_kind(&self) -> PathKind;

    /// Purely derivational from `context.known_addresses(target)` and
    /// `context.can_dial`; must not itself attempt a dial.
    async fn collect_candidates(&self, target: &PeerId, context: &C) -> Vec<Candidate>;

    /// Invokes `context.dial_address` for `candidate`.
    async fn attempt(&self, candidate: &Candidate, context: &C) -> Result<C::Output, CoreError>;

    fn box_clone(&self) -> Box<dyn Mechanism<C>>;
}

impl<C: Context> Clone for Box<dyn Mechanism<C>> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Candidates for addresses that resolve directly to an IP - no relay, no
/// coordinated punching required. Score is always the spec's fixed 1.0.
#[derive(Clone, Default)]
pub struct DirectMechanism;

#[async_trait]
impl<C: Context> Mechanism<C> for DirectMechanism {
    fn id(&self) -> &'static str {
        "direct"
    }

    fn path_kind(&self) -> PathKind {
        PathKind::Ip
    }

    async fn collect_candidates(&self, target: &PeerId, context: &C) -> Vec<Candidate> {
        context
            .known_addresses(target)
            .into_iter()
            .filter(|addr| addr.path_kind() == PathKind::Ip && context.can_dial(addr))
            .map(|addr| Candidate::new(self.id(), target.clone(), Some(addr), PathKind::Ip, 1.0))
            .collect()
    }

    async fn attempt(&self, candidate: &Candidate, context: &C) -> Result<C::Output, CoreError> {
        let addr = candidate.address.as_ref().ok_or(CoreError::NoCandidate)?;
        context.dial_address(addr).await
    }

    fn box_clone(&self) -> Box<dyn Mechanism<C>> {
        Box::new(self.clone())
    }
}

/// Candidates routed through a circuit relay (`/.../p2p-circuit`). Fixed,
/// low score per spec: relays add latency and a hop that can drop the
/// connection independently of either peer's own NAT, so they are a last
/// resort rather than a peer among equals.
#[derive(Clone, Default)]
pub struct RelayMechanism;

#[async_trait]
impl<C: Context> Mechanism<C> for RelayMechanism {
    fn id(&self) -> &'static str {
        "relay"
    }

    fn path_kind(&self) -> PathKind {
        PathKind::Relay
    }

    async fn collect_candidates(&self, target: &PeerId, context: &C) -> Vec<Candidate> {
        context
            .known_addresses(target)
            .into_iter()
            .filter(|addr| addr.path_kind() == PathKind::Relay && context.can_dial(addr))
            .map(|addr| Candidate::new(self.id(), target.clone(), Some(addr), PathKind::Relay, 0.1))
            .collect()
    }

    async fn attempt(&self, candidate: &Candidate, context: &C) -> Result<C::Output, CoreError> {
        let addr = candidate.address.as_ref().ok_or(CoreError::NoCandidate)?;
        context.dial_address(addr).await
    }

    fn box_clone(&self) -> Box<dyn Mechanism<C>> {
        Box::new(self.clone())
    }
}

/// Candidates reachable only via a coordinated simultaneous dial (QUIC
/// hole-punch). The score heuristic favors addresses that also have a
/// direct sibling on the same peer (suggesting the NAT is at least
/// cone-shaped) without requiring the mechanism to know how the punch
/// itself will be driven - that detail lives in `libp2prs-quic`.
#[derive(Clone, Default)]
pub struct HolePunchMechanism;

impl HolePunchMechanism {
    /// A context-specific heuristic score in `[0, 1]` per spec §4.G: more
    /// known addresses for the same peer suggests a more cooperative NAT,
    /// so confidence in the punch rises (but never reaches the direct-IP
    /// ceiling of 1.0).
    fn score_for(known_address_count: usize) -> f64 {
        (0.3 + 0.1 * known_address_count as f64).min(0.9)
    }
}

#[async_trait]
impl<C: Context> Mechanism<C> for HolePunchMechanism {
    fn id(&self) -> &'static str {
        "hole-punch"
    }

    fn path_kind(&self) -> PathKind {
        PathKind::HolePunch
    }

    async fn collect_candidates(&self, target: &PeerId, context: &C) -> Vec<Candidate> {
        let known = context.known_addresses(target);
        let score = Self::score_for(known.len());
        known
            .into_iter()
            .filter(|addr| addr.path_kind() == PathKind::Ip && context.can_dial(addr))
            .map(|addr| Candidate::new(self.id(), target.clone(), Some(addr), PathKind::HolePunch, score))
            .collect()
    }

    async fn attempt(&self, candidate: &Candidate, context: &C) -> Result<C::Output, CoreError> {
        let addr = candidate.address.as_ref().ok_or(CoreError::NoCandidate)?;
        context.dial_address(addr).await
    }

    fn box_clone(&self) -> Box<dyn Mechanism<C>> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hole_punch_score_grows_with_known_addresses_but_caps_below_one() {
        assert!(HolePunchMechanism::score_for(0) < HolePunchMechanism::score_for(3));
        assert!(HolePunchMechanism::score_for(100) < 1.0);
    }
}
