use crate::candidate::dedupe;
use crate::context::Context;
use crate::mechanism::Mechanism;
use crate::policy::{DefaultPolicy, Policy};
use libp2prs_core::error::CoreError;
use libp2prs_core::PeerId;

/// Drives candidate gathering, ordering and serial dialing for a target
/// peer: gather from every registered [`Mechanism`] in parallel, dedupe,
/// order via the [`Policy`], then try each candidate in turn until one
/// succeeds or the policy says to stop.
pub struct TraversalEngine<C: Context> {
    mechanisms: Vec<Box<dyn Mechanism<C>>>,
    policy: Box<dyn Policy<C>>,
}

impl<C: Context> TraversalEngine<C> {
    pub fn new(mechanisms: Vec<Box<dyn Mechanism<C>>>, policy: Box<dyn Policy<C>>) -> Self {
        TraversalEngine { mechanisms, policy }
    }

    /// Wires the three stock mechanisms from [`crate::mechanism`] together
    /// with [`DefaultPolicy`] - the configuration spec.md describes as the
    /// default.
    pub fn with_default_mechanisms() -> Self {
        TraversalEngine {
            mechanisms: vec![
                Box::new(crate::mechanism::DirectMechanism),
                Box::new(crate::mechanism::RelayMechanism),
                Box::new(crate::mechanism::HolePunchMechanism),
            ],
            policy: Box::new(DefaultPolicy),
        }
    }

    pub async fn dial(&self, target: &PeerId, context: &C) -> Result<C::Output, CoreError> {
        let gathered = futures::future::join_all(self.mechanisms.iter().map(|mechanism| mechanism.collect_candidates(target, context))).await;
        let candidates = dedupe(gathered.into_iter().flatten().collect());
        let ordered = self.policy.order(candidates, context);

        if ordered.is_empty() {
            log::debug!("traversal: no candidates for {:?}", target);
            return Err(CoreError::NoCandidate);
        }

        let mut last_err: Option<CoreError> = None;
        for candidate in &ordered {
            let mechanism = match self.mechanisms.iter().find(|m| m.id() == candidate.mechanism_id) {
                Some(m) => m,
                None => continue,
            };

            log::trace!("traversal: attempting {} candidate for {:?}", candidate.mechanism_id, target);
            match mechanism.attempt(candidate, context).await {
                Ok(output) => return Ok(output),
                Err(error) => {
                    let fallback = self.policy.should_fallback(&error, candidate, context);
                    log::debug!("traversal: {} candidate failed: {}; fallback={}", candidate.mechanism_id, error, fallback);
                    last_err = Some(error);
                    if !fallback {
                        break;
                    }
                }
            }
        }

        Err(last_err.unwrap_or(CoreError::NoCandidate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::Candidate;
    use async_trait::async_trait;
    use libp2prs_multiaddr::{Multiaddr, PathKind};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedContext {
        addrs: Vec<Multiaddr>,
        dial_attempts: Arc<AtomicUsize>,
        fail_first_n: usize,
    }

    #[async_trait]
    impl Context for FixedContext {
        type Output = Multiaddr;

        fn known_addresses(&self, _peer: &PeerId) -> Vec<Multiaddr> {
            self.addrs.clone()
        }

        fn can_dial(&self, _addr: &Multiaddr) -> bool {
            true
        }

        async fn dial_address(&self, addr: &Multiaddr) -> Result<Self::Output, CoreError> {
            let n = self.dial_attempts.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first_n {
                Err(CoreError::NoCandidate)
            } else {
                Ok(addr.clone())
            }
        }
    }

    #[derive(Clone, Default)]
    struct OnlyRelay;

    #[async_trait]
    impl Mechanism<FixedContext> for OnlyRelay {
        fn id(&self) -> &'static str {
            "relay"
        }

        fn path_kind(&self) -> PathKind {
            PathKind::Relay
        }

        async fn collect_candidates(&self, target: &PeerId, context: &FixedContext) -> Vec<Candidate> {
            context
                .known_addresses(target)
                .into_iter()
                .filter(|a| a.path_kind() == PathKind::Relay)
                .map(|a| Candidate::new(self.id(), target.clone(), Some(a), PathKind::Relay, 0.1))
                .collect()
        }

        async fn attempt(&self, candidate: &Candidate, context: &FixedContext) -> Result<Multiaddr, CoreError> {
            context.dial_address(candidate.address.as_ref().unwrap()).await
        }

        fn box_clone(&self) -> Box<dyn Mechanism<FixedContext>> {
            Box::new(self.clone())
        }
    }

    #[async_std::test]
    async fn succeeds_on_first_working_candidate() {
        let direct: Box<dyn Mechanism<FixedContext>> = Box::new(crate::mechanism::DirectMechanism);
        let engine = TraversalEngine::new(vec![direct], Box::new(DefaultPolicy));
        let addr: Multiaddr = "/ip4/9.9.9.9/udp/4001/quic-v1".parse().unwrap();
        let context = FixedContext { addrs: vec![addr.clone()], dial_attempts: Arc::new(AtomicUsize::new(0)), fail_first_n: 0 };

        let result = engine.dial(&PeerId::random(), &context).await.unwrap();
        assert_eq!(result, addr);
    }

    #[async_std::test]
    async fn falls_back_to_next_candidate_after_a_non_fatal_failure() {
        let direct: Box<dyn Mechanism<FixedContext>> = Box::new(crate::mechanism::DirectMechanism);
        let relay: Box<dyn Mechanism<FixedContext>> = Box::new(OnlyRelay);
        let engine = TraversalEngine::new(vec![direct, relay], Box::new(DefaultPolicy));

        let direct_addr: Multiaddr = "/ip4/9.9.9.9/udp/4001/quic-v1".parse().unwrap();
        let relay_addr: Multiaddr = "/ip4/9.9.9.9/udp/4001/quic-v1/p2p-circuit".parse().unwrap();
        let context = FixedContext {
            addrs: vec![direct_addr, relay_addr.clone()],
            dial_attempts: Arc::new(AtomicUsize::new(0)),
            fail_first_n: 1,
        };

        let result = engine.dial(&PeerId::random(), &context).await.unwrap();
        assert_eq!(result, relay_addr);
    }

    #[async_std::test]
    async fn no_known_addresses_fails_with_no_candidate() {
        let direct: Box<dyn Mechanism<FixedContext>> = Box::new(crate::mechanism::DirectMechanism);
        let engine = TraversalEngine::new(vec![direct], Box::new(DefaultPolicy));
        let context = FixedContext { addrs: vec![], dial_attempts: Arc::new(AtomicUsize::new(0)), fail_first_n: 0 };

        let err = engine.dial(&PeerId::random(), &context).await.unwrap_err();
        assert!(matches!(err, CoreError::NoCandidate));
    }
}
