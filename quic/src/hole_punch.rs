//! Coordinated simultaneous QUIC dialing across a NAT, per §4.F.
//!
//! The coordinator never owns the resulting connection - it hands back
//! whatever [`QuicConnection`] a punch attempt produced and lets the caller
//! (the traversal engine, typically) decide what to do with it. Reusing the
//! listener's own UDP socket for the outbound punch packets is what makes
//! this work: the NAT already has a mapping for that socket from accepting
//! inbound traffic, so packets sent from it toward the peer's observed
//! address are far more likely to cross the NAT than packets from a fresh
//! ephemeral port would be.

use crate::adapter::{extract_verified_identity, QuicConnection, QuicListener};
use crate::addr::{multiaddr_to_socketaddr, socketaddr_to_multiaddr};
use crate::error::QuicError;
use libp2prs_core::identity::Keypair;
use libp2prs_core::{Multiaddr, PeerId};
use libp2prs_tls::TLSProvider;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Tuning knobs for [`QUICHolePunchCoordinator::punch`]. Defaults match
/// §4.F: a 10s overall timeout, 3 simultaneous attempts per round, 200ms
/// between rounds.
#[derive(Debug, Clone)]
pub struct HolePunchConfig {
    pub timeout: Duration,
    pub simultaneous_attempts: usize,
    pub retry_delay: Duration,
}

impl Default for HolePunchConfig {
    fn default() -> Self {
        HolePunchConfig { timeout: Duration::from_secs(10), simultaneous_attempts: 3, retry_delay: Duration::from_millis(200) }
    }
}

/// The outcome of a punch attempt, win or lose - callers need `attemptCount`
/// and `duration` even on failure, for logging/metrics upstream.
#[derive(Debug, Clone)]
pub struct HolePunchResult {
    pub success: bool,
    pub remote_address: Option<Multiaddr>,
    pub attempt_count: usize,
    pub duration: Duration,
}

pub struct QUICHolePunchCoordinator {
    identity: Keypair,
    config: HolePunchConfig,
}

impl QUICHolePunchCoordinator {
    pub fn new(identity: Keypair, config: HolePunchConfig) -> Self {
        QUICHolePunchCoordinator { identity, config }
    }

    /// Runs timed rounds of simultaneous dial attempts at `remote_addr`
    /// through `listener`'s socket, stopping at the first success or once
    /// `config.timeout` elapses. Both addresses must already be validated
    /// IP+UDP+quic-v1 multiaddrs; a malformed `remote_addr` fails instantly
    /// with `attempt_count == 0` rather than waiting out the timeout.
    pub async fn punch(&self, listener: &QuicListener, remote_addr: Multiaddr, expected_peer: PeerId) -> (HolePunchResult, Option<QuicConnection>) {
        if multiaddr_to_socketaddr(&remote_addr).is_err() {
            return (HolePunchResult { success: false, remote_address: None, attempt_count: 0, duration: Duration::default() }, None);
        }

        let started = Instant::now();
        let mut attempt_count = 0;

        while started.elapsed() < self.config.timeout {
            let attempts: Vec<_> = (0..self.config.simultaneous_attempts)
                .map(|_| {
                    attempt_count += 1;
                    self.dial_from_listener(listener, remote_addr.clone(), expected_peer.clone())
                })
                .collect();

            let round = futures::future::join_all(attempts).await;
            if let Some(conn) = round.into_iter().find_map(|r| r.ok()) {
                return (
                    HolePunchResult { success: true, remote_address: Some(remote_addr), attempt_count, duration: started.elapsed() },
                    Some(conn),
                );
            }

            futures_timer::Delay::new(self.config.retry_delay).await;
        }

        (HolePunchResult { success: false, remote_address: None, attempt_count, duration: started.elapsed() }, None)
    }

    /// The `dialFromListener` primitive: dials out using the listener's
    /// already-bound endpoint rather than minting a new one.
    async fn dial_from_listener(&self, listener: &QuicListener, remote: Multiaddr, expected_peer: PeerId) -> Result<QuicConnection, QuicError> {
        let remote_sock = multiaddr_to_socketaddr(&remote)?;
        let provider = TLSProvider::new(&self.identity)?;
        let crypto = provider.client_config_with_0rtt(Some(expected_peer.clone()))?;

        let mut endpoint = listener.endpoint();
        endpoint.set_default_client_config(quinn::ClientConfig::new(Arc::new(crypto)));

        let connecting = endpoint.connect(remote_sock, &expected_peer.to_base58())?;
        let new_conn = connecting.await?;

        let verified = extract_verified_identity(&new_conn.connection)?;
        let verified = verified.expect_peer(Some(&expected_peer)).map_err(QuicError::Tls)?;

        let la = socketaddr_to_multiaddr(endpoint.local_addr().map_err(|_| QuicError::NoLocalAddr)?);
        Ok(QuicConnection::new(endpoint, new_conn, self.identity.clone(), verified, la, remote))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = HolePunchConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.simultaneous_attempts, 3);
        assert_eq!(config.retry_delay, Duration::from_millis(200));
    }

    #[async_std::test]
    async fn malformed_remote_address_fails_instantly() {
        use std::str::FromStr;
        let identity = Keypair::generate_ed25519();
        let coordinator = QUICHolePunchCoordinator::new(identity.clone(), HolePunchConfig::default());
        let adapter = crate::adapter::QUICSecuredAdapter::new(identity.clone());
        let listener = adapter.listen_secured(Multiaddr::from_str("/ip4/127.0.0.1/udp/0/quic-v1").unwrap()).unwrap();

        let bad_remote = Multiaddr::from_str("/ip4/127.0.0.1/tcp/4001").unwrap();
        let bogus_peer = Keypair::generate_ed25519().public().to_peer_id();
        let (result, conn) = coordinator.punch(&listener, bad_remote, bogus_peer).await;

        assert!(!result.success);
        assert_eq!(result.attempt_count, 0);
        assert!(conn.is_none());
    }
}
