//! Network infrastructure: implements `ReachabilityProbe` with a plain TCP connect.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;

use crate::application::ports::ReachabilityProbe;

/// Production implementation that performs real TCP connection attempts.
pub struct TokioReachabilityProbe {
    /// Upper bound for a single connection attempt.
    pub attempt_timeout: Duration,
}

impl Default for TokioReachabilityProbe {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(1),
        }
    }
}

impl ReachabilityProbe for TokioReachabilityProbe {
    async fn is_reachable(&self, addr: SocketAddr) -> bool {
        match tokio::time::timeout(self.attempt_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                tracing::trace!(%addr, error = %e, "connect failed");
                false
            }
            Err(_) => false,
        }
    }
}
