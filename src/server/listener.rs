//! TCP listener: one accept task plus one task per connection.

use super::connection::Connection;
use super::core::DirectoryService;
use crate::error::{LifecycleError, LifecycleResult};
use log::{info, warn};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Pause after a failed accept, e.g. when the process is out of descriptors.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// A running LDAP listener.
///
/// Dropping it without calling [`stop`](Self::stop) cancels the tasks but does
/// not wait for them.
#[derive(Debug)]
pub struct LdapListener {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl LdapListener {
    /// Bind `address` and start serving `service`.
    pub async fn bind(address: &str, service: DirectoryService) -> LifecycleResult<Self> {
        let listener_error = |source| LifecycleError::ListenerFailed {
            address: address.to_string(),
            source,
        };
        let listener = TcpListener::bind(address).await.map_err(listener_error)?;
        let local_addr = listener.local_addr().map_err(listener_error)?;

        let shutdown = CancellationToken::new();
        let tracker = TaskTracker::new();
        tracker.spawn(accept_loop(
            listener,
            service,
            shutdown.clone(),
            tracker.clone(),
        ));

        info!("LDAP listener accepting connections on {}", local_addr);
        Ok(Self {
            local_addr,
            shutdown,
            tracker,
        })
    }

    /// The bound address; reports the real port when bound to port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Stop accepting, close every connection and wait for their tasks.
    pub async fn stop(&self) {
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        info!("LDAP listener on {} stopped", self.local_addr);
    }
}

impl Drop for LdapListener {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn accept_loop(
    listener: TcpListener,
    service: DirectoryService,
    shutdown: CancellationToken,
    tracker: TaskTracker,
) {
    loop {
        let accepted = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => accepted,
        };
        match accepted {
            Ok((stream, peer)) => {
                let connection = Connection::new(stream, peer, service.clone());
                tracker.spawn(connection.run(shutdown.child_token()));
            }
            Err(e) => {
                warn!("Failed to accept LDAP connection: {}", e);
                if !pause_after_accept_error(&shutdown).await {
                    break;
                }
            }
        }
    }
}

/// Returns `false` when shutdown was requested during the pause.
async fn pause_after_accept_error(shutdown: &CancellationToken) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(ACCEPT_ERROR_BACKOFF) => true,
    }
}
