/*!
 * Internet reachability probe
 */

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;

/// Whether a TCP connection to `probe` (e.g. a public DNS server on port 53)
/// opens within `limit`. Avoids DNS, so a broken resolver does not count as
/// offline.
pub async fn has_internet(probe: &str, limit: Duration) -> bool {
    match timeout(limit, TcpStream::connect(probe)).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            tracing::debug!("Connectivity probe {} failed: {}", probe, e);
            false
        }
        Err(_) => {
            tracing::debug!("Connectivity probe {} timed out", probe);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn reachable_listener_is_online() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        assert!(has_internet(&addr, Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn closed_port_is_offline() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        assert!(!has_internet(&addr, Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn unparsable_probe_is_offline() {
        assert!(!has_internet("not an address", Duration::from_millis(200)).await);
    }
}
