use crate::error::{G3Error, Result};
use crate::protocol::IdGenerator;
use crate::transport::{url_host, Transport, WebSocketTransport};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

/// State guarded by the connection lock
///
/// Holding the guard is what entitles a caller to use the transport, so a
/// request and its response can never interleave with another exchange.
pub(crate) struct Link {
    transport: Option<Box<dyn Transport>>,
    ids: IdGenerator,
}

impl Link {
    pub(crate) fn transport(&mut self) -> Result<&mut (dyn Transport + 'static)> {
        self.transport.as_deref_mut().ok_or(G3Error::NotConnected)
    }

    pub(crate) fn next_id(&mut self) -> u32 {
        self.ids.next_id()
    }
}

/// Owner of the single WebSocket to the glasses
pub struct Connection {
    link: Mutex<Link>,
    connected: AtomicBool,
}

impl Connection {
    pub fn new() -> Self {
        Self {
            link: Mutex::new(Link {
                transport: None,
                ids: IdGenerator::new(),
            }),
            connected: AtomicBool::new(false),
        }
    }

    /// Connect to `ws://{address}/websocket/`, replacing any live connection
    pub async fn connect(&self, address: &str, connect_timeout: Duration) -> Result<()> {
        let url = format!("ws://{}/websocket/", url_host(address));
        let mut link = self.link.lock().await;
        self.teardown(&mut link).await;

        let transport = WebSocketTransport::connect(&url, connect_timeout).await?;
        self.install(&mut link, Box::new(transport));
        Ok(())
    }

    /// Use an already-open transport, replacing any live connection
    pub async fn attach(&self, transport: Box<dyn Transport>) {
        let mut link = self.link.lock().await;
        self.teardown(&mut link).await;
        self.install(&mut link, transport);
    }

    /// Close the connection; does nothing when not connected
    pub async fn disconnect(&self) {
        let mut link = self.link.lock().await;
        self.teardown(&mut link).await;
    }

    /// Whether a live transport is held; performs no I/O
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Sub-protocol negotiated by the current transport
    pub async fn subprotocol(&self) -> Option<String> {
        let link = self.link.lock().await;
        link.transport
            .as_deref()
            .and_then(|t| t.subprotocol())
            .map(str::to_owned)
    }

    /// Acquire exclusive use of the transport; callers queue in FIFO order
    pub(crate) async fn lock(&self) -> MutexGuard<'_, Link> {
        self.link.lock().await
    }

    /// Drop a transport that was observed closed mid-exchange
    pub(crate) fn mark_closed(&self, link: &mut Link) {
        if link.transport.take().is_some() {
            tracing::warn!("Glasses connection lost");
        }
        self.connected.store(false, Ordering::Release);
    }

    fn install(&self, link: &mut Link, transport: Box<dyn Transport>) {
        link.transport = Some(transport);
        self.connected.store(true, Ordering::Release);
        tracing::info!("Connected to glasses");
    }

    async fn teardown(&self, link: &mut Link) {
        if let Some(mut transport) = link.transport.take() {
            if let Err(e) = transport.close().await {
                tracing::debug!("Error while closing connection: {}", e);
            }
            tracing::info!("Disconnected from glasses");
        }
        self.connected.store(false, Ordering::Release);
    }
}

impl Default for Connection {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let Some(mut transport) = self.link.get_mut().transport.take() else {
            return;
        };
        // Closing needs a runtime; without one the socket is simply dropped
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                let _ = transport.close().await;
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockTransport;
    use serde_json::json;

    #[tokio::test]
    async fn test_starts_disconnected() {
        let conn = Connection::new();
        assert!(!conn.is_connected());
        let mut link = conn.lock().await;
        assert!(matches!(link.transport(), Err(G3Error::NotConnected)));
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let conn = Connection::new();
        conn.disconnect().await;
        assert!(!conn.is_connected());

        let (mock, handle) = MockTransport::echo(json!(1));
        conn.attach(Box::new(mock)).await;
        assert!(conn.is_connected());

        conn.disconnect().await;
        conn.disconnect().await;
        assert!(!conn.is_connected());
        assert_eq!(handle.close_count(), 1);
    }

    #[tokio::test]
    async fn test_attach_closes_previous_transport() {
        let conn = Connection::new();
        let (first, first_handle) = MockTransport::echo(json!(1));
        let (second, second_handle) = MockTransport::echo(json!(2));

        conn.attach(Box::new(first)).await;
        conn.attach(Box::new(second)).await;

        assert!(conn.is_connected());
        assert_eq!(first_handle.close_count(), 1);
        assert_eq!(second_handle.close_count(), 0);
    }

    #[tokio::test]
    async fn test_mark_closed_clears_state() {
        let conn = Connection::new();
        let (mock, _handle) = MockTransport::echo(json!(1));
        conn.attach(Box::new(mock)).await;

        {
            let mut link = conn.lock().await;
            conn.mark_closed(&mut link);
        }
        assert!(!conn.is_connected());
    }

    #[tokio::test]
    async fn test_drop_closes_transport() {
        let (mock, handle) = MockTransport::echo(json!(1));
        {
            let conn = Connection::new();
            conn.attach(Box::new(mock)).await;
        }
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert_eq!(handle.close_count(), 1);
    }

    #[tokio::test]
    async fn test_connect_to_unreachable_address_fails() {
        let conn = Connection::new();
        let err = conn
            .connect("127.0.0.1:1", Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            G3Error::WebSocket(_) | G3Error::ConnectionClosed | G3Error::Timeout(_)
        ));
        assert!(!conn.is_connected());
    }
}
