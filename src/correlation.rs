//! Request/response correlation over the shared connection.
//!
//! The wire protocol has no multiplexing: a response can only be tied to its
//! request through the echoed id. Each exchange therefore runs while holding
//! the connection lock, from id allocation until the response has been read.

use crate::connection::{Connection, Link};
use crate::error::{G3Error, Result};
use crate::protocol::{decode_response, encode_request, Request, Response};
use crate::transport::Transport;
use tokio::sync::MutexGuard;

/// Issues one request at a time and checks the answer belongs to it
pub struct CorrelationEngine {
    connection: Connection,
}

impl CorrelationEngine {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Send the request built for the next id and wait for its response
    ///
    /// A closed transport leaves the connection disconnected, as does dropping
    /// this future while it waits for the response. A response with
    /// a different id is reported as [`G3Error::InvalidId`]; no attempt is
    /// made to resynchronize.
    pub async fn issue<F>(&self, build: F) -> Result<Response>
    where
        F: FnOnce(u32) -> Request,
    {
        let mut exchange_guard = ExchangeGuard {
            connection: &self.connection,
            link: self.connection.lock().await,
            settled: true,
        };
        exchange_guard.link.transport()?;

        let id = exchange_guard.link.next_id();
        let request = build(id);
        let wire = encode_request(&request)?;
        tracing::debug!("Sending: {}", wire);

        exchange_guard.settled = false;
        let result = exchange(exchange_guard.link.transport()?, wire).await;
        let text = match result {
            Ok(text) => text,
            Err(G3Error::ConnectionClosed) => {
                // Dropping the unsettled guard tears the transport down
                return Err(G3Error::ConnectionClosed);
            }
            Err(e) => {
                exchange_guard.settled = true;
                return Err(e);
            }
        };
        exchange_guard.settled = true;
        drop(exchange_guard);

        tracing::debug!("Received: {}", text);
        let response = decode_response(&text)?;

        if !response.matches(request.id) {
            tracing::warn!(
                "Response to {} has id {:?}, expected {}",
                request.path,
                response.id,
                request.id
            );
            return Err(G3Error::InvalidId {
                expected: request.id,
                actual: response.id,
                response: response.raw,
            });
        }

        Ok(response)
    }
}

/// Holds the connection lock for one exchange
///
/// If the exchange is dropped between send and receive the reply is still
/// on the wire, so the transport can no longer be trusted and is torn down.
struct ExchangeGuard<'a> {
    connection: &'a Connection,
    link: MutexGuard<'a, Link>,
    settled: bool,
}

impl Drop for ExchangeGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.connection.mark_closed(&mut self.link);
        }
    }
}

async fn exchange(transport: &mut dyn Transport, wire: String) -> Result<String> {
    transport.send(wire).await?;
    transport.recv().await
}
