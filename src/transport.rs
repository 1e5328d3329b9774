use crate::error::{G3Error, Result};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::borrow::Cow;
use std::net::Ipv6Addr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Sub-protocol token the glasses expect during the WebSocket handshake
pub const WS_SUBPROTOCOL: &str = "g3api";

const SUBPROTOCOL_HEADER: &str = "Sec-WebSocket-Protocol";

/// Host part of a URL for an address; IPv6 literals need brackets
pub(crate) fn url_host(address: &str) -> Cow<'_, str> {
    match address.parse::<Ipv6Addr>() {
        Ok(_) => Cow::Owned(format!("[{}]", address)),
        Err(_) => Cow::Borrowed(address),
    }
}

/// A bidirectional text-message channel to the glasses
///
/// Only one exchange is ever in progress on a transport; the connection
/// serializes callers before they reach it.
#[async_trait]
pub trait Transport: Send {
    /// Send one text message
    async fn send(&mut self, text: String) -> Result<()>;

    /// Wait for the next text message
    ///
    /// Returns [`G3Error::ConnectionClosed`] once the peer has gone away.
    async fn recv(&mut self) -> Result<String>;

    /// Close the transport
    async fn close(&mut self) -> Result<()>;

    /// Sub-protocol negotiated during setup, if any
    fn subprotocol(&self) -> Option<&str> {
        None
    }
}

/// WebSocket transport to `ws://{address}/websocket/`
pub struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    subprotocol: Option<String>,
}

impl WebSocketTransport {
    /// Open a WebSocket to the given URL, offering the `g3api` sub-protocol
    ///
    /// A handshake that does not complete within `connect_timeout` is dropped
    /// and reported as [`G3Error::Timeout`].
    pub async fn connect(url: &str, connect_timeout: Duration) -> Result<Self> {
        tracing::info!("Connecting to {}", url);

        let mut request = url.into_client_request()?;
        request
            .headers_mut()
            .insert(SUBPROTOCOL_HEADER, HeaderValue::from_static(WS_SUBPROTOCOL));

        let (stream, response) = match timeout(connect_timeout, connect_async(request)).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!("Connecting to {} timed out after {:?}", url, connect_timeout);
                return Err(G3Error::Timeout("connecting to glasses websocket"));
            }
        };

        let subprotocol = response
            .headers()
            .get(SUBPROTOCOL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        tracing::debug!("Negotiated sub-protocol: {:?}", subprotocol);

        Ok(Self {
            stream,
            subprotocol,
        })
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, text: String) -> Result<()> {
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(closed_or_ws)
    }

    async fn recv(&mut self) -> Result<String> {
        while let Some(msg) = self.stream.next().await {
            match msg.map_err(closed_or_ws)? {
                Message::Text(text) => return Ok(text),
                Message::Binary(data) => {
                    return String::from_utf8(data)
                        .map_err(|e| G3Error::Malformed(format!("binary frame: {}", e)));
                }
                Message::Close(frame) => {
                    tracing::info!("WebSocket closed by glasses: {:?}", frame);
                    return Err(G3Error::ConnectionClosed);
                }
                // Pings are answered by tungstenite on the next write
                _ => {}
            }
        }
        Err(G3Error::ConnectionClosed)
    }

    async fn close(&mut self) -> Result<()> {
        match self.stream.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn subprotocol(&self) -> Option<&str> {
        self.subprotocol.as_deref()
    }
}

fn closed_or_ws(e: WsError) -> G3Error {
    match e {
        WsError::ConnectionClosed | WsError::AlreadyClosed | WsError::Io(_) => {
            G3Error::ConnectionClosed
        }
        WsError::Protocol(ref p) => {
            tracing::warn!("WebSocket protocol error: {}", p);
            G3Error::ConnectionClosed
        }
        other => G3Error::WebSocket(other),
    }
}
