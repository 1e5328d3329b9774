use crate::config::{ClientConfig, DiscoveryConfig};
use crate::connection::Connection;
use crate::correlation::CorrelationEngine;
use crate::discovery::Resolver;
use crate::error::{G3Error, Result};
use crate::protocol::{path_for, PathKind, Request};
use crate::transport::{url_host, Transport};
use serde_json::Value;

/// Client for a pair of Tobii Pro Glasses 3
///
/// The `G3Client` owns the WebSocket to the glasses and exposes the four
/// primitive operations of the API: reading and writing properties, invoking
/// actions and subscribing to signals. Calls made concurrently on one client
/// are serialized; each waits for the previous exchange to finish.
///
/// # Example
///
/// ```no_run
/// use tobii_g3::G3Client;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let address = G3Client::discover().await?.ok_or("no glasses found")?;
///     let client = G3Client::new(address);
///     client.connect().await?;
///
///     let level = client.get_property("system/battery", "level").await?;
///     println!("Battery: {}", level);
///
///     client.send_action("recorder", "start", vec![]).await?;
///     Ok(())
/// }
/// ```
pub struct G3Client {
    address: String,
    config: ClientConfig,
    engine: CorrelationEngine,
    http: reqwest::Client,
}

impl G3Client {
    /// Create a disconnected client for the glasses at `address`
    pub fn new(address: impl Into<String>) -> Self {
        Self::with_config(address, ClientConfig::default())
    }

    pub fn with_config(address: impl Into<String>, config: ClientConfig) -> Self {
        Self {
            address: address.into(),
            config,
            engine: CorrelationEngine::new(Connection::new()),
            http: reqwest::Client::new(),
        }
    }

    /// Locate the glasses using the default discovery settings
    pub async fn discover() -> Result<Option<String>> {
        Resolver::new(DiscoveryConfig::default())?.resolve().await
    }

    /// Hostname or IP literal of the glasses
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Point the client at different glasses, dropping any live connection
    pub async fn set_address(&mut self, address: impl Into<String>) {
        if self.is_connected() {
            self.disconnect().await;
        }
        self.address = address.into();
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/websocket/", url_host(&self.address))
    }

    pub fn http_url(&self) -> String {
        format!("http://{}", url_host(&self.address))
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Open the WebSocket, closing any connection that is already live
    pub async fn connect(&self) -> Result<()> {
        self.engine
            .connection()
            .connect(&self.address, self.config.connect_timeout)
            .await
    }

    /// Run the API over a caller-supplied transport instead of a WebSocket
    pub async fn connect_with(&self, transport: Box<dyn Transport>) {
        self.engine.connection().attach(transport).await
    }

    pub async fn disconnect(&self) {
        self.engine.connection().disconnect().await
    }

    pub fn is_connected(&self) -> bool {
        self.engine.connection().is_connected()
    }

    /// Sub-protocol negotiated for the live connection
    pub async fn subprotocol(&self) -> Option<String> {
        self.engine.connection().subprotocol().await
    }

    /// Read a property, e.g. `get_property("system/battery", "level")`
    ///
    /// The body is returned as sent by the glasses.
    pub async fn get_property(&self, object_path: &str, name: &str) -> Result<Value> {
        let path = path_for(PathKind::Property, object_path, name);
        let response = self.engine.issue(|id| Request::get(path, id)).await?;
        Ok(response.body)
    }

    /// Write a property
    ///
    /// A literal `false` body means the glasses rejected the value.
    pub async fn set_property(&self, object_path: &str, name: &str, value: Value) -> Result<Value> {
        let path = path_for(PathKind::Property, object_path, name);
        let detail = format!("rejected value {}", value);
        let response = self
            .engine
            .issue(|id| Request::post(path.clone(), id, value))
            .await?;

        if response.is_rejected() {
            return Err(G3Error::SemanticFailure { path, detail });
        }
        Ok(response.body)
    }

    /// Invoke an action with positional arguments
    pub async fn send_action(&self, object_path: &str, name: &str, args: Vec<Value>) -> Result<Value> {
        let path = path_for(PathKind::Action, object_path, name);
        let args = Value::Array(args);
        let detail = format!("rejected arguments {}", args);
        let response = self
            .engine
            .issue(|id| Request::post(path.clone(), id, args))
            .await?;

        if let Some(message) = response.error_message() {
            return Err(G3Error::SemanticFailure {
                path,
                detail: message,
            });
        }
        if response.is_rejected() {
            return Err(G3Error::SemanticFailure { path, detail });
        }
        Ok(response.body)
    }

    /// Subscribe to a signal; returns whatever the glasses answer with
    pub async fn subscribe_signal(&self, object_path: &str, name: &str) -> Result<Value> {
        let path = path_for(PathKind::Signal, object_path, name);
        let response = self
            .engine
            .issue(|id| Request::post(path, id, Value::Array(vec![])))
            .await?;
        Ok(response.body)
    }

    /// Read a property, falling back to `Value::Null` on any failure
    ///
    /// Failures are logged and otherwise dropped.
    pub async fn get_property_or_default(&self, object_path: &str, name: &str) -> Value {
        match self.get_property(object_path, name).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Reading {}.{} failed: {}", object_path, name, e);
                Value::Null
            }
        }
    }
}
