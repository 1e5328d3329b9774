//! Rust client for Tobii Pro Glasses 3
//!
//! This library provides an async API for finding a pair of Glasses 3 on the
//! local network and driving them over their WebSocket API. It supports:
//!
//! - Discovery via the glasses' access point address or mDNS
//! - A single persistent WebSocket connection (`g3api` sub-protocol)
//! - Property reads and writes, action calls and signal subscriptions
//! - Recorder, calibration, settings and Wi-Fi commands
//! - Download of recorded gaze, event and IMU data over HTTP
//!
//! # Quick Start
//!
//! ```no_run
//! use tobii_g3::G3Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let Some(address) = G3Client::discover().await? else {
//!         println!("No glasses found");
//!         return Ok(());
//!     };
//!
//!     let client = G3Client::new(address);
//!     client.connect().await?;
//!
//!     println!("Battery: {}", client.battery_level().await?);
//!     client.set_folder_name("session 1").await?;
//!     client.start_recording().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **Discovery**: access point check, then an mDNS scan for `_tobii-g3api._tcp`
//! - **Connection**: ownership of the one WebSocket to the glasses
//! - **Correlation**: one request in flight at a time, matched by id
//! - **Protocol**: JSON envelopes and path sigils
//! - **Client**: the four primitive operations and the named commands built on them
//!
//! Every failure is a [`G3Error`]; use [`G3Error::kind`] to branch on the
//! kind of failure.

mod client;
mod commands;
mod config;
mod connection;
mod correlation;
mod discovery;
mod error;
mod livestream;
mod protocol;
mod recordings;
mod transport;

#[cfg(test)]
mod test_support;

// Public exports
pub use client::G3Client;
pub use commands::validate_folder_name;
pub use config::{ClientConfig, DiscoveryConfig, DEFAULT_AP_ADDRESS, SERVICE_TYPE};
pub use connection::Connection;
pub use correlation::CorrelationEngine;
pub use discovery::{
    AccessPointCheck, Announcement, BrowseSession, HttpCheck, MdnsBrowser, Resolver,
    ServiceBrowser,
};
pub use error::{ErrorKind, G3Error, Result};
pub use livestream::RTSP_PORT;
pub use protocol::{
    decode_response, encode_request, path_for, IdGenerator, Method, PathKind, Request, Response,
    ID_MODULUS,
};
pub use recordings::{parse_json_lines, RecordingStream};
pub use transport::{Transport, WebSocketTransport, WS_SUBPROTOCOL};
