//! Configuration types for the Glasses 3 client
//!
//! Timeouts for connecting, probing and scanning. Everything has a default
//! matching what the glasses need on a typical local network.

use crate::error::{G3Error, Result};
use std::time::Duration;

/// mDNS service type announced by the glasses
pub const SERVICE_TYPE: &str = "_tobii-g3api._tcp.local.";

/// Address of the glasses on their own Wi-Fi access point
pub const DEFAULT_AP_ADDRESS: &str = "192.168.75.51";

/// Configuration for address discovery
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Address checked over HTTP before scanning
    /// Default: 192.168.75.51
    pub access_point: String,

    /// Timeout for the access point check
    /// Default: 250 milliseconds
    pub ap_timeout: Duration,

    /// Total time spent waiting for mDNS announcements
    /// Default: 10 seconds
    pub scan_timeout: Duration,

    /// Sleep between checks for new announcements
    /// Default: 100 milliseconds
    pub poll_interval: Duration,

    /// Service type to browse for
    /// Default: `_tobii-g3api._tcp.local.`
    pub service_type: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            access_point: DEFAULT_AP_ADDRESS.to_string(),
            ap_timeout: Duration::from_millis(250),
            scan_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(100),
            service_type: SERVICE_TYPE.to_string(),
        }
    }
}

impl DiscoveryConfig {
    /// Check the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(G3Error::InvalidArgument(
                "poll_interval must be greater than zero".to_string(),
            ));
        }
        if self.scan_timeout < self.poll_interval {
            return Err(G3Error::InvalidArgument(
                "scan_timeout must not be shorter than poll_interval".to_string(),
            ));
        }
        if !self.service_type.ends_with(".local.") {
            return Err(G3Error::InvalidArgument(format!(
                "service type {} is not a .local. domain",
                self.service_type
            )));
        }
        Ok(())
    }
}

/// Configuration for [`G3Client`](crate::G3Client)
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Bound on the WebSocket handshake
    /// Default: 5 seconds
    pub connect_timeout: Duration,

    /// Timeout for HTTP downloads of recording files
    /// Default: 500 milliseconds
    pub http_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            http_timeout: Duration::from_millis(500),
        }
    }
}
