use crate::config::DiscoveryConfig;
use crate::error::{G3Error, Result};
use crate::transport::url_host;
use async_trait::async_trait;
use mdns_sd::{ServiceDaemon, ServiceEvent};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// One event reported by a service browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Announcement {
    /// A service instance was resolved to a host and its addresses
    Resolved {
        instance: String,
        hostname: String,
        addresses: Vec<IpAddr>,
    },
    /// A previously announced instance went away
    Removed { instance: String },
}

/// Local-network service discovery facility
pub trait ServiceBrowser: Send + Sync {
    /// Start listening for announcements of `service_type`
    fn browse(&self, service_type: &str) -> Result<Box<dyn BrowseSession>>;
}

/// A running browse started by [`ServiceBrowser::browse`]
pub trait BrowseSession: Send {
    /// Drain announcements received so far without blocking
    fn poll(&mut self) -> Vec<Announcement>;

    /// Release the listener and any sockets behind it
    fn stop(&mut self);
}

/// Quick reachability check of the access point address
#[async_trait]
pub trait AccessPointCheck: Send + Sync {
    async fn is_reachable(&self, address: &str, timeout: Duration) -> bool;
}

/// Access point check that issues a plain HTTP GET
pub struct HttpCheck {
    client: reqwest::Client,
}

impl HttpCheck {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpCheck {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccessPointCheck for HttpCheck {
    async fn is_reachable(&self, address: &str, timeout: Duration) -> bool {
        let url = format!("http://{}", url_host(address));
        match self.client.get(&url).timeout(timeout).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!("Access point check of {} failed: {}", url, e);
                false
            }
        }
    }
}

/// Browser backed by the `mdns-sd` daemon
#[derive(Debug, Default, Clone, Copy)]
pub struct MdnsBrowser;

impl ServiceBrowser for MdnsBrowser {
    fn browse(&self, service_type: &str) -> Result<Box<dyn BrowseSession>> {
        let daemon = ServiceDaemon::new().map_err(|e| G3Error::Discovery(e.to_string()))?;
        let receiver = match daemon.browse(service_type) {
            Ok(receiver) => receiver,
            Err(e) => {
                let _ = daemon.shutdown();
                return Err(G3Error::Discovery(e.to_string()));
            }
        };

        Ok(Box::new(MdnsSession {
            daemon,
            receiver,
            service_type: service_type.to_string(),
            stopped: false,
        }))
    }
}

struct MdnsSession {
    daemon: ServiceDaemon,
    receiver: mdns_sd::Receiver<ServiceEvent>,
    service_type: String,
    stopped: bool,
}

impl BrowseSession for MdnsSession {
    fn poll(&mut self) -> Vec<Announcement> {
        let mut announcements = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            match event {
                ServiceEvent::ServiceResolved(info) => {
                    announcements.push(Announcement::Resolved {
                        instance: info.get_fullname().to_string(),
                        hostname: info.get_hostname().to_string(),
                        addresses: info.get_addresses().iter().copied().collect(),
                    });
                }
                ServiceEvent::ServiceRemoved(_, fullname) => {
                    announcements.push(Announcement::Removed { instance: fullname });
                }
                other => tracing::trace!("mDNS event: {:?}", other),
            }
        }
        announcements
    }

    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        if let Err(e) = self.daemon.stop_browse(&self.service_type) {
            tracing::debug!("Failed to stop mDNS browse: {}", e);
        }
        if let Err(e) = self.daemon.shutdown() {
            tracing::debug!("Failed to shut down mDNS daemon: {}", e);
        }
    }
}

/// Stops the browse session on every exit path
struct SessionGuard(Box<dyn BrowseSession>);

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.0.stop();
    }
}

/// Addresses collected during a single discovery call
#[derive(Debug, Default)]
struct DiscoveryListener {
    hostnames: Vec<String>,
    ipv4: Vec<Ipv4Addr>,
    ipv6: Vec<Ipv6Addr>,
    instances: HashMap<String, Vec<IpAddr>>,
}

impl DiscoveryListener {
    fn handle(&mut self, announcement: Announcement) {
        match announcement {
            Announcement::Resolved {
                instance,
                hostname,
                addresses,
            } => {
                let hostname = hostname.strip_suffix('.').unwrap_or(&hostname).to_string();
                tracing::debug!("Resolved {} at {} {:?}", instance, hostname, addresses);
                if !hostname.is_empty() && !self.hostnames.contains(&hostname) {
                    self.hostnames.push(hostname);
                }
                for addr in &addresses {
                    match addr {
                        IpAddr::V4(v4) if !self.ipv4.contains(v4) => self.ipv4.push(*v4),
                        IpAddr::V6(v6) if !self.ipv6.contains(v6) => self.ipv6.push(*v6),
                        _ => {}
                    }
                }
                self.instances.insert(instance, addresses);
            }
            Announcement::Removed { instance } => {
                tracing::debug!("Service {} removed", instance);
                if let Some(addresses) = self.instances.remove(&instance) {
                    self.ipv4.retain(|a| !addresses.contains(&IpAddr::V4(*a)));
                    self.ipv6.retain(|a| !addresses.contains(&IpAddr::V6(*a)));
                }
            }
        }
    }

    fn has_candidates(&self) -> bool {
        !self.hostnames.is_empty() || !self.ipv4.is_empty()
    }

    /// Last hostname seen, else last IPv4 address seen
    fn selection(&self) -> Option<String> {
        self.hostnames
            .last()
            .cloned()
            .or_else(|| self.ipv4.last().map(Ipv4Addr::to_string))
    }
}

/// Finds the glasses on the local network
///
/// The access point address is tried first since mDNS does not propagate on
/// the glasses' own Wi-Fi. Otherwise an mDNS scan runs until something is
/// found or the scan timeout passes.
///
/// # Example
///
/// ```no_run
/// use tobii_g3::Resolver;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let resolver = Resolver::new(Default::default())?;
///     match resolver.resolve().await? {
///         Some(address) => println!("Glasses at {}", address),
///         None => println!("No glasses found"),
///     }
///     Ok(())
/// }
/// ```
pub struct Resolver {
    config: DiscoveryConfig,
    check: Box<dyn AccessPointCheck>,
    browser: Box<dyn ServiceBrowser>,
}

impl Resolver {
    /// Resolver using HTTP for the access point check and `mdns-sd` for the scan
    pub fn new(config: DiscoveryConfig) -> Result<Self> {
        Self::with_backends(config, Box::new(HttpCheck::new()), Box::new(MdnsBrowser))
    }

    /// Resolver with caller-supplied access point check and browser
    pub fn with_backends(
        config: DiscoveryConfig,
        check: Box<dyn AccessPointCheck>,
        browser: Box<dyn ServiceBrowser>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            check,
            browser,
        })
    }

    /// Find the glasses' address
    ///
    /// `Ok(None)` means nothing answered within the scan timeout. Errors are
    /// reserved for a discovery backend that could not start.
    pub async fn resolve(&self) -> Result<Option<String>> {
        let ap = &self.config.access_point;
        if self.check.is_reachable(ap, self.config.ap_timeout).await {
            tracing::info!("Glasses reachable on access point address {}", ap);
            return Ok(Some(ap.clone()));
        }

        let found = self.scan().await?;
        match &found {
            Some(address) => tracing::info!("Discovered glasses at {}", address),
            None => tracing::info!(
                "No glasses announced {} within {:?}",
                self.config.service_type,
                self.config.scan_timeout
            ),
        }
        Ok(found)
    }

    async fn scan(&self) -> Result<Option<String>> {
        tracing::debug!("Browsing for {}", self.config.service_type);
        let mut session = SessionGuard(self.browser.browse(&self.config.service_type)?);
        let mut listener = DiscoveryListener::default();
        let deadline = Instant::now() + self.config.scan_timeout;

        loop {
            for announcement in session.0.poll() {
                listener.handle(announcement);
            }
            if listener.has_candidates() || Instant::now() >= deadline {
                break;
            }
            sleep(self.config.poll_interval).await;
        }

        Ok(listener.selection())
    }
}
