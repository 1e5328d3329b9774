//! In-memory stand-ins for the transport and discovery backends.

use crate::discovery::{AccessPointCheck, Announcement, BrowseSession, ServiceBrowser};
use crate::error::{G3Error, Result};
use crate::transport::Transport;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

type Responder = Box<dyn FnMut(&Value) -> Option<String> + Send>;

#[derive(Default)]
struct MockState {
    sent: Mutex<Vec<Value>>,
    log: Mutex<Vec<String>>,
    closes: AtomicUsize,
}

/// Inspects what a [`MockTransport`] saw after it has been handed off
#[derive(Clone)]
pub(crate) struct MockHandle(Arc<MockState>);

impl MockHandle {
    pub(crate) fn sent(&self) -> Vec<Value> {
        self.0.sent.lock().unwrap().clone()
    }

    pub(crate) fn log(&self) -> Vec<String> {
        self.0.log.lock().unwrap().clone()
    }

    pub(crate) fn close_count(&self) -> usize {
        self.0.closes.load(Ordering::SeqCst)
    }
}

/// Transport answering each request through a responder closure
///
/// A responder returning `None` makes the next receive see a closed peer.
pub(crate) struct MockTransport {
    responder: Responder,
    queued: VecDeque<String>,
    recv_delay: Duration,
    send_closed: bool,
    state: Arc<MockState>,
}

impl MockTransport {
    pub(crate) fn new<F>(responder: F) -> (Self, MockHandle)
    where
        F: FnMut(&Value) -> Option<String> + Send + 'static,
    {
        let state = Arc::new(MockState::default());
        let transport = Self {
            responder: Box::new(responder),
            queued: VecDeque::new(),
            recv_delay: Duration::ZERO,
            send_closed: false,
            state: state.clone(),
        };
        (transport, MockHandle(state))
    }

    /// Answer every request with its own id and the given body
    pub(crate) fn echo(body: Value) -> (Self, MockHandle) {
        Self::new(move |req| Some(json!({"id": req["id"], "body": body}).to_string()))
    }

    /// Transport whose sends fail as if the peer had gone away
    pub(crate) fn closed() -> (Self, MockHandle) {
        let (mut transport, handle) = Self::new(|_| None);
        transport.send_closed = true;
        (transport, handle)
    }

    pub(crate) fn with_recv_delay(mut self, delay: Duration) -> Self {
        self.recv_delay = delay;
        self
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, text: String) -> Result<()> {
        if self.send_closed {
            return Err(G3Error::ConnectionClosed);
        }
        let request: Value = serde_json::from_str(&text)?;
        self.state
            .log
            .lock()
            .unwrap()
            .push(format!("send {}", request["id"]));
        if let Some(reply) = (self.responder)(&request) {
            self.queued.push_back(reply);
        }
        self.state.sent.lock().unwrap().push(request);
        Ok(())
    }

    async fn recv(&mut self) -> Result<String> {
        if !self.recv_delay.is_zero() {
            tokio::time::sleep(self.recv_delay).await;
        }
        let reply = self.queued.pop_front().ok_or(G3Error::ConnectionClosed)?;
        let id = serde_json::from_str::<Value>(&reply)
            .map(|v| v["id"].to_string())
            .unwrap_or_default();
        self.state.log.lock().unwrap().push(format!("recv {}", id));
        Ok(reply)
    }

    async fn close(&mut self) -> Result<()> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn subprotocol(&self) -> Option<&str> {
        Some("g3api")
    }
}

/// Access point with a fixed answer
pub(crate) struct MockAccessPoint {
    reachable: bool,
}

impl MockAccessPoint {
    pub(crate) fn reachable() -> Self {
        Self { reachable: true }
    }

    pub(crate) fn unreachable() -> Self {
        Self { reachable: false }
    }
}

#[async_trait]
impl AccessPointCheck for MockAccessPoint {
    async fn is_reachable(&self, _address: &str, _timeout: Duration) -> bool {
        self.reachable
    }
}

#[derive(Default)]
struct BrowserStats {
    browses: AtomicUsize,
    stopped: AtomicBool,
}

#[derive(Clone)]
pub(crate) struct BrowserStatsHandle(Arc<BrowserStats>);

impl BrowserStatsHandle {
    pub(crate) fn browse_count(&self) -> usize {
        self.0.browses.load(Ordering::SeqCst)
    }

    pub(crate) fn stopped(&self) -> bool {
        self.0.stopped.load(Ordering::SeqCst)
    }
}

/// Browser replaying announcements at fixed offsets from the start of a browse
pub(crate) struct MockBrowser {
    script: Vec<(Duration, Announcement)>,
    fail: bool,
    stats: Arc<BrowserStats>,
}

impl MockBrowser {
    pub(crate) fn new(script: Vec<(Duration, Announcement)>) -> Self {
        Self {
            script,
            fail: false,
            stats: Arc::new(BrowserStats::default()),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(vec![])
        }
    }

    pub(crate) fn stats(&self) -> BrowserStatsHandle {
        BrowserStatsHandle(self.stats.clone())
    }
}

impl ServiceBrowser for MockBrowser {
    fn browse(&self, _service_type: &str) -> Result<Box<dyn BrowseSession>> {
        if self.fail {
            return Err(G3Error::Discovery("no multicast interface".to_string()));
        }
        self.stats.browses.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            started: Instant::now(),
            pending: self.script.iter().cloned().collect(),
            stats: self.stats.clone(),
        }))
    }
}

struct MockSession {
    started: Instant,
    pending: VecDeque<(Duration, Announcement)>,
    stats: Arc<BrowserStats>,
}

impl BrowseSession for MockSession {
    fn poll(&mut self) -> Vec<Announcement> {
        let elapsed = self.started.elapsed();
        let mut due = Vec::new();
        while let Some((offset, _)) = self.pending.front() {
            if *offset > elapsed {
                break;
            }
            if let Some((_, announcement)) = self.pending.pop_front() {
                due.push(announcement);
            }
        }
        due
    }

    fn stop(&mut self) {
        self.stats.stopped.store(true, Ordering::SeqCst);
    }
}
