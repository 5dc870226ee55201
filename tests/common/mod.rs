//! Shared test utilities
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use furby_bridge::transport::ServiceInfo;
use furby_bridge::{DeviceSession, Error, Result, Transport, TransportEvent};

/// Recorded `(command, params)` invocations
pub type Calls = Arc<Mutex<Vec<(String, Option<serde_json::Value>)>>>;

/// Session that records every command it executes
pub struct MockSession {
    id: String,
    calls: Calls,
}

impl MockSession {
    /// Create a session and return a handle to its call log
    #[must_use]
    pub fn new(id: &str) -> (Arc<Self>, Calls) {
        let calls = Calls::default();
        let session = Arc::new(Self {
            id: id.to_string(),
            calls: Arc::clone(&calls),
        });
        (session, calls)
    }
}

#[async_trait]
impl DeviceSession for MockSession {
    fn device_id(&self) -> &str {
        &self.id
    }

    async fn execute(&self, command: &str, params: Option<&serde_json::Value>) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((command.to_string(), params.cloned()));
        Ok(())
    }
}

/// Transport fed from a channel, handing out `MockSession`s on connect
pub struct MockTransport {
    events: Mutex<Option<mpsc::Receiver<TransportEvent>>>,
    pub scans: Mutex<Vec<&'static str>>,
    pub sessions: Mutex<Vec<(String, Calls)>>,
    pub unreachable: HashSet<String>,
}

impl MockTransport {
    /// Create a transport and the sender that drives its event stream
    #[must_use]
    pub fn new(unreachable: &[&str]) -> (Arc<Self>, mpsc::Sender<TransportEvent>) {
        let (tx, rx) = mpsc::channel(16);
        let transport = Arc::new(Self {
            events: Mutex::new(Some(rx)),
            scans: Mutex::new(Vec::new()),
            sessions: Mutex::new(Vec::new()),
            unreachable: unreachable.iter().map(ToString::to_string).collect(),
        });
        (transport, tx)
    }

    /// Call log of the most recent session opened for `device_id`
    #[must_use]
    pub fn calls_for(&self, device_id: &str) -> Option<Calls> {
        self.sessions
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(id, _)| id == device_id)
            .map(|(_, calls)| Arc::clone(calls))
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn events(&self) -> Result<BoxStream<'static, TransportEvent>> {
        let rx = self
            .events
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| Error::Discovery("events already taken".to_string()))?;
        Ok(ReceiverStream::new(rx).boxed())
    }

    async fn start_scan(&self) -> Result<()> {
        self.scans.lock().unwrap().push("start");
        Ok(())
    }

    async fn stop_scan(&self) -> Result<()> {
        self.scans.lock().unwrap().push("stop");
        Ok(())
    }

    async fn connect(&self, device_id: &str) -> Result<Arc<dyn DeviceSession>> {
        if self.unreachable.contains(device_id) {
            return Err(Error::Connection(format!("{device_id} out of range")));
        }
        let (session, calls) = MockSession::new(device_id);
        let session: Arc<dyn DeviceSession> = session;
        self.sessions
            .lock()
            .unwrap()
            .push((device_id.to_string(), calls));
        Ok(session)
    }

    async fn introspect(&self, _device_id: &str) -> Result<Vec<ServiceInfo>> {
        Ok(Vec::new())
    }
}

/// Poll `check` until it holds or a second passes
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}

/// Async counterpart of [`eventually`]
pub async fn eventually_async<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check().await
}
