//! Command dispatch
//!
//! Resolves a [`CommandRequest`] to one or all registered sessions and invokes
//! `execute` on each. A failed execution never touches the registry; only a
//! transport disconnect removes a device.

use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::devices::SharedDeviceRegistry;
use crate::transport::DeviceSession;
use crate::{Error, Result};

/// A command routed to one device or broadcast to all of them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl CommandRequest {
    /// Broadcast request with no parameters
    #[must_use]
    pub fn broadcast(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: None,
            params: None,
        }
    }

    /// Request addressed to a single device
    #[must_use]
    pub fn targeted(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: Some(target.into()),
            params: None,
        }
    }

    /// Attach parameters
    #[must_use]
    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.params = Some(params);
        self
    }
}

/// Per-target result of a dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommandOutcome {
    /// The session executed the command
    Executed { device_id: String },
    /// The session reported a failure
    Failed { device_id: String, reason: String },
    /// The named target is not registered
    TargetNotFound { target: String },
}

impl CommandOutcome {
    /// Whether the command reached and ran on its device
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Executed { .. })
    }
}

type Targets = Vec<(String, Arc<dyn DeviceSession>)>;

/// Routes command requests to registered device sessions
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: SharedDeviceRegistry,
}

impl Dispatcher {
    /// Create a dispatcher reading from the given registry
    #[must_use]
    pub const fn new(registry: SharedDeviceRegistry) -> Self {
        Self { registry }
    }

    /// Dispatch a request and wait for every target's outcome
    ///
    /// A targeted request for an unknown device yields a single
    /// `TargetNotFound`. A broadcast runs against the registry snapshot taken
    /// here, executions proceed concurrently.
    pub async fn dispatch(&self, request: CommandRequest) -> Vec<CommandOutcome> {
        let Some(targets) = self.resolve(&request).await else {
            return vec![CommandOutcome::TargetNotFound {
                target: request.target.unwrap_or_default(),
            }];
        };

        execute_all(targets, &request)
            .await
            .into_iter()
            .map(|(device_id, result)| match result {
                Ok(()) => CommandOutcome::Executed { device_id },
                Err(e) => CommandOutcome::Failed {
                    device_id,
                    reason: e.to_string(),
                },
            })
            .collect()
    }

    /// Resolve targets now and run the executions in the background
    ///
    /// Returns the number of sessions the command was handed to. Outcomes
    /// are only logged.
    ///
    /// # Errors
    ///
    /// Returns `TargetNotFound` if a named target is not registered
    pub async fn submit(&self, request: CommandRequest) -> Result<usize> {
        let Some(targets) = self.resolve(&request).await else {
            return Err(Error::TargetNotFound(request.target.unwrap_or_default()));
        };
        let count = targets.len();

        if count == 0 {
            tracing::debug!(command = %request.name, "no devices registered, nothing to dispatch");
            return Ok(0);
        }

        tokio::spawn(async move {
            let command = request.name.as_str();
            for (device_id, result) in execute_all(targets, &request).await {
                match result {
                    Ok(()) => tracing::debug!(device_id = %device_id, command, "command executed"),
                    Err(e) => {
                        tracing::warn!(device_id = %device_id, command, error = %e, "command failed");
                    }
                }
            }
        });

        Ok(count)
    }

    /// Sessions a request addresses; `None` if its named target is unknown
    async fn resolve(&self, request: &CommandRequest) -> Option<Targets> {
        match &request.target {
            Some(target) => self
                .registry
                .get(target)
                .await
                .map(|session| vec![(target.clone(), session)]),
            None => Some(self.registry.all().await),
        }
    }
}

async fn execute_all(targets: Targets, request: &CommandRequest) -> Vec<(String, Result<()>)> {
    let params = request.params.as_ref();
    let runs = targets.into_iter().map(|(device_id, session)| async move {
        let result = session.execute(&request.name, params).await;
        (device_id, result)
    });
    join_all(runs).await
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::devices::DeviceRegistry;

    type Calls = Arc<Mutex<Vec<(String, Option<serde_json::Value>)>>>;

    struct RecordingSession {
        id: String,
        fail: bool,
        calls: Calls,
    }

    impl RecordingSession {
        fn new(id: &str, fail: bool) -> (Arc<Self>, Calls) {
            let calls = Calls::default();
            let session = Arc::new(Self {
                id: id.to_string(),
                fail,
                calls: Arc::clone(&calls),
            });
            (session, calls)
        }
    }

    #[async_trait]
    impl DeviceSession for RecordingSession {
        fn device_id(&self) -> &str {
            &self.id
        }

        async fn execute(&self, command: &str, params: Option<&serde_json::Value>) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push((command.to_string(), params.cloned()));
            if self.fail {
                Err(Error::Execution("write rejected".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn missing_target_yields_single_not_found() {
        let registry = DeviceRegistry::shared();
        let (s1, calls) = RecordingSession::new("AA:BB", false);
        registry.insert("AA:BB", s1).await;

        let dispatcher = Dispatcher::new(registry);
        let outcomes = dispatcher
            .dispatch(CommandRequest::targeted("feed", "ZZ:ZZ"))
            .await;

        assert_eq!(
            outcomes,
            vec![CommandOutcome::TargetNotFound {
                target: "ZZ:ZZ".to_string()
            }]
        );
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn targeted_dispatch_hits_only_target() {
        let registry = DeviceRegistry::shared();
        let (s1, calls1) = RecordingSession::new("AA:BB", false);
        let (s2, calls2) = RecordingSession::new("CC:DD", false);
        registry.insert("AA:BB", s1).await;
        registry.insert("CC:DD", s2).await;

        let dispatcher = Dispatcher::new(registry);
        let outcomes = dispatcher
            .dispatch(CommandRequest::targeted("feed", "AA:BB"))
            .await;

        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_success());
        assert_eq!(*calls1.lock().unwrap(), vec![("feed".to_string(), None)]);
        assert!(calls2.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn broadcast_executes_once_per_device() {
        let registry = DeviceRegistry::shared();
        let (s1, calls1) = RecordingSession::new("AA:BB", false);
        let (s2, calls2) = RecordingSession::new("CC:DD", false);
        registry.insert("AA:BB", s1).await;
        registry.insert("CC:DD", s2).await;

        let dispatcher = Dispatcher::new(registry);
        let request = CommandRequest::broadcast("antenna").with_params(json!({"red": 1}));
        let outcomes = dispatcher.dispatch(request).await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(CommandOutcome::is_success));
        assert_eq!(calls1.lock().unwrap().len(), 1);
        assert_eq!(
            calls2.lock().unwrap()[0],
            ("antenna".to_string(), Some(json!({"red": 1})))
        );
    }

    #[tokio::test]
    async fn broadcast_on_empty_registry_does_nothing() {
        let dispatcher = Dispatcher::new(DeviceRegistry::shared());
        assert!(dispatcher.dispatch(CommandRequest::broadcast("wiggle")).await.is_empty());
        assert_eq!(
            dispatcher.submit(CommandRequest::broadcast("wiggle")).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_others() {
        let registry = DeviceRegistry::shared();
        let (bad, _) = RecordingSession::new("AA:BB", true);
        let (good, good_calls) = RecordingSession::new("CC:DD", false);
        registry.insert("AA:BB", bad).await;
        registry.insert("CC:DD", good).await;

        let dispatcher = Dispatcher::new(Arc::clone(&registry));
        let outcomes = dispatcher.dispatch(CommandRequest::broadcast("debug")).await;

        let failed: Vec<_> = outcomes.iter().filter(|o| !o.is_success()).collect();
        assert_eq!(failed.len(), 1);
        assert!(matches!(
            failed[0],
            CommandOutcome::Failed { device_id, .. } if device_id == "AA:BB"
        ));
        assert_eq!(good_calls.lock().unwrap().len(), 1);

        // failed executions leave the registry alone
        assert!(registry.contains("AA:BB").await);
    }

    #[tokio::test]
    async fn submit_reports_missing_target() {
        let dispatcher = Dispatcher::new(DeviceRegistry::shared());
        let result = dispatcher
            .submit(CommandRequest::targeted("feed", "ZZ:ZZ"))
            .await;
        assert!(matches!(result, Err(Error::TargetNotFound(t)) if t == "ZZ:ZZ"));
    }

    #[tokio::test]
    async fn submit_runs_in_background() {
        let registry = DeviceRegistry::shared();
        let (s1, calls) = RecordingSession::new("AA:BB", false);
        registry.insert("AA:BB", s1).await;

        let dispatcher = Dispatcher::new(registry);
        let count = dispatcher
            .submit(CommandRequest::broadcast("lcd").with_params(json!({"state": true})))
            .await
            .unwrap();
        assert_eq!(count, 1);

        for _ in 0..100 {
            if !calls.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    /// Session that registers another device while it executes
    struct LateJoinerSession {
        registry: SharedDeviceRegistry,
        late: Arc<dyn DeviceSession>,
    }

    #[async_trait]
    impl DeviceSession for LateJoinerSession {
        fn device_id(&self) -> &str {
            "AA:BB"
        }

        async fn execute(&self, _: &str, _: Option<&serde_json::Value>) -> Result<()> {
            self.registry.insert("CC:DD", Arc::clone(&self.late)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn broadcast_excludes_devices_added_after_snapshot() {
        let registry = DeviceRegistry::shared();
        let (late, late_calls) = RecordingSession::new("CC:DD", false);
        let joiner = Arc::new(LateJoinerSession {
            registry: Arc::clone(&registry),
            late,
        });
        registry.insert("AA:BB", joiner).await;

        let dispatcher = Dispatcher::new(Arc::clone(&registry));
        let outcomes = dispatcher.dispatch(CommandRequest::broadcast("debug")).await;

        assert_eq!(
            outcomes,
            vec![CommandOutcome::Executed {
                device_id: "AA:BB".to_string()
            }]
        );
        assert!(registry.contains("CC:DD").await);
        assert!(late_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn submit_counts_only_the_snapshot() {
        let registry = DeviceRegistry::shared();
        let (late, late_calls) = RecordingSession::new("CC:DD", false);
        let joiner = Arc::new(LateJoinerSession {
            registry: Arc::clone(&registry),
            late,
        });
        registry.insert("AA:BB", joiner).await;

        let dispatcher = Dispatcher::new(Arc::clone(&registry));
        let count = dispatcher
            .submit(CommandRequest::broadcast("debug"))
            .await
            .unwrap();
        assert_eq!(count, 1);

        for _ in 0..100 {
            if registry.contains("CC:DD").await {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert!(registry.contains("CC:DD").await);
        assert!(late_calls.lock().unwrap().is_empty());
    }
}
