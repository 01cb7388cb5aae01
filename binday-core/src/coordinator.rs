//! Periodic refresh of collection data and the cache readers pull from.
//!
//! The cache slot is a `watch` channel holding an immutable
//! [`CoordinatorState`]. Every transition publishes a fresh state, so readers
//! either see the previous snapshot or the new one, never a mix.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::BindayConfig;
use crate::model::ResultSet;
use crate::normalize::normalize;
use crate::ports::{BindayError, CollectionPort, CommunicationError};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Result of the last successful refresh.
pub struct Snapshot {
    /// Normalized collection windows.
    pub result: ResultSet,
    /// When the data was fetched.
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Record of a refresh cycle that did not update the cache.
pub struct RefreshFailure {
    /// When the cycle failed.
    pub at: DateTime<Utc>,
    /// Rendered error.
    pub message: String,
}

#[derive(Debug, Clone, Default)]
/// Everything readers can observe about the cache.
pub struct CoordinatorState {
    /// Last successful snapshot, `None` until the first success.
    pub data: Option<Arc<Snapshot>>,
    /// Failure of the most recent cycle, cleared by the next success.
    pub last_failure: Option<RefreshFailure>,
}

struct Shared {
    port: Arc<dyn CollectionPort>,
    state: watch::Sender<Arc<CoordinatorState>>,
    // one pipeline at a time
    refresh_lock: Mutex<()>,
}

impl Shared {
    async fn refresh(&self) -> Result<(), CommunicationError> {
        let _running = self.refresh_lock.lock().await;
        let backend = self.port.name();
        debug!(backend, "fetching collection data");
        let started = Instant::now();

        match self.port.fetch().await {
            Ok(body) => {
                let result = normalize(&body);
                let snapshot = Arc::new(Snapshot {
                    result,
                    fetched_at: Utc::now(),
                });
                self.state.send_replace(Arc::new(CoordinatorState {
                    data: Some(snapshot),
                    last_failure: None,
                }));
                info!(
                    backend,
                    elapsed_ms = started.elapsed().as_millis(),
                    "collection data refreshed"
                );
                Ok(())
            }
            Err(err) => {
                warn!(
                    backend,
                    error = %err,
                    elapsed_ms = started.elapsed().as_millis(),
                    "refresh failed, keeping previous data"
                );
                let data = self.state.borrow().data.clone();
                self.state.send_replace(Arc::new(CoordinatorState {
                    data,
                    last_failure: Some(RefreshFailure {
                        at: Utc::now(),
                        message: err.to_string(),
                    }),
                }));
                Err(err)
            }
        }
    }
}

/// Handle to a running refresh loop for one property.
pub struct Coordinator {
    shared: Arc<Shared>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Coordinator {
    /// Validate the configuration, fetch once, and start the refresh timer.
    ///
    /// The port must serve the property named by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`BindayError::InvalidInput`] for a bad configuration or a port
    /// bound to another property, before any request is made, and
    /// [`BindayError::Communication`] when the first fetch fails.
    pub async fn initialize(
        config: &BindayConfig,
        port: Arc<dyn CollectionPort>,
    ) -> Result<Self, BindayError> {
        let property = config.validate()?;
        if *port.property() != property {
            return Err(BindayError::InvalidInput(format!(
                "port serves UPRN {} / USRN {}, configuration names UPRN {} / USRN {}",
                port.property().uprn,
                port.property().usrn,
                property.uprn,
                property.usrn
            )));
        }

        let (state, _) = watch::channel(Arc::new(CoordinatorState::default()));
        let shared = Arc::new(Shared {
            port,
            state,
            refresh_lock: Mutex::new(()),
        });

        shared.refresh().await?;

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(
            Arc::clone(&shared),
            config.update_interval(),
            cancel.clone(),
        ));
        info!(
            backend = shared.port.name(),
            interval_secs = config.update_interval_secs,
            "coordinator started"
        );

        Ok(Self {
            shared,
            cancel,
            task: Some(task),
        })
    }

    /// Last successfully fetched data, if any.
    #[must_use]
    pub fn current_result(&self) -> Option<Arc<Snapshot>> {
        self.shared.state.borrow().data.clone()
    }

    /// Failure recorded by the most recent cycle.
    #[must_use]
    pub fn last_failure(&self) -> Option<RefreshFailure> {
        self.shared.state.borrow().last_failure.clone()
    }

    /// Current cache state.
    #[must_use]
    pub fn state(&self) -> Arc<CoordinatorState> {
        Arc::clone(&self.shared.state.borrow())
    }

    /// Receiver notified whenever the cache state is replaced.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<CoordinatorState>> {
        self.shared.state.subscribe()
    }

    /// Run one fetch-and-normalize cycle now.
    ///
    /// # Errors
    ///
    /// Returns the [`CommunicationError`] of the failed fetch. The cache keeps
    /// its previous data in that case.
    pub async fn refresh(&self) -> Result<(), CommunicationError> {
        self.shared.refresh().await
    }

    /// Stop the timer and release the upstream connection.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && let Err(err) = task.await
        {
            warn!(error = %err, "refresh task ended abnormally");
        }
        info!(backend = self.shared.port.name(), "coordinator stopped");
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run(shared: Arc<Shared>, interval: Duration, cancel: CancellationToken) {
    let mut ticker = time::interval_at(time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(err) = shared.refresh().await {
                    debug!(error = %err, "scheduled refresh failed, retrying at next tick");
                }
            }
        }
    }
    debug!("refresh loop exited");
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::{Value, json};

    use super::*;
    use crate::model::{BinType, PropertyRef};

    struct ScriptedPort {
        property: PropertyRef,
        responses: std::sync::Mutex<VecDeque<Result<Value, CommunicationError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedPort {
        fn new(responses: Vec<Result<Value, CommunicationError>>) -> Arc<Self> {
            Self::for_property(PropertyRef::new("100062", "2100"), responses)
        }

        fn for_property(
            property: PropertyRef,
            responses: Vec<Result<Value, CommunicationError>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                property,
                responses: std::sync::Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CollectionPort for ScriptedPort {
        fn name(&self) -> &str {
            "scripted"
        }

        fn property(&self) -> &PropertyRef {
            &self.property
        }

        async fn fetch(&self) -> Result<Value, CommunicationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .expect("script lock")
                .pop_front()
                .unwrap_or(Err(CommunicationError::Status(503)))
        }
    }

    fn black_bin_body(date: &str) -> Value {
        json!({
            "dates": json!({"blackBinDay": [date]}).to_string(),
            "status": "{}",
        })
    }

    fn as_port(port: &Arc<ScriptedPort>) -> Arc<dyn CollectionPort> {
        Arc::<ScriptedPort>::clone(port)
    }

    fn config() -> BindayConfig {
        BindayConfig::new("100062", "2100")
    }

    #[tokio::test]
    async fn initialize_caches_first_result() {
        let port = ScriptedPort::new(vec![Ok(black_bin_body("2025-05-03"))]);
        let coordinator = Coordinator::initialize(&config(), as_port(&port))
            .await
            .expect("initialize");

        let snapshot = coordinator.current_result().expect("data after setup");
        assert_eq!(
            snapshot.result.window(BinType::Black).next_date.map(|date| date.to_string()),
            Some("2025-05-03".to_owned())
        );
        assert!(coordinator.last_failure().is_none());
        assert_eq!(port.calls(), 1);
        coordinator.shutdown().await;
    }

    #[tokio::test]
    async fn blank_reference_is_rejected_without_fetching() {
        let port = ScriptedPort::new(vec![Ok(black_bin_body("2025-05-03"))]);
        let result =
            Coordinator::initialize(&BindayConfig::new("", "X"), as_port(&port)).await;

        assert!(matches!(result, Err(BindayError::InvalidInput(_))));
        assert_eq!(port.calls(), 0);
    }

    #[tokio::test]
    async fn port_for_another_property_is_rejected_without_fetching() {
        let port = ScriptedPort::for_property(
            PropertyRef::new("999999", "2100"),
            vec![Ok(black_bin_body("2025-05-03"))],
        );
        let result = Coordinator::initialize(&config(), as_port(&port)).await;

        assert!(matches!(result, Err(BindayError::InvalidInput(_))));
        assert_eq!(port.calls(), 0);
    }

    #[tokio::test]
    async fn configured_references_are_compared_trimmed() {
        let port = ScriptedPort::new(vec![Ok(black_bin_body("2025-05-03"))]);
        let config = BindayConfig::new(" 100062 ", "2100 ");
        let coordinator = Coordinator::initialize(&config, as_port(&port))
            .await
            .expect("initialize");
        assert_eq!(port.calls(), 1);
        coordinator.shutdown().await;
    }

    #[tokio::test]
    async fn failed_first_fetch_fails_setup() {
        let port = ScriptedPort::new(vec![Err(CommunicationError::Status(500))]);
        let result = Coordinator::initialize(&config(), as_port(&port)).await;

        assert!(matches!(
            result,
            Err(BindayError::Communication(CommunicationError::Status(500)))
        ));
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_snapshot() {
        let port = ScriptedPort::new(vec![
            Ok(black_bin_body("2025-05-03")),
            Err(CommunicationError::Status(500)),
            Ok(black_bin_body("2025-05-10")),
        ]);
        let coordinator = Coordinator::initialize(&config(), as_port(&port))
            .await
            .expect("initialize");
        let before = coordinator.current_result().expect("data after setup");

        let err = coordinator.refresh().await.expect_err("second fetch fails");
        assert!(matches!(err, CommunicationError::Status(500)));

        let after = coordinator.current_result().expect("data kept");
        assert!(Arc::ptr_eq(&before, &after));
        let failure = coordinator.last_failure().expect("failure recorded");
        assert!(failure.message.contains("500"), "{}", failure.message);

        coordinator.refresh().await.expect("third fetch succeeds");
        let latest = coordinator.current_result().expect("new data");
        assert_ne!(latest.result, before.result);
        assert!(coordinator.last_failure().is_none());
        coordinator.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn timer_refreshes_on_interval() {
        let port = ScriptedPort::new(vec![
            Ok(black_bin_body("2025-05-03")),
            Err(CommunicationError::Timeout),
            Ok(black_bin_body("2025-05-10")),
        ]);
        let coordinator = Coordinator::initialize(&config(), as_port(&port))
            .await
            .expect("initialize");
        let first = coordinator.current_result().expect("data after setup");
        let mut updates = coordinator.subscribe();

        updates.changed().await.expect("failed tick publishes state");
        assert_eq!(port.calls(), 2);
        let state = updates.borrow_and_update().clone();
        assert!(state.last_failure.is_some());
        assert!(Arc::ptr_eq(
            state.data.as_ref().expect("data kept"),
            &first
        ));

        updates.changed().await.expect("next tick publishes state");
        assert_eq!(port.calls(), 3);
        let refreshed = coordinator.current_result().expect("refreshed data");
        assert_eq!(
            refreshed.result.window(BinType::Black).next_date.map(|date| date.to_string()),
            Some("2025-05-10".to_owned())
        );
        coordinator.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_releases_port() {
        let port = ScriptedPort::new(vec![Ok(black_bin_body("2025-05-03"))]);
        let coordinator = Coordinator::initialize(&config(), as_port(&port))
            .await
            .expect("initialize");
        assert!(Arc::strong_count(&port) > 1);

        coordinator.shutdown().await;
        assert_eq!(Arc::strong_count(&port), 1);
    }
}
