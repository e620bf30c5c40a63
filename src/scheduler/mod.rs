//! Periodic monitoring scheduler.
//!
//! One timer drives the cycle: snapshot the registry, fan probes out across
//! a bounded pool, feed each result back into the store, hand transitions
//! to the alert dispatcher, then snapshot to disk. A cycle still draining
//! when the timer fires again is skipped, not queued, so a slow target set
//! cannot pile up work.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use crate::alert::{should_alert, AlertDispatcher};
use crate::config::Config;
use crate::probe::Prober;
use crate::store::{save_snapshot, CheckResult, Store};

pub struct Scheduler {
    store: Arc<Store>,
    prober: Arc<Prober>,
    alerts: Arc<AlertDispatcher>,
    interval: Duration,
    max_concurrent: usize,
    persist_path: Option<String>,
    cycle_running: AtomicBool,
    persist_warned: AtomicBool,
}

impl Scheduler {
    pub fn new(
        store: Arc<Store>,
        prober: Arc<Prober>,
        alerts: Arc<AlertDispatcher>,
        config: &Config,
    ) -> Self {
        Self {
            store,
            prober,
            alerts,
            interval: Duration::from_secs(config.check_interval_secs.max(1)),
            max_concurrent: config.max_concurrent_probes.max(1),
            persist_path: config.persist_path(),
            cycle_running: AtomicBool::new(false),
            persist_warned: AtomicBool::new(false),
        }
    }

    /// Spawn the timer loop. The first cycle runs immediately.
    pub fn start(self: &Arc<Self>) {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(scheduler.interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                timer.tick().await;

                if scheduler.cycle_running.swap(true, Ordering::SeqCst) {
                    tracing::warn!("Previous check cycle still draining, skipping this tick");
                    continue;
                }

                let cycle = Arc::clone(&scheduler);
                tokio::spawn(async move {
                    cycle.run_cycle().await;
                    cycle.cycle_running.store(false, Ordering::SeqCst);
                });
            }
        });
    }

    /// One complete cycle: probe every registered target, reconcile, and
    /// persist the snapshot.
    pub async fn run_cycle(&self) {
        let urls = self.store.urls();
        if urls.is_empty() {
            return;
        }
        tracing::debug!("Probing {} target(s)", urls.len());

        let pool = Arc::new(Semaphore::new(self.max_concurrent));
        let mut probes = JoinSet::new();
        for url in urls {
            let pool = Arc::clone(&pool);
            let prober = Arc::clone(&self.prober);
            probes.spawn(async move {
                let _permit = pool.acquire_owned().await.ok();
                // Small jitter to de-synchronize probe starts within a cycle.
                let jitter = rand::random::<u64>() % 250;
                tokio::time::sleep(Duration::from_millis(jitter)).await;
                let result = prober.check(&url).await;
                (url, result)
            });
        }

        while let Some(joined) = probes.join_next().await {
            match joined {
                Ok((url, result)) => self.reconcile(url, result),
                Err(e) => tracing::error!("Probe task failed: {}", e),
            }
        }

        self.persist().await;
    }

    /// Record one result and, on a transition, hand it to the dispatcher.
    ///
    /// The dispatch runs as its own task: state is updated first, and
    /// webhook latency never holds up the rest of the cycle.
    pub fn reconcile(&self, url: String, result: CheckResult) {
        let previous = self.store.record_result(&url, result.clone());
        if should_alert(previous, result.status_text) {
            let alerts = Arc::clone(&self.alerts);
            tokio::spawn(async move {
                alerts.notify(&url, previous, &result).await;
            });
        }
    }

    async fn persist(&self) {
        let Some(path) = &self.persist_path else {
            return;
        };
        match save_snapshot(path, &self.store.snapshot()).await {
            Ok(()) => self.persist_warned.store(false, Ordering::Relaxed),
            Err(e) => {
                if !self.persist_warned.swap(true, Ordering::Relaxed) {
                    tracing::warn!(
                        "Snapshot write to {} failed, continuing in-memory: {}",
                        path,
                        e
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::result_with_status;
    use crate::store::StatusText;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn scheduler_with(store: Arc<Store>, webhook: Option<String>) -> Scheduler {
        let config = Config {
            check_interval_secs: 60,
            max_concurrent_probes: 4,
            data_path: String::new(),
            alert_webhook_url: webhook,
            ..Config::default()
        };
        Scheduler::new(
            store,
            Arc::new(Prober::new(Duration::from_secs(2)).unwrap()),
            Arc::new(AlertDispatcher::new(config.alert_webhook_url.clone()).unwrap()),
            &config,
        )
    }

    async fn wait_for_requests(server: &MockServer, expected: usize) -> Vec<wiremock::Request> {
        for _ in 0..50 {
            let requests = server.received_requests().await.unwrap();
            if requests.len() >= expected {
                return requests;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        server.received_requests().await.unwrap()
    }

    #[tokio::test]
    async fn cycle_records_a_result_per_target() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let store = Arc::new(Store::new());
        let url = format!("{}/", server.uri());
        store.add_url(&url);

        let scheduler = scheduler_with(Arc::clone(&store), None);
        scheduler.run_cycle().await;

        let history = store.history(&url).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status_text, StatusText::Up);

        let rows = store.list_urls();
        assert_eq!(rows[0].last_status, Some(StatusText::Up));
        assert_eq!(rows[0].uptime_percentage, Some(100.0));
    }

    #[tokio::test]
    async fn cycle_with_empty_registry_is_a_noop() {
        let scheduler = scheduler_with(Arc::new(Store::new()), None);
        scheduler.run_cycle().await;
    }

    #[tokio::test]
    async fn down_then_up_dispatches_two_alerts() {
        let hooks = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&hooks)
            .await;

        let store = Arc::new(Store::new());
        store.add_url("https://example.com/");
        let scheduler =
            scheduler_with(Arc::clone(&store), Some(format!("{}/hook", hooks.uri())));

        scheduler.reconcile(
            "https://example.com/".to_string(),
            result_with_status(StatusText::Down),
        );
        wait_for_requests(&hooks, 1).await;
        scheduler.reconcile(
            "https://example.com/".to_string(),
            result_with_status(StatusText::Up),
        );

        let requests = wait_for_requests(&hooks, 2).await;
        assert_eq!(requests.len(), 2);
        let first: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let second: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
        assert_eq!(first["status"], "DOWN");
        assert_eq!(second["status"], "UP");

        assert_eq!(store.transitions("https://example.com/").len(), 2);
    }

    #[tokio::test]
    async fn repeated_status_does_not_alert() {
        let hooks = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&hooks)
            .await;

        let store = Arc::new(Store::new());
        store.add_url("https://example.com/");
        let scheduler = scheduler_with(Arc::clone(&store), Some(hooks.uri()));

        for _ in 0..3 {
            scheduler.reconcile(
                "https://example.com/".to_string(),
                result_with_status(StatusText::Up),
            );
        }

        // First observation alerts; the two repeats must not.
        let requests = wait_for_requests(&hooks, 1).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(requests.len(), 1);
        assert_eq!(hooks.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cycle_persists_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let snapshot_path = dir.path().join("snapshot.json");

        let store = Arc::new(Store::new());
        let url = format!("{}/", server.uri());
        store.add_url(&url);

        let config = Config {
            check_interval_secs: 60,
            max_concurrent_probes: 4,
            data_path: snapshot_path.to_str().unwrap().to_string(),
            alert_webhook_url: None,
            ..Config::default()
        };
        let scheduler = Scheduler::new(
            Arc::clone(&store),
            Arc::new(Prober::new(Duration::from_secs(2)).unwrap()),
            Arc::new(AlertDispatcher::new(None).unwrap()),
            &config,
        );
        scheduler.run_cycle().await;

        let restored = crate::store::load_store(snapshot_path.to_str().unwrap()).await;
        assert_eq!(restored.history(&url).unwrap().len(), 1);
    }
}
