//! Batch orchestration: one operation over every device of a group.
//!
//! Each device goes through acquire, execute, release independently. A
//! device that cannot be reached, fails, or panics ends up as a failure entry
//! in the report; it never stops the rest of the batch. Sessions are closed
//! exactly once whatever the operation did.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures_util::{FutureExt, StreamExt, stream};
use log::{error, info, warn};

use crate::config::{DeviceDescriptor, Registry, Settings};
use crate::connection::{Backoff, ConnectionManager, Sleeper, TokioSleeper};
use crate::operation::{Operation, OperationResult};
use crate::report::{BatchReport, DeviceReport};
use crate::session::{Session, SessionProvider};

/// Runs operations across device groups.
pub struct Orchestrator<'a, P, S = TokioSleeper> {
    registry: &'a Registry,
    settings: &'a Settings,
    connections: ConnectionManager<'a, P, S>,
}

impl<'a, P: SessionProvider> Orchestrator<'a, P> {
    pub fn new(registry: &'a Registry, settings: &'a Settings, provider: &'a P) -> Self {
        Self {
            registry,
            settings,
            connections: ConnectionManager::new(provider, settings),
        }
    }
}

impl<'a, P: SessionProvider, S: Sleeper> Orchestrator<'a, P, S> {
    /// Replace the delay source used between connection attempts.
    pub fn with_sleeper<T: Sleeper>(self, sleeper: T) -> Orchestrator<'a, P, T> {
        Orchestrator {
            registry: self.registry,
            settings: self.settings,
            connections: self.connections.with_sleeper(sleeper),
        }
    }

    /// Replace the backoff between connection attempts.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.connections = self.connections.with_backoff(backoff);
        self
    }

    /// Run `operation` on every device of `group`.
    ///
    /// Always returns a report. An unknown group yields an empty report with
    /// `error` set.
    pub async fn run<O: Operation>(&self, group: &str, operation: &O) -> BatchReport<O::Output> {
        let devices = match self.registry.resolve(group) {
            Ok(devices) => devices,
            Err(e) => {
                warn!("{}: {}", group, e);
                return BatchReport::unknown_group(group, &e);
            }
        };

        let concurrency = self.settings.concurrency.max(1);
        info!(
            "{}: starting {} on {} device(s), concurrency {}",
            group,
            operation.kind(),
            devices.len(),
            concurrency
        );

        let reports: Vec<DeviceReport<O::Output>> = stream::iter(devices)
            .map(|device| self.run_device(device, operation))
            .buffered(concurrency)
            .collect()
            .await;

        let report = BatchReport::from_devices(group, reports);
        info!(
            "{}: {} finished, {}/{} succeeded",
            group,
            operation.kind(),
            report.success,
            report.total
        );
        if !report.failed.is_empty() {
            warn!("{}: failed devices: {}", group, report.failed.join(", "));
        }
        report
    }

    /// One device, start to finish. A panic anywhere in the pipeline,
    /// connection phase included, becomes that device's failure entry.
    async fn run_device<O: Operation>(
        &self,
        device: &DeviceDescriptor,
        operation: &O,
    ) -> DeviceReport<O::Output> {
        AssertUnwindSafe(self.process_device(device, operation))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                let message = panic_message(panic.as_ref());
                error!("{}: {} panicked before completing: {}", device.name, operation.kind(), message);
                DeviceReport::failure(&device.name, format!("device processing panicked: {message}"))
            })
    }

    async fn process_device<O: Operation>(
        &self,
        device: &DeviceDescriptor,
        operation: &O,
    ) -> DeviceReport<O::Output> {
        let mut session = match self.connections.acquire(device, None).await.into_session() {
            Ok(session) => session,
            Err(reason) => {
                warn!("{}: skipped, {}", device.name, reason);
                return DeviceReport::failure(&device.name, reason);
            }
        };

        let result = AssertUnwindSafe(operation.execute(&mut session, device))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                let message = panic_message(panic.as_ref());
                error!("{}: {} panicked: {}", device.name, operation.kind(), message);
                OperationResult::Failure(format!("operation panicked: {message}"))
            });

        if let Err(e) = session.close().await {
            warn!("{}: error while closing session: {}", device.name, e);
        }

        match &result {
            OperationResult::Success(_) => info!("{}: {} succeeded", device.name, operation.kind()),
            OperationResult::Failure(reason) => {
                warn!("{}: {} failed: {}", device.name, operation.kind(), reason)
            }
        }

        DeviceReport::from_result(&device.name, result, |data| operation.warnings(data))
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::error::ConnectError;
    use crate::operation::{CheckItem, ConfigPush, Inspect, Thresholds};
    use crate::template::{InMemoryTemplates, TemplateParams};
    use crate::testing::{FakeProvider, RecordingSleeper};

    fn registry() -> Registry {
        let group = ["A", "B", "C"]
            .iter()
            .enumerate()
            .map(|(i, name)| DeviceDescriptor::new(*name, format!("192.0.2.{}", i + 1)))
            .collect();
        Registry::from_groups([("core".to_string(), group)].into_iter().collect()).unwrap()
    }

    fn inspect_all() -> Inspect {
        Inspect::new(CheckItem::ALL.to_vec(), Thresholds::default())
    }

    fn failing_provider() -> FakeProvider {
        FakeProvider::new()
            .fail("B", ConnectError::Timeout(Duration::from_secs(10)))
            .fail("C", ConnectError::AuthFailed { user: "admin".into() })
    }

    #[tokio::test]
    async fn test_mixed_outcomes() {
        let registry = registry();
        let settings = Settings::default();
        let provider = failing_provider();
        let orchestrator =
            Orchestrator::new(&registry, &settings, &provider).with_sleeper(RecordingSleeper::default());

        let report = orchestrator.run("core", &inspect_all()).await;

        assert_eq!(report.total, 3);
        assert_eq!(report.success, 1);
        assert_eq!(report.failed, vec!["B", "C"]);
        assert!(report.error.is_none());

        let b = report.device("B").and_then(|r| r.reason()).unwrap();
        assert!(b.contains("retries exhausted"), "{b}");
        let c = report.device("C").and_then(|r| r.reason()).unwrap();
        assert!(c.contains("authentication"), "{c}");

        assert_eq!(provider.attempts("A"), 1);
        assert_eq!(provider.attempts("B"), settings.retry);
        assert_eq!(provider.attempts("C"), 1);
        assert_eq!(provider.opened(), 1);
        assert_eq!(provider.closed(), 1);
    }

    #[tokio::test]
    async fn test_unknown_group_is_reported() {
        let registry = registry();
        let settings = Settings::default();
        let provider = FakeProvider::new();
        let orchestrator = Orchestrator::new(&registry, &settings, &provider);

        let report = orchestrator.run("edge", &inspect_all()).await;
        assert_eq!(report.total, 0);
        assert!(report.devices.is_empty());
        let error = report.error.unwrap();
        assert!(error.contains("edge") && error.contains("core"), "{error}");
        assert_eq!(provider.opened(), 0);
    }

    #[tokio::test]
    async fn test_panicking_operation_still_closes_session() {
        let registry = registry();
        let settings = Settings::default();
        let provider = FakeProvider::new().panic_on("display cpu-usage");
        let orchestrator = Orchestrator::new(&registry, &settings, &provider);

        let report = orchestrator.run("core", &inspect_all()).await;

        assert_eq!(report.total, 3);
        assert_eq!(report.success, 0);
        for name in ["A", "B", "C"] {
            let reason = report.device(name).and_then(|r| r.reason()).unwrap();
            assert!(reason.contains("panicked"), "{reason}");
            assert_eq!(provider.closed_for(name), 1);
        }
        assert_eq!(provider.opened(), 3);
    }

    #[tokio::test]
    async fn test_panic_while_connecting_keeps_batch_going() {
        let registry = registry();
        let settings = Settings::default();
        let provider = FakeProvider::new().panic_on_open("B");
        let orchestrator = Orchestrator::new(&registry, &settings, &provider);

        let report = orchestrator.run("core", &inspect_all()).await;

        assert_eq!(report.total, 3);
        assert_eq!(report.devices.len(), 3);
        assert_eq!(report.success, 2);
        assert_eq!(report.failed, vec!["B"]);
        let reason = report.device("B").and_then(|r| r.reason()).unwrap();
        assert!(reason.contains("scripted panic"), "{reason}");
        assert_eq!(provider.attempts("C"), 1);
        assert_eq!(provider.closed_for("A"), 1);
        assert_eq!(provider.closed_for("C"), 1);
    }

    #[tokio::test]
    async fn test_concurrent_panic_closes_other_sessions() {
        let registry = registry();
        let settings = Settings {
            concurrency: 3,
            ..Settings::default()
        };
        let provider = FakeProvider::new().panic_on_open("A");
        let orchestrator = Orchestrator::new(&registry, &settings, &provider);

        let report = orchestrator.run("core", &inspect_all()).await;

        assert_eq!(report.devices.keys().collect::<Vec<_>>(), vec!["A", "B", "C"]);
        assert_eq!(report.failed, vec!["A"]);
        assert_eq!(provider.closed(), 2);
    }

    #[tokio::test]
    async fn test_config_missing_param_never_sends() {
        let registry = registry();
        let settings = Settings::default();
        let provider = FakeProvider::new();
        let orchestrator = Orchestrator::new(&registry, &settings, &provider);
        let templates = Arc::new(InMemoryTemplates::new().with("vlan_tpl.txt", "vlan {vlan_id}\n"));

        let push = ConfigPush::new(templates, "vlan_tpl.txt", TemplateParams::new());
        let report = orchestrator.run("core", &push).await;

        assert_eq!(report.success, 0);
        assert_eq!(report.failed, vec!["A", "B", "C"]);
        let reason = report.device("A").and_then(|r| r.reason()).unwrap();
        assert!(reason.contains("vlan_id"), "{reason}");
        assert_eq!(provider.command_count(), 0);
        assert_eq!(provider.closed(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_run_keeps_registry_order() {
        let registry = registry();
        let settings = Settings {
            concurrency: 3,
            ..Settings::default()
        };
        let provider = failing_provider();
        let orchestrator =
            Orchestrator::new(&registry, &settings, &provider).with_sleeper(RecordingSleeper::default());

        let report = orchestrator.run("core", &inspect_all()).await;
        assert_eq!(report.devices.keys().collect::<Vec<_>>(), vec!["A", "B", "C"]);
        assert_eq!(report.failed, vec!["B", "C"]);
        assert_eq!(provider.closed(), 1);
    }

    #[tokio::test]
    async fn test_inspect_warnings_reach_report() {
        let registry = registry();
        let settings = Settings::default();
        let provider = FakeProvider::new().respond("display cpu-usage", "CPU Usage: 95%");
        let orchestrator = Orchestrator::new(&registry, &settings, &provider);

        let report = orchestrator
            .run("core", &Inspect::new(vec![CheckItem::CpuUsage], Thresholds::default()))
            .await;
        assert_eq!(report.success, 3);
        assert_eq!(report.needing_attention().count(), 3);
        assert_eq!(report.device("A").unwrap().warnings, vec!["cpu_usage at 95%"]);
    }

    #[test]
    fn test_panic_message() {
        let text: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(text.as_ref()), "boom");
        let owned: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(owned.as_ref()), "bang");
        let other: Box<dyn Any + Send> = Box::new(42);
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }
}
