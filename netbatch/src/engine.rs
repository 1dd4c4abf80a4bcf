//! Engine: the entry point presentation layers call.
//!
//! Owns the registry, settings, session provider, template renderer and
//! report sink. Batches for the same group never overlap: a run waits for
//! (or with the `try_` variant, skips) a batch already in progress.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::info;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::batch::Orchestrator;
use crate::config::{Registry, Settings};
use crate::operation::{ConfigOutput, ConfigPush, Inspect, InspectionData, Operation};
use crate::report::{BatchReport, JsonFileSink, ReportSink, publish};
use crate::session::SessionProvider;
use crate::template::{FileTemplateRenderer, TemplateParams, TemplateRenderer};

/// Batch device-operation engine.
pub struct Engine<P> {
    registry: Registry,
    settings: Settings,
    provider: P,
    templates: Arc<dyn TemplateRenderer>,
    sink: Arc<dyn ReportSink>,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl<P: SessionProvider> Engine<P> {
    /// Engine reading templates from `templates.path` and writing reports
    /// to `report.path`.
    pub fn new(registry: Registry, settings: Settings, provider: P) -> Self {
        let templates = Arc::new(FileTemplateRenderer::new(&settings.templates.path));
        let sink = Arc::new(JsonFileSink::new(&settings.report.path));
        Self {
            registry,
            settings,
            provider,
            templates,
            sink,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_templates(mut self, templates: Arc<dyn TemplateRenderer>) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Group names in registry order.
    pub fn groups(&self) -> Vec<String> {
        self.registry.group_names().map(str::to_string).collect()
    }

    /// Push `template` rendered with `params` to every device of `group`.
    pub async fn run_batch_config(
        &self,
        group: &str,
        template: &str,
        params: TemplateParams,
    ) -> BatchReport<ConfigOutput> {
        let push = ConfigPush::new(Arc::clone(&self.templates), template, params);
        let _guard = self.lock_group(group).await;
        self.run(group, &push).await
    }

    /// Inspect every device of `group` with the configured checks.
    pub async fn run_batch_inspect(&self, group: &str) -> BatchReport<InspectionData> {
        let _guard = self.lock_group(group).await;
        self.run(group, &Inspect::from_settings(&self.settings.inspect))
            .await
    }

    /// Like [`Engine::run_batch_inspect`], but returns `None` instead of
    /// waiting when a batch for `group` is already running.
    pub async fn try_run_batch_inspect(&self, group: &str) -> Option<BatchReport<InspectionData>> {
        let _guard = match self.group_lock(group) {
            Some(lock) => match lock.try_lock_owned() {
                Ok(guard) => Some(guard),
                Err(_) => {
                    info!("{}: previous batch still running, skipping", group);
                    return None;
                }
            },
            None => None,
        };
        Some(
            self.run(group, &Inspect::from_settings(&self.settings.inspect))
                .await,
        )
    }

    async fn run<O: Operation>(&self, group: &str, operation: &O) -> BatchReport<O::Output> {
        let report = Orchestrator::new(&self.registry, &self.settings, &self.provider)
            .run(group, operation)
            .await;
        publish(self.sink.as_ref(), operation.kind(), &report);
        report
    }

    async fn lock_group(&self, group: &str) -> Option<OwnedMutexGuard<()>> {
        match self.group_lock(group) {
            Some(lock) => Some(lock.lock_owned().await),
            None => None,
        }
    }

    /// Per-group lock; `None` for groups the registry does not know.
    fn group_lock(&self, group: &str) -> Option<Arc<AsyncMutex<()>>> {
        self.registry.resolve(group).ok()?;
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Some(Arc::clone(locks.entry(group.to_string()).or_default()))
    }
}
