//! # netbatch
//!
//! Batch configuration push and health inspection for groups of network
//! switches and routers over SSH.
//!
//! The engine fans one operation out across a named device group. For each
//! device it connects (with bounded retry and optional privilege escalation),
//! runs the operation, always closes the session, and folds the outcome into
//! a single [`BatchReport`]. One device failing never stops the batch.
//!
//! ## Features
//!
//! - Async SSH CLI sessions via russh, with tail-only prompt matching
//! - Table-driven vendor support (Huawei VRP, H3C Comware, Cisco IOS)
//! - Template-based configuration push with vendor persist commands
//! - Interface, CPU, memory and VLAN inspection with warning thresholds
//! - JSON reports, and a fixed-interval inspection loop
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use netbatch::{Engine, Registry, Settings, SshSessionProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), netbatch::Error> {
//!     let registry = Registry::load("config/devices.yaml")?;
//!     let settings = Settings::load("config/settings.yaml")?;
//!     let provider = SshSessionProvider::new(settings.connect_timeout());
//!
//!     let engine = Engine::new(registry, settings, provider);
//!     let report = engine.run_batch_inspect("switch_group_a").await;
//!     println!("{}/{} devices inspected", report.success, report.total);
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod channel;
pub mod config;
pub mod connection;
pub mod engine;
pub mod error;
pub mod logging;
pub mod operation;
pub mod platform;
pub mod report;
pub mod scheduler;
pub mod session;
pub mod template;
pub mod transport;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use batch::Orchestrator;
pub use config::{DeviceDescriptor, Registry, Settings};
pub use connection::{ConnectionManager, ConnectionOutcome, RetryPolicy};
pub use engine::Engine;
pub use error::Error;
pub use operation::{CheckItem, ConfigPush, Inspect, Operation, OperationResult};
pub use platform::{PlatformDefinition, Vendor};
pub use report::{BatchReport, DeviceReport, JsonFileSink, ReportSink};
pub use scheduler::{Scheduler, run_scheduled_inspect};
pub use session::{Session, SessionProvider};
pub use template::{FileTemplateRenderer, TemplateParams, TemplateRenderer};
pub use transport::{SshConfig, SshSessionProvider};
