//! Batch reports and where they go.

mod model;
mod sink;

pub use model::{BatchReport, DeviceOutcome, DeviceReport};
pub use sink::{publish, JsonFileSink, MemorySink, ReportSink};
