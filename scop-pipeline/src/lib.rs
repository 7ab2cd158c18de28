pub mod classify;
pub mod cohort;
pub mod config;
pub mod exclusion;
pub mod metric;
pub mod metrics_textfile;
pub mod observability;
pub mod pipeline;
pub mod season;
pub mod sinks;
pub mod sources;
pub mod stages;
pub mod table;
pub mod transform;

pub use metric::Metric;
pub use pipeline::{Envelope, Pipeline};
