pub mod daily;
pub mod lenient;
pub mod stats;
pub mod system;

pub use daily::{CategoryReading, DailyRecord, DailyRecordError, EnergyCategory};
pub use stats::SystemStats;
pub use system::System;
