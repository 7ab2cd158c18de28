pub mod csv_table;
pub mod daily_files;

pub use csv_table::CsvTable;
pub use daily_files::{daily_file_path, DailyVariant, DailyVariantSink};
