//! Recording tables, CSV ingestion and span selection

pub mod ingest;
pub mod range;
pub mod table;

pub use ingest::{parse_table, read_table};
pub use range::{
    select_by_time, select_channel_range, select_range, FrequencyRange, TimeRange, TimeSelection,
};
pub use table::TimeSeriesTable;
