//! Verification data: date axes and record tables
//!
//! Structure:
//! - `dates.rs`: valid/init date pairs per forecast hour
//! - `stat_file.rs`: MET `.stat` file reading
//! - `table.rs`: long-form table assembly with polars

pub mod dates;
pub mod stat_file;
pub mod table;

pub use dates::{plot_dates, DatePairs};
pub use stat_file::{StatFile, StatStore};
pub use table::{concat_tables, TableAssembler};
