//! Lead-by-date verification chart library
//!
//! Module organization:
//! - `config`: run configuration (JSON)
//! - `verif`: date pairs, stat file reading, table assembly
//! - `plotting`: layout planning and chart rendering
//! - `pipeline`: the end-to-end chart job
//! - `logging`: per-run log file setup
//! - `error`: the crate error type

pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod plotting;
pub mod verif;

pub use error::{PlotError, Result};
