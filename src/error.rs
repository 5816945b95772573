use thiserror::Error;

/// Errors that can occur while building a lead-by-date chart
#[derive(Debug, Error)]
pub enum PlotError {
    /// More panels requested than the grid layouts support
    #[error("TOO MANY SUBPLOTS REQUESTED, MAXIMUM IS 10 (got {0})")]
    TooManyPanels(usize),

    /// Panels disagree on forecast units
    #[error("DIFFERING UNITS: {}", .0.join(", "))]
    DifferingUnits(Vec<String>),

    /// Configuration error (bad dates, empty model list, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Verification record file could not be parsed
    #[error("Stat file error in {path}: {message}")]
    StatFile { path: String, message: String },

    /// Drawing backend error
    #[error("Render error: {0}")]
    Render(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Table error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl PlotError {
    /// Wrap a plotters drawing error
    pub fn render<E: std::fmt::Display>(err: E) -> Self {
        PlotError::Render(err.to_string())
    }

    /// True for the two fatal user-configuration conditions of a run
    pub fn is_fatal_misconfiguration(&self) -> bool {
        matches!(
            self,
            PlotError::TooManyPanels(_) | PlotError::DifferingUnits(_)
        )
    }
}

/// Type alias for Results using PlotError
pub type Result<T> = std::result::Result<T, PlotError>;
