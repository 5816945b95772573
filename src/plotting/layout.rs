//! Layout planning: grid shape, spacing, figure size, ticks and date format
//!
//! Everything here is pure and computed once per run from the panel count
//! and the data extents.

use crate::error::{PlotError, Result};
use chrono::NaiveDateTime;

/// Largest panel count any grid layout supports
pub const MAX_PANELS: usize = 10;

/// Figure size (inches) used when one or two panels are drawn
pub const WIDE_FIG_SIZE: (f64, f64) = (14.0, 7.0);

const SECONDS_PER_DAY: i64 = 86_400;

/// Grid of panels, in figure fractions
///
/// `hspace` is the gap between rows and `wspace` the gap between columns,
/// each as a fraction of the mean panel height/width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub rows: usize,
    pub cols: usize,
    pub hspace: f64,
    pub wspace: f64,
    pub bottom: f64,
    pub top: f64,
    pub left: f64,
    pub right: f64,
}

/// Panel rectangle in pixels, origin at the top-left of the figure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl GridSpec {
    /// Grid for a panel count
    pub fn for_panels(n_panels: usize) -> Result<Self> {
        let (rows, cols, hspace, wspace, bottom, top) = match n_panels {
            0 => return Err(PlotError::Config("no panels to draw".to_string())),
            1 => (1, 1, 0.0, 0.0, 0.175, 0.825),
            2 => (1, 2, 0.0, 0.1, 0.175, 0.825),
            3..=4 => (2, 2, 0.15, 0.1, 0.125, 0.9),
            5..=6 => (3, 2, 0.15, 0.1, 0.125, 0.9),
            7..=8 => (4, 2, 0.175, 0.1, 0.125, 0.9),
            n if n > MAX_PANELS => return Err(PlotError::TooManyPanels(n)),
            _ => (5, 2, 0.225, 0.1, 0.125, 0.9),
        };
        Ok(Self {
            rows,
            cols,
            hspace,
            wspace,
            bottom,
            top,
            left: 0.125,
            right: 0.9,
        })
    }

    /// (row, col) of a 0-based panel index, row-major
    pub fn position(&self, idx: usize) -> (usize, usize) {
        (idx / self.cols, idx % self.cols)
    }

    /// Bottom-row panels carry x tick labels
    ///
    /// With an odd panel count the last row has an empty slot, so the panel
    /// directly above it is labelled too.
    pub fn shows_x_labels(&self, idx: usize, n_panels: usize) -> bool {
        let (row, _) = self.position(idx);
        row + 1 == self.rows || (n_panels % 2 != 0 && idx + 2 == n_panels)
    }

    /// First-column panels carry y tick labels
    pub fn shows_y_labels(&self, idx: usize) -> bool {
        self.position(idx).1 == 0
    }

    /// Pixel rectangles for every grid cell, row-major
    pub fn cell_rects(&self, width: u32, height: u32) -> Vec<PixelRect> {
        let (w, h) = (f64::from(width), f64::from(height));
        let rows = self.rows as f64;
        let cols = self.cols as f64;

        let cell_h = (self.top - self.bottom) / (rows + self.hspace * (rows - 1.0));
        let sep_h = self.hspace * cell_h;
        let cell_w = (self.right - self.left) / (cols + self.wspace * (cols - 1.0));
        let sep_w = self.wspace * cell_w;

        let mut rects = Vec::with_capacity(self.rows * self.cols);
        for r in 0..self.rows {
            for c in 0..self.cols {
                let left = self.left + c as f64 * (cell_w + sep_w);
                let top = self.top - r as f64 * (cell_h + sep_h);
                rects.push(PixelRect {
                    x: (left * w).round() as i32,
                    y: ((1.0 - top) * h).round() as i32,
                    width: (cell_w * w).round() as u32,
                    height: (cell_h * h).round() as u32,
                });
            }
        }
        rects
    }
}

/// Figure size override for small panel counts
pub fn fig_size_override(n_panels: usize) -> Option<(f64, f64)> {
    if n_panels <= 2 {
        Some(WIDE_FIG_SIZE)
    } else {
        None
    }
}

/// Target number of x ticks
pub fn x_tick_target(n_panels: usize) -> usize {
    if n_panels >= 2 {
        8
    } else {
        17
    }
}

/// Stride through the forecast hours for major x ticks
///
/// Plain floor division once the count reaches the target; no clamp to 1.
pub fn x_tick_stride(n_panels: usize, n_forecast_hours: usize) -> usize {
    let n_xticks = x_tick_target(n_panels);
    if n_forecast_hours < n_xticks {
        1
    } else {
        n_forecast_hours / n_xticks
    }
}

/// Stride through the plot dates for major y ticks
///
/// The comparison reuses the x tick target; the divisor is 5.
pub fn y_tick_stride(n_panels: usize, n_dates: usize) -> usize {
    const N_YTICKS: usize = 5;
    if n_dates < x_tick_target(n_panels) {
        1
    } else {
        n_dates / N_YTICKS
    }
}

/// Major tick label format for the date axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// Dates not exactly one day apart, e.g. "01Jan2024 06Z"
    SubDaily,
    /// e.g. "01Jan2024"
    Daily,
}

impl DateFormat {
    pub fn pattern(&self) -> &'static str {
        match self {
            Self::SubDaily => "%d%b%Y %HZ",
            Self::Daily => "%d%b%Y",
        }
    }

    pub fn format(&self, date: &NaiveDateTime) -> String {
        date.format(self.pattern()).to_string()
    }
}

/// Minor tick spacing on the date axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinorTicks {
    Hourly,
    Daily,
    Monthly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateAxisFormat {
    pub format: DateFormat,
    pub minor: MinorTicks,
}

impl DateAxisFormat {
    /// Choose the format from the spacing of the first two dates
    ///
    /// A single date has no spacing and is treated as daily.
    pub fn from_dates(dates: &[NaiveDateTime]) -> Self {
        let interval = match dates {
            [first, second, ..] => (*second - *first).num_seconds(),
            _ => SECONDS_PER_DAY,
        };
        if interval != SECONDS_PER_DAY {
            let minor = if dates.len() < 10 {
                MinorTicks::Hourly
            } else {
                MinorTicks::Daily
            };
            Self {
                format: DateFormat::SubDaily,
                minor,
            }
        } else {
            let minor = if dates.len() < 60 {
                MinorTicks::Daily
            } else {
                MinorTicks::Monthly
            };
            Self {
                format: DateFormat::Daily,
                minor,
            }
        }
    }
}

/// All geometry and tick parameters of one chart
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutPlan {
    pub n_panels: usize,
    pub grid: GridSpec,
    /// Figure size in inches
    pub fig_size: (f64, f64),
    pub dpi: u32,
    pub x_tick_stride: usize,
    pub y_tick_stride: usize,
    pub date_axis: DateAxisFormat,
}

impl LayoutPlan {
    pub fn compute(
        n_panels: usize,
        default_fig_size: (f64, f64),
        dpi: u32,
        forecast_hours: &[u32],
        plot_dates: &[NaiveDateTime],
    ) -> Result<Self> {
        let grid = GridSpec::for_panels(n_panels)?;
        if forecast_hours.is_empty() {
            return Err(PlotError::Config("no forecast hours to plot".to_string()));
        }
        if plot_dates.is_empty() {
            return Err(PlotError::Config("no plot dates".to_string()));
        }

        Ok(Self {
            n_panels,
            grid,
            fig_size: fig_size_override(n_panels).unwrap_or(default_fig_size),
            dpi,
            x_tick_stride: x_tick_stride(n_panels, forecast_hours.len()),
            y_tick_stride: y_tick_stride(n_panels, plot_dates.len()),
            date_axis: DateAxisFormat::from_dates(plot_dates),
        })
    }

    /// Figure size in pixels
    pub fn figure_px(&self) -> (u32, u32) {
        let dpi = f64::from(self.dpi);
        (
            (self.fig_size.0 * dpi).round() as u32,
            (self.fig_size.1 * dpi).round() as u32,
        )
    }

    pub fn panel_rects(&self) -> Vec<PixelRect> {
        let (w, h) = self.figure_px();
        let mut rects = self.grid.cell_rects(w, h);
        rects.truncate(self.n_panels);
        rects
    }
}
