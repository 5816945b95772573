//! Lead-by-date chart: layout, axes, decorations and rendering
//!
//! Structure:
//! - `layout.rs`: grid shape, figure size, tick strides, date formats
//! - `axis.rs`: plotters coordinate ranges with explicit ticks
//! - `specs.rs`: titles, image names and logo placement
//! - `renderer.rs`: draws the panels into a PNG

pub mod axis;
pub mod layout;
pub mod renderer;
pub mod specs;

pub use layout::{GridSpec, LayoutPlan};
pub use renderer::{forecast_units, load_logos, ChartRenderer, Logo, RenderContext};
pub use specs::PlotSpecs;
