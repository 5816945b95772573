//! Multi-panel lead-by-date chart rendering
//!
//! The figure is drawn into an owned [`RenderContext`] (an RGB pixel buffer)
//! and encoded to PNG only once every panel has been drawn, so a failed run
//! writes no image. The PNG goes to a sibling temporary file first and is
//! renamed into place, so an existing image is never left truncated.

use super::axis::{
    cell_edges, date_axis, forecast_hour_axis, from_timestamp, minor_ticks, timestamp,
    TickedAxis,
};
use super::layout::{LayoutPlan, PixelRect};
use super::specs::{LogoPlacement, LogoSide, PlotSpecs, LEFT_LOGO_FILE, RIGHT_LOGO_FILE};
use crate::config::{DateType, ModelInfo};
use crate::error::{PlotError, Result};
use crate::verif::table::{is_missing, FCST_HOUR, FCST_UNITS, MODEL, PLOT_DATE, STAT_VALUE};
use chrono::NaiveDateTime;
use image::RgbaImage;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use polars::prelude::DataFrame;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

const TITLE_FONT_SIZE: u32 = 20;
const PANEL_TITLE_FONT_SIZE: u32 = 15;
const LABEL_FONT_SIZE: u32 = 12;
const X_LABEL_AREA: i32 = 45;
const Y_LABEL_AREA: i32 = 110;

/// Baseline values: viridis-like ramp
const SEQUENTIAL_STOPS: [(u8, u8, u8); 3] = [(68, 1, 84), (33, 145, 140), (253, 231, 37)];
/// Differences from the baseline: blue-white-red
const DIVERGING_STOPS: [(u8, u8, u8); 3] = [(49, 54, 149), (255, 255, 255), (165, 0, 38)];

/// Owned drawing surface for one figure
pub struct RenderContext {
    width: u32,
    height: u32,
    buffer: Vec<u8>,
}

impl RenderContext {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            buffer: vec![255; (width as usize) * (height as usize) * 3],
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn drawing_area(&mut self) -> DrawingArea<BitMapBackend<'_>, Shift> {
        BitMapBackend::with_buffer(&mut self.buffer, (self.width, self.height)).into_drawing_area()
    }

    /// Encode the buffer as PNG at `path`
    ///
    /// On failure the partial file is removed and `path` is untouched.
    pub fn save_png(&self, path: &Path) -> Result<()> {
        let partial = partial_path(path);
        let written = image::save_buffer_with_format(
            &partial,
            &self.buffer,
            self.width,
            self.height,
            image::ColorType::Rgb8,
            image::ImageFormat::Png,
        )
        .map_err(PlotError::from)
        .and_then(|()| std::fs::rename(&partial, path).map_err(PlotError::from));

        if written.is_err() && partial.exists() {
            if let Err(e) = std::fs::remove_file(&partial) {
                log::warn!("Could not remove {}: {}", partial.display(), e);
            }
        }
        written
    }
}

/// `<dir>/.<name>.partial` beside the final image
fn partial_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.partial", name))
}

/// A corner logo image
#[derive(Debug, Clone)]
pub struct Logo {
    pub side: LogoSide,
    pub image: RgbaImage,
}

/// Load the left and right logos from `logo_dir`
///
/// Missing files are skipped; files that fail to decode are skipped with a warning.
pub fn load_logos(logo_dir: &Path) -> Vec<Logo> {
    let mut logos = Vec::new();
    for (side, file) in [
        (LogoSide::Left, LEFT_LOGO_FILE),
        (LogoSide::Right, RIGHT_LOGO_FILE),
    ] {
        let path = logo_dir.join(file);
        if !path.exists() {
            log::debug!("No logo at {}", path.display());
            continue;
        }
        match image::open(&path) {
            Ok(img) => logos.push(Logo {
                side,
                image: img.to_rgba8(),
            }),
            Err(e) => log::warn!("Could not read logo {}: {}", path.display(), e),
        }
    }
    logos
}

/// The single forecast unit shared by every row
///
/// Missing units are ignored. More than one distinct unit is fatal; none at
/// all yields an empty label.
pub fn forecast_units(table: &DataFrame) -> Result<String> {
    let units: BTreeSet<String> = table
        .column(FCST_UNITS)?
        .as_materialized_series()
        .str()?
        .into_iter()
        .flatten()
        .filter(|u| !is_missing(u))
        .map(|u| u.trim().to_string())
        .collect();

    match units.len() {
        0 => {
            log::warn!("Empty dataframe");
            Ok(String::new())
        }
        1 => Ok(units.into_iter().next().unwrap_or_default()),
        _ => Err(PlotError::DifferingUnits(units.into_iter().collect())),
    }
}

/// Statistic values keyed by model, then (forecast hour, plot date seconds)
type ModelValues = HashMap<String, HashMap<(i64, i64), f64>>;

fn stat_values(table: &DataFrame) -> Result<ModelValues> {
    let models = table.column(MODEL)?.as_materialized_series().str()?;
    let hours = table.column(FCST_HOUR)?.as_materialized_series().i64()?;
    let dates = table.column(PLOT_DATE)?.as_materialized_series().i64()?;
    let values = table.column(STAT_VALUE)?.as_materialized_series().f64()?;

    let mut out: ModelValues = HashMap::new();
    for (((model, hour), date), value) in models
        .into_iter()
        .zip(hours.into_iter())
        .zip(dates.into_iter())
        .zip(values.into_iter())
    {
        if let (Some(model), Some(hour), Some(date), Some(value)) = (model, hour, date, value) {
            out.entry(model.to_string())
                .or_default()
                .insert((hour, date), value);
        }
    }
    Ok(out)
}

/// Cell values for one panel
#[derive(Debug, Clone, Default)]
struct PanelCells {
    values: HashMap<(i64, i64), f64>,
    differenced: bool,
}

impl PanelCells {
    fn range(&self) -> (f64, f64) {
        if self.differenced {
            let m = self.values.values().fold(0.0_f64, |acc, v| acc.max(v.abs()));
            let m = if m > 0.0 { m } else { 1.0 };
            (-m, m)
        } else {
            let lo = self.values.values().copied().fold(f64::INFINITY, f64::min);
            let hi = self.values.values().copied().fold(f64::NEG_INFINITY, f64::max);
            if lo.is_finite() && hi > lo {
                (lo, hi)
            } else if lo.is_finite() {
                (lo - 1.0, lo + 1.0)
            } else {
                (0.0, 1.0)
            }
        }
    }

    fn color(&self, value: f64, range: (f64, f64)) -> RGBColor {
        let t = ((value - range.0) / (range.1 - range.0)).clamp(0.0, 1.0);
        let stops = if self.differenced {
            &DIVERGING_STOPS
        } else {
            &SEQUENTIAL_STOPS
        };
        ramp(stops, t)
    }
}

fn ramp(stops: &[(u8, u8, u8); 3], t: f64) -> RGBColor {
    let (a, b, local) = if t < 0.5 {
        (stops[0], stops[1], t * 2.0)
    } else {
        (stops[1], stops[2], (t - 0.5) * 2.0)
    };
    let lerp = |x: u8, y: u8| (f64::from(x) + (f64::from(y) - f64::from(x)) * local).round() as u8;
    RGBColor(lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
}

/// Everything the renderer needs besides the table
pub struct ChartRenderer<'a> {
    pub specs: &'a PlotSpecs,
    pub layout: &'a LayoutPlan,
    pub models: &'a [ModelInfo],
    pub forecast_hours: &'a [u32],
    pub plot_dates: &'a [NaiveDateTime],
    pub date_type: DateType,
    pub logos: &'a [Logo],
}

impl ChartRenderer<'_> {
    /// Validate units, draw the figure and write it to `path`
    pub fn render(&self, table: &DataFrame, title: &str, path: &Path) -> Result<()> {
        forecast_units(table)?;

        let (width, height) = self.layout.figure_px();
        let mut ctx = RenderContext::new(width, height);
        self.draw(&mut ctx, table, title)?;

        log::info!("Saving image as {}", path.display());
        ctx.save_png(path)
    }

    fn draw(&self, ctx: &mut RenderContext, table: &DataFrame, title: &str) -> Result<()> {
        let (width, height) = ctx.size();
        let fonts = fonts_available();
        if !fonts {
            log::warn!("No usable system font; drawing the chart without text");
        }

        let root = ctx.drawing_area();
        root.fill(&WHITE).map_err(PlotError::render)?;

        if fonts {
            let style = ("sans-serif", TITLE_FONT_SIZE)
                .into_font()
                .color(&BLACK)
                .pos(Pos::new(HPos::Center, VPos::Top));
            let line_height = (TITLE_FONT_SIZE + 4) as i32;
            for (i, line) in title.lines().enumerate() {
                root.draw(&Text::new(
                    line.to_string(),
                    ((width / 2) as i32, 10 + i as i32 * line_height),
                    &style,
                ))
                .map_err(PlotError::render)?;
            }
        }

        let Some(first) = self.models.first() else {
            return Err(PlotError::Config("no models to draw".to_string()));
        };
        let values = stat_values(table)?;
        let empty = HashMap::new();
        let baseline = values.get(&first.name).unwrap_or(&empty);

        let x_axis = forecast_hour_axis(self.forecast_hours, self.layout.x_tick_stride);
        let y_axis = date_axis(self.plot_dates, self.layout.y_tick_stride);
        let y_minor = minor_ticks(&y_axis, self.layout.date_axis.minor);

        for (idx, (model, rect)) in self
            .models
            .iter()
            .zip(self.layout.panel_rects())
            .enumerate()
        {
            let (panel_title, cells) = if idx == 0 {
                (
                    model.plot_name.clone(),
                    PanelCells {
                        values: baseline.clone(),
                        differenced: false,
                    },
                )
            } else {
                let model_values = values.get(&model.name).unwrap_or(&empty);
                let diffs = model_values
                    .iter()
                    .filter_map(|(key, v)| baseline.get(key).map(|b| (*key, v - b)))
                    .collect();
                (
                    format!("{}-{}", model.plot_name, first.plot_name),
                    PanelCells {
                        values: diffs,
                        differenced: true,
                    },
                )
            };

            let panel = Panel {
                idx,
                rect,
                title: &panel_title,
                cells: &cells,
                x_axis: &x_axis,
                y_axis: &y_axis,
                y_minor: &y_minor,
                fonts,
            };
            self.draw_panel(&root, &panel)?;
        }

        self.draw_logos(&root, width, height)?;
        root.present().map_err(PlotError::render)?;
        Ok(())
    }

    fn draw_panel(&self, root: &DrawingArea<BitMapBackend<'_>, Shift>, panel: &Panel) -> Result<()> {
        let grid = &self.layout.grid;
        let show_x = grid.shows_x_labels(panel.idx, self.layout.n_panels);
        let show_y = grid.shows_y_labels(panel.idx);

        let x_area = if show_x && panel.fonts { X_LABEL_AREA } else { 0 };
        let y_area = if show_y && panel.fonts { Y_LABEL_AREA } else { 0 };
        let rect = panel.rect;
        let left = (rect.x - y_area).max(0);
        let y_area = rect.x - left;
        let area = root.clone().shrink(
            (left, rect.y),
            (y_area + rect.width as i32, rect.height as i32 + x_area),
        );

        let mut chart = ChartBuilder::on(&area)
            .x_label_area_size(x_area)
            .y_label_area_size(y_area)
            .build_cartesian_2d(panel.x_axis.clone(), panel.y_axis.clone())
            .map_err(PlotError::render)?;

        // Heatmap cells
        let hours: Vec<f64> = self.forecast_hours.iter().map(|h| f64::from(*h)).collect();
        let dates: Vec<f64> = self.plot_dates.iter().map(timestamp).collect();
        let x_edges = cell_edges(&hours, panel.x_axis);
        let y_edges = cell_edges(&dates, panel.y_axis);
        let range = panel.cells.range();
        let mut cells = Vec::new();
        for (hi, hour) in self.forecast_hours.iter().enumerate() {
            for (di, date) in self.plot_dates.iter().enumerate() {
                let key = (i64::from(*hour), date.and_utc().timestamp());
                if let Some(v) = panel.cells.values.get(&key) {
                    cells.push(Rectangle::new(
                        [(x_edges[hi].0, y_edges[di].0), (x_edges[hi].1, y_edges[di].1)],
                        panel.cells.color(*v, range).filled(),
                    ));
                }
            }
        }
        chart.draw_series(cells).map_err(PlotError::render)?;

        // Grid: minor date lines, then major lines on both axes
        let (x_lo, x_hi) = (panel.x_axis.lo(), panel.x_axis.hi());
        let (y_lo, y_hi) = (panel.y_axis.lo(), panel.y_axis.hi());
        let light = BLACK.mix(0.08).stroke_width(1);
        let bold = BLACK.mix(0.3).stroke_width(1);
        chart
            .draw_series(
                panel
                    .y_minor
                    .iter()
                    .map(|y| PathElement::new(vec![(x_lo, *y), (x_hi, *y)], light)),
            )
            .map_err(PlotError::render)?;
        chart
            .draw_series(
                panel
                    .y_axis
                    .ticks()
                    .iter()
                    .map(|y| PathElement::new(vec![(x_lo, *y), (x_hi, *y)], bold)),
            )
            .map_err(PlotError::render)?;
        chart
            .draw_series(
                panel
                    .x_axis
                    .ticks()
                    .iter()
                    .map(|x| PathElement::new(vec![(*x, y_lo), (*x, y_hi)], bold)),
            )
            .map_err(PlotError::render)?;
        chart
            .plotting_area()
            .draw(&Rectangle::new([(x_lo, y_lo), (x_hi, y_hi)], BLACK.stroke_width(1)))
            .map_err(PlotError::render)?;

        if !panel.fonts {
            return Ok(());
        }

        let date_format = self.layout.date_axis.format;
        let hour_label = |v: &f64| format!("{}", v.round() as i64);
        let date_label = |v: &f64| {
            from_timestamp(*v)
                .map(|d| date_format.format(&d))
                .unwrap_or_default()
        };
        let blank = |_: &f64| String::new();
        let x_fmt: &dyn Fn(&f64) -> String = if show_x { &hour_label } else { &blank };
        let y_fmt: &dyn Fn(&f64) -> String = if show_y { &date_label } else { &blank };
        let y_desc = format!("{} Date", self.date_type.title());

        let mut mesh = chart.configure_mesh();
        mesh.disable_mesh()
            .x_label_formatter(x_fmt)
            .y_label_formatter(y_fmt)
            .label_style(("sans-serif", LABEL_FONT_SIZE));
        if show_x {
            mesh.x_desc("Forecast Hour");
        }
        if show_y {
            mesh.y_desc(y_desc);
        }
        mesh.draw().map_err(PlotError::render)?;

        let title_style = ("sans-serif", PANEL_TITLE_FONT_SIZE)
            .into_font()
            .color(&BLACK)
            .pos(Pos::new(HPos::Center, VPos::Bottom));
        root.draw(&Text::new(
            panel.title.to_string(),
            (rect.x + rect.width as i32 / 2, rect.y - 4),
            &title_style,
        ))
        .map_err(PlotError::render)?;
        Ok(())
    }

    fn draw_logos(
        &self,
        root: &DrawingArea<BitMapBackend<'_>, Shift>,
        width: u32,
        height: u32,
    ) -> Result<()> {
        let (fig_w, fig_h) = self.layout.fig_size;
        for logo in self.logos {
            let (lw, lh) = logo.image.dimensions();
            if lw > width || lh > height {
                log::warn!("Logo ({}x{}) larger than figure; skipped", lw, lh);
                continue;
            }
            let placement = self
                .specs
                .logo_location(logo.side, fig_w, fig_h, self.layout.dpi);
            let pos = logo_origin(logo.side, &placement, (lw, lh), (width, height));

            let rgb = blend_over_white(&logo.image, placement.alpha);
            if let Some(element) = BitMapElement::<(i32, i32)>::with_owned_buffer(pos, (lw, lh), rgb)
            {
                root.draw(&element).map_err(PlotError::render)?;
            }
        }
        Ok(())
    }
}

struct Panel<'p> {
    idx: usize,
    rect: PixelRect,
    title: &'p str,
    cells: &'p PanelCells,
    x_axis: &'p TickedAxis,
    y_axis: &'p TickedAxis,
    y_minor: &'p [f64],
    fonts: bool,
}

/// Top-left pixel of a logo inside a `figure`-sized canvas
///
/// Placement is measured from the lower-left corner; the left logo's x
/// offset is halved. The result is clamped so the logo fits.
fn logo_origin(
    side: LogoSide,
    placement: &LogoPlacement,
    logo: (u32, u32),
    figure: (u32, u32),
) -> (i32, i32) {
    let x = match side {
        LogoSide::Left => placement.x - placement.x * 0.5,
        LogoSide::Right => placement.x,
    };
    let top = f64::from(figure.1) - placement.y - f64::from(logo.1);
    (
        (x.round() as i32).clamp(0, figure.0.saturating_sub(logo.0) as i32),
        (top.round() as i32).clamp(0, figure.1.saturating_sub(logo.1) as i32),
    )
}

fn fonts_available() -> bool {
    ("sans-serif", LABEL_FONT_SIZE).into_font().box_size("0").is_ok()
}

/// Flatten RGBA over a white background at the given overall opacity
fn blend_over_white(image: &RgbaImage, alpha: f64) -> Vec<u8> {
    let mut out = Vec::with_capacity((image.width() * image.height() * 3) as usize);
    for px in image.pixels() {
        let a = alpha * f64::from(px[3]) / 255.0;
        for c in 0..3 {
            let v = f64::from(px[c]) * a + 255.0 * (1.0 - a);
            out.push(v.round() as u8);
        }
    }
    out
}
