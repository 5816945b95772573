//! Lead-by-date chart pipeline
//!
//! The pipeline:
//! 1. Loads the stat files matching the configured grid
//! 2. Builds the date pairs and the table for every forecast hour
//! 3. Stacks the per-hour tables and plans the panel layout
//! 4. Renders the chart and writes it under `<output_dir>/images`

use crate::config::{EventEqualization, RunConfig};
use crate::error::Result;
use crate::plotting::{forecast_units, load_logos, ChartRenderer, LayoutPlan, PlotSpecs};
use crate::verif::dates::format_dates;
use crate::verif::table::STAT_VALUE;
use crate::verif::{concat_tables, plot_dates, StatStore, TableAssembler};
use std::path::PathBuf;

/// Build the chart for a run; returns the written image path
pub fn make_lead_by_date(config: &RunConfig) -> Result<PathBuf> {
    let date_info = &config.date_info;
    let plot_info = &config.plot_info;

    log::info!("Creating lead by date plot");
    log::debug!(
        "Models: {}",
        config
            .models
            .iter()
            .map(|m| m.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    log::debug!("Date info: {:?}", date_info);
    log::debug!("Plot info: {:?}", plot_info);

    let image_dir = config.image_dir();
    std::fs::create_dir_all(&image_dir)?;

    let store = StatStore::load_dir(&config.input_dir, &plot_info.grid)?;
    log::debug!(
        "Loaded {} stat file(s), {} row(s)",
        store.files.len(),
        store.total_rows()
    );
    let assembler = TableAssembler::new(&store, &config.models, plot_info);

    let mut tables = Vec::with_capacity(date_info.forecast_hours.len());
    let mut last_pairs = None;
    for &fhr in &date_info.forecast_hours {
        let pairs = plot_dates(date_info, fhr)?;
        log::debug!(
            "Forecast hour {}: valid dates {}",
            fhr,
            format_dates(&pairs.valid).join(", ")
        );
        log::debug!(
            "Forecast hour {}: init dates {}",
            fhr,
            format_dates(&pairs.init).join(", ")
        );

        let table = assembler.build(&pairs)?;
        if table.column(STAT_VALUE)?.as_materialized_series().null_count() == table.height() {
            log::warn!("Forecast hour {}: no matching records", fhr);
        }
        tables.push(table);
        last_pairs = Some(pairs);
    }
    let combined = concat_tables(tables)?;

    // Every hour shares the primary date sequence
    let plot_dates = last_pairs
        .map(|p| p.plot_dates().to_vec())
        .unwrap_or_default();

    let specs = PlotSpecs::lead_by_date();
    let layout = LayoutPlan::compute(
        config.models.len(),
        specs.fig_size,
        specs.dpi,
        &date_info.forecast_hours,
        &plot_dates,
    )?;
    log::debug!(
        "Layout: {}x{} grid, x stride {}, y stride {}, {:?} dates",
        layout.grid.rows,
        layout.grid.cols,
        layout.x_tick_stride,
        layout.y_tick_stride,
        layout.date_axis.format
    );

    if plot_info.event_equalization == EventEqualization::Yes {
        log::warn!("Event equalization requested but not applied");
    }

    let units = forecast_units(&combined)?;
    let title = specs.plot_title(plot_info, date_info, &units)?;
    let image_path = specs.savefig_name(&image_dir, plot_info, date_info);
    let logos = load_logos(&config.logo_dir);

    let renderer = ChartRenderer {
        specs: &specs,
        layout: &layout,
        models: &config.models,
        forecast_hours: &date_info.forecast_hours,
        plot_dates: &plot_dates,
        date_type: date_info.date_type,
        logos: &logos,
    };
    renderer.render(&combined, &title, &image_path)?;

    if !config.met_info.root.is_empty() || !config.met_info.version.is_empty() {
        log::debug!(
            "MET root {} version {}",
            config.met_info.root,
            config.met_info.version
        );
    }
    Ok(image_path)
}
