//! Long-form verification table assembly
//!
//! For each forecast hour the assembler produces one row per
//! `(model, plot date)`. Rows without a matching stat record keep null units
//! and values so every model spans the full date axis. Per-hour tables are
//! then stacked into one combined table keyed by `FCST_HOUR`.

use super::dates::DatePairs;
use super::stat_file::{format_lead, StatStore};
use crate::config::{ModelInfo, PlotInfo};
use crate::error::Result;
use polars::prelude::*;
use std::collections::HashMap;

pub const FCST_HOUR: &str = "FCST_HOUR";
pub const MODEL: &str = "MODEL";
pub const PLOT_DATE: &str = "PLOT_DATE";
pub const VALID_DATE: &str = "VALID_DATE";
pub const INIT_DATE: &str = "INIT_DATE";
pub const FCST_UNITS: &str = "FCST_UNITS";
pub const STAT_VALUE: &str = "STAT_VALUE";

/// Index key: (model, lead, valid begin), lower-cased model
type RecordKey = (String, String, String);

/// Builds per-forecast-hour tables from a loaded stat store
pub struct TableAssembler<'a> {
    store: &'a StatStore,
    models: &'a [ModelInfo],
    plot_info: &'a PlotInfo,
    stat_column: String,
    index: HashMap<RecordKey, Vec<(usize, usize)>>,
}

impl<'a> TableAssembler<'a> {
    pub fn new(store: &'a StatStore, models: &'a [ModelInfo], plot_info: &'a PlotInfo) -> Self {
        let mut index: HashMap<RecordKey, Vec<(usize, usize)>> = HashMap::new();
        for (file_idx, file) in store.files.iter().enumerate() {
            for row in 0..file.len() {
                let (Some(model), Some(lead), Some(valid)) = (
                    file.get(row, "MODEL"),
                    file.get(row, "FCST_LEAD"),
                    file.get(row, "FCST_VALID_BEG"),
                ) else {
                    continue;
                };
                index
                    .entry((model.to_lowercase(), lead.to_string(), valid.to_string()))
                    .or_default()
                    .push((file_idx, row));
            }
        }

        let stat_column = plot_info.stat.trim().to_uppercase();
        if !store.files.is_empty() && !store.files.iter().any(|f| f.has_column(&stat_column)) {
            log::warn!("No stat file has a {} column", stat_column);
        }

        Self {
            store,
            models,
            plot_info,
            stat_column,
            index,
        }
    }

    /// Assemble the table for one forecast hour
    pub fn build(&self, pairs: &DatePairs) -> Result<DataFrame> {
        if pairs.is_empty() {
            log::warn!("Forecast hour {}: no dates in window", pairs.forecast_hour);
            return empty_table();
        }
        let lead = format_lead(pairs.forecast_hour);
        let valid_strs = pairs.formatted_valid();
        let init_strs = pairs.formatted_init();
        let plot_dates = pairs.plot_dates();

        let n = self.models.len() * pairs.len();
        let mut hours: Vec<i64> = Vec::with_capacity(n);
        let mut model_names: Vec<String> = Vec::with_capacity(n);
        let mut plot_ts: Vec<i64> = Vec::with_capacity(n);
        let mut valid_col: Vec<String> = Vec::with_capacity(n);
        let mut init_col: Vec<String> = Vec::with_capacity(n);
        let mut units: Vec<Option<String>> = Vec::with_capacity(n);
        let mut values: Vec<Option<f64>> = Vec::with_capacity(n);

        let mut matched = 0usize;
        for model in self.models {
            for (i, valid) in valid_strs.iter().enumerate() {
                let record = self.find_record(model, &lead, valid);
                if record.is_some() {
                    matched += 1;
                }
                let (unit, value) = record.unwrap_or((None, None));

                hours.push(i64::from(pairs.forecast_hour));
                model_names.push(model.name.clone());
                plot_ts.push(plot_dates[i].and_utc().timestamp());
                valid_col.push(valid.clone());
                init_col.push(init_strs[i].clone());
                units.push(unit);
                values.push(value);
            }
        }

        log::debug!(
            "Forecast hour {}: matched {} of {} model/date rows",
            pairs.forecast_hour,
            matched,
            n
        );

        let df = df! {
            FCST_HOUR => hours,
            MODEL => model_names,
            PLOT_DATE => plot_ts,
            VALID_DATE => valid_col,
            INIT_DATE => init_col,
            FCST_UNITS => units,
            STAT_VALUE => values,
        }?;
        Ok(df)
    }

    /// First record matching every filter; (units, stat value)
    fn find_record(
        &self,
        model: &ModelInfo,
        lead: &str,
        valid: &str,
    ) -> Option<(Option<String>, Option<f64>)> {
        let key = (model.name.to_lowercase(), lead.to_string(), valid.to_string());
        let candidates = self.index.get(&key)?;

        let p = self.plot_info;
        let filters: [(&str, &str); 11] = [
            ("OBTYPE", model.obs_name.as_str()),
            ("FCST_VAR", p.fcst_var_name.as_str()),
            ("FCST_LEV", p.fcst_var_level.as_str()),
            ("FCST_THRESH", p.fcst_var_thresh.as_str()),
            ("OBS_VAR", p.obs_var_name.as_str()),
            ("OBS_LEV", p.obs_var_level.as_str()),
            ("OBS_THRESH", p.obs_var_thresh.as_str()),
            ("LINE_TYPE", p.line_type.as_str()),
            ("VX_MASK", p.vx_mask.as_str()),
            ("INTERP_MTHD", p.interp_method.as_str()),
            ("INTERP_PNTS", p.interp_points.as_str()),
        ];

        let mut hits = candidates.iter().filter(|(file_idx, row)| {
            let file = &self.store.files[*file_idx];
            filters.iter().all(|(column, wanted)| {
                file.get(*row, column)
                    .map(|v| v.eq_ignore_ascii_case(wanted.trim()))
                    .unwrap_or(false)
            })
        });

        let (file_idx, row) = *hits.next()?;
        let extra = hits.count();
        if extra > 0 {
            log::debug!(
                "{} duplicate record(s) for {} lead {} valid {}; using first",
                extra,
                model.name,
                lead,
                valid
            );
        }

        let file = &self.store.files[file_idx];
        let unit = file
            .get(row, "FCST_UNITS")
            .filter(|u| !is_missing(u))
            .map(str::to_string);
        let value = file
            .get(row, &self.stat_column)
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite());
        Some((unit, value))
    }
}

/// MET and pandas spellings of a missing value
pub fn is_missing(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || v.eq_ignore_ascii_case("na") || v.eq_ignore_ascii_case("nan")
}

/// A table with the assembled schema and no rows
pub fn empty_table() -> Result<DataFrame> {
    let df = df! {
        FCST_HOUR => Vec::<i64>::new(),
        MODEL => Vec::<String>::new(),
        PLOT_DATE => Vec::<i64>::new(),
        VALID_DATE => Vec::<String>::new(),
        INIT_DATE => Vec::<String>::new(),
        FCST_UNITS => Vec::<Option<String>>::new(),
        STAT_VALUE => Vec::<Option<f64>>::new(),
    }?;
    Ok(df)
}

/// Stack per-forecast-hour tables into one combined table
pub fn concat_tables(tables: Vec<DataFrame>) -> Result<DataFrame> {
    let mut iter = tables.into_iter();
    let mut combined = match iter.next() {
        Some(first) => first,
        None => return empty_table(),
    };
    for table in iter {
        combined.vstack_mut(&table)?;
    }
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::sample_config;
    use crate::verif::dates::plot_dates;
    use crate::verif::stat_file::tests::{row, HEADER};
    use crate::verif::stat_file::StatFile;

    fn store(rows: &[String]) -> StatStore {
        let text = format!("{}\n{}\n", HEADER, rows.join("\n"));
        StatStore {
            files: vec![StatFile::parse("t.stat", &text).unwrap()],
        }
    }

    #[test]
    fn test_build_fills_missing_rows() {
        let config = sample_config(2);
        let store = store(&[
            row("model1", "anl1", "240000", "20240101_000000", "gpm", "12.5"),
            row("model1", "anl1", "240000", "20240103_000000", "gpm", "NA"),
            row("model2", "anl2", "240000", "20240102_000000", "gpm", "9.0"),
            // wrong lead, must not match
            row("model2", "anl2", "480000", "20240101_000000", "m", "1.0"),
        ]);
        let assembler = TableAssembler::new(&store, &config.models, &config.plot_info);
        let pairs = plot_dates(&config.date_info, 24).unwrap();

        let df = assembler.build(&pairs).unwrap();
        assert_eq!(df.height(), 10);

        let units: Vec<Option<&str>> = df
            .column(FCST_UNITS)
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(units.iter().filter(|u| u.is_some()).count(), 3);
        assert_eq!(units[0], Some("gpm"));
        assert_eq!(units[1], None);

        let values: Vec<Option<f64>> = df
            .column(STAT_VALUE)
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(values[0], Some(12.5));
        // NA statistic keeps the units but no value
        assert_eq!(values[2], None);
        assert_eq!(values[6], Some(9.0));
    }

    #[test]
    fn test_obs_name_must_match() {
        let config = sample_config(1);
        let store = store(&[row(
            "model1",
            "other_anl",
            "000000",
            "20240101_000000",
            "gpm",
            "1.0",
        )]);
        let assembler = TableAssembler::new(&store, &config.models, &config.plot_info);
        let pairs = plot_dates(&config.date_info, 0).unwrap();
        let df = assembler.build(&pairs).unwrap();
        assert_eq!(
            df.column(FCST_UNITS)
                .unwrap()
                .as_materialized_series()
                .null_count(),
            df.height()
        );
    }

    #[test]
    fn test_empty_date_window_gives_empty_table() {
        let config = sample_config(2);
        let store = StatStore::default();
        let assembler = TableAssembler::new(&store, &config.models, &config.plot_info);
        let mut pairs = plot_dates(&config.date_info, 0).unwrap();
        pairs.valid.clear();
        pairs.init.clear();

        let df = assembler.build(&pairs).unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), 7);
    }

    #[test]
    fn test_concat_tables() {
        let config = sample_config(1);
        let store = StatStore::default();
        let assembler = TableAssembler::new(&store, &config.models, &config.plot_info);

        let tables: Vec<DataFrame> = config
            .date_info
            .forecast_hours
            .iter()
            .map(|fhr| assembler.build(&plot_dates(&config.date_info, *fhr).unwrap()).unwrap())
            .collect();
        let combined = concat_tables(tables).unwrap();
        assert_eq!(combined.height(), 15);

        let hours: Vec<Option<i64>> = combined
            .column(FCST_HOUR)
            .unwrap()
            .as_materialized_series()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(hours[0], Some(0));
        assert_eq!(hours[14], Some(48));

        assert_eq!(concat_tables(Vec::new()).unwrap().height(), 0);
    }

    #[test]
    fn test_is_missing() {
        assert!(is_missing("NA"));
        assert!(is_missing("nan"));
        assert!(is_missing(" "));
        assert!(!is_missing("K"));
    }
}
