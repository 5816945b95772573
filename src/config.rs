//! Run configuration
//!
//! A run is described by one JSON file holding the model, date, plot and MET
//! information blocks. Directories may also be overridden from the command line.
//!
//! ```json
//! {
//!   "input_dir": "/path/to/stats",
//!   "output_dir": "/path/to/out",
//!   "logo_dir": "/path/to/logos",
//!   "models": [{ "name": "gfs", "plot_name": "GFS", "obs_name": "gfs_anl" }],
//!   "date_info": { "date_type": "VALID", "start_date": "20240101", ... },
//!   "plot_info": { "line_type": "SL1L2", "stat": "RMSE", ... },
//!   "met_info": { "root": "/path/to/MET", "version": "10.1.1" }
//! }
//! ```

use crate::error::{PlotError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which of the date pair is plotted on the calendar axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DateType {
    Valid,
    Init,
}

impl DateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "VALID",
            Self::Init => "INIT",
        }
    }

    /// Title-cased name, used for axis labels ("Valid Date")
    pub fn title(&self) -> &'static str {
        match self {
            Self::Valid => "Valid",
            Self::Init => "Init",
        }
    }
}

impl std::fmt::Display for DateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event equalization switch
///
/// Parsed and carried through the run, but not applied to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum EventEqualization {
    Yes,
    #[default]
    No,
}

impl EventEqualization {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "YES" | "TRUE" => Self::Yes,
            _ => Self::No,
        }
    }
}

impl From<String> for EventEqualization {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

/// One configured model; its position in the list is the panel order
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub plot_name: String,
    pub obs_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DateInfo {
    pub date_type: DateType,
    /// `YYYYMMDD`
    pub start_date: String,
    /// `YYYYMMDD`
    pub end_date: String,
    pub valid_hr_start: u32,
    pub valid_hr_end: u32,
    pub valid_hr_inc: u32,
    pub init_hr_start: u32,
    pub init_hr_end: u32,
    pub init_hr_inc: u32,
    pub forecast_hours: Vec<u32>,
}

impl DateInfo {
    /// (start hour, end hour, increment in hours) of the plotted date type
    pub fn hour_window(&self) -> (u32, u32, u32) {
        match self.date_type {
            DateType::Valid => (self.valid_hr_start, self.valid_hr_end, self.valid_hr_inc),
            DateType::Init => (self.init_hr_start, self.init_hr_end, self.init_hr_inc),
        }
    }

    pub fn start(&self) -> Result<NaiveDate> {
        parse_ymd("start_date", &self.start_date)
    }

    pub fn end(&self) -> Result<NaiveDate> {
        parse_ymd("end_date", &self.end_date)
    }
}

fn parse_ymd(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y%m%d").map_err(|e| {
        PlotError::Config(format!("{} '{}' is not YYYYMMDD: {}", field, value, e))
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlotInfo {
    pub line_type: String,
    #[serde(default)]
    pub grid: String,
    pub stat: String,
    pub vx_mask: String,
    #[serde(default)]
    pub event_equalization: EventEqualization,
    pub interp_method: String,
    pub interp_points: String,
    pub fcst_var_name: String,
    pub fcst_var_level: String,
    #[serde(default = "na")]
    pub fcst_var_thresh: String,
    pub obs_var_name: String,
    pub obs_var_level: String,
    #[serde(default = "na")]
    pub obs_var_thresh: String,
}

fn na() -> String {
    "NA".to_string()
}

/// MET tool information; logged for provenance only
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetInfo {
    #[serde(default)]
    pub root: String,
    #[serde(default)]
    pub version: String,
}

fn current_dir() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    #[serde(default = "current_dir")]
    pub input_dir: PathBuf,
    #[serde(default = "current_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "current_dir")]
    pub logo_dir: PathBuf,
    pub models: Vec<ModelInfo>,
    pub date_info: DateInfo,
    pub plot_info: PlotInfo,
    #[serde(default)]
    pub met_info: MetInfo,
}

impl RunConfig {
    /// Load and validate configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            PlotError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: RunConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations no run could succeed with
    ///
    /// The panel upper bound is left to the layout planner, which owns the grid table.
    pub fn validate(&self) -> Result<()> {
        if self.models.is_empty() {
            return Err(PlotError::Config("no models configured".to_string()));
        }
        let dates = &self.date_info;
        if dates.forecast_hours.is_empty() {
            return Err(PlotError::Config("no forecast hours configured".to_string()));
        }
        if let Some(pair) = dates.forecast_hours.windows(2).find(|w| w[0] >= w[1]) {
            return Err(PlotError::Config(format!(
                "forecast_hours must be strictly ascending ({} then {})",
                pair[0], pair[1]
            )));
        }
        let start = dates.start()?;
        let end = dates.end()?;
        if end < start {
            return Err(PlotError::Config(format!(
                "end_date {} is before start_date {}",
                dates.end_date, dates.start_date
            )));
        }
        for (name, hour) in [
            ("valid_hr_start", dates.valid_hr_start),
            ("valid_hr_end", dates.valid_hr_end),
            ("init_hr_start", dates.init_hr_start),
            ("init_hr_end", dates.init_hr_end),
        ] {
            if hour > 23 {
                return Err(PlotError::Config(format!(
                    "{} must be an hour of day (0-23), got {}",
                    name, hour
                )));
            }
        }
        let (_, _, inc) = dates.hour_window();
        if inc == 0 {
            return Err(PlotError::Config(format!(
                "{}_hr_inc must be greater than zero",
                dates.date_type.as_str().to_lowercase()
            )));
        }
        Ok(())
    }

    pub fn image_dir(&self) -> PathBuf {
        self.output_dir.join("images")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.output_dir.join("logs")
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_json(n_models: usize) -> String {
        let models: Vec<String> = (1..=n_models)
            .map(|i| {
                format!(
                    r#"{{"name": "model{i}", "plot_name": "MODEL{i}", "obs_name": "anl{i}"}}"#
                )
            })
            .collect();
        format!(
            r#"{{
                "models": [{}],
                "date_info": {{
                    "date_type": "VALID",
                    "start_date": "20240101",
                    "end_date": "20240105",
                    "valid_hr_start": 0, "valid_hr_end": 0, "valid_hr_inc": 24,
                    "init_hr_start": 0, "init_hr_end": 0, "init_hr_inc": 24,
                    "forecast_hours": [0, 24, 48]
                }},
                "plot_info": {{
                    "line_type": "CNT",
                    "grid": "G004",
                    "stat": "RMSE",
                    "vx_mask": "NHX",
                    "event_equalization": "NO",
                    "interp_method": "NEAREST",
                    "interp_points": "1",
                    "fcst_var_name": "HGT",
                    "fcst_var_level": "P500",
                    "obs_var_name": "HGT",
                    "obs_var_level": "P500"
                }},
                "met_info": {{"root": "/opt/met", "version": "10.1.1"}}
            }}"#,
            models.join(",")
        )
    }

    pub(crate) fn sample_config(n_models: usize) -> RunConfig {
        RunConfig::from_json(&sample_json(n_models)).unwrap()
    }

    #[test]
    fn test_parse_sample_config() {
        let config = sample_config(2);
        assert_eq!(config.models.len(), 2);
        assert_eq!(config.models[1].plot_name, "MODEL2");
        assert_eq!(config.date_info.date_type, DateType::Valid);
        assert_eq!(config.date_info.hour_window(), (0, 0, 24));
        assert_eq!(config.plot_info.fcst_var_thresh, "NA");
        assert_eq!(config.plot_info.event_equalization, EventEqualization::No);
        assert_eq!(config.input_dir, PathBuf::from("."));
        assert_eq!(config.image_dir(), PathBuf::from("./images"));
    }

    #[test]
    fn test_event_equalization_parse() {
        assert_eq!(EventEqualization::parse("YES"), EventEqualization::Yes);
        assert_eq!(EventEqualization::parse("yes "), EventEqualization::Yes);
        assert_eq!(EventEqualization::parse("NO"), EventEqualization::No);
        assert_eq!(EventEqualization::parse(""), EventEqualization::No);
    }

    #[test]
    fn test_rejects_empty_models() {
        let json = sample_json(0);
        assert!(matches!(
            RunConfig::from_json(&json),
            Err(PlotError::Config(_))
        ));
    }

    #[test]
    fn test_rejects_bad_dates_and_hours() {
        let json = sample_json(1).replace("\"20240105\"", "\"2024-01-05\"");
        assert!(RunConfig::from_json(&json).is_err());

        let json = sample_json(1).replace("\"end_date\": \"20240105\"", "\"end_date\": \"20231231\"");
        assert!(RunConfig::from_json(&json).is_err());

        let json = sample_json(1).replace("\"valid_hr_start\": 0", "\"valid_hr_start\": 24");
        assert!(RunConfig::from_json(&json).is_err());

        let json = sample_json(1).replace("\"valid_hr_inc\": 24", "\"valid_hr_inc\": 0");
        assert!(RunConfig::from_json(&json).is_err());
    }

    #[test]
    fn test_rejects_unordered_forecast_hours() {
        let json = sample_json(1).replace("[0, 24, 48]", "[48, 0, 24]");
        assert!(matches!(
            RunConfig::from_json(&json),
            Err(PlotError::Config(_))
        ));

        let json = sample_json(1).replace("[0, 24, 48]", "[0, 24, 24]");
        assert!(RunConfig::from_json(&json).is_err());

        let json = sample_json(1).replace("[0, 24, 48]", "[6]");
        assert!(RunConfig::from_json(&json).is_ok());
    }

    #[test]
    fn test_init_date_type_uses_init_window() {
        let json = sample_json(1)
            .replace("\"VALID\"", "\"INIT\"")
            .replace("\"init_hr_inc\": 24", "\"init_hr_inc\": 12");
        let config = RunConfig::from_json(&json).unwrap();
        assert_eq!(config.date_info.date_type, DateType::Init);
        assert_eq!(config.date_info.hour_window(), (0, 0, 12));
        assert_eq!(config.date_info.date_type.title(), "Init");
    }
}
