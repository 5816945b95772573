//! Plot naming and decoration helpers
//!
//! Statistic display names, the figure title, the output image name and the
//! logo placement for the lead-by-date chart.

use crate::config::{DateInfo, PlotInfo};
use crate::error::Result;
use std::path::{Path, PathBuf};

pub const DEFAULT_DPI: u32 = 100;

/// Figure size (inches) for three or more panels
pub const LEAD_BY_DATE_FIG_SIZE: (f64, f64) = (14.0, 14.0);

pub const LEFT_LOGO_FILE: &str = "noaa.png";
pub const RIGHT_LOGO_FILE: &str = "nws.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoSide {
    Left,
    Right,
}

/// Logo position in pixels from the figure's lower-left corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogoPlacement {
    pub x: f64,
    pub y: f64,
    pub alpha: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlotSpecs {
    pub fig_size: (f64, f64),
    pub dpi: u32,
}

impl PlotSpecs {
    pub fn lead_by_date() -> Self {
        Self {
            fig_size: LEAD_BY_DATE_FIG_SIZE,
            dpi: DEFAULT_DPI,
        }
    }

    /// Display name for a statistic; unknown statistics are shown upper-cased
    pub fn stat_plot_name(&self, stat: &str) -> String {
        let stat = stat.trim().to_uppercase();
        let name = match stat.as_str() {
            "ACC" => "Anomaly Correlation Coefficient",
            "BIAS" => "Bias",
            "CSI" => "Critical Success Index",
            "ETS" => "Equitable Threat Score",
            "FAR" => "False Alarm Ratio",
            "FBAR" => "Forecast Mean",
            "FBAR_OBAR" => "Forecast and Observation Mean",
            "FBIAS" => "Frequency Bias",
            "FSS" => "Fractions Skill Score",
            "HSS" => "Heidke Skill Score",
            "MAE" => "Mean Absolute Error",
            "ME" => "Mean Error (Forecast - Observation)",
            "OBAR" => "Observation Mean",
            "POD" => "Probability of Detection",
            "RMSE" => "Root Mean Square Error",
            "S1" => "S1 Skill Score",
            _ => return stat,
        };
        name.to_string()
    }

    /// Three-line figure title
    pub fn plot_title(
        &self,
        plot_info: &PlotInfo,
        date_info: &DateInfo,
        units: &str,
    ) -> Result<String> {
        let mut var_line = format!("{} {}", plot_info.fcst_var_name, plot_info.fcst_var_level);
        if !units.is_empty() {
            var_line.push_str(&format!(" ({})", units));
        }
        if has_threshold(&plot_info.fcst_var_thresh) {
            var_line.push_str(&format!(", {}", plot_info.fcst_var_thresh));
        }
        var_line.push_str(&format!(", {}", plot_info.vx_mask));

        let (hr_start, hr_end, hr_inc) = date_info.hour_window();
        let date_line = format!(
            "{}: {}-{}, {:02}Z-{:02}Z every {}h",
            date_info.date_type.title(),
            date_info.start()?.format("%d%b%Y"),
            date_info.end()?.format("%d%b%Y"),
            hr_start,
            hr_end,
            hr_inc
        );

        Ok(format!(
            "{}\n{}\n{}",
            self.stat_plot_name(&plot_info.stat),
            var_line,
            date_line
        ))
    }

    /// Output image path inside `image_dir`
    pub fn savefig_name(
        &self,
        image_dir: &Path,
        plot_info: &PlotInfo,
        date_info: &DateInfo,
    ) -> PathBuf {
        let (hr_start, hr_end, _) = date_info.hour_window();
        let mut parts = vec![
            plot_info.stat.clone(),
            plot_info.fcst_var_name.clone(),
            plot_info.fcst_var_level.clone(),
        ];
        if has_threshold(&plot_info.fcst_var_thresh) {
            parts.push(threshold_word(&plot_info.fcst_var_thresh));
        }
        parts.push(plot_info.vx_mask.clone());
        parts.push(format!(
            "{}{}to{}",
            date_info.date_type.as_str(),
            date_info.start_date,
            date_info.end_date
        ));
        parts.push(format!("{:02}Zto{:02}Z", hr_start, hr_end));
        parts.push("leadbydate".to_string());

        let stem = sanitize(&parts.join("_"));
        image_dir.join(format!("{}.png", stem))
    }

    /// Logo offset for a figure of `fig_w` x `fig_h` inches
    pub fn logo_location(&self, side: LogoSide, fig_w: f64, fig_h: f64, dpi: u32) -> LogoPlacement {
        let dpi = f64::from(dpi);
        // Wide figures have a lower grid top (0.825 vs 0.9)
        let y_frac = if fig_h < fig_w { 0.858 } else { 0.92 };
        let x_frac = match side {
            LogoSide::Left => 0.05,
            LogoSide::Right => 0.88,
        };
        LogoPlacement {
            x: fig_w * dpi * x_frac,
            y: fig_h * dpi * y_frac,
            alpha: 0.5,
        }
    }
}

fn has_threshold(thresh: &str) -> bool {
    let t = thresh.trim();
    !t.is_empty() && !t.eq_ignore_ascii_case("na")
}

/// Spell comparison operators as words (">=5" -> "ge5")
fn threshold_word(thresh: &str) -> String {
    let mut out = thresh.trim().to_string();
    for (symbol, word) in [
        (">=", "ge"),
        ("<=", "le"),
        ("==", "eq"),
        ("!=", "ne"),
        (">", "gt"),
        ("<", "lt"),
    ] {
        out = out.replace(symbol, word);
    }
    out
}

fn sanitize(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::sample_config;

    #[test]
    fn test_stat_plot_name() {
        let specs = PlotSpecs::lead_by_date();
        assert_eq!(specs.stat_plot_name("rmse"), "Root Mean Square Error");
        assert_eq!(specs.stat_plot_name("ACC"), "Anomaly Correlation Coefficient");
        assert_eq!(specs.stat_plot_name("custom"), "CUSTOM");
    }

    #[test]
    fn test_plot_title() {
        let config = sample_config(1);
        let specs = PlotSpecs::lead_by_date();

        let title = specs
            .plot_title(&config.plot_info, &config.date_info, "gpm")
            .unwrap();
        let lines: Vec<&str> = title.lines().collect();
        assert_eq!(lines[0], "Root Mean Square Error");
        assert_eq!(lines[1], "HGT P500 (gpm), NHX");
        assert_eq!(lines[2], "Valid: 01Jan2024-05Jan2024, 00Z-00Z every 24h");

        let title = specs
            .plot_title(&config.plot_info, &config.date_info, "")
            .unwrap();
        assert!(title.contains("HGT P500, NHX"));
    }

    #[test]
    fn test_savefig_name() {
        let mut config = sample_config(1);
        let specs = PlotSpecs::lead_by_date();
        let path = specs.savefig_name(Path::new("/out/images"), &config.plot_info, &config.date_info);
        assert_eq!(
            path,
            PathBuf::from(
                "/out/images/rmse_hgt_p500_nhx_valid20240101to20240105_00zto00z_leadbydate.png"
            )
        );

        config.plot_info.fcst_var_thresh = ">=5".to_string();
        let path = specs.savefig_name(Path::new("img"), &config.plot_info, &config.date_info);
        assert!(path.to_string_lossy().contains("_ge5_"));
    }

    #[test]
    fn test_logo_location() {
        let specs = PlotSpecs::lead_by_date();
        let left = specs.logo_location(LogoSide::Left, 14.0, 7.0, 100);
        let right = specs.logo_location(LogoSide::Right, 14.0, 7.0, 100);
        assert!(left.x < right.x);
        assert_eq!(left.y, right.y);
        assert!((right.x - 1232.0).abs() < 1e-9);
        assert_eq!(left.alpha, 0.5);
    }
}
