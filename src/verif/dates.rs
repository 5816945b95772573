//! Valid/init date pairs for one forecast hour

use crate::config::{DateInfo, DateType};
use crate::error::{PlotError, Result};
use chrono::{Duration, NaiveDateTime, NaiveTime};

/// Timestamp format used by MET stat files and in log output
pub const STAT_DATE_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Paired valid and init dates, index-aligned
#[derive(Debug, Clone, PartialEq)]
pub struct DatePairs {
    pub date_type: DateType,
    pub forecast_hour: u32,
    pub valid: Vec<NaiveDateTime>,
    pub init: Vec<NaiveDateTime>,
}

impl DatePairs {
    /// The dates shown on the calendar axis
    pub fn plot_dates(&self) -> &[NaiveDateTime] {
        match self.date_type {
            DateType::Valid => &self.valid,
            DateType::Init => &self.init,
        }
    }

    pub fn len(&self) -> usize {
        self.valid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.valid.is_empty()
    }

    pub fn formatted_valid(&self) -> Vec<String> {
        format_dates(&self.valid)
    }

    pub fn formatted_init(&self) -> Vec<String> {
        format_dates(&self.init)
    }
}

pub fn format_dates(dates: &[NaiveDateTime]) -> Vec<String> {
    dates
        .iter()
        .map(|d| d.format(STAT_DATE_FORMAT).to_string())
        .collect()
}

/// Build the date pairs for a forecast hour
///
/// The plotted sequence runs from `start_date` at the window's start hour to
/// `end_date` at its end hour, inclusive, every increment hours. The companion
/// sequence is shifted by the forecast hour.
pub fn plot_dates(date_info: &DateInfo, forecast_hour: u32) -> Result<DatePairs> {
    let (hr_start, hr_end, hr_inc) = date_info.hour_window();
    if hr_inc == 0 {
        return Err(PlotError::Config(
            "date increment must be greater than zero".to_string(),
        ));
    }

    let start = date_info.start()?.and_time(hour_of_day(hr_start)?);
    let end = date_info.end()?.and_time(hour_of_day(hr_end)?);
    if end < start {
        return Err(PlotError::Config(format!(
            "date window ends ({}) before it starts ({})",
            end.format(STAT_DATE_FORMAT),
            start.format(STAT_DATE_FORMAT)
        )));
    }

    let step = Duration::hours(i64::from(hr_inc));
    let mut primary = Vec::new();
    let mut current = start;
    while current <= end {
        primary.push(current);
        current += step;
    }

    let lead = Duration::hours(i64::from(forecast_hour));
    let companion: Vec<NaiveDateTime> = match date_info.date_type {
        DateType::Valid => primary.iter().map(|d| *d - lead).collect(),
        DateType::Init => primary.iter().map(|d| *d + lead).collect(),
    };

    let (valid, init) = match date_info.date_type {
        DateType::Valid => (primary, companion),
        DateType::Init => (companion, primary),
    };

    Ok(DatePairs {
        date_type: date_info.date_type,
        forecast_hour,
        valid,
        init,
    })
}

fn hour_of_day(hour: u32) -> Result<NaiveTime> {
    NaiveTime::from_hms_opt(hour, 0, 0)
        .ok_or_else(|| PlotError::Config(format!("{} is not an hour of day", hour)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::sample_config;

    #[test]
    fn test_valid_dates_daily() {
        let config = sample_config(1);
        let pairs = plot_dates(&config.date_info, 24).unwrap();

        assert_eq!(pairs.len(), 5);
        assert_eq!(
            pairs.formatted_valid(),
            vec![
                "20240101_000000",
                "20240102_000000",
                "20240103_000000",
                "20240104_000000",
                "20240105_000000"
            ]
        );
        assert_eq!(pairs.formatted_init()[0], "20231231_000000");
        assert_eq!(pairs.plot_dates(), pairs.valid.as_slice());
    }

    #[test]
    fn test_init_dates_shift_forward() {
        let mut config = sample_config(1);
        config.date_info.date_type = DateType::Init;
        config.date_info.init_hr_start = 0;
        config.date_info.init_hr_end = 12;
        config.date_info.init_hr_inc = 12;
        config.date_info.end_date = "20240102".to_string();

        let pairs = plot_dates(&config.date_info, 6).unwrap();

        assert_eq!(
            pairs.formatted_init(),
            vec![
                "20240101_000000",
                "20240101_120000",
                "20240102_000000",
                "20240102_120000"
            ]
        );
        assert_eq!(pairs.formatted_valid()[1], "20240101_180000");
        assert_eq!(pairs.plot_dates(), pairs.init.as_slice());
    }

    #[test]
    fn test_single_day_window() {
        let mut config = sample_config(1);
        config.date_info.end_date = "20240101".to_string();
        let pairs = plot_dates(&config.date_info, 0).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs.valid, pairs.init);
    }

    #[test]
    fn test_zero_increment_rejected() {
        let mut config = sample_config(1);
        config.date_info.valid_hr_inc = 0;
        assert!(matches!(
            plot_dates(&config.date_info, 0),
            Err(PlotError::Config(_))
        ));
    }
}
