//! Axis coordinates with explicit major tick positions
//!
//! Plotters picks its own "nice" key points for numeric ranges. The chart
//! needs ticks at every n-th forecast hour and every n-th plot date instead,
//! so `TickedAxis` is a linear f64 range whose key points are supplied.

use super::layout::MinorTicks;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use plotters::coord::ranged1d::{DefaultFormatting, KeyPointHint, Ranged};
use std::ops::Range;

/// Upper bound on generated minor grid lines per axis
const MAX_MINOR_TICKS: usize = 2000;

#[derive(Debug, Clone, PartialEq)]
pub struct TickedAxis {
    lo: f64,
    hi: f64,
    ticks: Vec<f64>,
}

impl TickedAxis {
    /// A degenerate range (lo == hi) is widened by `pad` on both sides
    pub fn new(lo: f64, hi: f64, ticks: Vec<f64>, pad: f64) -> Self {
        let (lo, hi) = if hi > lo { (lo, hi) } else { (lo - pad, hi + pad) };
        Self { lo, hi, ticks }
    }

    pub fn ticks(&self) -> &[f64] {
        &self.ticks
    }

    pub fn lo(&self) -> f64 {
        self.lo
    }

    pub fn hi(&self) -> f64 {
        self.hi
    }

}

impl Ranged for TickedAxis {
    type FormatOption = DefaultFormatting;
    type ValueType = f64;

    fn map(&self, value: &f64, limit: (i32, i32)) -> i32 {
        let frac = (value - self.lo) / (self.hi - self.lo);
        limit.0 + (frac * f64::from(limit.1 - limit.0)).round() as i32
    }

    fn key_points<Hint: KeyPointHint>(&self, hint: Hint) -> Vec<f64> {
        if hint.max_num_points() == 0 {
            return Vec::new();
        }
        self.ticks.clone()
    }

    fn range(&self) -> Range<f64> {
        self.lo..self.hi
    }
}

/// Forecast hour axis: lowest to highest hour, a tick every `stride` hours
pub fn forecast_hour_axis(hours: &[u32], stride: usize) -> TickedAxis {
    let lo = hours.iter().min().copied().map(f64::from).unwrap_or(0.0);
    let hi = hours.iter().max().copied().map(f64::from).unwrap_or(0.0);
    TickedAxis::new(lo, hi, strided(hours.iter().map(|h| f64::from(*h)), stride), 1.0)
}

/// Date axis in unix seconds: first to last date, a tick every `stride` dates
pub fn date_axis(dates: &[NaiveDateTime], stride: usize) -> TickedAxis {
    let secs: Vec<f64> = dates.iter().map(timestamp).collect();
    let lo = secs.first().copied().unwrap_or(0.0);
    let hi = secs.last().copied().unwrap_or(0.0);
    TickedAxis::new(lo, hi, strided(secs.into_iter(), stride), 86_400.0)
}

fn strided(values: impl Iterator<Item = f64>, stride: usize) -> Vec<f64> {
    if stride == 0 {
        log::warn!("Tick stride is 0; no major ticks drawn");
        return Vec::new();
    }
    values.step_by(stride).collect()
}

pub fn timestamp(date: &NaiveDateTime) -> f64 {
    date.and_utc().timestamp() as f64
}

pub fn from_timestamp(secs: f64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(secs.round() as i64, 0).map(|dt| dt.naive_utc())
}

/// Minor tick positions (unix seconds) within the axis range
pub fn minor_ticks(axis: &TickedAxis, granularity: MinorTicks) -> Vec<f64> {
    let (Some(lo), Some(hi)) = (from_timestamp(axis.lo()), from_timestamp(axis.hi())) else {
        return Vec::new();
    };

    let mut ticks = Vec::new();
    let mut current = first_boundary(lo, granularity);
    while current <= hi && ticks.len() < MAX_MINOR_TICKS {
        ticks.push(timestamp(&current));
        current = match granularity {
            MinorTicks::Hourly => current + Duration::hours(1),
            MinorTicks::Daily => current + Duration::days(1),
            MinorTicks::Monthly => match next_month(current.date()) {
                Some(d) => d.and_hms_opt(0, 0, 0).unwrap_or(current),
                None => break,
            },
        };
    }
    ticks
}

/// First hour/day/month boundary at or after `start`
fn first_boundary(start: NaiveDateTime, granularity: MinorTicks) -> NaiveDateTime {
    let hour_floor = start
        .date()
        .and_hms_opt(start.hour(), 0, 0)
        .unwrap_or(start);
    let day_floor = start.date().and_hms_opt(0, 0, 0).unwrap_or(start);
    match granularity {
        MinorTicks::Hourly if hour_floor < start => hour_floor + Duration::hours(1),
        MinorTicks::Hourly => hour_floor,
        MinorTicks::Daily if day_floor < start => day_floor + Duration::days(1),
        MinorTicks::Daily => day_floor,
        MinorTicks::Monthly => {
            let month_floor = NaiveDate::from_ymd_opt(start.year(), start.month(), 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .unwrap_or(start);
            if month_floor < start {
                next_month(month_floor.date())
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .unwrap_or(start)
            } else {
                month_floor
            }
        }
    }
}

fn next_month(date: NaiveDate) -> Option<NaiveDate> {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Half-cell extents around each sorted coordinate, clamped to the axis
///
/// Each cell spans the midpoints to its neighbours; edge cells reach the
/// axis limits.
pub fn cell_edges(values: &[f64], axis: &TickedAxis) -> Vec<(f64, f64)> {
    let n = values.len();
    (0..n)
        .map(|i| {
            let lo = if i == 0 {
                axis.lo()
            } else {
                (values[i - 1] + values[i]) / 2.0
            };
            let hi = if i + 1 == n {
                axis.hi()
            } else {
                (values[i] + values[i + 1]) / 2.0
            };
            (lo.max(axis.lo()), hi.min(axis.hi()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_map_linear() {
        let axis = TickedAxis::new(0.0, 240.0, vec![0.0, 120.0, 240.0], 1.0);
        assert_eq!(axis.map(&0.0, (0, 100)), 0);
        assert_eq!(axis.map(&120.0, (0, 100)), 50);
        assert_eq!(axis.map(&240.0, (0, 100)), 100);
        // Reversed pixel limits, as used for the y axis
        assert_eq!(axis.map(&240.0, (100, 0)), 0);
        assert_eq!(axis.range(), 0.0..240.0);
    }

    #[test]
    fn test_degenerate_range_widened() {
        let axis = TickedAxis::new(24.0, 24.0, vec![24.0], 1.0);
        assert_eq!(axis.range(), 23.0..25.0);
    }

    #[test]
    fn test_forecast_hour_ticks() {
        let hours: Vec<u32> = (0..=240).step_by(6).collect();
        let axis = forecast_hour_axis(&hours, 5);
        assert_eq!(axis.lo(), 0.0);
        assert_eq!(axis.hi(), 240.0);
        assert_eq!(axis.ticks()[..3], [0.0, 30.0, 60.0]);
        assert_eq!(axis.ticks().len(), 9);
    }

    #[test]
    fn test_forecast_hour_axis_spans_min_to_max() {
        let axis = forecast_hour_axis(&[48, 0, 24], 1);
        assert_eq!((axis.lo(), axis.hi()), (0.0, 48.0));
        assert!(axis.lo() < axis.hi());
    }

    #[test]
    fn test_zero_stride_draws_no_ticks() {
        let axis = forecast_hour_axis(&[0, 6, 12], 0);
        assert!(axis.ticks().is_empty());
    }

    #[test]
    fn test_date_axis_timestamps() {
        let dates = vec![day(1, 0), day(2, 0), day(3, 0)];
        let axis = date_axis(&dates, 2);
        assert_eq!(axis.ticks().len(), 2);
        assert_eq!(from_timestamp(axis.ticks()[1]), Some(day(3, 0)));
    }

    #[test]
    fn test_minor_ticks() {
        let axis = date_axis(&[day(1, 0), day(1, 6)], 1);
        assert_eq!(minor_ticks(&axis, MinorTicks::Hourly).len(), 7);

        let axis = date_axis(&[day(1, 12), day(4, 12)], 1);
        let daily = minor_ticks(&axis, MinorTicks::Daily);
        assert_eq!(daily.len(), 3);
        assert_eq!(from_timestamp(daily[0]), Some(day(2, 0)));

        let start = NaiveDate::from_ymd_opt(2023, 11, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 2, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let axis = date_axis(&[start, end], 1);
        let monthly = minor_ticks(&axis, MinorTicks::Monthly);
        assert_eq!(monthly.len(), 3);
        assert_eq!(from_timestamp(monthly[1]), Some(day(1, 0)));
    }

    #[test]
    fn test_cell_edges() {
        let axis = TickedAxis::new(0.0, 12.0, vec![], 1.0);
        let edges = cell_edges(&[0.0, 6.0, 12.0], &axis);
        assert_eq!(edges, vec![(0.0, 3.0), (3.0, 9.0), (9.0, 12.0)]);
    }
}
