use chrono_tz::Tz;
use serde::Serialize;

use super::decimated::{DecimatedPoint, TIMESTAMP_FORMAT};

// A chart point with its timestamp already rendered in the display timezone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayPoint {
    pub timestamp: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesData {
    pub label: String,
    pub points: Vec<DisplayPoint>,
    pub current: f64,
    pub minimum: f64,
    pub maximum: f64,
    pub minimum_at: String,
    pub maximum_at: String,
}

/// The chart-ready history of one sensor over a day range.
///
/// `NoData` is returned when no day in the range produced a point, so callers
/// never see a made-up current/minimum/maximum.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Dataset {
    Series(SeriesData),
    NoData { label: String },
}

impl Dataset {
    /// Aggregates chronologically merged UTC points, then renders every
    /// timestamp in `display_tz`. Conversion is the last step.
    pub fn from_points(label: impl Into<String>, points: Vec<DecimatedPoint>, display_tz: Tz) -> Self {
        let label = label.into();
        let Some(last) = points.last() else {
            return Dataset::NoData { label };
        };
        let current = last.value;

        let mut min_point = points[0];
        let mut max_point = points[0];
        for point in &points[1..] {
            if point.value < min_point.value {
                min_point = *point;
            }
            if point.value > max_point.value {
                max_point = *point;
            }
        }

        let render = |point: &DecimatedPoint| {
            point
                .timestamp
                .with_timezone(&display_tz)
                .format(TIMESTAMP_FORMAT)
                .to_string()
        };

        Dataset::Series(SeriesData {
            minimum_at: render(&min_point),
            maximum_at: render(&max_point),
            points: points
                .iter()
                .map(|p| DisplayPoint {
                    timestamp: render(p),
                    value: p.value,
                })
                .collect(),
            label,
            current,
            minimum: min_point.value,
            maximum: max_point.value,
        })
    }

    pub fn label(&self) -> &str {
        match self {
            Dataset::Series(data) => &data.label,
            Dataset::NoData { label } => label,
        }
    }

    pub fn points(&self) -> &[DisplayPoint] {
        match self {
            Dataset::Series(data) => &data.points,
            Dataset::NoData { .. } => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Dataset::NoData { .. })
    }

    pub fn current(&self) -> Option<f64> {
        self.series().map(|d| d.current)
    }

    pub fn minimum(&self) -> Option<f64> {
        self.series().map(|d| d.minimum)
    }

    pub fn maximum(&self) -> Option<f64> {
        self.series().map(|d| d.maximum)
    }

    pub fn series(&self) -> Option<&SeriesData> {
        match self {
            Dataset::Series(data) => Some(data),
            Dataset::NoData { .. } => None,
        }
    }
}

/// Minimum of minima and maximum of maxima across the datasets that have data,
/// for drawing several sensors on one shared axis.
pub fn combined_extrema(datasets: &[Dataset]) -> Option<(f64, f64)> {
    datasets
        .iter()
        .filter_map(Dataset::series)
        .fold(None, |acc, data| match acc {
            None => Some((data.minimum, data.maximum)),
            Some((lo, hi)) => Some((lo.min(data.minimum), hi.max(data.maximum))),
        })
}
