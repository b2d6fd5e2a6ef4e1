//! Per-day min/max decimation.
//!
//! A calendar day (UTC) is split into `Resolution::periods_per_day` contiguous
//! periods of equal width starting at midnight. Each period that holds at
//! least one reading keeps its minimum and its maximum reading, in the order
//! they occurred, so spikes survive any amount of thinning. A reading whose
//! timestamp equals a period's upper boundary belongs to that period.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, SubsecRound, Utc};
use tracing::{debug, warn};

use crate::models::{DayResult, DecimatedPoint, Reading, Resolution};

/// First instant of `date` in UTC.
pub fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Last representable instant of `date` in UTC, for inclusive range queries.
pub fn day_end(date: NaiveDate) -> DateTime<Utc> {
    day_start(date) + Duration::days(1) - Duration::nanoseconds(1)
}

#[derive(Debug, Clone, Copy)]
struct Extreme {
    timestamp: DateTime<Utc>,
    value: f64,
    seq: usize,
}

impl Extreme {
    fn into_point(self) -> DecimatedPoint {
        DecimatedPoint::new(self.timestamp.trunc_subsecs(0), self.value)
    }
}

// Running extrema of the open period.
#[derive(Debug)]
struct PeriodAccumulator {
    min: Extreme,
    max: Extreme,
}

impl PeriodAccumulator {
    fn seed(timestamp: DateTime<Utc>, value: f64, seq: usize) -> Self {
        let first = Extreme { timestamp, value, seq };
        Self { min: first, max: first }
    }

    fn observe(&mut self, timestamp: DateTime<Utc>, value: f64, seq: usize) {
        // Strict comparisons: on a tie the earlier reading stays.
        if value < self.min.value {
            self.min = Extreme { timestamp, value, seq };
        }
        if value > self.max.value {
            self.max = Extreme { timestamp, value, seq };
        }
    }

    fn flush_into(self, points: &mut Vec<DecimatedPoint>) {
        let (first, second) = if self.min.timestamp <= self.max.timestamp {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        };

        if first.timestamp == second.timestamp {
            let earliest = if first.seq <= second.seq { first } else { second };
            points.push(earliest.into_point());
        } else {
            points.push(first.into_point());
            points.push(second.into_point());
        }
    }
}

/// Collapse one day of readings for one sensor into its per-period extrema.
///
/// Returns `None` when the day has no valid readings. Readings with a missing
/// timestamp or value, or a non-finite value, are skipped; readings outside
/// `date` are ignored.
pub fn decimate_day(
    sensor_id: &str,
    date: NaiveDate,
    readings: &[Reading],
    resolution: Resolution,
) -> Option<DayResult> {
    let start = day_start(date);
    let end = day_end(date);
    let width = resolution.period_width();

    let mut samples: Vec<(DateTime<Utc>, f64)> = Vec::with_capacity(readings.len());
    let mut skipped = 0usize;
    for reading in readings {
        match reading.sample() {
            Some((ts, value)) if ts >= start && ts <= end => samples.push((ts, value)),
            Some((ts, _)) => {
                debug!("Ignoring reading for {} at {} outside {}", sensor_id, ts, date);
            }
            None => {
                skipped += 1;
                debug!("Skipping invalid reading for {} on {}: {:?}", sensor_id, date, reading);
            }
        }
    }
    if skipped > 0 {
        warn!("Skipped {} invalid readings for {} on {}", skipped, sensor_id, date);
    }

    // Stable, so equal timestamps keep source order.
    samples.sort_by_key(|(ts, _)| *ts);

    let mut points = Vec::with_capacity(2 * resolution.periods_per_day() as usize);
    let mut boundary = start + width;
    let mut open: Option<PeriodAccumulator> = None;

    for (seq, (ts, value)) in samples.into_iter().enumerate() {
        if ts > boundary {
            if let Some(acc) = open.take() {
                acc.flush_into(&mut points);
            }
            // Whole periods without data contribute nothing; move the boundary
            // along the grid until it covers this reading.
            while ts > boundary {
                boundary = boundary + width;
            }
        }

        match open.as_mut() {
            Some(acc) => acc.observe(ts, value, seq),
            None => open = Some(PeriodAccumulator::seed(ts, value, seq)),
        }
    }

    if let Some(acc) = open.take() {
        acc.flush_into(&mut points);
    }

    DayResult::from_points(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 20).unwrap()
    }

    fn at(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 20, hour, minute, second).unwrap()
    }

    fn reading(ts: DateTime<Utc>, value: f64) -> Reading {
        Reading::new("pi", ts, value)
    }

    fn quarter_hour() -> Resolution {
        Resolution::for_days_back(0)
    }

    fn values(result: &DayResult) -> Vec<f64> {
        result.points().iter().map(|p| p.value).collect()
    }

    #[test]
    fn test_no_readings_is_no_result() {
        assert!(decimate_day("pi", date(), &[], quarter_hour()).is_none());
    }

    #[test]
    fn test_only_invalid_readings_is_no_result() {
        let readings = vec![
            Reading { sensor_id: "pi".into(), timestamp: None, value: Some(70.0) },
            Reading { sensor_id: "pi".into(), timestamp: Some(at(1, 0, 0)), value: None },
        ];
        assert!(decimate_day("pi", date(), &readings, quarter_hour()).is_none());
    }

    #[test]
    fn test_invalid_readings_are_skipped() {
        let readings = vec![
            reading(at(1, 0, 0), 70.0),
            Reading { sensor_id: "pi".into(), timestamp: Some(at(1, 1, 0)), value: None },
            Reading { sensor_id: "pi".into(), timestamp: None, value: Some(-100.0) },
            reading(at(1, 2, 0), 72.0),
        ];
        let result = decimate_day("pi", date(), &readings, quarter_hour()).unwrap();
        assert_eq!(values(&result), vec![70.0, 72.0]);
    }

    #[test]
    fn test_single_reading_gives_single_point() {
        let result = decimate_day("pi", date(), &[reading(at(6, 3, 0), 64.0)], quarter_hour()).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.points()[0].timestamp, at(6, 3, 0));
    }

    #[test]
    fn test_flat_period_gives_single_point() {
        let readings = vec![
            reading(at(2, 1, 0), 50.0),
            reading(at(2, 5, 0), 50.0),
            reading(at(2, 9, 0), 50.0),
        ];
        let result = decimate_day("pi", date(), &readings, quarter_hour()).unwrap();
        assert_eq!(result.points(), &[DecimatedPoint::new(at(2, 1, 0), 50.0)]);
    }

    #[test]
    fn test_extrema_ordered_chronologically() {
        // Max comes before min within the period
        let readings = vec![
            reading(at(3, 1, 0), 60.0),
            reading(at(3, 4, 0), 75.0),
            reading(at(3, 8, 0), 55.0),
            reading(at(3, 12, 0), 61.0),
        ];
        let result = decimate_day("pi", date(), &readings, quarter_hour()).unwrap();
        assert_eq!(
            result.points(),
            &[
                DecimatedPoint::new(at(3, 4, 0), 75.0),
                DecimatedPoint::new(at(3, 8, 0), 55.0),
            ]
        );
    }

    #[test]
    fn test_ties_keep_first_timestamp() {
        let readings = vec![
            reading(at(4, 1, 0), 10.0),
            reading(at(4, 2, 0), 20.0),
            reading(at(4, 3, 0), 10.0),
            reading(at(4, 4, 0), 20.0),
        ];
        let result = decimate_day("pi", date(), &readings, quarter_hour()).unwrap();
        assert_eq!(
            result.points(),
            &[
                DecimatedPoint::new(at(4, 1, 0), 10.0),
                DecimatedPoint::new(at(4, 2, 0), 20.0),
            ]
        );
    }

    #[test]
    fn test_boundary_reading_belongs_to_earlier_period() {
        let readings = vec![
            reading(at(0, 5, 0), 1.0),
            reading(at(0, 15, 0), 9.0),
            reading(at(0, 16, 0), 5.0),
        ];
        let result = decimate_day("pi", date(), &readings, quarter_hour()).unwrap();
        // Period one: 1.0 then 9.0. Period two: 5.0 alone.
        assert_eq!(values(&result), vec![1.0, 9.0, 5.0]);
    }

    #[test]
    fn test_trailing_period_is_flushed() {
        let readings = vec![
            reading(at(23, 46, 0), 40.0),
            reading(at(23, 50, 0), 38.0),
            reading(at(23, 59, 59), 45.0),
        ];
        let result = decimate_day("pi", date(), &readings, quarter_hour()).unwrap();
        assert_eq!(
            result.points(),
            &[
                DecimatedPoint::new(at(23, 50, 0), 38.0),
                DecimatedPoint::new(at(23, 59, 59), 45.0),
            ]
        );
    }

    #[test]
    fn test_gap_keeps_grid_alignment() {
        // Data at 01:00-01:10, nothing until 05:20-05:25. 05:20 and 05:25 share
        // the (05:15, 05:30] period and must be grouped together.
        let readings = vec![
            reading(at(1, 0, 0), 3.0),
            reading(at(1, 10, 0), 4.0),
            reading(at(5, 20, 0), 8.0),
            reading(at(5, 25, 0), 7.0),
            reading(at(5, 31, 0), 6.0),
        ];
        let result = decimate_day("pi", date(), &readings, quarter_hour()).unwrap();
        assert_eq!(
            result.points(),
            &[
                DecimatedPoint::new(at(1, 0, 0), 3.0),
                DecimatedPoint::new(at(1, 10, 0), 4.0),
                DecimatedPoint::new(at(5, 20, 0), 8.0),
                DecimatedPoint::new(at(5, 25, 0), 7.0),
                DecimatedPoint::new(at(5, 31, 0), 6.0),
            ]
        );
    }

    #[test]
    fn test_unsorted_and_out_of_day_input() {
        let readings = vec![
            reading(at(7, 10, 0), 2.0),
            reading(at(7, 1, 0), 8.0),
            reading(day_start(date()) - Duration::minutes(1), -50.0),
            reading(day_start(date()) + Duration::days(1), 99.0),
        ];
        let result = decimate_day("pi", date(), &readings, quarter_hour()).unwrap();
        assert_eq!(values(&result), vec![8.0, 2.0]);
    }

    #[test]
    fn test_subsecond_timestamps_are_truncated() {
        let ts = at(8, 0, 1) + Duration::milliseconds(750);
        let result = decimate_day("pi", date(), &[reading(ts, 1.5)], quarter_hour()).unwrap();
        assert_eq!(result.points()[0].timestamp, at(8, 0, 1));
    }

    #[test]
    fn test_one_period_per_day() {
        let readings: Vec<Reading> = (0..24)
            .map(|h| reading(at(h, 30, 0), (h as f64 - 12.0).abs()))
            .collect();
        let result = decimate_day("pi", date(), &readings, Resolution::for_days_back(400)).unwrap();
        assert_eq!(
            result.points(),
            &[
                DecimatedPoint::new(at(0, 30, 0), 12.0),
                DecimatedPoint::new(at(12, 30, 0), 0.0),
            ]
        );
    }

    #[test]
    fn test_five_minute_day_matches_brute_force_extrema() {
        let start = day_start(date());
        let readings: Vec<Reading> = (0..288)
            .map(|i| {
                let ts = start + Duration::minutes(5 * i);
                let value = 70.0 + 10.0 * ((i as f64) * 0.37).sin() + (i % 7) as f64 * 0.1;
                reading(ts, value)
            })
            .collect();

        let resolution = quarter_hour();
        let result = decimate_day("pi", date(), &readings, resolution).unwrap();
        assert!(result.len() <= 192);

        // Group readings into periods the same way: (start + k*w, start + (k+1)*w],
        // with midnight itself in the first period.
        let width = resolution.period_width();
        let mut expected = Vec::new();
        for k in 0..resolution.periods_per_day() as i32 {
            let lower = start + width * k;
            let upper = lower + width;
            let in_period: Vec<&Reading> = readings
                .iter()
                .filter(|r| {
                    let ts = r.timestamp.unwrap();
                    (ts > lower || (k == 0 && ts == lower)) && ts <= upper
                })
                .collect();
            if in_period.is_empty() {
                continue;
            }
            let mut min = in_period[0];
            let mut max = in_period[0];
            for r in &in_period[1..] {
                if r.value.unwrap() < min.value.unwrap() {
                    min = r;
                }
                if r.value.unwrap() > max.value.unwrap() {
                    max = r;
                }
            }
            let mut pair = vec![
                DecimatedPoint::new(min.timestamp.unwrap(), min.value.unwrap()),
                DecimatedPoint::new(max.timestamp.unwrap(), max.value.unwrap()),
            ];
            pair.sort_by_key(|p| p.timestamp);
            pair.dedup_by_key(|p| p.timestamp);
            expected.extend(pair);
        }

        assert_eq!(result.points(), expected.as_slice());

        let raw_max = readings.iter().filter_map(|r| r.value).fold(f64::MIN, f64::max);
        let raw_min = readings.iter().filter_map(|r| r.value).fold(f64::MAX, f64::min);
        let kept_max = values(&result).into_iter().fold(f64::MIN, f64::max);
        let kept_min = values(&result).into_iter().fold(f64::MAX, f64::min);
        assert_eq!(kept_max, raw_max);
        assert_eq!(kept_min, raw_min);
    }
}
