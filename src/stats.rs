use crate::models::Series;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Weekday};
use chrono_tz::Tz;
use std::collections::BTreeMap;

pub const WEEKDAY_LABELS: [&str; 7] = [
    "Lunes",
    "Martes",
    "Miércoles",
    "Jueves",
    "Viernes",
    "Sábado",
    "Domingo",
];
pub const HOURS_PER_DAY: usize = 24;
pub const AGE_FLOOR: u32 = 60;
pub const AGE_STEP: u32 = 5;
pub const DURATION_STEP_MINUTES: f64 = 5.0;
const LAST_EDGE_NUDGE: f64 = 0.1;
/// One day of five-minute ranges.
pub const MAX_DURATION_BINS: usize = 288;

pub fn weekday_index(day: Weekday) -> usize {
    day.num_days_from_monday() as usize
}

pub fn to_local(utc: NaiveDateTime, tz: Tz) -> NaiveDateTime {
    tz.from_utc_datetime(&utc).naive_local()
}

pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

pub fn week_label(start: NaiveDate) -> String {
    let end = start + Duration::days(6);
    format!("{} - {}", start.format("%d/%m/%y"), end.format("%d/%m/%y"))
}

/// Left-closed five-year age ranges starting at 60, enough of them to cover
/// the oldest age seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeBins {
    count: usize,
}

impl AgeBins {
    pub fn covering(max_age: u32) -> Self {
        let span = max_age.max(AGE_FLOOR) - AGE_FLOOR;
        Self {
            count: (span / AGE_STEP) as usize + 1,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn index_of(&self, age: u32) -> Option<usize> {
        if age < AGE_FLOOR {
            return None;
        }
        let index = ((age - AGE_FLOOR) / AGE_STEP) as usize;
        (index < self.count).then_some(index)
    }

    pub fn label(&self, index: usize) -> String {
        let low = AGE_FLOOR + index as u32 * AGE_STEP;
        format!("{low}-{}", low + AGE_STEP - 1)
    }

    #[cfg(test)]
    fn labels(&self) -> Vec<String> {
        (0..self.count).map(|index| self.label(index)).collect()
    }
}

/// Left-closed five-minute ranges from 0; the last upper edge is nudged so
/// the longest call lands inside it. At most [`MAX_DURATION_BINS`] ranges:
/// past that the last range is open-ended and takes every longer call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationBins {
    count: usize,
    open_ended: bool,
}

impl DurationBins {
    pub fn covering(max_minutes: f64) -> Self {
        // NaN.max(0.0) is 0.0; infinity stays infinite and is capped below.
        let needed = (max_minutes.max(0.0) / DURATION_STEP_MINUTES).ceil();
        if needed > MAX_DURATION_BINS as f64 {
            return Self {
                count: MAX_DURATION_BINS,
                open_ended: true,
            };
        }
        Self {
            count: (needed as usize).max(1),
            open_ended: false,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    fn lower(&self, index: usize) -> f64 {
        index as f64 * DURATION_STEP_MINUTES
    }

    fn upper(&self, index: usize) -> f64 {
        let edge = self.lower(index + 1);
        if index + 1 == self.count { edge + LAST_EDGE_NUDGE } else { edge }
    }

    pub fn index_of(&self, minutes: f64) -> Option<usize> {
        let last = self.count - 1;
        if minutes.is_nan() || minutes < 0.0 || (!self.open_ended && minutes >= self.upper(last)) {
            return None;
        }
        let index = (minutes / DURATION_STEP_MINUTES).floor();
        Some(if index >= last as f64 { last } else { index as usize })
    }

    pub fn label(&self, index: usize) -> String {
        if self.open_ended && index + 1 == self.count {
            format!("[{:.1}, ∞)", self.lower(index))
        } else {
            format!("[{:.1}, {:.1})", self.lower(index), self.upper(index))
        }
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Whole numbers without decimals, everything else with two.
pub fn format_value(value: f64) -> String {
    let rounded = round_to(value, 2);
    if rounded.fract() == 0.0 {
        format!("{rounded:.0}")
    } else {
        format!("{rounded:.2}")
    }
}

/// Calls per duration range, every range present.
pub fn duration_histogram(minutes: &[f64]) -> Series {
    if minutes.is_empty() {
        return Series::default();
    }
    let max = minutes.iter().copied().fold(0.0, f64::max);
    let bins = DurationBins::covering(max);
    let mut counts = vec![0u64; bins.count()];
    for value in minutes {
        if let Some(index) = bins.index_of(*value) {
            counts[index] += 1;
        }
    }
    Series::from_pairs(
        counts
            .into_iter()
            .enumerate()
            .map(|(index, count)| (bins.label(index), count as f64)),
    )
}

/// Sums `(age, value)` pairs into age ranges, every range present. Ages
/// under 60 are ignored.
pub fn age_totals(pairs: impl IntoIterator<Item = (u32, f64)>) -> Series {
    let pairs: Vec<(u32, f64)> = pairs
        .into_iter()
        .filter(|(age, _)| *age >= AGE_FLOOR)
        .collect();
    let Some(max_age) = pairs.iter().map(|(age, _)| *age).max() else {
        return Series::default();
    };
    let bins = AgeBins::covering(max_age);
    let mut totals = vec![0.0; bins.count()];
    for (age, value) in pairs {
        if let Some(index) = bins.index_of(age) {
            totals[index] += value;
        }
    }
    Series::from_pairs(
        totals
            .into_iter()
            .enumerate()
            .map(|(index, total)| (bins.label(index), total)),
    )
}

/// Means of `(age, value)` pairs per age range; ranges without values read 0.
pub fn age_means(pairs: impl IntoIterator<Item = (u32, f64)>) -> Series {
    let pairs: Vec<(u32, f64)> = pairs
        .into_iter()
        .filter(|(age, _)| *age >= AGE_FLOOR)
        .collect();
    let Some(max_age) = pairs.iter().map(|(age, _)| *age).max() else {
        return Series::default();
    };
    let bins = AgeBins::covering(max_age);
    let mut grouped = vec![Vec::new(); bins.count()];
    for (age, value) in pairs {
        if let Some(index) = bins.index_of(age) {
            grouped[index].push(value);
        }
    }
    Series::from_pairs(
        grouped
            .iter()
            .enumerate()
            .map(|(index, values)| (bins.label(index), mean(values))),
    )
}

/// Mean per key, keys in their natural order.
pub fn means_by<K: Ord>(pairs: impl IntoIterator<Item = (K, f64)>) -> BTreeMap<K, f64> {
    let mut grouped: BTreeMap<K, Vec<f64>> = BTreeMap::new();
    for (key, value) in pairs {
        grouped.entry(key).or_default().push(value);
    }
    grouped
        .into_iter()
        .map(|(key, values)| (key, mean(&values)))
        .collect()
}

pub fn counts_by<K: Ord>(keys: impl IntoIterator<Item = K>) -> BTreeMap<K, u64> {
    let mut counts = BTreeMap::new();
    for key in keys {
        *counts.entry(key).or_insert(0u64) += 1;
    }
    counts
}
