use crate::extract::{duration_minutes, start_times};
use crate::models::{CallRecord, CallType, Series};
use crate::stats::{self, week_label, week_start};
use chrono::{Duration, NaiveDate};
use chrono_tz::Tz;
use std::collections::{BTreeMap, BTreeSet};

/// Outbound calls per Monday-based week, oldest first. Weeks between the
/// first and last call are present even without calls.
pub fn calls_by_week(records: &[CallRecord], tz: Tz) -> Series {
    let weeks: BTreeMap<NaiveDate, u64> = stats::counts_by(
        start_times(records, CallType::Outbound, tz)
            .into_iter()
            .map(|start| week_start(start.date())),
    );
    let (Some(first), Some(last)) = (weeks.keys().next().copied(), weeks.keys().next_back().copied()) else {
        return Series::default();
    };

    let mut points = Vec::new();
    let mut week = first;
    while week <= last {
        let count = weeks.get(&week).copied().unwrap_or(0);
        points.push((week_label(week), count as f64));
        week += Duration::weeks(1);
    }
    Series::from_pairs(points)
}

pub fn calls_by_duration(records: &[CallRecord]) -> Series {
    stats::duration_histogram(&duration_minutes(records, |call| call.is_type(CallType::Outbound)))
}

fn outbound_users(records: &[CallRecord]) -> impl Iterator<Item = (&str, &CallRecord)> {
    records
        .iter()
        .filter(|record| record.has_call_type(CallType::Outbound))
        .filter_map(|record| record.user_id().map(|user_id| (user_id, record)))
}

/// Distinct users with outbound calls per age range.
pub fn users_by_age(records: &[CallRecord]) -> Series {
    let mut users: BTreeMap<u32, BTreeSet<&str>> = BTreeMap::new();
    for (user_id, record) in outbound_users(records) {
        if let Some(age) = record.age_years() {
            users.entry(age).or_default().insert(user_id);
        }
    }
    let Some(max_age) = users.keys().next_back().copied() else {
        return Series::default();
    };
    if max_age < stats::AGE_FLOOR {
        return Series::default();
    }

    let bins = stats::AgeBins::covering(max_age);
    let mut per_bin = vec![BTreeSet::new(); bins.count()];
    for (age, ids) in &users {
        if let Some(index) = bins.index_of(*age) {
            per_bin[index].extend(ids.iter().copied());
        }
    }
    Series::from_pairs(
        per_bin
            .iter()
            .enumerate()
            .map(|(index, ids)| (bins.label(index), ids.len() as f64)),
    )
}

/// Distinct users with outbound calls per gender, genders in alphabetical
/// order.
pub fn users_by_gender(records: &[CallRecord]) -> Series {
    let mut users: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for (user_id, record) in outbound_users(records) {
        if let Some(gender) = record.gender() {
            users.entry(gender).or_default().insert(user_id);
        }
    }
    Series::from_pairs(
        users
            .into_iter()
            .map(|(gender, ids)| (gender, ids.len() as f64)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::decode_records;
    use serde_json::json;

    fn fixture() -> Vec<CallRecord> {
        decode_records(vec![
            json!({
                "user_id": "a", "user_age": "61", "user_gender": "Female",
                "calls": [
                    { "type_call": "outbound", "call_start_time": "2024-03-05T10:00:00", "call_duration": { "original_total_time": 90 } },
                    { "type_call": "outbound", "call_start_time": "2024-03-10T10:00:00.5" },
                    { "type_call": "outbound", "call_start_time": "2024-03-19T10:00:00" }
                ]
            }),
            json!({
                "user_id": "b", "user_age": "83", "user_gender": "Male",
                "calls": [{ "type_call": "outbound", "call_start_time": "broken" }]
            }),
            json!({
                "user_id": "a", "user_age": "61", "user_gender": "Female",
                "calls": [{ "type_call": "outbound" }]
            }),
            json!({
                "user_id": "c", "user_age": "70", "user_gender": "Female",
                "calls": [{ "type_call": "inbound", "call_start_time": "2024-03-05T10:00:00" }]
            }),
        ])
    }

    #[test]
    fn weeks_are_ordered_and_gap_filled() {
        let series = calls_by_week(&fixture(), chrono_tz::UTC);
        let labels: Vec<&str> = series.points.iter().map(|point| point.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["04/03/24 - 10/03/24", "11/03/24 - 17/03/24", "18/03/24 - 24/03/24"]
        );
        let values: Vec<f64> = series.points.iter().map(|point| point.value).collect();
        assert_eq!(values, vec![2.0, 0.0, 1.0]);
        assert!(calls_by_week(&[], chrono_tz::UTC).is_empty());
    }

    #[test]
    fn users_are_counted_once() {
        let ages = users_by_age(&fixture());
        assert_eq!(ages.value_of("60-64"), Some(1.0));
        assert_eq!(ages.value_of("70-74"), Some(0.0));
        assert_eq!(ages.value_of("80-84"), Some(1.0));
        assert_eq!(ages.len(), 5);

        let genders = users_by_gender(&fixture());
        assert_eq!(genders.value_of("Female"), Some(1.0));
        assert_eq!(genders.value_of("Male"), Some(1.0));
        assert_eq!(genders.len(), 2);
    }

    #[test]
    fn duration_uses_outbound_calls_only() {
        let series = calls_by_duration(&fixture());
        assert_eq!(series.len(), 1);
        assert_eq!(series.value_of("[0.0, 5.1)"), Some(1.0));
    }
}
