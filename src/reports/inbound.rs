use crate::extract::{duration_minutes, flatten_calls, start_times};
use crate::models::{CallRecord, CallType, Series, Table, TableColumn};
use crate::stats::{self, weekday_index, HOURS_PER_DAY, WEEKDAY_LABELS};
use chrono::{Datelike, Timelike};
use chrono_tz::Tz;
use std::collections::BTreeSet;

pub const CALL_RANGES: [&str; 5] = ["0-3", "4", "5-6", "7-8", "9 o más"];
pub const DISTRIBUTION_AGE_RANGES: [&str; 7] =
    ["60-65", "66-70", "71-75", "76-80", "81-85", "86-90", "90 o más"];
const DISTRIBUTION_GENDERS: [(&str, &str); 2] = [("Female", "Mujer"), ("Male", "Hombre")];
const CALLS_COLUMN: &str = "# de llamadas";

pub fn calls_by_day(records: &[CallRecord], tz: Tz) -> Series {
    let starts = start_times(records, CallType::Inbound, tz);
    if starts.is_empty() {
        return Series::default();
    }
    let mut counts = [0u64; 7];
    for start in starts {
        counts[weekday_index(start.weekday())] += 1;
    }
    Series::from_pairs(
        WEEKDAY_LABELS
            .iter()
            .zip(counts)
            .map(|(label, count)| (*label, count as f64)),
    )
}

pub fn calls_by_hour(records: &[CallRecord], tz: Tz) -> Series {
    let starts = start_times(records, CallType::Inbound, tz);
    if starts.is_empty() {
        return Series::default();
    }
    let mut counts = [0u64; HOURS_PER_DAY];
    for start in starts {
        counts[start.hour() as usize] += 1;
    }
    Series::from_pairs(
        counts
            .into_iter()
            .enumerate()
            .map(|(hour, count)| (hour.to_string(), count as f64)),
    )
}

/// One count per inbound call of users with a known gender, most frequent
/// gender first.
pub fn calls_by_gender(records: &[CallRecord]) -> Series {
    let counts = stats::counts_by(
        flatten_calls(records, |call| call.is_type(CallType::Inbound))
            .into_iter()
            .filter_map(|row| row.record.gender()),
    );
    let mut ranked: Vec<(&str, u64)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    Series::from_pairs(ranked.into_iter().map(|(gender, count)| (gender, count as f64)))
}

pub fn calls_by_age(records: &[CallRecord]) -> Series {
    stats::age_totals(
        flatten_calls(records, |call| call.is_type(CallType::Inbound))
            .into_iter()
            .filter_map(|row| row.record.age_years())
            .map(|age| (age, 1.0)),
    )
}

pub fn calls_by_duration(records: &[CallRecord]) -> Series {
    stats::duration_histogram(&duration_minutes(records, |call| call.is_type(CallType::Inbound)))
}

fn call_range_index(calls: usize) -> Option<usize> {
    match calls {
        0 => None,
        1..=3 => Some(0),
        4 => Some(1),
        5 | 6 => Some(2),
        7 | 8 => Some(3),
        _ => Some(4),
    }
}

fn distribution_age_index(age: u32) -> Option<usize> {
    match age {
        0..=60 => None,
        61..=90 => Some(((age - 61) / 5) as usize),
        _ => Some(DISTRIBUTION_AGE_RANGES.len() - 1),
    }
}

/// Unique users by how many inbound calls they made, split by gender and age
/// range. Each cell reads `users/column total`.
pub fn call_distribution(records: &[CallRecord]) -> Table {
    let age_ranges = DISTRIBUTION_AGE_RANGES.len();
    let column_count = DISTRIBUTION_GENDERS.len() * age_ranges;
    let mut cells: Vec<Vec<BTreeSet<&str>>> = vec![vec![BTreeSet::new(); column_count]; CALL_RANGES.len()];

    for record in records {
        let Some(user_id) = record.user_id() else {
            continue;
        };
        let Some(gender_index) = record
            .gender()
            .and_then(|gender| DISTRIBUTION_GENDERS.iter().position(|(raw, _)| *raw == gender))
        else {
            continue;
        };
        let Some(age_index) = record.age_years().and_then(distribution_age_index) else {
            continue;
        };
        let Some(range_index) = call_range_index(record.calls_of_type(CallType::Inbound).count()) else {
            continue;
        };
        cells[range_index][gender_index * age_ranges + age_index].insert(user_id);
    }

    let column_totals: Vec<usize> = (0..column_count)
        .map(|column| cells.iter().map(|row| row[column].len()).sum())
        .collect();
    if column_totals.iter().all(|total| *total == 0) {
        return Table::default();
    }

    let mut columns = vec![TableColumn {
        group: CALLS_COLUMN.to_string(),
        label: CALLS_COLUMN.to_string(),
    }];
    for (_, gender_label) in DISTRIBUTION_GENDERS {
        for age_range in DISTRIBUTION_AGE_RANGES {
            columns.push(TableColumn {
                group: gender_label.to_string(),
                label: age_range.to_string(),
            });
        }
    }

    let rows = CALL_RANGES
        .iter()
        .zip(&cells)
        .map(|(range, row)| {
            let mut line = vec![range.to_string()];
            line.extend(
                row.iter()
                    .zip(&column_totals)
                    .map(|(users, total)| format!("{}/{}", users.len(), total)),
            );
            line
        })
        .collect();

    Table {
        caption: Some("Distribución por género y rangos de edad".to_string()),
        columns,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::decode_records;
    use serde_json::json;

    fn inbound(start: &str, seconds: Option<f64>) -> serde_json::Value {
        json!({
            "type_call": "inbound",
            "call_start_time": start,
            "call_duration": { "original_total_time": seconds }
        })
    }

    fn fixture() -> Vec<CallRecord> {
        decode_records(vec![
            json!({
                "user_id": "u1", "user_age": "62", "user_gender": "Female",
                "calls": [
                    // Monday
                    inbound("2024-03-04T09:30:00.250", Some(240.0)),
                    inbound("2024-03-04T17:05:00", Some(600.0)),
                    { "type_call": "outbound", "call_start_time": "2024-03-05T09:00:00" }
                ]
            }),
            json!({
                "user_id": "u2", "user_age": "75", "user_gender": "Male",
                "calls": [
                    // Sunday
                    inbound("2024-03-10T23:59:59", None),
                    inbound("not a date", Some(30.0))
                ]
            }),
            json!({
                "user_id": "u3", "user_age": "sesenta", "user_gender": "Female",
                "calls": [inbound("2024-03-06T12:00:00", Some(60.0))]
            }),
        ])
    }

    #[test]
    fn day_of_week_has_seven_entries() {
        let series = calls_by_day(&fixture(), chrono_tz::UTC);
        assert_eq!(series.len(), 7);
        assert_eq!(series.points[0].label, "Lunes");
        assert_eq!(series.value_of("Lunes"), Some(2.0));
        assert_eq!(series.value_of("Martes"), Some(0.0));
        assert_eq!(series.value_of("Miércoles"), Some(1.0));
        assert_eq!(series.value_of("Domingo"), Some(1.0));
        assert!(calls_by_day(&[], chrono_tz::UTC).is_empty());
    }

    #[test]
    fn one_malformed_call_keeps_the_rest_of_the_user() {
        let records = decode_records(vec![json!({
            "user_id": "u9", "user_age": "70", "user_gender": "Female",
            "calls": [
                {
                    "type_call": "inbound", "call_start_time": "2024-03-04T10:00:00",
                    "call_duration": { "original_total_time": "120" }
                },
                inbound("2024-03-05T10:00:00", Some(300.0)),
                "garbage",
                inbound("2024-03-06T10:00:00", Some(60.0)),
                {
                    "type_call": "inbound", "call_start_time": "2024-03-07T10:00:00",
                    "call_duration": "unknown"
                }
            ]
        })]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].calls.len(), 3);
        assert_eq!(records[0].calls[0].total_seconds(), Some(120.0));

        let by_day = calls_by_day(&records, chrono_tz::UTC);
        assert_eq!(by_day.value_of("Lunes"), Some(1.0));
        assert_eq!(by_day.value_of("Martes"), Some(1.0));
        assert_eq!(by_day.value_of("Miércoles"), Some(1.0));
        assert_eq!(by_day.value_of("Jueves"), Some(0.0));

        let by_duration = calls_by_duration(&records);
        assert_eq!(by_duration.value_of("[0.0, 5.1)"), Some(3.0));
    }

    #[test]
    fn hour_of_day_has_twenty_four_entries() {
        let series = calls_by_hour(&fixture(), chrono_tz::UTC);
        assert_eq!(series.len(), 24);
        assert_eq!(series.value_of("9"), Some(1.0));
        assert_eq!(series.value_of("23"), Some(1.0));
        assert_eq!(series.value_of("0"), Some(0.0));

        let shifted = calls_by_hour(&fixture(), chrono_tz::America::Mexico_City);
        assert_eq!(shifted.value_of("3"), Some(1.0));
        assert_eq!(shifted.value_of("17"), Some(1.0));
    }

    #[test]
    fn gender_counts_calls_most_frequent_first() {
        let series = calls_by_gender(&fixture());
        assert_eq!(series.points[0].label, "Female");
        assert_eq!(series.value_of("Female"), Some(3.0));
        assert_eq!(series.value_of("Male"), Some(2.0));
    }

    #[test]
    fn age_counts_only_numeric_ages() {
        let series = calls_by_age(&fixture());
        assert_eq!(series.points.first().unwrap().label, "60-64");
        assert_eq!(series.points.last().unwrap().label, "75-79");
        assert_eq!(series.value_of("60-64"), Some(2.0));
        assert_eq!(series.value_of("70-74"), Some(0.0));
        assert_eq!(series.value_of("75-79"), Some(2.0));
    }

    #[test]
    fn duration_includes_only_present_values() {
        let series = calls_by_duration(&fixture());
        let total: f64 = series.points.iter().map(|point| point.value).sum();
        assert_eq!(total, 4.0);
        assert_eq!(series.len(), 2);
        assert_eq!(series.value_of("[0.0, 5.0)"), Some(3.0));
        assert_eq!(series.value_of("[5.0, 10.1)"), Some(1.0));
    }

    #[test]
    fn distribution_counts_unique_users() {
        let mut records = fixture();
        records.extend(decode_records(vec![json!({
            "user_id": "u1", "user_age": "62", "user_gender": "Female",
            "calls": [inbound("2024-03-11T10:00:00", None), inbound("2024-03-12T10:00:00", None)]
        })]));

        let table = call_distribution(&records);
        assert_eq!(table.columns.len(), 1 + 2 * DISTRIBUTION_AGE_RANGES.len());
        assert_eq!(table.columns[1].group, "Mujer");
        assert_eq!(table.columns[8].group, "Hombre");
        assert_eq!(table.rows.len(), CALL_RANGES.len());

        // u1 appears twice with two inbound calls each; counted once.
        assert_eq!(table.rows[0][0], "0-3");
        assert_eq!(table.rows[0][1], "1/1");
        // u2 is a 75 year old man: Hombre / 71-75.
        assert_eq!(table.rows[0][8 + 2], "1/1");
        assert_eq!(table.rows[1][1], "0/1");
        assert_eq!(table.rows[0][2], "0/0");
    }

    #[test]
    fn distribution_ranges() {
        assert_eq!(call_range_index(0), None);
        assert_eq!(call_range_index(3), Some(0));
        assert_eq!(call_range_index(4), Some(1));
        assert_eq!(call_range_index(12), Some(4));
        assert_eq!(distribution_age_index(60), None);
        assert_eq!(distribution_age_index(61), Some(0));
        assert_eq!(distribution_age_index(66), Some(1));
        assert_eq!(distribution_age_index(90), Some(5));
        assert_eq!(distribution_age_index(91), Some(6));
        assert!(call_distribution(&[]).is_empty());
    }
}
