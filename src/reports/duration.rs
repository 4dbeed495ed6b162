use crate::extract::{call_minutes, flatten_calls, local_start, talk_split, TalkSplit};
use crate::models::{CallRecord, GroupedSeries, Metric, Series, SeriesGroup};
use crate::stats::{self, weekday_index, AgeBins, HOURS_PER_DAY, WEEKDAY_LABELS};
use chrono::{Datelike, NaiveDateTime, Timelike};
use chrono_tz::Tz;

pub const HUMAN_GROUP: &str = "Humano";
pub const BOT_GROUP: &str = "Chatbot";

/// `(record, minutes)` for every call with a usable total time.
fn timed_calls(records: &[CallRecord]) -> Vec<(&CallRecord, f64)> {
    flatten_calls(records, |_| true)
        .into_iter()
        .filter_map(|row| call_minutes(row.call).map(|minutes| (row.record, minutes)))
        .collect()
}

pub fn average_duration(records: &[CallRecord]) -> Metric {
    let minutes: Vec<f64> = timed_calls(records).into_iter().map(|(_, minutes)| minutes).collect();
    Metric {
        value: stats::round_to(stats::mean(&minutes), 2),
        unit: "min".to_string(),
    }
}

pub fn average_by_gender(records: &[CallRecord]) -> Series {
    let means = stats::means_by(
        timed_calls(records)
            .into_iter()
            .filter_map(|(record, minutes)| record.gender().map(|gender| (gender, minutes))),
    );
    Series::from_pairs(means)
}

pub fn average_by_age(records: &[CallRecord]) -> Series {
    stats::age_means(
        timed_calls(records)
            .into_iter()
            .filter_map(|(record, minutes)| record.age_years().map(|age| (age, minutes))),
    )
}

fn timed_starts(records: &[CallRecord], tz: Tz) -> Vec<(NaiveDateTime, f64)> {
    flatten_calls(records, |_| true)
        .into_iter()
        .filter_map(|row| {
            let minutes = call_minutes(row.call)?;
            local_start(row.call, tz).map(|start| (start, minutes))
        })
        .collect()
}

pub fn average_by_day(records: &[CallRecord], tz: Tz) -> Series {
    let starts = timed_starts(records, tz);
    if starts.is_empty() {
        return Series::default();
    }
    let mut per_day = vec![Vec::new(); WEEKDAY_LABELS.len()];
    for (start, minutes) in starts {
        per_day[weekday_index(start.weekday())].push(minutes);
    }
    Series::from_pairs(
        WEEKDAY_LABELS
            .iter()
            .zip(&per_day)
            .map(|(label, values)| (*label, stats::mean(values))),
    )
}

pub fn average_by_hour(records: &[CallRecord], tz: Tz) -> Series {
    let starts = timed_starts(records, tz);
    if starts.is_empty() {
        return Series::default();
    }
    let mut per_hour = vec![Vec::new(); HOURS_PER_DAY];
    for (start, minutes) in starts {
        per_hour[start.hour() as usize].push(minutes);
    }
    Series::from_pairs(
        per_hour
            .iter()
            .enumerate()
            .map(|(hour, values)| (hour.to_string(), stats::mean(values))),
    )
}

fn split_groups(categories: Vec<String>, splits: &[Vec<TalkSplit>]) -> GroupedSeries {
    let mean_of = |pick: fn(&TalkSplit) -> f64| -> Vec<f64> {
        splits
            .iter()
            .map(|group| stats::mean(&group.iter().map(pick).collect::<Vec<_>>()))
            .collect()
    };
    GroupedSeries {
        categories,
        groups: vec![
            SeriesGroup {
                name: HUMAN_GROUP.to_string(),
                values: mean_of(|split| split.human_pct),
            },
            SeriesGroup {
                name: BOT_GROUP.to_string(),
                values: mean_of(|split| split.bot_pct),
            },
        ],
    }
}

/// Mean human and bot share of speaking time per gender. Calls where nobody
/// spoke are left out.
pub fn talk_split_by_gender(records: &[CallRecord]) -> GroupedSeries {
    let mut per_gender: std::collections::BTreeMap<&str, Vec<TalkSplit>> = Default::default();
    for row in flatten_calls(records, |_| true) {
        if let (Some(gender), Some(split)) = (row.record.gender(), talk_split(row.call)) {
            per_gender.entry(gender).or_default().push(split);
        }
    }
    let (categories, splits): (Vec<String>, Vec<Vec<TalkSplit>>) = per_gender
        .into_iter()
        .map(|(gender, splits)| (gender.to_string(), splits))
        .unzip();
    split_groups(categories, &splits)
}

/// Mean human and bot share of speaking time per age range; ranges without
/// calls are left out.
pub fn talk_split_by_age(records: &[CallRecord]) -> GroupedSeries {
    let rows: Vec<(u32, TalkSplit)> = flatten_calls(records, |_| true)
        .into_iter()
        .filter_map(|row| {
            let age = row.record.age_years().filter(|age| *age >= stats::AGE_FLOOR)?;
            talk_split(row.call).map(|split| (age, split))
        })
        .collect();
    let Some(max_age) = rows.iter().map(|(age, _)| *age).max() else {
        return GroupedSeries::default();
    };

    let bins = AgeBins::covering(max_age);
    let mut per_bin = vec![Vec::new(); bins.count()];
    for (age, split) in rows {
        if let Some(index) = bins.index_of(age) {
            per_bin[index].push(split);
        }
    }
    let (categories, splits): (Vec<String>, Vec<Vec<TalkSplit>>) = per_bin
        .into_iter()
        .enumerate()
        .filter(|(_, splits)| !splits.is_empty())
        .map(|(index, splits)| (bins.label(index), splits))
        .unzip();
    split_groups(categories, &splits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::decode_records;
    use serde_json::json;

    fn fixture() -> Vec<CallRecord> {
        decode_records(vec![
            json!({
                "user_age": "66", "user_gender": "Female",
                "calls": [
                    {
                        "call_start_time": "2024-03-04T10:00:00",
                        "call_duration": { "original_total_time": 120, "human": 30, "bot": 90 }
                    },
                    {
                        "call_start_time": "2024-03-05T14:00:00",
                        "call_duration": { "original_total_time": 360, "human": 60, "bot": 60 }
                    }
                ]
            }),
            json!({
                "user_age": "81", "user_gender": "Male",
                "calls": [
                    {
                        "call_start_time": "2024-03-04T10:30:00",
                        "call_duration": { "original_total_time": 60, "human": 0, "bot": 0 }
                    },
                    { "call_duration": { "original_total_time": null, "human": 10 } }
                ]
            }),
        ])
    }

    #[test]
    fn overall_average_in_minutes() {
        // (2 + 6 + 1) / 3
        assert_eq!(average_duration(&fixture()).value, 3.0);
        assert_eq!(average_duration(&[]).value, 0.0);
    }

    #[test]
    fn negative_totals_stay_out_of_averages() {
        let mut records = fixture();
        records.extend(decode_records(vec![json!({
            "user_age": "66", "user_gender": "Female",
            "calls": [{
                "call_start_time": "2024-03-04T10:00:00",
                "call_duration": { "original_total_time": -600 }
            }]
        })]));

        assert_eq!(average_duration(&records).value, 3.0);
        assert_eq!(average_by_gender(&records).value_of("Female"), Some(4.0));
        assert_eq!(average_by_day(&records, chrono_tz::UTC).value_of("Lunes"), Some(1.5));
    }

    #[test]
    fn averages_by_demographics() {
        let by_gender = average_by_gender(&fixture());
        assert_eq!(by_gender.value_of("Female"), Some(4.0));
        assert_eq!(by_gender.value_of("Male"), Some(1.0));

        let by_age = average_by_age(&fixture());
        assert_eq!(by_age.value_of("65-69"), Some(4.0));
        assert_eq!(by_age.value_of("70-74"), Some(0.0));
        assert_eq!(by_age.value_of("80-84"), Some(1.0));
    }

    #[test]
    fn averages_by_calendar_are_complete() {
        let by_day = average_by_day(&fixture(), chrono_tz::UTC);
        assert_eq!(by_day.len(), 7);
        assert_eq!(by_day.value_of("Lunes"), Some(1.5));
        assert_eq!(by_day.value_of("Martes"), Some(6.0));
        assert_eq!(by_day.value_of("Domingo"), Some(0.0));

        let by_hour = average_by_hour(&fixture(), chrono_tz::UTC);
        assert_eq!(by_hour.len(), 24);
        assert_eq!(by_hour.value_of("10"), Some(1.5));
        assert_eq!(by_hour.value_of("14"), Some(6.0));
    }

    #[test]
    fn talk_splits_sum_to_one_hundred() {
        let by_gender = talk_split_by_gender(&fixture());
        assert_eq!(by_gender.categories, vec!["Female", "Male"]);
        assert_eq!(by_gender.value(HUMAN_GROUP, "Female"), Some(37.5));
        assert_eq!(by_gender.value(BOT_GROUP, "Female"), Some(62.5));
        assert_eq!(by_gender.value(HUMAN_GROUP, "Male"), Some(100.0));
        for (index, _) in by_gender.categories.iter().enumerate() {
            let total = by_gender.groups[0].values[index] + by_gender.groups[1].values[index];
            assert!((total - 100.0).abs() < 1e-9);
        }

        let by_age = talk_split_by_age(&fixture());
        assert_eq!(by_age.categories, vec!["65-69", "80-84"]);
        assert_eq!(by_age.value(BOT_GROUP, "80-84"), Some(0.0));
    }
}
