use crate::extract::{topic_rows, TopicRow};
use crate::models::{CallRecord, GroupedSeries, Series, SeriesGroup, Table, TableColumn};
use crate::stats::{self, AgeBins};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Catch-all topic, always listed last.
pub const OTHER_TOPIC: &str = "Otros";
pub const BOT_GROUP: &str = "Chatbot";
pub const PERSONA_GROUP: &str = "Cliente";

fn topic_order(a: &str, b: &str) -> Ordering {
    (a == OTHER_TOPIC)
        .cmp(&(b == OTHER_TOPIC))
        .then_with(|| a.cmp(b))
}

fn ordered_topics<'a>(topics: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let mut unique: Vec<&str> = topics.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
    unique.sort_by(|a, b| topic_order(a, b));
    unique
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part * 100.0 / whole } else { 0.0 }
}

/// Share of each topic's summed time taken by the bot and by the client.
pub fn talk_split(records: &[CallRecord]) -> GroupedSeries {
    let rows = topic_rows(records);
    let mut sums: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
    for row in &rows {
        let entry = sums.entry(row.topic.as_str()).or_default();
        entry.0 += row.bot_time;
        entry.1 += row.persona_time;
    }

    let topics = ordered_topics(sums.keys().copied());
    let mut bot = Vec::with_capacity(topics.len());
    let mut persona = Vec::with_capacity(topics.len());
    for topic in &topics {
        let (bot_time, persona_time) = sums[topic];
        let total = bot_time + persona_time;
        bot.push(percent(bot_time, total));
        persona.push(percent(persona_time, total));
    }

    GroupedSeries {
        categories: topics.into_iter().map(str::to_string).collect(),
        groups: vec![
            SeriesGroup {
                name: BOT_GROUP.to_string(),
                values: bot,
            },
            SeriesGroup {
                name: PERSONA_GROUP.to_string(),
                values: persona,
            },
        ],
    }
}

/// Total speaking time per topic.
pub fn share(records: &[CallRecord]) -> Series {
    let rows = topic_rows(records);
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for row in &rows {
        *totals.entry(row.topic.as_str()).or_default() += row.total_time();
    }
    Series::from_pairs(
        ordered_topics(totals.keys().copied())
            .into_iter()
            .map(|topic| (topic, totals[topic])),
    )
}

/// For every topic, how its time splits across `keys` (one group per key).
fn shares_within_topic<K, F>(rows: &[TopicRow], keys: &[K], key_of: F) -> GroupedSeries
where
    K: Ord + ToString,
    F: Fn(&TopicRow) -> Option<K>,
{
    let mut totals: BTreeMap<&str, BTreeMap<K, f64>> = BTreeMap::new();
    for row in rows {
        if let Some(key) = key_of(row) {
            *totals
                .entry(row.topic.as_str())
                .or_default()
                .entry(key)
                .or_default() += row.total_time();
        }
    }

    let topics = ordered_topics(totals.keys().copied());
    let groups = keys
        .iter()
        .map(|key| SeriesGroup {
            name: key.to_string(),
            values: topics
                .iter()
                .map(|topic| {
                    let per_key = &totals[topic];
                    let topic_total: f64 = per_key.values().sum();
                    percent(per_key.get(key).copied().unwrap_or(0.0), topic_total)
                })
                .collect(),
        })
        .collect();

    GroupedSeries {
        categories: topics.into_iter().map(str::to_string).collect(),
        groups,
    }
}

/// Share of each topic's time per age range.
pub fn by_age_range(records: &[CallRecord]) -> GroupedSeries {
    let rows = topic_rows(records);
    let Some(max_age) = rows.iter().map(|row| row.age).max() else {
        return GroupedSeries::default();
    };
    let bins = AgeBins::covering(max_age);
    let indices: Vec<usize> = (0..bins.count()).collect();

    let mut grouped = shares_within_topic(&rows, &indices, |row| bins.index_of(row.age));
    for (group, index) in grouped.groups.iter_mut().zip(&indices) {
        group.name = bins.label(*index);
    }
    grouped
}

/// Share of each topic's time per gender.
pub fn by_gender(records: &[CallRecord]) -> GroupedSeries {
    let rows = topic_rows(records);
    let genders: Vec<String> = rows
        .iter()
        .filter_map(|row| row.gender.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    shares_within_topic(&rows, &genders, |row| row.gender.clone())
}

fn topic_table(rows: &[TopicRow], reduce: fn(&[f64]) -> f64) -> Table {
    let mut cells: BTreeMap<(&str, u32), BTreeMap<&str, Vec<f64>>> = BTreeMap::new();
    for row in rows {
        let Some(gender) = row.gender.as_deref() else {
            continue;
        };
        cells
            .entry((row.topic.as_str(), row.age))
            .or_default()
            .entry(gender)
            .or_default()
            .push(row.total_time());
    }
    if cells.is_empty() {
        return Table::default();
    }

    let genders: BTreeSet<&str> = cells.values().flat_map(|per_gender| per_gender.keys().copied()).collect();
    let mut keys: Vec<(&str, u32)> = cells.keys().copied().collect();
    keys.sort_by(|a, b| topic_order(a.0, b.0).then(a.1.cmp(&b.1)));

    let mut columns = vec![
        TableColumn {
            group: "Tema".to_string(),
            label: "Tema".to_string(),
        },
        TableColumn {
            group: "Edad".to_string(),
            label: "Edad".to_string(),
        },
    ];
    columns.extend(genders.iter().map(|gender| TableColumn {
        group: "Género".to_string(),
        label: gender.to_string(),
    }));

    let rows = keys
        .iter()
        .map(|key| {
            let per_gender = &cells[key];
            let mut line = vec![key.0.to_string(), key.1.to_string()];
            line.extend(genders.iter().map(|gender| match per_gender.get(gender) {
                Some(values) => stats::format_value(reduce(values)),
                None => "-".to_string(),
            }));
            line
        })
        .collect();

    Table {
        caption: None,
        columns,
        rows,
    }
}

fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

/// Summed seconds per topic and age, one column per gender.
pub fn total_time_table(records: &[CallRecord]) -> Table {
    topic_table(&topic_rows(records), sum)
}

/// Mean seconds per topic mention, per topic and age, one column per gender.
pub fn average_time_table(records: &[CallRecord]) -> Table {
    topic_table(&topic_rows(records), stats::mean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::decode_records;
    use serde_json::json;

    fn fixture() -> Vec<CallRecord> {
        decode_records(vec![
            json!({
                "user_age": "62", "user_gender": "Female",
                "calls": [
                    { "analysis": { "times_by_subject": {
                        "Otros": { "bot": 10, "persona": 10 },
                        "Salud": { "bot": 30, "persona": 10 },
                        "Banco": { "bot": 5 }
                    } } },
                    { "analysis": { "times_by_subject": { "Salud": { "bot": 10, "persona": 30 } } } }
                ]
            }),
            json!({
                "user_age": "71", "user_gender": "Male",
                "calls": [{ "analysis": { "times_by_subject": { "Salud": { "bot": 20, "persona": 0 } } } }]
            }),
            json!({
                "user_age": "50", "user_gender": "Male",
                "calls": [{ "analysis": { "times_by_subject": { "Salud": { "bot": 999 } } } }]
            }),
        ])
    }

    #[test]
    fn other_topic_goes_last() {
        let split = talk_split(&fixture());
        assert_eq!(split.categories, vec!["Banco", "Salud", "Otros"]);
        assert_eq!(split.value(BOT_GROUP, "Banco"), Some(100.0));
        assert_eq!(split.value(BOT_GROUP, "Salud"), Some(60.0));
        assert_eq!(split.value(PERSONA_GROUP, "Salud"), Some(40.0));
        for index in 0..split.categories.len() {
            let total = split.groups[0].values[index] + split.groups[1].values[index];
            assert!((total - 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn share_sums_time_per_topic() {
        let series = share(&fixture());
        assert_eq!(series.points.last().unwrap().label, OTHER_TOPIC);
        assert_eq!(series.value_of("Salud"), Some(100.0));
        assert_eq!(series.value_of("Banco"), Some(5.0));
    }

    #[test]
    fn shares_per_age_range_and_gender() {
        let by_age = by_age_range(&fixture());
        let names: Vec<&str> = by_age.groups.iter().map(|group| group.name.as_str()).collect();
        assert_eq!(names, vec!["60-64", "65-69", "70-74"]);
        assert_eq!(by_age.value("60-64", "Salud"), Some(80.0));
        assert_eq!(by_age.value("65-69", "Salud"), Some(0.0));
        assert_eq!(by_age.value("70-74", "Salud"), Some(20.0));

        let by_gender = by_gender(&fixture());
        assert_eq!(by_gender.value("Female", "Salud"), Some(80.0));
        assert_eq!(by_gender.value("Male", "Salud"), Some(20.0));
        assert_eq!(by_gender.value("Male", "Otros"), Some(0.0));
    }

    #[test]
    fn tables_pivot_gender_into_columns() {
        let totals = total_time_table(&fixture());
        let labels: Vec<&str> = totals.columns.iter().map(|column| column.label.as_str()).collect();
        assert_eq!(labels, vec!["Tema", "Edad", "Female", "Male"]);
        assert_eq!(totals.rows[0], vec!["Banco", "62", "5", "-"]);
        assert_eq!(totals.rows[1], vec!["Salud", "62", "80", "-"]);
        assert_eq!(totals.rows[2], vec!["Salud", "71", "-", "20"]);
        assert_eq!(totals.rows[3][0], "Otros");

        let averages = average_time_table(&fixture());
        assert_eq!(averages.rows[1], vec!["Salud", "62", "40", "-"]);
        assert!(total_time_table(&[]).is_empty());
    }
}
