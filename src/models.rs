use crate::deserializers::{lenient_f64, lenient_list, lenient_string, null_as_default};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    Inbound,
    Outbound,
}

impl CallType {
    pub fn as_str(self) -> &'static str {
        match self {
            CallType::Inbound => "inbound",
            CallType::Outbound => "outbound",
        }
    }
}

/// One document of the `call_information` collection: a user and their calls.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub user_age: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub user_gender: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub calls: Vec<Call>,
}

impl CallRecord {
    /// Age in years, only when `user_age` is made of ASCII digits.
    pub fn age_years(&self) -> Option<u32> {
        let age = self.user_age.as_deref()?.trim();
        if age.is_empty() || !age.bytes().all(|byte| byte.is_ascii_digit()) {
            return None;
        }
        age.parse().ok()
    }

    pub fn gender(&self) -> Option<&str> {
        self.user_gender.as_deref().filter(|gender| !gender.is_empty())
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn calls_of_type(&self, call_type: CallType) -> impl Iterator<Item = &Call> + '_ {
        self.calls.iter().filter(move |call| call.is_type(call_type))
    }

    pub fn has_call_type(&self, call_type: CallType) -> bool {
        self.calls_of_type(call_type).next().is_some()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Call {
    #[serde(default, deserialize_with = "lenient_string")]
    pub call_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub type_call: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub call_start_time: Option<String>,
    #[serde(default)]
    pub call_duration: Option<CallDuration>,
    #[serde(default)]
    pub analysis: Option<CallAnalysis>,
}

impl Call {
    pub fn is_type(&self, call_type: CallType) -> bool {
        self.type_call.as_deref() == Some(call_type.as_str())
    }

    pub fn total_seconds(&self) -> Option<f64> {
        self.call_duration.as_ref()?.original_total_time
    }

    pub fn topics(&self) -> impl Iterator<Item = (&String, &TopicTimes)> {
        self.analysis
            .iter()
            .flat_map(|analysis| analysis.times_by_subject.iter())
    }
}

/// Seconds spent on the call, split by speaker.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallDuration {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub original_total_time: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub human: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub bot: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallAnalysis {
    #[serde(default, deserialize_with = "null_as_default")]
    pub times_by_subject: BTreeMap<String, TopicTimes>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopicTimes {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub bot: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub persona: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub label: String,
    pub value: f64,
}

/// Labelled values in display order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Series {
    pub points: Vec<SeriesPoint>,
}

impl Series {
    pub fn from_pairs<I, L>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (L, f64)>,
        L: Into<String>,
    {
        Self {
            points: pairs
                .into_iter()
                .map(|(label, value)| SeriesPoint {
                    label: label.into(),
                    value,
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
impl Series {
    pub fn value_of(&self, label: &str) -> Option<f64> {
        self.points
            .iter()
            .find(|point| point.label == label)
            .map(|point| point.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesGroup {
    pub name: String,
    pub values: Vec<f64>,
}

/// Several named value lists sharing one category axis; `values[i]` of every
/// group belongs to `categories[i]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupedSeries {
    pub categories: Vec<String>,
    pub groups: Vec<SeriesGroup>,
}

impl GroupedSeries {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

#[cfg(test)]
impl GroupedSeries {
    pub fn value(&self, group: &str, category: &str) -> Option<f64> {
        let index = self.categories.iter().position(|name| name == category)?;
        self.groups
            .iter()
            .find(|candidate| candidate.name == group)
            .and_then(|found| found.values.get(index).copied())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableColumn {
    pub group: String,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    pub caption: Option<String>,
    pub columns: Vec<TableColumn>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub value: f64,
    pub unit: String,
}

/// Output of one report, as served by the JSON API and rendered by the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportData {
    Series(Series),
    Grouped(GroupedSeries),
    Table(Table),
    Metric(Metric),
}

impl ReportData {
    pub fn is_empty(&self) -> bool {
        match self {
            ReportData::Series(series) => series.is_empty(),
            ReportData::Grouped(grouped) => grouped.is_empty(),
            ReportData::Table(table) => table.is_empty(),
            ReportData::Metric(_) => false,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReportSummary {
    pub slug: &'static str,
    pub title: &'static str,
}
