use crate::models::{Call, CallRecord, CallType};
use crate::stats::to_local;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use chrono_tz::Tz;
use tracing::warn;

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

/// A call together with the record (user) it belongs to.
#[derive(Debug, Clone, Copy)]
pub struct CallRow<'a> {
    pub record: &'a CallRecord,
    pub call: &'a Call,
}

/// One row per call passing `predicate`.
pub fn flatten_calls<'a>(records: &'a [CallRecord], predicate: impl Fn(&Call) -> bool) -> Vec<CallRow<'a>> {
    let mut rows = Vec::new();
    for record in records {
        for call in &record.calls {
            if predicate(call) {
                rows.push(CallRow { record, call });
            }
        }
    }
    rows
}

/// Parses a stored start time as UTC. Sub-second precision is dropped;
/// explicit offsets are honoured and a bare date means midnight.
pub fn parse_start_time(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    let trimmed = raw.trim();
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(trimmed) {
        let utc = with_offset.naive_utc();
        return Ok(utc.with_nanosecond(0).unwrap_or(utc));
    }

    let whole_seconds = trimmed.split('.').next().unwrap_or(trimmed);
    let mut parsed = NaiveDateTime::parse_from_str(whole_seconds, NAIVE_FORMATS[0]);
    for format in &NAIVE_FORMATS[1..] {
        if parsed.is_ok() {
            break;
        }
        if let Ok(candidate) = NaiveDateTime::parse_from_str(whole_seconds, format) {
            parsed = Ok(candidate);
        }
    }
    parsed.or_else(|err| {
        NaiveDate::parse_from_str(whole_seconds, "%Y-%m-%d")
            .map(|date| date.and_time(NaiveTime::MIN))
            .map_err(|_| err)
    })
}

/// Local start time of a call; `None` when absent or unparseable (logged).
pub fn local_start(call: &Call, tz: Tz) -> Option<NaiveDateTime> {
    let raw = call.call_start_time.as_deref().filter(|raw| !raw.trim().is_empty())?;
    match parse_start_time(raw) {
        Ok(utc) => Some(to_local(utc, tz)),
        Err(err) => {
            warn!("skipping call with unparseable call_start_time '{raw}': {err}");
            None
        }
    }
}

/// Local start times of every call of `call_type`.
pub fn start_times(records: &[CallRecord], call_type: CallType, tz: Tz) -> Vec<NaiveDateTime> {
    flatten_calls(records, |call| call.is_type(call_type))
        .into_iter()
        .filter_map(|row| local_start(row.call, tz))
        .collect()
}

/// Length of a call in minutes. Absent totals give `None`; negative or
/// non-finite totals are logged and give `None` too.
pub fn call_minutes(call: &Call) -> Option<f64> {
    let seconds = call.total_seconds()?;
    if !seconds.is_finite() || seconds < 0.0 {
        warn!(
            "ignoring call {} with invalid original_total_time {seconds}",
            call.call_id.as_deref().unwrap_or("<no id>")
        );
        return None;
    }
    Some(seconds / 60.0)
}

/// Durations in minutes of the calls passing `predicate` that carry a
/// usable `original_total_time`.
pub fn duration_minutes(records: &[CallRecord], predicate: impl Fn(&Call) -> bool) -> Vec<f64> {
    flatten_calls(records, predicate)
        .into_iter()
        .filter_map(|row| call_minutes(row.call))
        .collect()
}

/// Share of speaking time taken by the human and by the bot, in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TalkSplit {
    pub human_pct: f64,
    pub bot_pct: f64,
}

/// `None` when the call has no duration breakdown or nobody spoke.
pub fn talk_split(call: &Call) -> Option<TalkSplit> {
    let duration = call.call_duration.as_ref()?;
    let human = duration.human.unwrap_or(0.0);
    let bot = duration.bot.unwrap_or(0.0);
    let total = human + bot;
    if total.is_nan() || total <= 0.0 {
        return None;
    }
    Some(TalkSplit {
        human_pct: human / total * 100.0,
        bot_pct: bot / total * 100.0,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopicRow {
    pub topic: String,
    pub age: u32,
    pub gender: Option<String>,
    pub bot_time: f64,
    pub persona_time: f64,
}

impl TopicRow {
    pub fn total_time(&self) -> f64 {
        self.bot_time + self.persona_time
    }
}

/// One row per (call, topic) for users aged 60 or more, skipping topics
/// where nobody spoke.
pub fn topic_rows(records: &[CallRecord]) -> Vec<TopicRow> {
    let mut rows = Vec::new();
    for record in records {
        let Some(age) = record.age_years().filter(|age| *age >= crate::stats::AGE_FLOOR) else {
            continue;
        };
        for call in &record.calls {
            for (topic, times) in call.topics() {
                let row = TopicRow {
                    topic: topic.clone(),
                    age,
                    gender: record.gender().map(str::to_string),
                    bot_time: times.bot.unwrap_or(0.0),
                    persona_time: times.persona.unwrap_or(0.0),
                };
                if row.total_time() > 0.0 {
                    rows.push(row);
                }
            }
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::decode_records;
    use chrono::NaiveDate;
    use serde_json::json;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap().and_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn start_time_drops_fractional_seconds() {
        assert_eq!(parse_start_time("2024-03-04T10:15:30.987654").unwrap(), at(10, 15, 30));
        assert_eq!(parse_start_time("2024-03-04 10:15:30").unwrap(), at(10, 15, 30));
        assert_eq!(parse_start_time("2024-03-04T10:15").unwrap(), at(10, 15, 0));
        assert_eq!(parse_start_time("2024-03-04T10:15:30.5Z").unwrap(), at(10, 15, 30));
        assert_eq!(parse_start_time("2024-03-04T04:15:30-06:00").unwrap(), at(10, 15, 30));
        assert!(parse_start_time("ayer por la tarde").is_err());
    }

    #[test]
    fn date_only_start_time_is_midnight() {
        assert_eq!(parse_start_time("2024-03-04").unwrap(), at(0, 0, 0));
        assert_eq!(parse_start_time(" 2024-03-04 ").unwrap(), at(0, 0, 0));
        assert!(parse_start_time("2024-13-04").is_err());
    }

    #[test]
    fn local_start_converts_and_skips_garbage() {
        let records = decode_records(vec![json!({
            "calls": [
                { "type_call": "inbound", "call_start_time": "2024-03-04T18:00:00" },
                { "type_call": "inbound", "call_start_time": "garbage" },
                { "type_call": "inbound" },
                { "type_call": "outbound", "call_start_time": "2024-03-04T18:00:00" }
            ]
        })]);

        let local = start_times(&records, CallType::Inbound, chrono_tz::America::Mexico_City);
        assert_eq!(local, vec![at(12, 0, 0)]);
    }

    #[test]
    fn durations_require_a_value() {
        let records = decode_records(vec![json!({
            "calls": [
                { "type_call": "inbound", "call_duration": { "original_total_time": 300 } },
                { "type_call": "inbound", "call_duration": { "original_total_time": null } },
                { "type_call": "inbound", "call_duration": {} },
                { "type_call": "inbound" },
                { "type_call": "outbound", "call_duration": { "original_total_time": 60 } }
            ]
        })]);

        assert_eq!(duration_minutes(&records, |call| call.is_type(CallType::Inbound)), vec![5.0]);
        assert_eq!(duration_minutes(&records, |_| true), vec![5.0, 1.0]);
    }

    #[test]
    fn negative_durations_are_dropped() {
        let records = decode_records(vec![json!({
            "calls": [
                { "call_id": "ok", "call_duration": { "original_total_time": 120 } },
                { "call_id": "bad", "call_duration": { "original_total_time": -300 } }
            ]
        })]);
        let calls = &records[0].calls;

        assert_eq!(call_minutes(&calls[0]), Some(2.0));
        assert_eq!(call_minutes(&calls[1]), None);
        assert_eq!(duration_minutes(&records, |_| true), vec![2.0]);
    }

    #[test]
    fn talk_split_needs_speaking_time() {
        let records = decode_records(vec![json!({
            "calls": [
                { "call_duration": { "human": 30, "bot": 90 } },
                { "call_duration": { "human": 0, "bot": 0 } },
                { "call_duration": { "bot": 10 } }
            ]
        })]);
        let calls = &records[0].calls;

        let split = talk_split(&calls[0]).unwrap();
        assert_eq!(split.human_pct, 25.0);
        assert_eq!(split.bot_pct, 75.0);
        assert_eq!(talk_split(&calls[1]), None);
        assert_eq!(talk_split(&calls[2]).unwrap().bot_pct, 100.0);
    }

    #[test]
    fn topic_rows_filter_age_and_silence() {
        let records = decode_records(vec![
            json!({
                "user_age": "67", "user_gender": "Female",
                "calls": [{ "analysis": { "times_by_subject": {
                    "Salud": { "bot": 20, "persona": 10 },
                    "Otros": { "bot": 0, "persona": 0 }
                } } }]
            }),
            json!({
                "user_age": "45",
                "calls": [{ "analysis": { "times_by_subject": { "Salud": { "bot": 5 } } } }]
            }),
        ]);

        let rows = topic_rows(&records);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].topic, "Salud");
        assert_eq!(rows[0].age, 67);
        assert_eq!(rows[0].gender.as_deref(), Some("Female"));
        assert_eq!(rows[0].total_time(), 30.0);
    }
}
