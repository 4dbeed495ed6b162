//! Every chart and table of the dashboard is a [`Report`]: a query against the
//! call store plus an aggregation over the decoded records.

pub mod duration;
pub mod inbound;
pub mod outbound;
pub mod topics;

use crate::errors::StoreError;
use crate::models::{CallRecord, CallType, ReportData, ReportSummary};
use crate::storage::{CallFilter, CallStore, Query};
use chrono_tz::Tz;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct ReportContext {
    /// Zone used for day-of-week, hour-of-day and week derivations.
    pub timezone: Tz,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Report {
    InboundByDay,
    InboundByHour,
    InboundByGender,
    InboundByAge,
    InboundByDuration,
    InboundCallDistribution,
    OutboundByWeek,
    OutboundByDuration,
    OutboundByAge,
    OutboundByGender,
    AverageDuration,
    AverageDurationByGender,
    AverageDurationByAge,
    AverageDurationByDay,
    AverageDurationByHour,
    TalkSplitByGender,
    TalkSplitByAge,
    TopicTalkSplit,
    TopicShare,
    TopicByAgeRange,
    TopicByGender,
    TopicTotalTime,
    TopicAverageTime,
}

const INBOUND: CallFilter = CallFilter::CallType(CallType::Inbound);
const OUTBOUND: CallFilter = CallFilter::CallType(CallType::Outbound);
const HAS_TOTAL_TIME: CallFilter = CallFilter::CallFieldExists("call_duration.original_total_time");
const HAS_BREAKDOWN: CallFilter = CallFilter::CallFieldExists("call_duration");
const HAS_TOPICS: CallFilter = CallFilter::CallFieldExists("analysis.times_by_subject");

const TOPIC_QUERY: Query = Query::new(
    HAS_TOPICS,
    &["user_age", "user_gender", "calls.analysis.times_by_subject"],
);

impl Report {
    pub const ALL: [Report; 23] = [
        Report::InboundByDay,
        Report::InboundByHour,
        Report::InboundByGender,
        Report::InboundByAge,
        Report::InboundByDuration,
        Report::InboundCallDistribution,
        Report::OutboundByWeek,
        Report::OutboundByDuration,
        Report::OutboundByAge,
        Report::OutboundByGender,
        Report::AverageDuration,
        Report::AverageDurationByGender,
        Report::AverageDurationByAge,
        Report::AverageDurationByDay,
        Report::AverageDurationByHour,
        Report::TalkSplitByGender,
        Report::TalkSplitByAge,
        Report::TopicTalkSplit,
        Report::TopicShare,
        Report::TopicByAgeRange,
        Report::TopicByGender,
        Report::TopicTotalTime,
        Report::TopicAverageTime,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            Report::InboundByDay => "inbound-by-day",
            Report::InboundByHour => "inbound-by-hour",
            Report::InboundByGender => "inbound-by-gender",
            Report::InboundByAge => "inbound-by-age",
            Report::InboundByDuration => "inbound-by-duration",
            Report::InboundCallDistribution => "inbound-call-distribution",
            Report::OutboundByWeek => "outbound-by-week",
            Report::OutboundByDuration => "outbound-by-duration",
            Report::OutboundByAge => "outbound-by-age",
            Report::OutboundByGender => "outbound-by-gender",
            Report::AverageDuration => "average-duration",
            Report::AverageDurationByGender => "average-duration-by-gender",
            Report::AverageDurationByAge => "average-duration-by-age",
            Report::AverageDurationByDay => "average-duration-by-day",
            Report::AverageDurationByHour => "average-duration-by-hour",
            Report::TalkSplitByGender => "talk-split-by-gender",
            Report::TalkSplitByAge => "talk-split-by-age",
            Report::TopicTalkSplit => "topic-talk-split",
            Report::TopicShare => "topic-share",
            Report::TopicByAgeRange => "topic-by-age-range",
            Report::TopicByGender => "topic-by-gender",
            Report::TopicTotalTime => "topic-total-time",
            Report::TopicAverageTime => "topic-average-time",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|report| report.slug() == slug)
    }

    pub fn title(self) -> &'static str {
        match self {
            Report::InboundByDay => "Número de llamadas inbound por día de la semana",
            Report::InboundByHour => "Número de llamadas inbound por hora del día (24 hrs)",
            Report::InboundByGender => "Número de llamadas inbound por género",
            Report::InboundByAge => "Número de llamadas inbound por edad (rangos de 5 años desde 60 años)",
            Report::InboundByDuration => {
                "Número de llamadas inbound por duración de las llamadas (rangos de 5 minutos)"
            }
            Report::InboundCallDistribution => {
                "Número de llamadas inbound por número de llamadas totales en el mes"
            }
            Report::OutboundByWeek => "Número de llamadas outbound por semana",
            Report::OutboundByDuration => {
                "Número de llamadas outbound por duración de las llamadas (rangos de 5 minutos)"
            }
            Report::OutboundByAge => "Usuarios outbound por edad (rangos de 5 años desde 60 años)",
            Report::OutboundByGender => "Usuarios outbound por género",
            Report::AverageDuration => "Duración promedio de las llamadas",
            Report::AverageDurationByGender => "Duración promedio por género (minutos)",
            Report::AverageDurationByAge => "Duración promedio por edad (minutos)",
            Report::AverageDurationByDay => "Duración promedio por día de la semana (minutos)",
            Report::AverageDurationByHour => "Duración promedio por hora del día (minutos)",
            Report::TalkSplitByGender => "Porcentaje de conversación chatbot vs. humano por género",
            Report::TalkSplitByAge => "Porcentaje de conversación chatbot vs. humano por edad",
            Report::TopicTalkSplit => "Porcentaje de tiempo del chatbot y del cliente por tema",
            Report::TopicShare => "Distribución del tiempo total por tema",
            Report::TopicByAgeRange => "Porcentaje de tiempo por tema y rango de edad",
            Report::TopicByGender => "Porcentaje de tiempo por tema y género",
            Report::TopicTotalTime => "Tiempo total por tema, edad y género (segundos)",
            Report::TopicAverageTime => "Tiempo promedio por llamada por tema, edad y género (segundos)",
        }
    }

    pub fn summary(self) -> ReportSummary {
        ReportSummary {
            slug: self.slug(),
            title: self.title(),
        }
    }

    pub fn query(self) -> Query {
        match self {
            Report::InboundByDay | Report::InboundByHour | Report::InboundByDuration => {
                Query::new(INBOUND, &["calls"])
            }
            Report::InboundByGender => Query::new(INBOUND, &["calls", "user_gender"]),
            Report::InboundByAge => Query::new(INBOUND, &["calls", "user_age"]),
            Report::InboundCallDistribution => {
                Query::new(INBOUND, &["calls", "user_id", "user_gender", "user_age"])
            }
            Report::OutboundByWeek | Report::OutboundByDuration => Query::new(OUTBOUND, &["calls"]),
            Report::OutboundByAge => Query::new(OUTBOUND, &["user_age", "user_id", "calls.type_call"]),
            Report::OutboundByGender => {
                Query::new(OUTBOUND, &["user_gender", "user_id", "calls.type_call"])
            }
            Report::AverageDuration => {
                Query::new(HAS_TOTAL_TIME, &["calls.call_duration.original_total_time"])
            }
            Report::AverageDurationByGender => Query::new(
                HAS_TOTAL_TIME,
                &["user_gender", "calls.call_duration.original_total_time"],
            ),
            Report::AverageDurationByAge => Query::new(
                HAS_TOTAL_TIME,
                &["user_age", "calls.call_duration.original_total_time"],
            ),
            Report::AverageDurationByDay | Report::AverageDurationByHour => Query::new(
                HAS_TOTAL_TIME,
                &["calls.call_duration.original_total_time", "calls.call_start_time"],
            ),
            Report::TalkSplitByGender => Query::new(
                HAS_BREAKDOWN,
                &["user_gender", "calls.call_duration.human", "calls.call_duration.bot"],
            ),
            Report::TalkSplitByAge => Query::new(
                HAS_BREAKDOWN,
                &["user_age", "calls.call_duration.human", "calls.call_duration.bot"],
            ),
            Report::TopicTalkSplit
            | Report::TopicShare
            | Report::TopicByAgeRange
            | Report::TopicByGender
            | Report::TopicTotalTime
            | Report::TopicAverageTime => TOPIC_QUERY,
        }
    }

    pub fn aggregate(self, records: &[CallRecord], ctx: &ReportContext) -> ReportData {
        let tz = ctx.timezone;
        match self {
            Report::InboundByDay => ReportData::Series(inbound::calls_by_day(records, tz)),
            Report::InboundByHour => ReportData::Series(inbound::calls_by_hour(records, tz)),
            Report::InboundByGender => ReportData::Series(inbound::calls_by_gender(records)),
            Report::InboundByAge => ReportData::Series(inbound::calls_by_age(records)),
            Report::InboundByDuration => ReportData::Series(inbound::calls_by_duration(records)),
            Report::InboundCallDistribution => ReportData::Table(inbound::call_distribution(records)),
            Report::OutboundByWeek => ReportData::Series(outbound::calls_by_week(records, tz)),
            Report::OutboundByDuration => ReportData::Series(outbound::calls_by_duration(records)),
            Report::OutboundByAge => ReportData::Series(outbound::users_by_age(records)),
            Report::OutboundByGender => ReportData::Series(outbound::users_by_gender(records)),
            Report::AverageDuration => ReportData::Metric(duration::average_duration(records)),
            Report::AverageDurationByGender => ReportData::Series(duration::average_by_gender(records)),
            Report::AverageDurationByAge => ReportData::Series(duration::average_by_age(records)),
            Report::AverageDurationByDay => ReportData::Series(duration::average_by_day(records, tz)),
            Report::AverageDurationByHour => {
                ReportData::Series(duration::average_by_hour(records, tz))
            }
            Report::TalkSplitByGender => ReportData::Grouped(duration::talk_split_by_gender(records)),
            Report::TalkSplitByAge => ReportData::Grouped(duration::talk_split_by_age(records)),
            Report::TopicTalkSplit => ReportData::Grouped(topics::talk_split(records)),
            Report::TopicShare => ReportData::Series(topics::share(records)),
            Report::TopicByAgeRange => ReportData::Grouped(topics::by_age_range(records)),
            Report::TopicByGender => ReportData::Grouped(topics::by_gender(records)),
            Report::TopicTotalTime => ReportData::Table(topics::total_time_table(records)),
            Report::TopicAverageTime => ReportData::Table(topics::average_time_table(records)),
        }
    }

    /// Fetches what the report needs and aggregates it.
    pub async fn run(self, store: &CallStore, ctx: &ReportContext) -> Result<ReportData, StoreError> {
        let records = store.find(&self.query()).await?;
        debug!(report = self.slug(), records = records.len(), "running report");
        Ok(self.aggregate(&records, ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_round_trip_and_are_unique() {
        for report in Report::ALL {
            assert_eq!(Report::from_slug(report.slug()), Some(report));
        }
        let mut slugs: Vec<&str> = Report::ALL.iter().map(|report| report.slug()).collect();
        slugs.sort_unstable();
        slugs.dedup();
        assert_eq!(slugs.len(), Report::ALL.len());
        assert_eq!(Report::from_slug("nope"), None);
    }

    #[test]
    fn queries_project_what_the_aggregation_reads() {
        let query = Report::OutboundByAge.query();
        assert_eq!(query.filter, CallFilter::CallType(CallType::Outbound));
        assert!(query.projection.contains(&"calls.type_call"));

        let query = Report::AverageDurationByHour.query();
        assert!(query.projection.contains(&"calls.call_start_time"));
        assert_eq!(Report::TopicShare.query(), TOPIC_QUERY);
    }
}
