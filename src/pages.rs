//! Dashboard pages: which reports each page shows and how.

use crate::models::ReportData;
use crate::reports::{Report, ReportContext};
use crate::storage::CallStore;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Inbound,
    Outbound,
    Duration,
    Topics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Bar,
    GroupedBar,
    Pie,
    Table,
    Metric,
}

#[derive(Debug, Clone, Copy)]
pub struct Widget {
    pub report: Report,
    pub chart: ChartKind,
    /// Shown instead of the chart when the report has no data.
    pub empty_message: &'static str,
}

const fn widget(report: Report, chart: ChartKind, empty_message: &'static str) -> Widget {
    Widget {
        report,
        chart,
        empty_message,
    }
}

const NO_TABLE_DATA: &str = "No hay datos disponibles para mostrar en la tabla.";
const NO_CHART_DATA: &str = "No hay datos disponibles para generar la gráfica.";

const INBOUND_WIDGETS: [Widget; 6] = [
    widget(
        Report::InboundByDay,
        ChartKind::Bar,
        "No hay datos disponibles para mostrar en la métrica por día de la semana.",
    ),
    widget(
        Report::InboundByHour,
        ChartKind::Bar,
        "No hay datos disponibles para mostrar en la métrica por hora del día.",
    ),
    widget(
        Report::InboundByGender,
        ChartKind::Bar,
        "No hay datos disponibles para mostrar en la métrica por género.",
    ),
    widget(
        Report::InboundByAge,
        ChartKind::Bar,
        "No hay datos disponibles para mostrar en la métrica por edad.",
    ),
    widget(
        Report::InboundByDuration,
        ChartKind::Bar,
        "No hay datos disponibles para mostrar en la métrica por duración de llamadas.",
    ),
    widget(Report::InboundCallDistribution, ChartKind::Table, NO_TABLE_DATA),
];

const OUTBOUND_WIDGETS: [Widget; 4] = [
    widget(
        Report::OutboundByWeek,
        ChartKind::Bar,
        "No hay datos disponibles para mostrar en la métrica por semana.",
    ),
    widget(
        Report::OutboundByDuration,
        ChartKind::Bar,
        "No hay datos disponibles para mostrar en la métrica por duración de llamadas.",
    ),
    widget(
        Report::OutboundByAge,
        ChartKind::Bar,
        "No hay datos disponibles para mostrar en la métrica por edad.",
    ),
    widget(
        Report::OutboundByGender,
        ChartKind::Bar,
        "No hay datos disponibles para mostrar en la métrica por género.",
    ),
];

const DURATION_WIDGETS: [Widget; 7] = [
    widget(Report::AverageDuration, ChartKind::Metric, NO_CHART_DATA),
    widget(
        Report::AverageDurationByGender,
        ChartKind::Bar,
        "No hay datos disponibles para mostrar en la métrica por género.",
    ),
    widget(
        Report::AverageDurationByAge,
        ChartKind::Bar,
        "No hay datos disponibles para mostrar en la métrica por edad.",
    ),
    widget(
        Report::AverageDurationByDay,
        ChartKind::Bar,
        "No hay datos disponibles para mostrar en la métrica por día de la semana.",
    ),
    widget(
        Report::AverageDurationByHour,
        ChartKind::Bar,
        "No hay datos disponibles para mostrar en la métrica por hora del día.",
    ),
    widget(Report::TalkSplitByGender, ChartKind::GroupedBar, NO_CHART_DATA),
    widget(Report::TalkSplitByAge, ChartKind::GroupedBar, NO_CHART_DATA),
];

const TOPIC_WIDGETS: [Widget; 6] = [
    widget(Report::TopicTalkSplit, ChartKind::GroupedBar, NO_CHART_DATA),
    widget(Report::TopicShare, ChartKind::Pie, NO_CHART_DATA),
    widget(Report::TopicByAgeRange, ChartKind::GroupedBar, NO_CHART_DATA),
    widget(Report::TopicByGender, ChartKind::GroupedBar, NO_CHART_DATA),
    widget(Report::TopicTotalTime, ChartKind::Table, NO_TABLE_DATA),
    widget(Report::TopicAverageTime, ChartKind::Table, NO_TABLE_DATA),
];

impl Page {
    /// Menu order; the first page is the landing page.
    pub const ALL: [Page; 4] = [Page::Inbound, Page::Outbound, Page::Duration, Page::Topics];

    pub fn slug(self) -> &'static str {
        match self {
            Page::Inbound => "inbound",
            Page::Outbound => "outbound",
            Page::Duration => "duracion",
            Page::Topics => "temas",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|page| page.slug() == slug)
    }

    pub fn menu_title(self) -> &'static str {
        match self {
            Page::Inbound => "Llamadas Inbound",
            Page::Outbound => "Llamadas Outbound",
            Page::Duration => "Duración de llamadas",
            Page::Topics => "Temas de conversación",
        }
    }

    pub fn heading(self) -> &'static str {
        match self {
            Page::Inbound => "Métricas de Usuarios Inbound",
            Page::Outbound => "Métricas de Usuarios Outbound",
            Page::Duration => "Métricas de Duración de Llamadas",
            Page::Topics => "Métricas por Tema de Conversación",
        }
    }

    pub fn widgets(self) -> &'static [Widget] {
        match self {
            Page::Inbound => &INBOUND_WIDGETS,
            Page::Outbound => &OUTBOUND_WIDGETS,
            Page::Duration => &DURATION_WIDGETS,
            Page::Topics => &TOPIC_WIDGETS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PanelOutcome {
    Data(ReportData),
    Empty(&'static str),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct Panel {
    pub title: &'static str,
    pub chart: ChartKind,
    pub outcome: PanelOutcome,
}

#[derive(Debug, Clone)]
pub struct PageView {
    pub page: Page,
    pub panels: Vec<Panel>,
}

/// Runs every report of `page`, one after the other. A failing report only
/// affects its own panel.
pub async fn build_page(store: &CallStore, page: Page, ctx: &ReportContext) -> PageView {
    let mut panels = Vec::with_capacity(page.widgets().len());
    for widget in page.widgets() {
        let outcome = match widget.report.run(store, ctx).await {
            Ok(data) if data.is_empty() => PanelOutcome::Empty(widget.empty_message),
            Ok(data) => PanelOutcome::Data(data),
            Err(err) => {
                error!(report = widget.report.slug(), "report failed: {err}");
                PanelOutcome::Failed(format!("No se pudieron cargar los datos: {err}"))
            }
        };
        panels.push(Panel {
            title: widget.report.title(),
            chart: widget.chart,
            outcome,
        });
    }
    PageView { page, panels }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FileStore;
    use std::path::PathBuf;

    fn context() -> ReportContext {
        ReportContext {
            timezone: chrono_tz::UTC,
        }
    }

    #[test]
    fn every_report_sits_on_exactly_one_page() {
        for report in Report::ALL {
            let hosts = Page::ALL
                .iter()
                .filter(|page| page.widgets().iter().any(|widget| widget.report == report))
                .count();
            assert_eq!(hosts, 1, "{}", report.slug());
        }
        for page in Page::ALL {
            assert_eq!(Page::from_slug(page.slug()), Some(page));
        }
        assert_eq!(Page::from_slug("otra"), None);
    }

    #[test]
    fn chart_kinds_match_report_output() {
        for page in Page::ALL {
            for widget in page.widgets() {
                let data = widget.report.aggregate(&[], &context());
                let compatible = matches!(
                    (widget.chart, &data),
                    (ChartKind::Bar | ChartKind::Pie, ReportData::Series(_))
                        | (ChartKind::GroupedBar, ReportData::Grouped(_))
                        | (ChartKind::Table, ReportData::Table(_))
                        | (ChartKind::Metric, ReportData::Metric(_))
                );
                assert!(compatible, "{}", widget.report.slug());
            }
        }
    }

    #[tokio::test]
    async fn empty_collection_renders_notices() {
        let store = CallStore::File(FileStore::new(PathBuf::from("/nonexistent/calls.json")));
        let view = build_page(&store, Page::Inbound, &context()).await;
        assert_eq!(view.panels.len(), 6);
        assert_eq!(
            view.panels[0].outcome,
            PanelOutcome::Empty("No hay datos disponibles para mostrar en la métrica por día de la semana.")
        );

        let view = build_page(&store, Page::Duration, &context()).await;
        assert!(matches!(view.panels[0].outcome, PanelOutcome::Data(ReportData::Metric(_))));
    }

    #[tokio::test]
    async fn broken_file_fails_each_panel() {
        let mut path = std::env::temp_dir();
        path.push(format!("call_dashboard_pages_{}.json", std::process::id()));
        tokio::fs::write(&path, b"[{ not json").await.unwrap();

        let store = CallStore::File(FileStore::new(path.clone()));
        let view = build_page(&store, Page::Topics, &context()).await;
        assert!(view
            .panels
            .iter()
            .all(|panel| matches!(panel.outcome, PanelOutcome::Failed(_))));

        tokio::fs::remove_file(&path).await.unwrap();
    }
}
