use crate::models::{GroupedSeries, Metric, ReportData, Series, Table};
use crate::pages::{ChartKind, Page, PageView, Panel, PanelOutcome};
use crate::stats::format_value;

const WIDTH: f64 = 600.0;
const HEIGHT: f64 = 260.0;
const PADDING_X: f64 = 44.0;
const PADDING_Y: f64 = 34.0;
const TOP: f64 = 24.0;
const TICKS: u32 = 4;
const ROTATED_EXTRA: f64 = 44.0;

const PIE_SIZE: f64 = 320.0;
const PIE_RADIUS: f64 = 140.0;
const PIE_START_DEGREES: f64 = 140.0;

const PALETTE: [&str; 8] = [
    "#ff6b4a", "#2f4858", "#f2a541", "#3f8f7f", "#8e5572", "#5b8bd9", "#c9a227", "#7a746d",
];

pub fn render_page(view: &PageView) -> String {
    let panels: String = view.panels.iter().map(render_panel).collect();
    LAYOUT_HTML
        .replace("{{TITLE}}", &escape(view.page.menu_title()))
        .replace("{{NAV}}", &nav(view.page))
        .replace("{{HEADING}}", &escape(view.page.heading()))
        .replace("{{PANELS}}", &panels)
}

pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn nav(current: Page) -> String {
    Page::ALL
        .iter()
        .map(|page| {
            let class = if *page == current { "nav-link active" } else { "nav-link" };
            format!(
                r#"<a class="{class}" href="/pages/{}">{}</a>"#,
                page.slug(),
                escape(page.menu_title())
            )
        })
        .collect()
}

fn render_panel(panel: &Panel) -> String {
    let body = match &panel.outcome {
        PanelOutcome::Data(data) => render_data(panel.chart, data),
        PanelOutcome::Empty(message) => notice("warning", message),
        PanelOutcome::Failed(message) => notice("error", message),
    };
    format!(
        r#"<section class="chart-card"><h2>{}</h2>{body}</section>"#,
        escape(panel.title)
    )
}

fn render_data(chart: ChartKind, data: &ReportData) -> String {
    match (chart, data) {
        (ChartKind::Pie, ReportData::Series(series)) => pie_chart(series),
        (_, ReportData::Series(series)) => bar_chart(series),
        (_, ReportData::Grouped(grouped)) => grouped_bar_chart(grouped),
        (_, ReportData::Table(table)) => table_html(table),
        (_, ReportData::Metric(metric)) => metric_card(metric),
    }
}

fn notice(kind: &str, message: &str) -> String {
    format!(r#"<p class="status" data-type="{kind}">{}</p>"#, escape(message))
}

fn color(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

fn bar_chart(series: &Series) -> String {
    let categories: Vec<&str> = series.points.iter().map(|point| point.label.as_str()).collect();
    let values: Vec<f64> = series.points.iter().map(|point| point.value).collect();
    bars_svg(&categories, &[("", values.as_slice())])
}

fn grouped_bar_chart(grouped: &GroupedSeries) -> String {
    let categories: Vec<&str> = grouped.categories.iter().map(String::as_str).collect();
    let groups: Vec<(&str, &[f64])> = grouped
        .groups
        .iter()
        .map(|group| (group.name.as_str(), group.values.as_slice()))
        .collect();
    let names: Vec<&str> = groups.iter().map(|(name, _)| *name).collect();
    format!("{}{}", bars_svg(&categories, &groups), legend(&names))
}

fn legend(names: &[&str]) -> String {
    let items: String = names
        .iter()
        .enumerate()
        .map(|(index, name)| {
            format!(
                r#"<li><span class="swatch" style="background:{}"></span>{}</li>"#,
                color(index),
                escape(name)
            )
        })
        .collect();
    format!(r#"<ul class="legend">{items}</ul>"#)
}

/// Vertical bars, one slot per category and one bar per group inside it.
fn bars_svg(categories: &[&str], groups: &[(&str, &[f64])]) -> String {
    let rotate = categories.iter().any(|label| label.chars().count() > 8);
    let bottom = if rotate { PADDING_Y + ROTATED_EXTRA } else { PADDING_Y };
    let height = if rotate { HEIGHT + ROTATED_EXTRA } else { HEIGHT };
    let max = groups
        .iter()
        .flat_map(|(_, values)| values.iter().copied())
        .fold(0.0, f64::max);
    let max = if max > 0.0 { max } else { 1.0 };
    let baseline = height - bottom;
    let y = |value: f64| baseline - value.max(0.0) / max * (baseline - TOP);

    let slot = (WIDTH - PADDING_X * 2.0) / categories.len().max(1) as f64;
    let bar_width = slot * 0.7 / groups.len().max(1) as f64;
    let label_every = if categories.len() > 12 { 2 } else { 1 };

    let mut svg = format!(r#"<svg class="chart" viewBox="0 0 {WIDTH} {height}" role="img">"#);
    for tick in 0..=TICKS {
        let value = max * f64::from(tick) / f64::from(TICKS);
        let y_pos = y(value);
        svg.push_str(&format!(
            r#"<line class="chart-grid" x1="{PADDING_X}" y1="{y_pos:.1}" x2="{}" y2="{y_pos:.1}" />"#,
            WIDTH - PADDING_X
        ));
        svg.push_str(&format!(
            r#"<text class="chart-label" x="{}" y="{:.1}" text-anchor="end">{}</text>"#,
            PADDING_X - 8.0,
            y_pos + 4.0,
            format_value(value)
        ));
    }

    for (index, category) in categories.iter().enumerate() {
        let slot_x = PADDING_X + slot * index as f64;
        for (group_index, (name, values)) in groups.iter().enumerate() {
            let value = values.get(index).copied().unwrap_or(0.0);
            let x = slot_x + slot * 0.15 + bar_width * group_index as f64;
            let top = y(value);
            let tooltip = if name.is_empty() {
                format!("{category}: {}", format_value(value))
            } else {
                format!("{name} · {category}: {}", format_value(value))
            };
            svg.push_str(&format!(
                r#"<rect class="chart-bar" x="{x:.1}" y="{top:.1}" width="{bar_width:.1}" height="{:.1}" fill="{}"><title>{}</title></rect>"#,
                baseline - top,
                color(group_index),
                escape(&tooltip)
            ));
        }

        if index % label_every == 0 {
            let x = slot_x + slot / 2.0;
            let label_y = baseline + 16.0;
            if rotate {
                svg.push_str(&format!(
                    r#"<text class="chart-label" x="{x:.1}" y="{label_y:.1}" text-anchor="end" transform="rotate(-35 {x:.1} {label_y:.1})">{}</text>"#,
                    escape(category)
                ));
            } else {
                svg.push_str(&format!(
                    r#"<text class="chart-label" x="{x:.1}" y="{label_y:.1}" text-anchor="middle">{}</text>"#,
                    escape(category)
                ));
            }
        }
    }

    svg.push_str(&format!(
        r#"<line class="chart-axis" x1="{PADDING_X}" y1="{baseline:.1}" x2="{}" y2="{baseline:.1}" /></svg>"#,
        WIDTH - PADDING_X
    ));
    svg
}

fn pie_point(center: f64, radius: f64, degrees: f64) -> (f64, f64) {
    let radians = degrees.to_radians();
    (center + radius * radians.cos(), center - radius * radians.sin())
}

/// Counter-clockwise slices starting at 140 degrees, each labelled with its
/// share.
fn pie_chart(series: &Series) -> String {
    let total: f64 = series.points.iter().map(|point| point.value.max(0.0)).sum();
    let center = PIE_SIZE / 2.0;
    let mut svg = format!(r#"<svg class="chart pie" viewBox="0 0 {PIE_SIZE} {PIE_SIZE}" role="img">"#);
    if total <= 0.0 {
        svg.push_str(&format!(
            r#"<text class="chart-label" x="{center}" y="{center}" text-anchor="middle">Sin datos</text></svg>"#
        ));
        return svg;
    }

    let mut start = PIE_START_DEGREES;
    for (index, point) in series.points.iter().enumerate() {
        let fraction = point.value.max(0.0) / total;
        if fraction <= 0.0 {
            continue;
        }
        let sweep = fraction * 360.0;
        let title = format!("{}: {}", point.label, format_value(point.value));
        if fraction >= 0.999_999 {
            svg.push_str(&format!(
                r#"<circle cx="{center}" cy="{center}" r="{PIE_RADIUS}" fill="{}"><title>{}</title></circle>"#,
                color(index),
                escape(&title)
            ));
        } else {
            let (x1, y1) = pie_point(center, PIE_RADIUS, start);
            let (x2, y2) = pie_point(center, PIE_RADIUS, start + sweep);
            let large_arc = u8::from(sweep > 180.0);
            svg.push_str(&format!(
                r#"<path d="M{center},{center} L{x1:.2},{y1:.2} A{PIE_RADIUS},{PIE_RADIUS} 0 {large_arc} 0 {x2:.2},{y2:.2} Z" fill="{}"><title>{}</title></path>"#,
                color(index),
                escape(&title)
            ));
        }
        let (label_x, label_y) = pie_point(center, PIE_RADIUS * 0.65, start + sweep / 2.0);
        svg.push_str(&format!(
            r#"<text class="pie-label" x="{label_x:.1}" y="{label_y:.1}" text-anchor="middle">{:.1}%</text>"#,
            fraction * 100.0
        ));
        start += sweep;
    }
    svg.push_str("</svg>");

    let names: Vec<&str> = series.points.iter().map(|point| point.label.as_str()).collect();
    format!("{svg}{}", legend(&names))
}

/// Two header rows: column groups on top, labels below. A column whose label
/// repeats its group spans both rows.
fn table_html(table: &Table) -> String {
    let mut runs: Vec<(&str, usize, usize)> = Vec::new();
    for (index, column) in table.columns.iter().enumerate() {
        let extends = match runs.last() {
            Some((group, start, _)) => {
                let first = &table.columns[*start];
                *group == column.group && column.group != column.label && first.group != first.label
            }
            None => false,
        };
        match runs.last_mut() {
            Some(run) if extends => run.2 += 1,
            _ => runs.push((column.group.as_str(), index, 1)),
        }
    }

    let mut top = String::new();
    let mut bottom = String::new();
    for (group, start, len) in &runs {
        let first = &table.columns[*start];
        if *len == 1 && first.group == first.label {
            top.push_str(&format!(r#"<th rowspan="2">{}</th>"#, escape(group)));
            continue;
        }
        top.push_str(&format!(r#"<th colspan="{len}">{}</th>"#, escape(group)));
        for column in &table.columns[*start..*start + *len] {
            bottom.push_str(&format!("<th>{}</th>", escape(&column.label)));
        }
    }

    let body: String = table
        .rows
        .iter()
        .map(|row| {
            let cells: String = row
                .iter()
                .map(|cell| format!("<td>{}</td>", escape(cell)))
                .collect();
            format!("<tr>{cells}</tr>")
        })
        .collect();
    let caption = table
        .caption
        .as_deref()
        .map(|caption| format!("<caption>{}</caption>", escape(caption)))
        .unwrap_or_default();

    format!(
        r#"<div class="table-wrap"><table>{caption}<thead><tr>{top}</tr><tr>{bottom}</tr></thead><tbody>{body}</tbody></table></div>"#
    )
}

fn metric_card(metric: &Metric) -> String {
    format!(
        r#"<div class="stat"><span class="label">Promedio</span><span class="value">{} {}</span></div>"#,
        format_value(metric.value),
        escape(&metric.unit)
    )
}

const LAYOUT_HTML: &str = r#"<!DOCTYPE html>
<html lang="es">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{TITLE}} · Dashboard de llamadas</title>
  <style>
    @import url('https://fonts.googleapis.com/css2?family=Space+Grotesk:wght@400;500;600&family=Fraunces:wght@600&display=swap');

    :root {
      --bg-1: #f8f3e6;
      --bg-2: #f5d3a7;
      --ink: #2b2a28;
      --accent: #ff6b4a;
      --accent-2: #2f4858;
      --card: rgba(255, 255, 255, 0.86);
      --shadow: 0 24px 60px rgba(47, 72, 88, 0.18);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: radial-gradient(circle at top, var(--bg-2), transparent 60%),
        linear-gradient(135deg, var(--bg-1), #ffe9d4 60%, #f9f2e9 100%);
      color: var(--ink);
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
      display: grid;
      grid-template-columns: 240px 1fr;
      gap: 24px;
      padding: 32px 18px 48px;
    }

    .sidebar {
      background: var(--card);
      border-radius: 28px;
      box-shadow: var(--shadow);
      padding: 24px 16px;
      display: flex;
      flex-direction: column;
      gap: 6px;
      align-self: start;
      position: sticky;
      top: 32px;
    }

    .sidebar .hint {
      margin: 0 8px 10px;
      color: #6f6a65;
      font-size: 0.85rem;
      text-transform: uppercase;
      letter-spacing: 0.12em;
    }

    .nav-link {
      border-radius: 999px;
      padding: 10px 14px;
      font-weight: 600;
      color: #6b645d;
      text-decoration: none;
    }

    .nav-link.active {
      background: white;
      color: var(--accent-2);
      box-shadow: 0 8px 16px rgba(47, 72, 88, 0.12);
    }

    .app {
      width: min(960px, 100%);
      background: var(--card);
      backdrop-filter: blur(12px);
      border-radius: 28px;
      box-shadow: var(--shadow);
      padding: 36px;
      display: grid;
      gap: 28px;
      animation: rise 600ms ease;
    }

    h1 {
      font-family: "Fraunces", "Georgia", serif;
      font-weight: 600;
      font-size: clamp(2rem, 4vw, 2.8rem);
      margin: 0;
    }

    .chart-card {
      background: white;
      border-radius: 20px;
      padding: 16px;
      border: 1px solid rgba(47, 72, 88, 0.08);
      display: grid;
      gap: 12px;
    }

    .chart-card h2 {
      margin: 0;
      font-size: 1.2rem;
    }

    .chart {
      width: 100%;
      display: block;
    }

    .chart.pie {
      max-width: 360px;
      margin: 0 auto;
    }

    .chart text {
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
    }

    .chart-grid {
      stroke: rgba(47, 72, 88, 0.12);
    }

    .chart-axis {
      stroke: rgba(47, 72, 88, 0.25);
      stroke-dasharray: 4 6;
    }

    .chart-label {
      fill: #7a746d;
      font-size: 11px;
    }

    .pie-label {
      fill: white;
      font-size: 12px;
      font-weight: 600;
    }

    .legend {
      list-style: none;
      margin: 0;
      padding: 0;
      display: flex;
      flex-wrap: wrap;
      gap: 12px;
      font-size: 0.9rem;
      color: #5f5c57;
    }

    .swatch {
      display: inline-block;
      width: 12px;
      height: 12px;
      border-radius: 4px;
      margin-right: 6px;
    }

    .stat {
      border-radius: 18px;
      padding: 18px;
      border: 1px solid rgba(47, 72, 88, 0.08);
      display: grid;
      gap: 8px;
    }

    .stat .label {
      font-size: 0.85rem;
      text-transform: uppercase;
      letter-spacing: 0.12em;
      color: #8b857d;
    }

    .stat .value {
      font-size: 1.7rem;
      font-weight: 600;
      color: var(--accent-2);
    }

    .table-wrap {
      overflow-x: auto;
    }

    table {
      border-collapse: collapse;
      font-size: 0.9rem;
      width: 100%;
    }

    caption {
      text-align: left;
      color: #5f5c57;
      padding-bottom: 8px;
    }

    th,
    td {
      padding: 6px 10px;
      border-bottom: 1px solid rgba(47, 72, 88, 0.08);
      text-align: center;
      white-space: nowrap;
    }

    th {
      color: var(--accent-2);
    }

    .status {
      margin: 0;
      font-size: 0.95rem;
      padding: 12px 14px;
      border-radius: 12px;
    }

    .status[data-type="warning"] {
      color: #8a5a00;
      background: #fff4d6;
    }

    .status[data-type="error"] {
      color: #c63b2b;
      background: #fde4df;
    }

    @keyframes rise {
      from {
        opacity: 0;
        transform: translateY(18px);
      }
      to {
        opacity: 1;
        transform: translateY(0);
      }
    }

    @media (max-width: 800px) {
      body {
        grid-template-columns: 1fr;
      }
      .sidebar {
        position: static;
      }
      .app {
        padding: 28px 22px;
      }
    }
  </style>
</head>
<body>
  <nav class="sidebar">
    <p class="hint">Seleccione una página</p>
    {{NAV}}
  </nav>
  <main class="app">
    <header>
      <h1>{{HEADING}}</h1>
    </header>
    {{PANELS}}
  </main>
</body>
</html>
"#;
