use crate::errors::AppError;
use crate::models::{ReportData, ReportSummary};
use crate::pages::{build_page, Page};
use crate::reports::Report;
use crate::state::AppState;
use crate::ui::render_page;
use axum::{
    extract::{Path, State},
    response::{Html, Redirect},
    Json,
};

pub async fn index() -> Redirect {
    Redirect::to(&format!("/pages/{}", Page::ALL[0].slug()))
}

pub async fn page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Html<String>, AppError> {
    let page = Page::from_slug(&slug).ok_or_else(|| AppError::not_found(format!("unknown page '{slug}'")))?;
    let view = build_page(&state.store, page, &state.context).await;
    Ok(Html(render_page(&view)))
}

pub async fn list_reports() -> Json<Vec<ReportSummary>> {
    Json(Report::ALL.into_iter().map(Report::summary).collect())
}

pub async fn report(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ReportData>, AppError> {
    let report =
        Report::from_slug(&slug).ok_or_else(|| AppError::not_found(format!("unknown report '{slug}'")))?;
    let data = report.run(&state.store, &state.context).await?;
    Ok(Json(data))
}
