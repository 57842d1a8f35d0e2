use crate::pages::{DashboardPage, LandingPage, LoadingPage, Tab};
use askama::Template;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, Redirect},
    Form, Json,
};
use quantbot_controller::{Dashboard, DashboardView};
use quantbot_engine_client::EngineAction;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub tab: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConfigForm {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

fn render(template: &impl Template) -> Result<Html<String>, StatusCode> {
    template.render().map(Html).map_err(|e| {
        tracing::error!(error = %e, "Template rendering failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// Landing page.
///
/// # Errors
/// Returns `StatusCode::INTERNAL_SERVER_ERROR` if the template fails to render.
pub async fn landing() -> Result<Html<String>, StatusCode> {
    render(&LandingPage::new())
}

/// Form posts already re-fetch before redirecting here.
const PAGE_MAX_AGE: Duration = Duration::from_secs(2);

/// Fetches fresh engine state and renders the dashboard.
///
/// A view fetched within [`PAGE_MAX_AGE`] is reused. Shows the loading page
/// until both config and status have arrived.
///
/// # Errors
/// Returns `StatusCode::INTERNAL_SERVER_ERROR` if the template fails to render.
pub async fn dashboard_page(
    State(dashboard): State<Arc<Dashboard>>,
    Query(query): Query<DashboardQuery>,
) -> Result<Html<String>, StatusCode> {
    dashboard.refresh_if_stale(PAGE_MAX_AGE).await;
    let view = dashboard.snapshot().await;

    if !view.is_ready() {
        return render(&LoadingPage::from_view(&view));
    }
    render(&DashboardPage::from_view(&view, Tab::parse(query.tab.as_deref())))
}

pub async fn update_config(
    State(dashboard): State<Arc<Dashboard>>,
    Form(form): Form<ConfigForm>,
) -> Redirect {
    dashboard.update_config_raw(&form.key, &form.value).await;
    Redirect::to("/dashboard?tab=config")
}

pub async fn toggle(State(dashboard): State<Arc<Dashboard>>) -> Redirect {
    dashboard.toggle().await;
    Redirect::to("/dashboard")
}

pub async fn start(State(dashboard): State<Arc<Dashboard>>) -> Redirect {
    dashboard.start().await;
    Redirect::to("/dashboard")
}

pub async fn stop(State(dashboard): State<Arc<Dashboard>>) -> Redirect {
    dashboard.stop().await;
    Redirect::to("/dashboard")
}

/// Runs a one-off engine action.
///
/// # Errors
/// Returns `StatusCode::NOT_FOUND` for an unknown action name.
pub async fn execute(
    State(dashboard): State<Arc<Dashboard>>,
    Path(action): Path<String>,
) -> Result<Redirect, StatusCode> {
    let action: EngineAction = action.parse().map_err(|_| StatusCode::NOT_FOUND)?;
    dashboard.execute(action).await;
    Ok(Redirect::to("/dashboard"))
}

/// Current view without contacting the engine.
pub async fn api_dashboard(State(dashboard): State<Arc<Dashboard>>) -> Json<DashboardView> {
    Json(dashboard.snapshot().await)
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
