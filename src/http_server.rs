use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::error::HookError;
use crate::types::WebhookDelivery;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Form, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

const HEADER_EVENT: &str = "x-github-event";
const HEADER_DELIVERY: &str = "x-github-delivery";
const HEADER_SIGNATURE_256: &str = "x-hub-signature-256";
const HEADER_SIGNATURE_SHA1: &str = "x-hub-signature";

/// GitHub caps webhook payloads at 25 MB.
const MAX_WEBHOOK_BODY: usize = 25 * 1024 * 1024;

const EVENT_PAGE: &str = include_str!("../assets/event.html");

#[derive(Clone)]
pub struct AppState {
    dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/webhook",
            post(handle_webhook).layer(DefaultBodyLimit::max(MAX_WEBHOOK_BODY)),
        )
        .route("/event", get(event_page))
        .route("/eventr", get(list_events))
        .route("/deletedb", post(delete_events))
        // Path used by older copies of the viewer page.
        .route("/Deletedb", post(delete_events))
        .route("/health", get(|| async { "ok" }))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until the process exits.
pub async fn serve(state: AppState, addr: &str) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "http server started");
    axum::serve(listener, router(state)).await
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), HookError> {
    let event_type =
        header_value(&headers, HEADER_EVENT).ok_or(HookError::MissingHeader(HEADER_EVENT))?;

    let delivery = WebhookDelivery {
        event_type,
        signature_256: header_value(&headers, HEADER_SIGNATURE_256),
        signature_sha1: header_value(&headers, HEADER_SIGNATURE_SHA1),
        delivery_id: header_value(&headers, HEADER_DELIVERY),
        body,
    };

    let body = match state.dispatcher.handle(delivery).await? {
        DispatchOutcome::Handled { .. } => "handled",
        DispatchOutcome::NoOp => "no-op",
        DispatchOutcome::Ignored { .. } => "ignored",
    };
    Ok((StatusCode::OK, body))
}

async fn event_page() -> Html<&'static str> {
    Html(EVENT_PAGE)
}

async fn list_events(State(state): State<AppState>) -> Response {
    let entries = match state.dispatcher.recorder().list().await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, "failed to read audit log");
            return (StatusCode::INTERNAL_SERVER_ERROR, "audit log unavailable").into_response();
        }
    };
    match serde_json::to_string_pretty(&entries) {
        Ok(json) => ([(header::CONTENT_TYPE, "application/json")], json).into_response(),
        Err(e) => {
            warn!(error = %e, "failed to serialize audit log");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct DeleteForm {
    #[serde(rename = "Nbr", default)]
    count: Option<String>,
    #[serde(rename = "Eventid", default)]
    event_ids: String,
}

async fn delete_events(
    State(state): State<AppState>,
    Form(form): Form<DeleteForm>,
) -> (StatusCode, String) {
    let count = form.count.as_deref().and_then(|c| c.trim().parse().ok());
    let ids = crate::audit::parse_id_list(count, &form.event_ids);
    if ids.is_empty() {
        return (StatusCode::BAD_REQUEST, "No events selected".to_string());
    }

    match state.dispatcher.recorder().delete(&ids).await {
        Ok(removed) => (
            StatusCode::OK,
            format!("Events : {} deleted ({removed} removed)", form.event_ids),
        ),
        Err(e) => {
            warn!(error = %e, ids = %form.event_ids, "failed to delete events");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error deleted Events : {}", form.event_ids),
            )
        }
    }
}
