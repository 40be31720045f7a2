//! HTTP/SSE server for the dashboard.
//!
//! Three routes: `/` serves the embedded dashboard page, `/events` streams a
//! session's events as server-sent events, `/sessions` lists sessions as
//! JSON. `serve` blocks until cancellation; callers poll briefly for startup
//! errors and treat silence as success.

use crate::registry::{SessionInfo, SessionRegistry};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("bind port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },
    #[error("serve: {0}")]
    Serve(#[from] std::io::Error),
}

/// Builds the dashboard router.
pub fn router(registry: Arc<SessionRegistry>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/events", get(stream_events))
        .route("/sessions", get(list_sessions))
        .with_state(registry)
}

/// Serves the dashboard until the token is canceled. Blocks; bind errors
/// surface immediately, which is what the caller's startup poll watches for.
pub async fn serve(
    registry: Arc<SessionRegistry>,
    port: u16,
    cancel: CancellationToken,
) -> Result<(), ServerError> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(|source| ServerError::Bind { port, source })?;
    info!(port, "dashboard listening");

    axum::serve(listener, router(registry))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;
    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(include_str!("../assets/dashboard.html"))
}

async fn list_sessions(State(registry): State<Arc<SessionRegistry>>) -> Json<Vec<SessionInfo>> {
    Json(registry.list())
}

#[derive(Debug, Deserialize)]
struct EventsQuery {
    session: Option<String>,
}

async fn stream_events(
    State(registry): State<Arc<SessionRegistry>>,
    Query(query): Query<EventsQuery>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, StatusCode> {
    let id = query.session.unwrap_or_else(|| "main".to_string());
    let session = registry.get(&id).ok_or(StatusCode::NOT_FOUND)?;

    let stream = ReceiverStream::new(session.subscribe()).map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
        Ok(SseEvent::default().event(event.kind()).data(data))
    });

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(10))
            .text("keepalive"),
    ))
}
