//! HTTP control surface over the running scraper.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{delete, get, post, put},
};
use score_core::{Legend, RegistryEvent, Rejection};
use score_server::{
    BufferedSink, ControlCommand, EventCursor, ScraperHandle, ServerEvent, parse_command,
};
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, sync::Arc, time::Duration};
use tokio::sync::{broadcast, watch, RwLock};
use tokio_stream::StreamExt;
use tower_http::cors::CorsLayer;

/// Tracks the event broadcast channel for SSE fan-out.
struct EventStream {
    tx: broadcast::Sender<String>,
    _task: tokio::task::JoinHandle<()>,
}

pub struct AppState {
    handle: ScraperHandle,
    events: Arc<BufferedSink>,
    /// Created on first subscriber, cleared when all disconnect.
    stream: Arc<RwLock<Option<EventStream>>>,
    /// Flips to true on shutdown; open SSE streams end so graceful
    /// shutdown can finish.
    shutdown: watch::Receiver<bool>,
}

impl AppState {
    pub fn new(
        handle: ScraperHandle,
        events: Arc<BufferedSink>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            handle,
            events,
            stream: Arc::new(RwLock::new(None)),
            shutdown,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/accounts", get(list_accounts))
        .route("/api/state", get(snapshot))
        .route("/api/live", post(set_live))
        .route("/api/live/{name}", delete(remove_live))
        .route("/api/binding", put(bind_account))
        .route("/api/commands", post(enqueue_command))
        .route("/api/pause", post(toggle_pause))
        .route("/api/abandon", post(abandon_round))
        .route("/api/events", get(poll_events))
        .route("/api/stream/events", get(stream_events))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct LiveRequest {
    pub name: String,
    pub legend: String,
}

#[derive(Debug, Deserialize)]
pub struct BindingRequest {
    pub name: String,
    /// Empty unbinds the player.
    #[serde(default)]
    pub account: String,
}

#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub cursor: u64,
}

#[derive(Debug, Serialize)]
struct PauseResponse {
    paused: bool,
}

#[derive(Debug, Serialize)]
struct EventsResponse {
    events: Vec<ServerEvent<RegistryEvent>>,
    cursor: u64,
}

#[derive(Debug, Serialize)]
struct RejectionResponse {
    code: u8,
    reason: String,
}

/// Rejected requests answer `400 + rejection bits`.
fn rejected(rejection: Rejection) -> Response {
    let status = StatusCode::from_u16(400 + u16::from(rejection.bits()))
        .unwrap_or(StatusCode::BAD_REQUEST);
    let body = RejectionResponse {
        code: rejection.bits(),
        reason: rejection.to_string(),
    };
    (status, Json(body)).into_response()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn list_accounts(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.handle.accounts().await)
}

async fn snapshot(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.handle.snapshot().await)
}

async fn set_live(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LiveRequest>,
) -> Response {
    match state
        .handle
        .set_live_assignment(&request.name, Legend::new(&request.legend))
        .await
    {
        Ok(()) => StatusCode::OK.into_response(),
        Err(rejection) => {
            tracing::warn!(player = %request.name, %rejection, "live assignment rejected");
            rejected(rejection)
        }
    }
}

async fn remove_live(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Response {
    if state.handle.remove_live_player(&name).await {
        StatusCode::OK.into_response()
    } else {
        tracing::warn!(player = %name, "cannot withdraw unknown player");
        StatusCode::UNAUTHORIZED.into_response()
    }
}

async fn bind_account(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BindingRequest>,
) -> Response {
    match state.handle.bind_account(&request.name, &request.account).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(rejection) => {
            tracing::warn!(player = %request.name, account = %request.account, %rejection, "binding rejected");
            rejected(rejection)
        }
    }
}

async fn enqueue_command(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CommandRequest>,
) -> Response {
    let args: Vec<&str> = request.args.iter().map(String::as_str).collect();
    match parse_command(&request.command, &args) {
        Ok(command) => {
            apply_control(&state.handle, command).await;
            StatusCode::ACCEPTED.into_response()
        }
        Err(error) => {
            tracing::warn!("Dropped command {}: {error}", request.command);
            (StatusCode::BAD_REQUEST, error.to_string()).into_response()
        }
    }
}

async fn toggle_pause(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(PauseResponse {
        paused: state.handle.toggle_pause().await,
    })
}

async fn abandon_round(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.handle.abandon_round().await;
    StatusCode::OK
}

async fn poll_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> impl IntoResponse {
    let (events, cursor) = state.events.poll(EventCursor(query.cursor));
    Json(EventsResponse {
        events,
        cursor: cursor.0,
    })
}

/// Route a parsed control command: identity mutations go through the queue,
/// pause and abandon act directly.
pub async fn apply_control(handle: &ScraperHandle, command: ControlCommand) {
    match command {
        ControlCommand::Enqueue(commands) => handle.enqueue_all(commands),
        ControlCommand::Pause => {
            handle.toggle_pause().await;
        }
        ControlCommand::Abandon => handle.abandon_round().await,
    }
}

// ---------------------------------------------------------------------------
// SSE
// ---------------------------------------------------------------------------

/// SSE endpoint: streams registry notifications to all connected clients.
async fn stream_events(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if *state.shutdown.borrow() {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let rx = {
        let mut lock = state.stream.write().await;

        let existing = lock
            .as_ref()
            .filter(|entry| !entry._task.is_finished())
            .map(|entry| entry.tx.subscribe());

        match existing {
            Some(rx) => {
                tracing::info!("Event SSE: new subscriber");
                rx
            }
            None => {
                let (tx, rx) = broadcast::channel::<String>(64);

                let poll_tx = tx.clone();
                let events = state.events.clone();
                let stream = state.stream.clone();
                let shutdown = state.shutdown.clone();
                let task = tokio::spawn(async move {
                    poll_events_loop(events, stream, poll_tx, shutdown).await;
                });

                *lock = Some(EventStream { tx, _task: task });

                tracing::info!("Event SSE: first subscriber, started polling");
                rx
            }
        }
    };

    let stream = tokio_stream::wrappers::BroadcastStream::new(rx).map(|result| match result {
        Ok(json) => Ok::<_, Infallible>(Event::default().data(json)),
        Err(_) => Ok(Event::default().data("{\"error\": \"stream lagged\"}")),
    });

    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}

/// Polls the event buffer every 100ms and broadcasts new events.
///
/// Stops when the last subscriber leaves or on shutdown. Clearing the shared
/// entry drops the last sender, which ends every open stream.
async fn poll_events_loop(
    events: Arc<BufferedSink>,
    stream: Arc<RwLock<Option<EventStream>>>,
    tx: broadcast::Sender<String>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(Duration::from_millis(100));
    let mut cursor = events.current_cursor();

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.changed() => {
                tracing::info!("Event SSE: shutting down, closing streams");
                *stream.write().await = None;
                return;
            }
        }

        if tx.receiver_count() == 0 {
            // New subscribers attach under the write lock, so the count
            // cannot change while it is held.
            if release_if_idle(&mut *stream.write().await, &tx) {
                tracing::info!("Event SSE: no subscribers, stopped poll loop");
                return;
            }
        }

        let (batch, next) = events.poll(cursor);
        cursor = next;
        for event in batch {
            match serde_json::to_string(&event) {
                Ok(json) => {
                    let _ = tx.send(json);
                }
                Err(error) => tracing::error!("Failed to encode event: {error}"),
            }
        }
    }
}

/// Clear the shared entry if nobody listens on `tx`. Must be called with the
/// stream lock held.
fn release_if_idle(slot: &mut Option<EventStream>, tx: &broadcast::Sender<String>) -> bool {
    if tx.receiver_count() > 0 {
        return false;
    }
    *slot = None;
    true
}
