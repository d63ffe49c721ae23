//! HTTP and WebSocket routes (§6). Thin: every handler just calls through to
//! the `GameHook` facade and serializes the result.

use crate::error::ApiError;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use engine::GameHook;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

pub type AppState = Arc<GameHook>;

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/mappers", get(list_mappers))
        .route("/mappers/:name/load", post(load_mapper))
        .route("/properties/:name", get(get_property).post(set_property))
        .route("/properties/:name/freeze", post(freeze_property).delete(unfreeze_property))
        .route("/ws", get(ws_upgrade))
        .with_state(state)
}

async fn list_mappers(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let mappers = state.list_mappers().await?;
    Ok(Json(mappers))
}

async fn load_mapper(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.load_mapper(&name).await?;
    Ok(Json(json!({ "loaded": name })))
}

async fn get_property(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let value = state.get_property(&name).await?;
    Ok(Json(value))
}

#[derive(Deserialize)]
struct SetPropertyBody {
    value: shared::PropertyValue,
}

async fn set_property(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<SetPropertyBody>,
) -> Result<impl IntoResponse, ApiError> {
    state.set_property(&name, body.value).await?;
    Ok(Json(json!({ "ok": true })))
}

async fn freeze_property(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.freeze_property(&name).await?;
    Ok(Json(json!({ "frozen": name })))
}

async fn unfreeze_property(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.unfreeze_property(&name).await?;
    Ok(Json(json!({ "unfrozen": name })))
}

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| forward_changes(socket, state))
}

/// Forwards every change event on the bus to this socket as JSON text
/// frames, until the client disconnects (§4.5 "HTTP/WS fan-out is only at
/// the edges").
async fn forward_changes(mut socket: WebSocket, state: AppState) {
    let mut changes = state.subscribe_changes(None).await;
    loop {
        tokio::select! {
            event = changes.recv() => {
                let Some(event) = event else { break };
                let Ok(text) = serde_json::to_string(&event) else { continue };
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                if incoming.is_none() {
                    break;
                }
            }
        }
    }
}
