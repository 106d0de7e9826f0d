//! # WebSocket Handler
//!
//! Real-time channel for session updates. A connected client subscribes to
//! the session ids it cares about and receives a `sessionUpdate` frame
//! whenever one of them changes state.
//!
//! ## Wire protocol (text frames, JSON)
//! Inbound: `{"action": "subscribe", "sessionId": "..."}` and
//! `{"action": "unsubscribe", "sessionId": "..."}`.
//! Outbound: `{"event": "subscribed" | "unsubscribed", "data": "<sessionId>"}`
//! acks and `{"event": "sessionUpdate", "data": {sessionId, status,
//! username?}}` pushes.
//!
//! All of a socket's subscriptions are released when it disconnects.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tokio::sync::mpsc;

use crate::hub::{NotificationHub, SubscriberId};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
enum ClientMessage {
    Subscribe {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    Unsubscribe {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.hub.clone()))
}

async fn handle_socket(socket: WebSocket, hub: NotificationHub) {
    let (mut sink, mut stream) = socket.split();

    // Outbound frames funnel through one channel so acks and hub pushes
    // cannot interleave on the socket.
    let (frames_tx, mut frames_rx) = mpsc::unbounded_channel::<String>();
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();

    let send_task = tokio::spawn(async move {
        while let Some(frame) = frames_rx.recv().await {
            if sink.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    let event_frames_tx = frames_tx.clone();
    let forward_task = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            let frame = json!({ "event": "sessionUpdate", "data": event }).to_string();
            if event_frames_tx.send(frame).is_err() {
                break;
            }
        }
    });

    let mut subscriptions: HashMap<String, SubscriberId> = HashMap::new();

    while let Some(Ok(msg)) = stream.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Subscribe { session_id }) => {
                    if !subscriptions.contains_key(&session_id) {
                        let id = hub.subscribe(&session_id, events_tx.clone());
                        subscriptions.insert(session_id.clone(), id);
                        tracing::debug!(session_id = %session_id, "subscriber joined channel");
                    }
                    let _ = frames_tx
                        .send(json!({ "event": "subscribed", "data": session_id }).to_string());
                }
                Ok(ClientMessage::Unsubscribe { session_id }) => {
                    if let Some(id) = subscriptions.remove(&session_id) {
                        hub.unsubscribe(&session_id, id);
                        tracing::debug!(session_id = %session_id, "subscriber left channel");
                    }
                    let _ = frames_tx
                        .send(json!({ "event": "unsubscribed", "data": session_id }).to_string());
                }
                Err(_) => {
                    tracing::debug!("ignoring unrecognized websocket message");
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    for (channel, id) in subscriptions {
        hub.unsubscribe(&channel, id);
    }
    forward_task.abort();
    send_task.abort();

    tracing::debug!("notification subscriber disconnected");
}
