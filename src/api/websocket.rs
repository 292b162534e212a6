//! WebSocket handler for the live feed

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, stream::StreamExt};
use tracing::{debug, info};

use crate::api::ApiState;

/// WebSocket upgrade handler
///
/// GET /ws
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<ApiState>) -> Response {
    ws.on_upgrade(|socket| handle_websocket(socket, state))
}

/// Handle one viewer connection
async fn handle_websocket(socket: WebSocket, state: ApiState) {
    info!("live viewer connected");

    let (mut sender, mut receiver) = socket.split();
    let (id, mut feed) = state.broadcaster.subscribe().await;

    if sender
        .send(Message::Text(r#"{"msg":"welcome"}"#.to_string()))
        .await
        .is_err()
    {
        state.broadcaster.unsubscribe(id).await;
        return;
    }

    // Forward broadcast frames until the viewer goes away
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = feed.recv().await {
            if sender.send(Message::Text(frame)).await.is_err() {
                debug!("WebSocket send failed, viewer disconnected");
                break;
            }
        }
    });

    // Drain incoming messages so close frames are noticed
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
        }
    }

    state.broadcaster.unsubscribe(id).await;
    info!("live viewer disconnected");
}
