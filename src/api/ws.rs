use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use crate::relay::CycleReportSender;

#[derive(Clone)]
pub struct CycleWsState {
    pub cycle_tx: CycleReportSender,
}

/// WebSocket endpoint streaming completed check-cycle reports
pub async fn ws_cycles(
    ws: WebSocketUpgrade,
    State(state): State<CycleWsState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: CycleWsState) {
    let (mut sender, mut receiver) = socket.split();
    let mut cycle_rx = state.cycle_tx.subscribe();

    // Forward each completed cycle report to the client
    let forward_task = tokio::spawn(async move {
        loop {
            match cycle_rx.recv().await {
                Ok(report) => {
                    if let Ok(json) = serde_json::to_string(&report) {
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
            }
        }
    });

    // Handle incoming messages (just wait for close)
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Ping(_)) => {
                // Axum handles pong automatically
            }
            Ok(Message::Close(_)) => break,
            Err(_) => break,
            _ => {}
        }
    }

    forward_task.abort();
}
