//! Canvas WebSocket handler
//!
//! Streams a snapshot per canvas event and executes client actions.

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::Extension,
    response::IntoResponse,
};
use easel_canvas::{CanvasEvent, CanvasOrchestrator, Position};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::protocol::{ClientAction, ServerMessage};

/// WebSocket upgrade handler
pub async fn canvas_ws_handler(
    ws: WebSocketUpgrade,
    Extension(canvas): Extension<Arc<CanvasOrchestrator>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, canvas))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, canvas: Arc<CanvasOrchestrator>) {
    let session_id = Uuid::new_v4();
    info!(%session_id, "canvas websocket connected");

    let (mut sender, mut receiver) = socket.split();

    // Subscribe before the welcome snapshot so no event slips in between
    let events = canvas.subscribe();

    let welcome = ServerMessage::Welcome {
        session_id,
        snapshot: canvas.snapshot().await,
    };
    if let Ok(json) = serde_json::to_string(&welcome) {
        if sender.send(Message::Text(json)).await.is_err() {
            return;
        }
    }

    // Internal channel for messages produced by spawned tasks
    let (tx, mut internal_rx) = mpsc::unbounded_channel::<ServerMessage>();
    let stream_handle = tokio::spawn(stream_snapshots(Arc::clone(&canvas), events, tx.clone()));

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        debug!(%session_id, "received canvas action: {}", text);
                        match serde_json::from_str::<ClientAction>(&text) {
                            Ok(action) => {
                                let canvas = Arc::clone(&canvas);
                                let tx = tx.clone();
                                // actions outlive the socket so the canvas never stays half-updated
                                tokio::spawn(async move {
                                    let reply = dispatch(&canvas, action).await;
                                    let _ = tx.send(reply);
                                });
                            }
                            Err(e) => {
                                let _ = tx.send(ServerMessage::Error {
                                    action: None,
                                    message: format!("Invalid message format: {}", e),
                                    code: "invalid_message".to_string(),
                                });
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => break,
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sender.send(Message::Pong(data)).await;
                    }
                    Some(Err(e)) => {
                        error!(%session_id, "websocket error: {}", e);
                        break;
                    }
                    None => break,
                    _ => {}
                }
            }
            server_msg = internal_rx.recv() => {
                match server_msg {
                    Some(msg) => {
                        if let Ok(json) = serde_json::to_string(&msg) {
                            if sender.send(Message::Text(json)).await.is_err() {
                                break;
                            }
                        }
                    }
                    None => break,
                }
            }
        }
    }

    stream_handle.abort();
    info!(%session_id, "canvas websocket disconnected");
}

/// Forward a snapshot after every canvas event
async fn stream_snapshots(
    canvas: Arc<CanvasOrchestrator>,
    mut events: broadcast::Receiver<CanvasEvent>,
    tx: mpsc::UnboundedSender<ServerMessage>,
) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(n)) => {
                // the next snapshot covers whatever was skipped
                warn!("canvas subscriber lagged by {} events", n);
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => return,
        };

        let snapshot = canvas.snapshot().await;
        if tx.send(ServerMessage::Snapshot { event, snapshot }).is_err() {
            return;
        }
    }
}

/// Execute one client action against the canvas
async fn dispatch(canvas: &CanvasOrchestrator, action: ClientAction) -> ServerMessage {
    let name = action.name();
    let result = match action {
        ClientAction::Ping => return ServerMessage::Pong,
        ClientAction::Mount => Ok(ServerMessage::ack(name, canvas.mount().await)),
        ClientAction::Prompt { prompt } => {
            canvas.update_prompt(prompt).await;
            Ok(ServerMessage::ack(name, ()))
        }
        ClientAction::Select { id } => canvas
            .select_entity(&id)
            .await
            .map(|selected| ServerMessage::ack(name, selected)),
        ClientAction::Deselect => {
            canvas.deselect().await;
            Ok(ServerMessage::ack(name, ()))
        }
        ClientAction::Duplicate { id } => canvas
            .duplicate(&id)
            .await
            .map(|new_id| ServerMessage::ack(name, new_id)),
        ClientAction::Variations { id, prompt } => {
            let prompt = match prompt {
                Some(prompt) => prompt,
                None => canvas
                    .snapshot()
                    .await
                    .entities
                    .into_iter()
                    .find(|e| e.id == id)
                    .map(|e| e.prompt)
                    .unwrap_or_default(),
            };
            canvas
                .generate_variations(&id, &prompt)
                .await
                .map(|report| ServerMessage::ack(name, report))
        }
        ClientAction::Move { id, x, y } => canvas
            .move_entity(&id, Position::new(x, y))
            .await
            .map(|position| ServerMessage::ack(name, position)),
        ClientAction::Delete { id } => canvas
            .delete(&id)
            .await
            .map(|()| ServerMessage::ack(name, id)),
        ClientAction::Save { id } => {
            let src = canvas
                .snapshot()
                .await
                .entities
                .into_iter()
                .find(|e| e.id == id)
                .map(|e| e.src)
                .unwrap_or_default();
            canvas
                .save(&id, &src)
                .await
                .map(|()| ServerMessage::ack(name, id))
        }
        ClientAction::Arrange => Ok(ServerMessage::ack(name, canvas.arrange_grid().await)),
        ClientAction::Resize { width, height } => canvas
            .resize_container(width, height)
            .await
            .map(|bounds| ServerMessage::ack(name, bounds)),
        ClientAction::PlaceSaved { id } => canvas
            .place_saved_by_id(&id)
            .await
            .map(|id| ServerMessage::ack(name, id)),
        ClientAction::RefreshSaved => Ok(ServerMessage::ack(
            name,
            canvas.load_saved_catalog().await,
        )),
    };

    result.unwrap_or_else(|e| ServerMessage::failed(name, &e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{canvas, StubGenerator, StubStore};
    use easel_canvas::EntityId;

    fn ack_result(msg: ServerMessage) -> serde_json::Value {
        match msg {
            ServerMessage::Ack { result, .. } => result.unwrap_or(serde_json::Value::Null),
            other => panic!("expected ack, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dispatch_mount_and_move() {
        let canvas = canvas(StubGenerator::default(), StubStore::default());

        assert_eq!(ack_result(dispatch(&canvas, ClientAction::Mount).await), true);

        let reply = dispatch(
            &canvas,
            ClientAction::Move {
                id: EntityId::from("initial-placeholder"),
                x: 5000.0,
                y: -3.0,
            },
        )
        .await;
        let position = ack_result(reply);
        assert_eq!(position["x"], 1050.0);
        assert_eq!(position["y"], 0.0);
    }

    #[tokio::test]
    async fn test_dispatch_reports_errors() {
        let canvas = canvas(StubGenerator::default(), StubStore::default());
        let reply = dispatch(
            &canvas,
            ClientAction::PlaceSaved {
                id: EntityId::from("nope"),
            },
        )
        .await;
        match reply {
            ServerMessage::Error { action, code, .. } => {
                assert_eq!(action, Some("place_saved"));
                assert_eq!(code, "saved_image_not_found");
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dispatch_save_uses_entity_source() {
        let store = StubStore::default();
        let canvas = canvas(StubGenerator::default(), store.clone());
        canvas
            .place_saved_image(easel_canvas::SavedImage {
                id: "cat".into(),
                prompt: "a cat".to_string(),
                url: "https://img.test/cat.png".to_string(),
            })
            .await
            .unwrap();

        let action: ClientAction =
            serde_json::from_str(r#"{"type":"save","id":"cat","src":"/etc/passwd"}"#).unwrap();
        assert_eq!(ack_result(dispatch(&canvas, action).await), "cat");
        assert_eq!(store.saved_sources(), vec!["https://img.test/cat.png".to_string()]);
    }

    #[tokio::test]
    async fn test_ping() {
        let canvas = canvas(StubGenerator::default(), StubStore::default());
        assert!(matches!(
            dispatch(&canvas, ClientAction::Ping).await,
            ServerMessage::Pong
        ));
    }

    #[tokio::test]
    async fn test_snapshots_follow_events() {
        let canvas = canvas(StubGenerator::default(), StubStore::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(stream_snapshots(canvas.clone(), canvas.subscribe(), tx));

        canvas.mount().await;

        match rx.recv().await.unwrap() {
            ServerMessage::Snapshot { event, snapshot } => {
                assert_eq!(event.event_type(), "mounted");
                assert_eq!(snapshot.entities.len(), 1);
            }
            other => panic!("expected snapshot, got {other:?}"),
        }
        handle.abort();
    }
}
