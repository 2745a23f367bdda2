// WebSocket server the overlay page connects to.
//
// Serves one client at a time; a newer connection replaces the older one.
// Every `UiUpdate` is pushed as a JSON text frame, and the latest draft
// update is replayed to a freshly connected client.

use std::time::Duration;

use futures_util::sink::Sink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};

use crate::protocol::UiUpdate;

/// How long a connecting overlay gets to complete the WebSocket handshake.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(3);

type OverlaySocket = WebSocketStream<TcpStream>;

/// Bind `127.0.0.1:{port}` and serve overlay clients until `updates` closes.
pub async fn run(port: u16, updates: mpsc::Receiver<UiUpdate>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(format!("127.0.0.1:{port}")).await?;
    serve(listener, updates).await
}

/// Serve overlay clients on an already bound listener.
pub async fn serve(listener: TcpListener, updates: mpsc::Receiver<UiUpdate>) -> anyhow::Result<()> {
    serve_with_timeout(listener, updates, HANDSHAKE_TIMEOUT).await
}

async fn serve_with_timeout(
    listener: TcpListener,
    mut updates: mpsc::Receiver<UiUpdate>,
    handshake_timeout: Duration,
) -> anyhow::Result<()> {
    info!("Overlay server listening on {}", listener.local_addr()?);

    let mut client: Option<OverlaySocket> = None;
    let mut latest_draft: Option<UiUpdate> = None;

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, addr) = accepted?;
                let handshake = tokio_tungstenite::accept_async(stream);
                let mut ws = match tokio::time::timeout(handshake_timeout, handshake).await {
                    Ok(Ok(ws)) => ws,
                    Ok(Err(e)) => {
                        warn!("Overlay handshake failed for {addr}: {e}");
                        continue;
                    }
                    Err(_) => {
                        warn!("Overlay handshake from {addr} timed out");
                        continue;
                    }
                };
                info!("Overlay connected from {addr}");

                if let Some(update) = &latest_draft {
                    if let Err(e) = forward_update(&mut ws, update).await {
                        warn!("Failed to replay draft state to {addr}: {e}");
                        continue;
                    }
                }
                if let Some(mut previous) = client.replace(ws) {
                    info!("Replacing previous overlay connection");
                    let _ = previous.close(None).await;
                }
            }

            incoming = next_client_message(&mut client) => {
                if ends_connection(&incoming) {
                    info!("Overlay disconnected");
                    client = None;
                } else {
                    debug!("Ignoring message from overlay");
                }
            }

            update = updates.recv() => {
                let Some(update) = update else {
                    info!("UI update channel closed, stopping overlay server");
                    break;
                };

                match &update {
                    UiUpdate::DraftUpdate { .. } => latest_draft = Some(update.clone()),
                    UiUpdate::SessionStarted => latest_draft = None,
                    _ => {}
                }

                match client.as_mut() {
                    Some(ws) => {
                        if let Err(e) = forward_update(ws, &update).await {
                            warn!("Overlay connection lost: {e}");
                            client = None;
                        }
                    }
                    None => debug!("No overlay connected, update cached only"),
                }
            }
        }
    }

    if let Some(mut ws) = client {
        let _ = ws.close(None).await;
    }
    Ok(())
}

/// Next frame from the connected overlay; never resolves while none is connected.
async fn next_client_message(client: &mut Option<OverlaySocket>) -> Option<Result<Message, WsError>> {
    match client {
        Some(ws) => ws.next().await,
        None => std::future::pending().await,
    }
}

/// Whether a read result from the overlay means its connection is over.
fn ends_connection(incoming: &Option<Result<Message, WsError>>) -> bool {
    matches!(incoming, None | Some(Err(_)) | Some(Ok(Message::Close(_))))
}

/// Serialize `update` and send it as a text frame.
///
/// Generic over the sink so tests can collect frames without a socket.
pub async fn forward_update<S>(sink: &mut S, update: &UiUpdate) -> anyhow::Result<()>
where
    S: Sink<Message> + Unpin,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    let json = serde_json::to_string(update)?;
    sink.send(Message::Text(json.into())).await?;
    Ok(())
}
