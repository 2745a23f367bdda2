// Live client connection: WebSocket event stream plus the one REST lookup
// done on connect.

use std::path::PathBuf;
use std::time::Duration;

use futures_util::stream::Stream;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{
    HeaderValue, InvalidHeaderValue, AUTHORIZATION, SEC_WEBSOCKET_PROTOCOL,
};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::lockfile::{self, LockfileCredentials, LockfileError};
use crate::config::ClientConfig;
use crate::protocol::{parse_event_frame, subscribe_frame, ChampSelectSession, SessionEvent, SESSION_URI};

/// WebSocket subprotocol spoken by the client's event endpoint.
const WAMP_SUBPROTOCOL: &str = "wamp";

/// Events emitted by the client connection to the application layer.
#[derive(Debug, Clone, PartialEq)]
pub enum LcuEvent {
    /// The event stream is up and subscribed.
    Connected,
    /// The event stream ended (client closed or connection lost).
    Disconnected,
    /// A champ select session change.
    Session(SessionEvent),
}

#[derive(Debug, Error)]
pub enum LcuError {
    #[error(transparent)]
    Lockfile(#[from] LockfileError),

    #[error("failed to build TLS connector: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    #[error("invalid header value: {0}")]
    Header(#[from] InvalidHeaderValue),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("session request returned status {0}")]
    UnexpectedStatus(reqwest::StatusCode),
}

pub type LcuStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// HTTP client for the local REST API. The client serves a self-signed
/// certificate, so verification is disabled.
pub fn http_client() -> Result<reqwest::Client, LcuError> {
    Ok(reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .build()?)
}

/// Open the event WebSocket and subscribe to champ select session events.
pub async fn connect(creds: &LockfileCredentials) -> Result<LcuStream, LcuError> {
    let tls = native_tls::TlsConnector::builder()
        .danger_accept_invalid_certs(true)
        .build()?;

    let mut request = creds.ws_url().into_client_request()?;
    let headers = request.headers_mut();
    headers.insert(AUTHORIZATION, HeaderValue::from_str(&creds.auth_header())?);
    headers.insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static(WAMP_SUBPROTOCOL));

    let (mut stream, _response) = tokio_tungstenite::connect_async_tls_with_config(
        request,
        None,
        false,
        Some(Connector::NativeTls(tls)),
    )
    .await?;

    stream.send(Message::Text(subscribe_frame().into())).await?;
    Ok(stream)
}

/// Fetch the current champ select session, if one is in place.
pub async fn fetch_session(
    http: &reqwest::Client,
    creds: &LockfileCredentials,
) -> Result<Option<ChampSelectSession>, LcuError> {
    let url = format!("{}{}", creds.base_url(), SESSION_URI);
    let response = http
        .get(&url)
        .header(reqwest::header::AUTHORIZATION, creds.auth_header())
        .send()
        .await?;

    match response.status() {
        reqwest::StatusCode::OK => Ok(Some(response.json().await?)),
        reqwest::StatusCode::NOT_FOUND => Ok(None),
        status => Err(LcuError::UnexpectedStatus(status)),
    }
}

/// Read frames from the event stream and forward session events through
/// `tx`. Returns `Err(())` if the receiver is gone, signalling the caller to
/// stop.
///
/// Generic over the stream so it can be driven by in-memory streams in tests.
pub async fn process_frame_stream<St>(mut stream: St, tx: &mpsc::Sender<LcuEvent>) -> Result<(), ()>
where
    St: Stream<Item = Result<Message, WsError>> + Unpin,
{
    while let Some(msg_result) = stream.next().await {
        match msg_result {
            Ok(Message::Text(text)) => match parse_event_frame(text.as_str()) {
                Ok(Some(event)) => {
                    if tx.send(LcuEvent::Session(event)).await.is_err() {
                        return Err(());
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Dropping client frame: {e}"),
            },
            Ok(Message::Close(_)) => {
                info!("Client closed the event stream");
                break;
            }
            Err(e) => {
                warn!("Client event stream error: {e}");
                break;
            }
            _ => {
                // Binary, Ping, Pong and raw frames carry nothing for us.
            }
        }
    }
    Ok(())
}

/// Keep a connection to the client alive, forwarding events through `tx`.
///
/// Waits for the lockfile to appear, connects, reports any session that is
/// already running, then streams events until the socket ends. Reconnects
/// after `reconnect_delay_ms`. Returns when the receiver is dropped.
pub async fn run(config: ClientConfig, tx: mpsc::Sender<LcuEvent>) -> anyhow::Result<()> {
    let http = http_client()?;
    let install_dir = PathBuf::from(&config.install_dir);
    let delay = Duration::from_millis(config.reconnect_delay_ms);

    loop {
        let creds = match lockfile::read_lockfile(&install_dir) {
            Ok(creds) => creds,
            Err(e) => {
                debug!("{e}");
                tokio::time::sleep(delay).await;
                continue;
            }
        };

        let stream = match connect(&creds).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Failed to connect to client on port {}: {e}", creds.port);
                tokio::time::sleep(delay).await;
                continue;
            }
        };
        info!("Connected to client on port {} (pid {})", creds.port, creds.pid);

        if tx.send(LcuEvent::Connected).await.is_err() {
            break;
        }

        match fetch_session(&http, &creds).await {
            Ok(Some(session)) => {
                info!("Champ select session already in place");
                if tx
                    .send(LcuEvent::Session(SessionEvent::Existing(session)))
                    .await
                    .is_err()
                {
                    break;
                }
            }
            Ok(None) => info!("No champ select session in place"),
            Err(e) => warn!("Failed to fetch current session: {e}"),
        }

        let (_write, read) = stream.split();
        if process_frame_stream(read, &tx).await.is_err() {
            break;
        }

        if tx.send(LcuEvent::Disconnected).await.is_err() {
            break;
        }
        tokio::time::sleep(delay).await;
    }

    info!("Client connection task exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn mock_stream(
        messages: Vec<Result<Message, WsError>>,
    ) -> impl Stream<Item = Result<Message, WsError>> + Unpin {
        stream::iter(messages)
    }

    fn frame(event_type: &str, data: &str) -> Message {
        Message::Text(
            format!(
                r#"[8,"OnJsonApiEvent_lol-champ-select_v1_session",{{"data":{data},"eventType":"{event_type}","uri":"/lol-champ-select/v1/session"}}]"#
            )
            .into(),
        )
    }

    #[tokio::test]
    async fn session_frames_forwarded_in_order() {
        let (tx, mut rx) = mpsc::channel(64);
        let messages = vec![
            Ok(frame("Create", "{}")),
            Ok(frame("Update", r#"{"localPlayerCellId":4}"#)),
            Ok(frame("Delete", "null")),
        ];

        process_frame_stream(mock_stream(messages), &tx).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), LcuEvent::Session(SessionEvent::Created));
        match rx.recv().await.unwrap() {
            LcuEvent::Session(SessionEvent::Updated(session)) => {
                assert_eq!(session.local_player_cell_id, Some(4));
            }
            other => panic!("expected Updated, got {other:?}"),
        }
        assert_eq!(rx.recv().await.unwrap(), LcuEvent::Session(SessionEvent::Deleted));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn malformed_and_unrelated_frames_are_dropped() {
        let (tx, mut rx) = mpsc::channel(64);
        let messages = vec![
            Ok(Message::Text("garbage".into())),
            Ok(Message::Text(r#"[8,"t",{"data":{},"eventType":"Update","uri":"/lol-lobby/v2/lobby"}]"#.into())),
            Ok(frame("Create", "{}")),
        ];

        process_frame_stream(mock_stream(messages), &tx).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), LcuEvent::Session(SessionEvent::Created));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn close_frame_stops_processing() {
        let (tx, mut rx) = mpsc::channel(64);
        let messages = vec![
            Ok(frame("Create", "{}")),
            Ok(Message::Close(None)),
            Ok(frame("Delete", "null")),
        ];

        process_frame_stream(mock_stream(messages), &tx).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), LcuEvent::Session(SessionEvent::Created));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn error_stops_processing() {
        let (tx, mut rx) = mpsc::channel(64);
        let messages = vec![Err(WsError::ConnectionClosed), Ok(frame("Create", "{}"))];

        process_frame_stream(mock_stream(messages), &tx).await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn binary_and_ping_are_ignored() {
        let (tx, mut rx) = mpsc::channel(64);
        let messages = vec![
            Ok(Message::Binary(vec![1, 2, 3].into())),
            Ok(Message::Ping(vec![].into())),
            Ok(frame("Create", "{}")),
        ];

        process_frame_stream(mock_stream(messages), &tx).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), LcuEvent::Session(SessionEvent::Created));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn returns_err_when_channel_closed() {
        let (tx, rx) = mpsc::channel(64);
        drop(rx);

        let result = process_frame_stream(mock_stream(vec![Ok(frame("Create", "{}"))]), &tx).await;
        assert!(result.is_err());
    }
}
