// Application state and orchestration logic.
//
// The single consumer of live-client events. Owns the only `DraftState`,
// folds session snapshots into it and pushes the results to the overlay.

use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::draft::state::DraftState;
use crate::lcu::client::LcuEvent;
use crate::protocol::{ChampSelectSession, ConnectionStatus, DraftPayload, SessionEvent, UiUpdate};

/// The complete application state.
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub draft: DraftState,
    pub connection_status: ConnectionStatus,
    /// Whether a champ select session is currently open in the client.
    pub session_open: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            draft: DraftState::new(),
            connection_status: ConnectionStatus::Disconnected,
            session_open: false,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the main application event loop.
///
/// Consumes events from the client connection until the channel closes or
/// `shutdown` flips to `true`, pushing overlay updates through `ui_tx`.
pub async fn run(
    mut lcu_rx: mpsc::Receiver<LcuEvent>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    loop {
        tokio::select! {
            event = lcu_rx.recv() => {
                match event {
                    Some(event) => handle_lcu_event(&mut state, event, &ui_tx).await,
                    None => {
                        info!("Client event channel closed, shutting down");
                        break;
                    }
                }
            }

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("Shutdown requested");
                    break;
                }
            }
        }
    }

    info!("Application event loop exiting");
    Ok(())
}

/// Apply one client event to `state`, forwarding whatever the overlay needs.
pub async fn handle_lcu_event(state: &mut AppState, event: LcuEvent, ui_tx: &mpsc::Sender<UiUpdate>) {
    match event {
        LcuEvent::Connected => {
            info!("Client connection up");
            state.connection_status = ConnectionStatus::Connected;
            let _ = ui_tx
                .send(UiUpdate::ConnectionStatus {
                    status: ConnectionStatus::Connected,
                })
                .await;
        }
        LcuEvent::Disconnected => {
            info!("Client connection down");
            state.connection_status = ConnectionStatus::Disconnected;
            let _ = ui_tx
                .send(UiUpdate::ConnectionStatus {
                    status: ConnectionStatus::Disconnected,
                })
                .await;
        }
        LcuEvent::Session(event) => handle_session_event(state, event, ui_tx).await,
    }
}

async fn handle_session_event(state: &mut AppState, event: SessionEvent, ui_tx: &mpsc::Sender<UiUpdate>) {
    match event {
        SessionEvent::Existing(session) => {
            info!("Resuming champ select session already in place");
            state.session_open = true;
            let _ = ui_tx.send(UiUpdate::SessionStarted).await;
            state.draft.reset();
            apply_snapshot(state, &session, ui_tx).await;
        }
        SessionEvent::Created => {
            info!("Champ select session created");
            state.session_open = true;
            state.draft.reset();
            let _ = ui_tx.send(UiUpdate::SessionStarted).await;
        }
        SessionEvent::Updated(session) => apply_snapshot(state, &session, ui_tx).await,
        SessionEvent::Deleted => {
            info!("Champ select session ended");
            state.session_open = false;
            let _ = ui_tx.send(UiUpdate::SessionEnded).await;
        }
    }
}

async fn apply_snapshot(
    state: &mut AppState,
    session: &ChampSelectSession,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    let update = state.draft.update(session);
    if !update.changed {
        debug!("Snapshot produced no change");
        return;
    }

    let payload = DraftPayload {
        state: state.draft.clone(),
        updated: update.delta,
    };
    let _ = ui_tx
        .send(UiUpdate::DraftUpdate {
            payload: Box::new(payload),
        })
        .await;
}
