// Wire types shared between the live client, the reducer and the overlay.
//
// Inbound: champ select session snapshots and the WAMP event frames that
// carry them. Outbound: the tagged JSON messages pushed to the overlay page.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::draft::state::{DraftDelta, DraftState};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// REST path and event URI of the champ select session resource.
pub const SESSION_URI: &str = "/lol-champ-select/v1/session";

/// WAMP topic carrying change notifications for [`SESSION_URI`].
pub const SESSION_TOPIC: &str = "OnJsonApiEvent_lol-champ-select_v1_session";

/// WAMP opcode for a subscription request.
pub const OPCODE_SUBSCRIBE: u64 = 5;

/// WAMP opcode for an event delivery.
pub const OPCODE_EVENT: u64 = 8;

/// Champion identifier as used by the live client.
pub type ChampionId = u32;

// ---------------------------------------------------------------------------
// Session snapshot (inbound)
// ---------------------------------------------------------------------------

/// One snapshot of the champ select session.
///
/// Only the fields the reducer reads are modelled; everything else the client
/// sends (timers, trades, summoner ids, ...) is ignored. Missing fields decode
/// to their defaults so a partial snapshot yields no progress instead of an
/// error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChampSelectSession {
    #[serde(default)]
    pub has_simultaneous_picks: bool,
    #[serde(default)]
    pub local_player_cell_id: Option<i64>,
    #[serde(default)]
    pub my_team: Vec<TeamMember>,
    /// Ordered action groups, each an ordered list of actions.
    #[serde(default)]
    pub actions: Vec<Vec<SessionAction>>,
}

impl ChampSelectSession {
    /// All actions of `kind`, group by group, in the order the client lists them.
    pub fn actions_of(&self, kind: ActionKind) -> impl Iterator<Item = &SessionAction> {
        self.actions
            .iter()
            .flatten()
            .filter(move |action| action.kind == kind)
    }

    /// Number of actions in the first action group (0 when there are none).
    pub fn first_group_len(&self) -> usize {
        self.actions.first().map_or(0, Vec::len)
    }
}

/// A member of the local player's team.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    #[serde(default)]
    pub cell_id: Option<i64>,
    #[serde(default)]
    pub assigned_position: Option<String>,
}

/// The kind of a champ select action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Ban,
    Pick,
    /// `ten_bans_reveal` and anything else the reducer does not track.
    #[serde(other)]
    Other,
}

/// A single ban or pick, possibly not yet locked in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAction {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    #[serde(default = "unknown_cell")]
    pub actor_cell_id: i64,
    #[serde(default)]
    pub champion_id: ChampionId,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub is_in_progress: bool,
    #[serde(default)]
    pub is_ally_action: bool,
}

fn unknown_cell() -> i64 {
    -1
}

// ---------------------------------------------------------------------------
// Event frames (inbound)
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed event frame: {0}")]
    InvalidFrame(#[source] serde_json::Error),

    #[error("event frame has no payload object")]
    MissingPayload,

    #[error("unknown event type `{0}`")]
    UnknownEventType(String),

    #[error("session payload did not decode: {0}")]
    InvalidSession(#[source] serde_json::Error),
}

/// A change to the champ select session, as seen by the application loop.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A session was already running when the client connection came up.
    Existing(ChampSelectSession),
    /// A new session was created (a new draft is starting).
    Created,
    /// The session changed; carries the complete current snapshot.
    Updated(ChampSelectSession),
    /// The session ended (dodge, game start, or leaving the lobby).
    Deleted,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventPayload {
    #[serde(default)]
    data: Value,
    event_type: String,
    uri: String,
}

/// The subscription frame sent after connecting.
pub fn subscribe_frame() -> String {
    Value::Array(vec![
        Value::from(OPCODE_SUBSCRIBE),
        Value::from(SESSION_TOPIC),
    ])
    .to_string()
}

/// Parse one WAMP text frame from the live client.
///
/// Returns `Ok(None)` for frames that are well-formed but irrelevant (other
/// opcodes, other URIs, empty keep-alives).
pub fn parse_event_frame(text: &str) -> Result<Option<SessionEvent>, ProtocolError> {
    if text.trim().is_empty() {
        return Ok(None);
    }

    let frame: Vec<Value> = serde_json::from_str(text).map_err(ProtocolError::InvalidFrame)?;
    if frame.first().and_then(Value::as_u64) != Some(OPCODE_EVENT) {
        return Ok(None);
    }

    let payload = frame.into_iter().nth(2).ok_or(ProtocolError::MissingPayload)?;
    let payload: EventPayload =
        serde_json::from_value(payload).map_err(ProtocolError::InvalidFrame)?;
    if payload.uri != SESSION_URI {
        return Ok(None);
    }

    match payload.event_type.as_str() {
        "Create" => Ok(Some(SessionEvent::Created)),
        "Update" => {
            let session = serde_json::from_value(payload.data)
                .map_err(ProtocolError::InvalidSession)?;
            Ok(Some(SessionEvent::Updated(session)))
        }
        "Delete" => Ok(Some(SessionEvent::Deleted)),
        other => Err(ProtocolError::UnknownEventType(other.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Overlay messages (outbound)
// ---------------------------------------------------------------------------

/// Whether the live client connection is up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

/// Full draft state plus what changed in the call that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftPayload {
    #[serde(flatten)]
    pub state: DraftState,
    pub updated: DraftDelta,
}

/// Messages pushed to the rendering surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UiUpdate {
    /// The draft state changed.
    DraftUpdate { payload: Box<DraftPayload> },
    /// A new draft session began; the surface should switch to the pick view.
    SessionStarted,
    /// The session is gone.
    SessionEnded,
    /// The live client connection came up or went down.
    ConnectionStatus { status: ConnectionStatus },
}
