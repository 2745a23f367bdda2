// Draft state: bans, picks and phase for one champ select session.
//
// `DraftState::update` folds a full session snapshot into the state and
// reports only what became true during that call. Slots are fill-once: a
// later snapshot can never rewrite a ban or pick that has been recorded.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::role::Role;
use super::seat::{seat_slot, Side, SLOTS_PER_SIDE, TOTAL_SEATS};
use crate::protocol::{ActionKind, ChampSelectSession, ChampionId};

/// Size of the first action group in ranked and flex drafts (ten bans up front).
const SOLO_FIRST_GROUP_LEN: usize = 10;

/// How the draft is structured, judged from its first snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DraftType {
    /// Ranked solo/flex: all ten bans happen in one opening group.
    Solo,
    /// Tournament draft: bans and picks interleave in phases.
    Tournament,
}

/// A side's pick slot, addressed by the picker's seat within that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickSlot {
    pub champion_id: Option<ChampionId>,
    pub role: Option<Role>,
}

/// A pick that was locked in during a single `update` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickInsert {
    pub side: Side,
    pub slot: usize,
    pub champion_id: ChampionId,
    pub role: Option<Role>,
}

/// What the overlay should animate for this call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaMode {
    /// New bans were completed.
    Ban,
}

/// The increment produced by one `update` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftDelta {
    pub mode: Option<DeltaMode>,
    pub insert_list: Vec<PickInsert>,
    pub to_pick_phase: bool,
}

/// Result of [`DraftState::update`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftUpdate {
    /// Whether anything observable changed.
    pub changed: bool,
    pub delta: DraftDelta,
}

/// The state of a single draft, owned by whoever drives the updates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftState {
    active: bool,
    draft_type: Option<DraftType>,
    my_side: Option<Side>,
    bans_completed: usize,
    /// Blue bans in slots 0..=4, red bans in 5..=9.
    bans: [Option<ChampionId>; TOTAL_SEATS],
    picks_completed: usize,
    /// `picks[side.index()][slot]`.
    picks: [[PickSlot; SLOTS_PER_SIDE]; 2],
    pick_phase_started: bool,
}

impl DraftState {
    /// An empty, inactive draft.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return to the empty, inactive state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn draft_type(&self) -> Option<DraftType> {
        self.draft_type
    }

    pub fn my_side(&self) -> Option<Side> {
        self.my_side
    }

    pub fn bans_completed(&self) -> usize {
        self.bans_completed
    }

    pub fn bans(&self) -> &[Option<ChampionId>; TOTAL_SEATS] {
        &self.bans
    }

    pub fn picks_completed(&self) -> usize {
        self.picks_completed
    }

    pub fn picks(&self, side: Side) -> &[PickSlot; SLOTS_PER_SIDE] {
        &self.picks[side.index()]
    }

    pub fn pick_phase_started(&self) -> bool {
        self.pick_phase_started
    }

    /// Whether all ten picks have been locked in.
    pub fn is_complete(&self) -> bool {
        self.picks_completed >= TOTAL_SEATS
    }

    /// Fold one session snapshot into the state.
    ///
    /// Snapshots must be applied one at a time and in the order the client
    /// produced them. A snapshot that carries nothing new returns
    /// `changed == false` and an empty delta.
    pub fn update(&mut self, session: &ChampSelectSession) -> DraftUpdate {
        let mut update = DraftUpdate::default();

        // The type tracks the latest snapshot until activation locks it in.
        if !self.active && !self.is_complete() {
            self.draft_type = Some(classify(session));
            if !session.has_simultaneous_picks {
                self.active = true;
                update.changed = true;
                debug!("Draft activated as {:?}", self.draft_type);
            }
        }

        if !self.active {
            return update;
        }

        if self.my_side.is_none() {
            if let Some(side) = session.local_player_cell_id.and_then(Side::from_seat) {
                self.my_side = Some(side);
                update.changed = true;
                debug!("Local player is on {:?} side", side);
            }
        }

        self.fold_bans(session, &mut update);
        self.detect_pick_phase(session, &mut update);
        if self.pick_phase_started {
            self.fold_picks(session, &mut update);
        }

        if self.picks_completed >= TOTAL_SEATS {
            self.active = false;
            info!("Draft complete: all {} picks locked in", TOTAL_SEATS);
        }

        update
    }

    /// Record completed bans. The slot for a ban is its ordinal among that
    /// side's ban actions, so incomplete bans still reserve their slot.
    fn fold_bans(&mut self, session: &ChampSelectSession, update: &mut DraftUpdate) {
        let mut bans = self.bans;
        let mut completed = 0;
        let mut ordinals = [0usize; 2];

        for action in session.actions_of(ActionKind::Ban) {
            let Some(side) = Side::from_seat(action.actor_cell_id) else {
                continue;
            };
            let ordinal = ordinals[side.index()];
            ordinals[side.index()] += 1;

            if !action.completed {
                continue;
            }
            completed += 1;
            if ordinal < SLOTS_PER_SIDE {
                bans[side.ban_offset() + ordinal].get_or_insert(action.champion_id);
            }
        }

        if completed > self.bans_completed {
            debug!("Bans completed: {} -> {}", self.bans_completed, completed);
            self.bans = bans;
            self.bans_completed = completed;
            update.changed = true;
            update.delta.mode = Some(DeltaMode::Ban);
        }
    }

    fn detect_pick_phase(&mut self, session: &ChampSelectSession, update: &mut DraftUpdate) {
        if self.pick_phase_started {
            return;
        }
        let started = session
            .actions_of(ActionKind::Pick)
            .any(|action| action.completed || action.is_in_progress);
        if started {
            info!("Pick phase started");
            self.pick_phase_started = true;
            update.changed = true;
            update.delta.to_pick_phase = true;
        }
    }

    fn fold_picks(&mut self, session: &ChampSelectSession, update: &mut DraftUpdate) {
        let mut completed = 0;

        for action in session.actions_of(ActionKind::Pick) {
            if !action.completed {
                continue;
            }
            let Some((side, slot)) = seat_slot(action.actor_cell_id) else {
                continue;
            };
            // Counted even when the slot is already filled.
            completed += 1;

            let entry = &mut self.picks[side.index()][slot];
            if entry.champion_id.is_some() {
                continue;
            }

            entry.champion_id = Some(action.champion_id);
            if action.is_ally_action {
                entry.role = self.my_side.and_then(|my_side| {
                    ally_role(session, action.actor_cell_id - my_side.seat_offset())
                });
            }
            debug!(
                "Pick locked: {:?} slot {} -> champion {} ({:?})",
                side, slot, action.champion_id, entry.role
            );

            update.delta.insert_list.push(PickInsert {
                side,
                slot,
                champion_id: action.champion_id,
                role: entry.role,
            });
        }

        if completed > self.picks_completed {
            self.picks_completed = completed;
            update.changed = true;
        }
    }
}

/// Ten actions in the opening group means ranked/flex; anything else is
/// treated as a tournament draft.
fn classify(session: &ChampSelectSession) -> DraftType {
    if session.first_group_len() == SOLO_FIRST_GROUP_LEN {
        DraftType::Solo
    } else {
        DraftType::Tournament
    }
}

fn ally_role(session: &ChampSelectSession, local_index: i64) -> Option<Role> {
    let index = usize::try_from(local_index).ok()?;
    let member = session.my_team.get(index)?;
    Role::from_assigned_position(member.assigned_position.as_deref()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{SessionAction, TeamMember};

    fn ban(cell: i64, champion: ChampionId, completed: bool) -> SessionAction {
        SessionAction {
            kind: ActionKind::Ban,
            actor_cell_id: cell,
            champion_id: champion,
            completed,
            is_in_progress: false,
            is_ally_action: cell <= 4,
        }
    }

    fn pick(cell: i64, champion: ChampionId, completed: bool, in_progress: bool) -> SessionAction {
        SessionAction {
            kind: ActionKind::Pick,
            actor_cell_id: cell,
            champion_id: champion,
            completed,
            is_in_progress: in_progress,
            is_ally_action: cell <= 4,
        }
    }

    fn roster() -> Vec<TeamMember> {
        ["top", "jungle", "middle", "bottom", "utility"]
            .iter()
            .enumerate()
            .map(|(i, pos)| TeamMember {
                cell_id: Some(i as i64),
                assigned_position: Some(pos.to_string()),
            })
            .collect()
    }

    /// Ten opening bans, blue seats 0..=4 then red seats 5..=9.
    fn solo_bans(completed: usize) -> Vec<SessionAction> {
        (0..10)
            .map(|cell| ban(cell, 100 + cell as ChampionId, (cell as usize) < completed))
            .collect()
    }

    fn session(local: i64, actions: Vec<Vec<SessionAction>>) -> ChampSelectSession {
        ChampSelectSession {
            has_simultaneous_picks: false,
            local_player_cell_id: Some(local),
            my_team: roster(),
            actions,
        }
    }

    #[test]
    fn new_state_is_inactive_and_empty() {
        let state = DraftState::new();
        assert!(!state.is_active());
        assert_eq!(state.draft_type(), None);
        assert_eq!(state.my_side(), None);
        assert_eq!(state.bans_completed(), 0);
        assert!(state.bans().iter().all(Option::is_none));
        assert_eq!(state.picks_completed(), 0);
        assert!(!state.pick_phase_started());
    }

    #[test]
    fn first_snapshot_classifies_solo_and_activates() {
        let mut state = DraftState::new();
        let update = state.update(&session(2, vec![solo_bans(0)]));

        assert!(update.changed);
        assert!(state.is_active());
        assert_eq!(state.draft_type(), Some(DraftType::Solo));
        assert_eq!(state.my_side(), Some(Side::Blue));
        assert_eq!(state.bans_completed(), 0);
        assert_eq!(update.delta, DraftDelta::default());
    }

    #[test]
    fn short_first_group_classifies_tournament() {
        let mut state = DraftState::new();
        state.update(&session(7, vec![vec![ban(0, 1, false), ban(5, 2, false)]]));
        assert_eq!(state.draft_type(), Some(DraftType::Tournament));
        assert_eq!(state.my_side(), Some(Side::Red));
    }

    #[test]
    fn simultaneous_picks_classify_without_activating() {
        let mut state = DraftState::new();
        let mut snapshot = session(0, vec![vec![pick(0, 1, false, true)]]);
        snapshot.has_simultaneous_picks = true;

        let update = state.update(&snapshot);
        assert!(!update.changed);
        assert!(!state.is_active());
        assert_eq!(state.draft_type(), Some(DraftType::Tournament));
        assert_eq!(state.my_side(), None);

        // A later sequential snapshot activates and fixes the type.
        snapshot.has_simultaneous_picks = false;
        snapshot.actions = vec![solo_bans(0)];
        state.update(&snapshot);
        assert!(state.is_active());
        assert_eq!(state.draft_type(), Some(DraftType::Solo));

        // Once active, a differently shaped snapshot does not reclassify.
        snapshot.actions = vec![vec![ban(0, 1, false)]];
        state.update(&snapshot);
        assert_eq!(state.draft_type(), Some(DraftType::Solo));
    }

    #[test]
    fn completed_ban_lands_in_ordinal_slot() {
        let mut state = DraftState::new();
        // Blue bans by seat 1 three times (tournament style): the third is done.
        let actions = vec![
            vec![ban(1, 10, false), ban(5, 20, false)],
            vec![ban(1, 11, false), ban(6, 21, false)],
            vec![ban(1, 99, true), ban(7, 22, false)],
        ];
        state.update(&session(0, actions));

        assert_eq!(state.bans()[2], Some(99));
        assert_eq!(state.bans_completed(), 1);
        assert!(state.bans()[0].is_none());
        assert!(state.bans()[1].is_none());
    }

    #[test]
    fn new_bans_set_ban_mode() {
        let mut state = DraftState::new();
        state.update(&session(0, vec![solo_bans(0)]));

        let update = state.update(&session(0, vec![solo_bans(3)]));
        assert!(update.changed);
        assert_eq!(update.delta.mode, Some(DeltaMode::Ban));
        assert_eq!(state.bans_completed(), 3);
        assert_eq!(&state.bans()[..3], &[Some(100), Some(101), Some(102)]);

        let update = state.update(&session(0, vec![solo_bans(3)]));
        assert!(!update.changed);
        assert_eq!(update.delta.mode, None);
    }

    #[test]
    fn red_bans_use_upper_block() {
        let mut state = DraftState::new();
        let actions = vec![vec![ban(5, 55, true), ban(0, 11, false), ban(8, 88, true)]];
        state.update(&session(0, actions));
        assert_eq!(state.bans()[5], Some(55));
        assert_eq!(state.bans()[6], Some(88));
        assert_eq!(state.bans_completed(), 2);
    }

    #[test]
    fn filled_ban_slot_is_never_rewritten() {
        let mut state = DraftState::new();
        state.update(&session(0, vec![vec![ban(0, 1, true)]]));
        assert_eq!(state.bans()[0], Some(1));

        // Client now reports a different champion for the same ban plus a new one.
        state.update(&session(0, vec![vec![ban(0, 2, true), ban(1, 3, true)]]));
        assert_eq!(state.bans()[0], Some(1));
        assert_eq!(state.bans()[1], Some(3));
        assert_eq!(state.bans_completed(), 2);
    }

    #[test]
    fn pick_phase_reported_exactly_once() {
        let mut state = DraftState::new();
        state.update(&session(0, vec![solo_bans(10)]));

        let snapshot = session(0, vec![solo_bans(10), vec![pick(0, 0, false, true)]]);
        let update = state.update(&snapshot);
        assert!(update.changed);
        assert!(update.delta.to_pick_phase);
        assert!(state.pick_phase_started());

        let update = state.update(&snapshot);
        assert!(!update.changed);
        assert!(!update.delta.to_pick_phase);
        assert!(state.pick_phase_started());
    }

    #[test]
    fn incomplete_pick_not_in_progress_does_not_start_phase() {
        let mut state = DraftState::new();
        let update = state.update(&session(0, vec![solo_bans(10), vec![pick(0, 0, false, false)]]));
        assert!(!update.delta.to_pick_phase);
        assert!(!state.pick_phase_started());
    }

    #[test]
    fn ally_pick_gets_role_and_is_inserted_once() {
        let mut state = DraftState::new();
        state.update(&session(0, vec![solo_bans(10)]));

        let snapshot = session(0, vec![solo_bans(10), vec![pick(1, 64, true, false)]]);
        let update = state.update(&snapshot);
        assert!(update.changed);
        assert_eq!(
            update.delta.insert_list,
            vec![PickInsert {
                side: Side::Blue,
                slot: 1,
                champion_id: 64,
                role: Some(Role::Jungle),
            }]
        );
        assert_eq!(
            state.picks(Side::Blue)[1],
            PickSlot {
                champion_id: Some(64),
                role: Some(Role::Jungle),
            }
        );
        assert_eq!(state.picks_completed(), 1);

        let update = state.update(&snapshot);
        assert!(update.delta.insert_list.is_empty());
        assert!(!update.changed);
    }

    #[test]
    fn red_side_ally_role_uses_local_index() {
        let mut state = DraftState::new();
        let mut red_pick = pick(8, 222, true, false);
        red_pick.is_ally_action = true;
        state.update(&session(6, vec![solo_bans(10), vec![red_pick]]));

        assert_eq!(state.my_side(), Some(Side::Red));
        assert_eq!(
            state.picks(Side::Red)[3],
            PickSlot {
                champion_id: Some(222),
                role: Some(Role::Bottom),
            }
        );
    }

    #[test]
    fn enemy_pick_has_no_role() {
        let mut state = DraftState::new();
        let update = state.update(&session(0, vec![solo_bans(10), vec![pick(5, 77, true, false)]]));
        assert_eq!(update.delta.insert_list.len(), 1);
        assert_eq!(update.delta.insert_list[0].side, Side::Red);
        assert_eq!(update.delta.insert_list[0].slot, 0);
        assert_eq!(update.delta.insert_list[0].role, None);
    }

    #[test]
    fn unknown_or_missing_position_yields_no_role() {
        let mut state = DraftState::new();
        let mut snapshot = session(0, vec![solo_bans(10), vec![pick(0, 1, true, false), pick(1, 2, true, false)]]);
        snapshot.my_team[0].assigned_position = Some(String::new());
        snapshot.my_team[1].assigned_position = None;
        state.update(&snapshot);
        assert_eq!(state.picks(Side::Blue)[0].role, None);
        assert_eq!(state.picks(Side::Blue)[1].role, None);
        assert_eq!(state.picks(Side::Blue)[0].champion_id, Some(1));
    }

    #[test]
    fn ten_picks_end_the_draft() {
        let mut state = DraftState::new();
        state.update(&session(0, vec![solo_bans(10)]));

        let picks: Vec<SessionAction> = (0..10).map(|cell| pick(cell, 200 + cell as ChampionId, true, false)).collect();
        let snapshot = session(0, vec![solo_bans(10), picks]);
        let update = state.update(&snapshot);

        assert!(update.changed);
        assert_eq!(update.delta.insert_list.len(), 10);
        assert_eq!(state.picks_completed(), 10);
        assert!(state.is_complete());
        assert!(!state.is_active());

        // Repeating the final snapshot does not reactivate the tracker.
        let update = state.update(&snapshot);
        assert!(!update.changed);
        assert!(!state.is_active());

        state.reset();
        assert_eq!(state, DraftState::new());
    }

    #[test]
    fn out_of_range_seats_are_ignored() {
        let mut state = DraftState::new();
        let update = state.update(&session(0, vec![vec![ban(-1, 5, true), ban(12, 6, true)]]));
        assert_eq!(state.bans_completed(), 0);
        assert!(state.bans().iter().all(Option::is_none));
        assert_eq!(update.delta.mode, None);
    }

    #[test]
    fn out_of_range_pick_seats_make_no_progress() {
        let mut state = DraftState::new();
        state.update(&session(0, vec![solo_bans(10), vec![pick(0, 0, false, true)]]));
        assert!(state.pick_phase_started());

        let stray: Vec<SessionAction> = (0..10).map(|_| pick(42, 7, true, false)).collect();
        let update = state.update(&session(0, vec![solo_bans(10), stray]));

        assert!(!update.changed);
        assert!(update.delta.insert_list.is_empty());
        assert_eq!(state.picks_completed(), 0);
        assert!(state.is_active());
        assert!(state.picks(Side::Blue).iter().all(|pick| pick.champion_id.is_none()));
    }

    #[test]
    fn new_slot_without_higher_count_is_not_a_change() {
        let mut state = DraftState::new();
        // Seat 0 reported twice: two completed picks, one slot.
        let update = state.update(&session(
            0,
            vec![solo_bans(10), vec![pick(0, 11, true, false), pick(0, 11, true, false)]],
        ));
        assert!(update.changed);
        assert_eq!(state.picks_completed(), 2);

        let update = state.update(&session(
            0,
            vec![solo_bans(10), vec![pick(0, 11, true, false), pick(1, 12, true, false)]],
        ));

        assert!(!update.changed);
        assert_eq!(state.picks_completed(), 2);
        assert_eq!(update.delta.insert_list.len(), 1);
        assert_eq!(state.picks(Side::Blue)[1].champion_id, Some(12));
    }

    #[test]
    fn missing_local_cell_leaves_side_unset_until_known() {
        let mut state = DraftState::new();
        let mut snapshot = session(0, vec![solo_bans(0)]);
        snapshot.local_player_cell_id = None;
        state.update(&snapshot);
        assert!(state.is_active());
        assert_eq!(state.my_side(), None);

        snapshot.local_player_cell_id = Some(9);
        let update = state.update(&snapshot);
        assert!(update.changed);
        assert_eq!(state.my_side(), Some(Side::Red));
    }

    #[test]
    fn reset_then_update_matches_fresh_instance() {
        let snapshot = session(3, vec![solo_bans(4), vec![pick(3, 9, true, false)]]);

        let mut used = DraftState::new();
        used.update(&session(8, vec![vec![ban(5, 1, true)]]));
        used.reset();
        let from_reset = used.update(&snapshot);

        let mut fresh = DraftState::new();
        let from_fresh = fresh.update(&snapshot);

        assert_eq!(from_reset, from_fresh);
        assert_eq!(used, fresh);
    }

    #[test]
    fn serializes_with_contract_keys() {
        let mut state = DraftState::new();
        state.update(&session(0, vec![solo_bans(1)]));
        let json = serde_json::to_value(&state).unwrap();

        assert_eq!(json["active"], true);
        assert_eq!(json["draftType"], "SOLO");
        assert_eq!(json["mySide"], "BLUE");
        assert_eq!(json["bansCompleted"], 1);
        assert_eq!(json["bans"][0], 100);
        assert!(json["bans"][1].is_null());
        assert_eq!(json["picksCompleted"], 0);
        assert_eq!(json["picks"][1][4]["championId"], serde_json::Value::Null);
        assert_eq!(json["pickPhaseStarted"], false);

        let delta = DraftDelta {
            mode: Some(DeltaMode::Ban),
            insert_list: vec![],
            to_pick_phase: false,
        };
        let json = serde_json::to_value(&delta).unwrap();
        assert_eq!(json["mode"], "ban");
        assert_eq!(json["insertList"], serde_json::json!([]));
        assert_eq!(json["toPickPhase"], false);
    }
}
