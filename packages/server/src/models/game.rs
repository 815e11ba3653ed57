use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{
    player::{DeathReason, PlayerId, PlayerState},
    role::{NightAction, Role, Team},
    window::TargetOption,
};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GameState {
    pub game_id: String,
    pub phase: GamePhase,
    pub round: u32,
    pub result: GameResult,
    /// Join order.
    pub players: Vec<PlayerState>,
    pub fixed_speaking_order: Vec<PlayerId>,
    pub speaking: SpeakingOrder,
    pub night_actions: NightActions,
    pub witch_potions: HashMap<PlayerId, WitchPotions>,
    pub guard_last_protect: Option<PlayerId>,
    #[serde(default)]
    pub day_votes: HashMap<PlayerId, VoteChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pk_round: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pk_players: Vec<PlayerId>,
    #[serde(default)]
    pub pk_speaking: SpeakingOrder,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_exile_shoot: Option<PlayerId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending_shooters: Vec<PlayerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_shooter_index: Option<usize>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum GamePhase {
    Setup, // ゲーム開始前
    Night, // 夜フェーズ
    Day,   // 昼フェーズ
    Ended, // ゲーム終了
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum GameResult {
    InProgress,
    VillagerWin,  // 村人陣営勝利
    WerewolfWin,  // 人狼陣営勝利
    Aborted,
}

impl GameResult {
    pub fn is_terminal(self) -> bool {
        self != GameResult::InProgress
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeakingOrder {
    pub order: Vec<PlayerId>,
    pub current: Option<usize>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum WitchAction {
    Antidote,
    Poison,
    Skip,
}

/// Per-night scratch space, cleared when night falls.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct NightActions {
    pub werewolf_kill: Option<PlayerId>,
    pub guard_protect: Option<PlayerId>,
    pub seer_check: Option<PlayerId>,
    pub seer_result: Option<Team>,
    pub witch_action: Option<WitchAction>,
    pub witch_antidote_target: Option<PlayerId>,
    pub witch_poison_target: Option<PlayerId>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WitchPotions {
    pub antidote: bool,
    pub poison: bool,
}

impl Default for WitchPotions {
    fn default() -> Self {
        Self {
            antidote: true,
            poison: true,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VoteChoice {
    Player(PlayerId),
    Abstain,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RosterEntry {
    pub player_id: PlayerId,
    pub role: Role,
    pub alive: bool,
    pub death_reason: Option<DeathReason>,
}

/// A seat as the table sees it. Roles stay hidden until the game ends or
/// the idiot flips their card.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PublicPlayer {
    pub id: PlayerId,
    pub alive: bool,
    pub can_vote: bool,
    pub has_spoken: bool,
    pub death_round: Option<u32>,
    /// Night deaths keep their cause until the game is over.
    pub death_reason: Option<DeathReason>,
    pub idiot_revealed: bool,
    pub role: Option<Role>,
}

/// The game without anything a player could not have seen at the table.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PublicGameState {
    pub game_id: String,
    pub phase: GamePhase,
    pub round: u32,
    pub result: GameResult,
    pub players: Vec<PublicPlayer>,
    pub fixed_speaking_order: Vec<PlayerId>,
    pub speaking: SpeakingOrder,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pk_players: Vec<PlayerId>,
}

impl std::fmt::Display for GameState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Game {{ game_id: {}, phase: {:?}, round: {}, result: {:?}, alive: {}/{} }}",
            self.game_id,
            self.phase,
            self.round,
            self.result,
            self.alive_players().count(),
            self.players.len()
        )
    }
}

impl GameState {
    /// Builds the state for a game whose roles are already assigned. The
    /// speaking order is the seat order given by `players`.
    pub fn new(game_id: impl Into<String>, players: Vec<(PlayerId, Role)>) -> Self {
        let fixed_speaking_order = players.iter().map(|(id, _)| id.clone()).collect();
        let witch_potions = players
            .iter()
            .filter(|(_, role)| role.night_action() == Some(NightAction::Support))
            .map(|(id, _)| (id.clone(), WitchPotions::default()))
            .collect();

        GameState {
            game_id: game_id.into(),
            phase: GamePhase::Setup,
            round: 0,
            result: GameResult::InProgress,
            players: players
                .into_iter()
                .map(|(id, role)| PlayerState::new(id, role))
                .collect(),
            fixed_speaking_order,
            speaking: SpeakingOrder::default(),
            night_actions: NightActions::default(),
            witch_potions,
            guard_last_protect: None,
            day_votes: HashMap::new(),
            pk_round: None,
            pk_players: Vec::new(),
            pk_speaking: SpeakingOrder::default(),
            pending_exile_shoot: None,
            pending_shooters: Vec::new(),
            current_shooter_index: None,
        }
    }

    pub fn player(&self, id: &str) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: &str) -> Option<&mut PlayerState> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn is_alive(&self, id: &str) -> bool {
        self.player(id).map(|p| p.alive).unwrap_or(false)
    }

    pub fn alive_players(&self) -> impl Iterator<Item = &PlayerState> {
        self.players.iter().filter(|p| p.alive)
    }

    /// Living players in seat order.
    pub fn alive_in_seat_order(&self) -> Vec<PlayerId> {
        self.fixed_speaking_order
            .iter()
            .filter(|id| self.is_alive(id))
            .cloned()
            .collect()
    }

    pub fn count_alive(&self, team: Team) -> usize {
        self.alive_players().filter(|p| p.team() == team).count()
    }

    /// Living holders of a night action, in seat order.
    pub fn living_holders(&self, action: NightAction) -> Vec<PlayerId> {
        self.alive_in_seat_order()
            .into_iter()
            .filter(|id| {
                self.player(id)
                    .map(|p| p.role.night_action() == Some(action))
                    .unwrap_or(false)
            })
            .collect()
    }

    pub fn ordinal(&self, id: &str) -> Option<usize> {
        self.fixed_speaking_order
            .iter()
            .position(|p| p == id)
            .map(|i| i + 1)
    }

    /// Living players accepted by `filter`, labelled with their seat ordinal.
    pub fn target_options<F>(&self, filter: F) -> Vec<TargetOption>
    where
        F: Fn(&PlayerState) -> bool,
    {
        self.fixed_speaking_order
            .iter()
            .enumerate()
            .filter_map(|(i, id)| {
                let player = self.player(id)?;
                (player.alive && filter(player)).then(|| TargetOption {
                    ordinal: i + 1,
                    player_id: id.clone(),
                })
            })
            .collect()
    }

    /// Nearest living neighbours on each side of `id` in seat order,
    /// wrapping around the table.
    pub fn living_neighbours(&self, id: &str) -> Vec<&PlayerState> {
        let seats = &self.fixed_speaking_order;
        let Some(pos) = seats.iter().position(|p| p == id) else {
            return Vec::new();
        };
        let n = seats.len();
        let living_at = |i: usize| self.player(&seats[i]).filter(|p| p.alive);

        let left = (1..n).map(|d| (pos + n - d) % n).find_map(living_at);
        let right = (1..n).map(|d| (pos + d) % n).find_map(living_at);

        let mut neighbours = Vec::with_capacity(2);
        if let Some(l) = left {
            neighbours.push(l);
        }
        if let Some(r) = right {
            if neighbours.iter().all(|p| p.id != r.id) {
                neighbours.push(r);
            }
        }
        neighbours
    }

    /// Kills `id` in the current round. Returns false if the player is
    /// unknown or already dead.
    pub fn kill(&mut self, id: &str, reason: DeathReason) -> bool {
        let round = self.round;
        self.player_mut(id)
            .map(|p| p.kill(round, reason))
            .unwrap_or(false)
    }

    pub fn begin_night(&mut self) {
        self.phase = GamePhase::Night;
        self.round += 1;
        self.night_actions = NightActions::default();
        self.clear_day_state();
    }

    pub fn begin_day(&mut self) {
        self.phase = GamePhase::Day;
        for player in &mut self.players {
            player.has_spoken = false;
        }
        self.clear_day_state();
    }

    fn clear_day_state(&mut self) {
        self.speaking = SpeakingOrder::default();
        self.day_votes.clear();
        self.clear_pk();
        self.clear_shooters();
    }

    pub fn clear_pk(&mut self) {
        self.pk_round = None;
        self.pk_players.clear();
        self.pk_speaking = SpeakingOrder::default();
    }

    pub fn clear_shooters(&mut self) {
        self.pending_exile_shoot = None;
        self.pending_shooters.clear();
        self.current_shooter_index = None;
    }

    pub fn finish(&mut self, result: GameResult) {
        self.phase = GamePhase::Ended;
        self.result = result;
    }

    pub fn is_ended(&self) -> bool {
        self.phase == GamePhase::Ended
    }

    pub fn public_view(&self) -> PublicGameState {
        let ended = self.is_ended();
        let players = self
            .players
            .iter()
            .map(|p| PublicPlayer {
                id: p.id.clone(),
                alive: p.alive,
                can_vote: p.can_vote,
                has_spoken: p.has_spoken,
                death_round: p.death_round,
                death_reason: p.death_reason.filter(|r| ended || r.is_announced()),
                idiot_revealed: p.idiot_revealed,
                role: (ended || p.idiot_revealed).then_some(p.role),
            })
            .collect();

        PublicGameState {
            game_id: self.game_id.clone(),
            phase: self.phase,
            round: self.round,
            result: self.result,
            players,
            fixed_speaking_order: self.fixed_speaking_order.clone(),
            speaking: self.speaking.clone(),
            pk_players: self.pk_players.clone(),
        }
    }

    pub fn roster(&self) -> Vec<RosterEntry> {
        self.players
            .iter()
            .map(|p| RosterEntry {
                player_id: p.id.clone(),
                role: p.role,
                alive: p.alive,
                death_reason: p.death_reason,
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn state_with(roles: &[Role]) -> GameState {
        let players = roles
            .iter()
            .enumerate()
            .map(|(i, role)| (format!("p{}", i + 1), *role))
            .collect();
        GameState::new("test", players)
    }

    #[test]
    fn new_state_seeds_potions_and_order() {
        let state = state_with(&[Role::Werewolf, Role::Witch, Role::Villager]);
        assert_eq!(state.fixed_speaking_order, vec!["p1", "p2", "p3"]);
        assert_eq!(state.witch_potions.get("p2"), Some(&WitchPotions::default()));
        assert_eq!(state.phase, GamePhase::Setup);
        assert_eq!(state.ordinal("p3"), Some(3));
    }

    #[test]
    fn begin_night_clears_scratch_and_bumps_round() {
        let mut state = state_with(&[Role::Werewolf, Role::Villager, Role::Villager]);
        state.night_actions.werewolf_kill = Some("p2".into());
        state.begin_night();
        assert_eq!(state.round, 1);
        assert_eq!(state.night_actions, NightActions::default());
        assert_eq!(state.phase, GamePhase::Night);
    }

    #[test]
    fn living_neighbours_skip_the_dead_and_wrap() {
        let mut state = state_with(&[
            Role::Bear,
            Role::Villager,
            Role::Villager,
            Role::Werewolf,
            Role::Villager,
        ]);
        state.kill("p5", DeathReason::Killed);
        state.kill("p2", DeathReason::Killed);
        let ids: Vec<_> = state
            .living_neighbours("p1")
            .iter()
            .map(|p| p.id.clone())
            .collect();
        assert_eq!(ids, vec!["p4", "p3"]);
    }

    #[test]
    fn target_options_carry_seat_ordinals() {
        let mut state = state_with(&[Role::Werewolf, Role::Villager, Role::Seer]);
        state.kill("p2", DeathReason::Exiled);
        let targets = state.target_options(|p| p.team() == Team::Villagers);
        assert_eq!(
            targets,
            vec![TargetOption {
                ordinal: 3,
                player_id: "p3".into()
            }]
        );
    }

    #[test]
    fn public_view_hides_roles_until_the_end() {
        let mut state = state_with(&[Role::Werewolf, Role::Idiot, Role::Witch, Role::Villager]);
        state.begin_night();
        state.night_actions.werewolf_kill = Some("p4".into());
        state.kill("p4", DeathReason::Poisoned);
        if let Some(idiot) = state.player_mut("p2") {
            idiot.idiot_revealed = true;
        }

        let public = state.public_view();
        let roles: Vec<_> = public.players.iter().map(|p| p.role).collect();
        assert_eq!(roles, vec![None, Some(Role::Idiot), None, None]);
        assert_eq!(public.players[3].death_reason, None);
        assert!(!public.players[3].alive);
        let json = serde_json::to_string(&public).unwrap();
        assert!(!json.contains("werewolf_kill"));
        assert!(!json.contains("Werewolf"));

        state.finish(GameResult::VillagerWin);
        let public = state.public_view();
        assert!(public.players.iter().all(|p| p.role.is_some()));
        assert_eq!(public.players[3].death_reason, Some(DeathReason::Poisoned));
    }

    #[test]
    fn state_round_trips_through_json() {
        let mut state = state_with(&[Role::Werewolf, Role::Witch, Role::Villager]);
        state.begin_night();
        state.night_actions.witch_action = Some(WitchAction::Poison);
        state
            .day_votes
            .insert("p1".into(), VoteChoice::Player("p3".into()));
        let json = serde_json::to_string(&state).unwrap();
        let back: GameState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
