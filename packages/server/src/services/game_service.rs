use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::Arc,
};
use tokio::sync::{broadcast, mpsc, oneshot, watch, Mutex};
use tracing::{info, info_span, Instrument};

use crate::{
    errors::{ActionRejection, GameError},
    models::{
        action::{ActionAck, ActionRequest},
        config::GameConfig,
        event::GameEvent,
        game::{GameResult, GameState, PublicGameState},
        player::PlayerId,
        role::{Role, Team},
        room::RoomStatus,
        window::WindowInfo,
    },
    services::{
        game_driver::{GameCommand, GameDriver},
        store::GameStore,
    },
    state::AppState,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSetup {
    /// Seat order.
    pub players: Vec<PlayerId>,
    /// One role per player, matched by position unless roles are shuffled.
    pub roles: Vec<Role>,
}

struct GameHandle {
    commands: mpsc::Sender<GameCommand>,
    events: broadcast::Sender<GameEvent>,
    snapshot: watch::Receiver<GameState>,
    window: watch::Receiver<Option<WindowInfo>>,
}

/// Finished games kept around so late readers still see the result.
const RETAINED_RESULTS: usize = 32;

#[derive(Default)]
struct GameTable {
    running: HashMap<String, GameHandle>,
    finished: VecDeque<GameState>,
}

impl GameTable {
    fn finished(&self, game_id: &str) -> Option<&GameState> {
        self.finished.iter().find(|s| s.game_id == game_id)
    }

    fn retire(&mut self, state: GameState) {
        self.running.remove(&state.game_id);
        self.finished.retain(|s| s.game_id != state.game_id);
        if self.finished.len() == RETAINED_RESULTS {
            self.finished.pop_front();
        }
        self.finished.push_back(state);
    }
}

/// Entry point for everything outside the game loop. Each running game is
/// owned by its own driver task; the manager only holds channels to it.
#[derive(Clone)]
pub struct GameManager {
    games: Arc<Mutex<GameTable>>,
    store: Arc<dyn GameStore>,
    config: Arc<GameConfig>,
}

impl GameManager {
    pub fn new(store: Arc<dyn GameStore>, config: Arc<GameConfig>) -> Self {
        Self {
            games: Arc::new(Mutex::new(GameTable::default())),
            store,
            config,
        }
    }

    pub async fn start_game(
        &self,
        game_id: &str,
        setup: GameSetup,
    ) -> Result<GameState, GameError> {
        let assignments = self.assign_roles(setup)?;

        let mut games = self.games.lock().await;
        if games.running.contains_key(game_id) {
            return Err(GameError::AlreadyExists(game_id.to_string()));
        }

        let state = GameState::new(game_id, assignments);
        self.store.save(game_id, &state).await?;

        let (commands, command_rx) = mpsc::channel(64);
        let (events, _) = broadcast::channel(256);
        let (snapshot_tx, snapshot) = watch::channel(state.clone());
        let (window_tx, window) = watch::channel(None);

        let driver = GameDriver::new(
            state.clone(),
            self.config.clone(),
            self.store.clone(),
            command_rx,
            events.clone(),
            snapshot_tx,
            window_tx,
        );
        let table = self.games.clone();
        tokio::spawn(
            async move {
                let ended = driver.run().await;
                info!(result = ?ended.result, "game finished");
                table.lock().await.retire(ended);
            }
            .instrument(info_span!("game", game_id)),
        );

        games.finished.retain(|s| s.game_id != game_id);
        games.running.insert(
            game_id.to_string(),
            GameHandle {
                commands,
                events,
                snapshot,
                window,
            },
        );
        info!(game_id, players = state.players.len(), "game started");
        Ok(state)
    }

    fn assign_roles(&self, setup: GameSetup) -> Result<Vec<(PlayerId, Role)>, GameError> {
        let GameSetup { players, mut roles } = setup;

        if players.len() < self.config.min_players {
            return Err(GameError::InvalidSetup(format!(
                "need at least {} players, got {}",
                self.config.min_players,
                players.len()
            )));
        }
        let unique: HashSet<&PlayerId> = players.iter().collect();
        if unique.len() != players.len() {
            return Err(GameError::InvalidSetup("duplicate player ids".into()));
        }
        if roles.len() != players.len() {
            return Err(GameError::InvalidSetup(format!(
                "{} roles for {} players",
                roles.len(),
                players.len()
            )));
        }
        if !roles.iter().any(|r| r.team() == Team::Werewolves) {
            return Err(GameError::InvalidSetup("lineup has no werewolf".into()));
        }

        if self.config.random_role {
            roles.shuffle(&mut rand::thread_rng());
        }
        Ok(players.into_iter().zip(roles).collect())
    }

    /// `None` once the game has finished.
    async fn commands(
        &self,
        game_id: &str,
    ) -> Result<Option<mpsc::Sender<GameCommand>>, GameError> {
        let games = self.games.lock().await;
        if let Some(handle) = games.running.get(game_id) {
            return Ok(Some(handle.commands.clone()));
        }
        match games.finished(game_id) {
            Some(_) => Ok(None),
            None => Err(GameError::NotFound(game_id.to_string())),
        }
    }

    /// Hands a submission to the game's driver and waits for its verdict.
    pub async fn submit_action(
        &self,
        game_id: &str,
        request: ActionRequest,
    ) -> Result<ActionAck, GameError> {
        let Some(commands) = self.commands(game_id).await? else {
            return Err(ActionRejection::StaleWindow.into());
        };
        let (reply, verdict) = oneshot::channel();
        if commands
            .send(GameCommand::Submit { request, reply })
            .await
            .is_err()
        {
            // the driver has already stopped
            return Err(ActionRejection::StaleWindow.into());
        }
        verdict
            .await
            .unwrap_or_else(|_| Err(ActionRejection::StaleWindow.into()))
    }

    /// The open window as `player_id` may see it. Without a player only the
    /// public view is returned.
    pub async fn current_window(
        &self,
        game_id: &str,
        player_id: Option<&str>,
    ) -> Result<Option<WindowInfo>, GameError> {
        let games = self.games.lock().await;
        if let Some(handle) = games.running.get(game_id) {
            let window = handle.window.borrow().as_ref().map(|w| w.view_for(player_id));
            return Ok(window);
        }
        match games.finished(game_id) {
            Some(_) => Ok(None),
            None => Err(GameError::NotFound(game_id.to_string())),
        }
    }

    /// Unredacted window feed for trusted in-process callers such as a
    /// moderator console. Never served to players.
    pub async fn watch_window(
        &self,
        game_id: &str,
    ) -> Result<watch::Receiver<Option<WindowInfo>>, GameError> {
        let games = self.games.lock().await;
        games
            .running
            .get(game_id)
            .map(|h| h.window.clone())
            .ok_or_else(|| GameError::NotFound(game_id.to_string()))
    }

    /// Full state, hidden roles included.
    pub async fn snapshot(&self, game_id: &str) -> Result<GameState, GameError> {
        let games = self.games.lock().await;
        if let Some(handle) = games.running.get(game_id) {
            let state = handle.snapshot.borrow().clone();
            return Ok(state);
        }
        games
            .finished(game_id)
            .cloned()
            .ok_or_else(|| GameError::NotFound(game_id.to_string()))
    }

    pub async fn public_state(&self, game_id: &str) -> Result<PublicGameState, GameError> {
        Ok(self.snapshot(game_id).await?.public_view())
    }

    pub async fn subscribe(
        &self,
        game_id: &str,
    ) -> Result<broadcast::Receiver<GameEvent>, GameError> {
        let games = self.games.lock().await;
        games
            .running
            .get(game_id)
            .map(|h| h.events.subscribe())
            .ok_or_else(|| GameError::NotFound(game_id.to_string()))
    }

    /// Stops the driver. Aborting a game that already ended is a no-op.
    pub async fn abort_game(
        &self,
        game_id: &str,
        reason: impl Into<String>,
    ) -> Result<(), GameError> {
        let Some(commands) = self.commands(game_id).await? else {
            return Ok(());
        };
        let reason = reason.into();
        info!(game_id, %reason, "abort requested");
        let _ = commands.send(GameCommand::Abort { reason }).await;
        Ok(())
    }

    /// Freezes the open window's countdown. Submissions are still accepted.
    pub async fn pause_game(&self, game_id: &str) -> Result<(), GameError> {
        self.send_control(game_id, GameCommand::Pause).await
    }

    pub async fn resume_game(&self, game_id: &str) -> Result<(), GameError> {
        self.send_control(game_id, GameCommand::Resume).await
    }

    async fn send_control(&self, game_id: &str, command: GameCommand) -> Result<(), GameError> {
        let over = || GameError::Aborted(format!("game {} is over", game_id));
        let commands = self.commands(game_id).await?.ok_or_else(over)?;
        commands.send(command).await.map_err(|_| over())
    }

    /// Resolves once the game has a terminal result.
    pub async fn wait_for_end(&self, game_id: &str) -> Result<GameState, GameError> {
        let mut snapshot = {
            let games = self.games.lock().await;
            match games.running.get(game_id) {
                Some(handle) => handle.snapshot.clone(),
                None => {
                    return games
                        .finished(game_id)
                        .cloned()
                        .ok_or_else(|| GameError::NotFound(game_id.to_string()));
                }
            }
        };
        let waited = snapshot
            .wait_for(|s| s.is_ended())
            .await
            .map(|s| s.clone());
        let ended = match waited {
            Ok(state) => state,
            Err(_) => snapshot.borrow().clone(),
        };
        Ok(ended)
    }
}

/// Starts the game for a room, seating its players in join order. The room
/// opens again once the game is over, or closes if it was aborted.
pub async fn start_room_game(state: &AppState, room_id: &str) -> Result<GameState, GameError> {
    let setup = {
        let rooms = state.rooms.lock().await;
        let room = rooms
            .get(room_id)
            .ok_or_else(|| GameError::NotFound(room_id.to_string()))?;
        if room.status != RoomStatus::Open {
            return Err(GameError::AlreadyExists(room_id.to_string()));
        }
        let roles = room
            .roles
            .clone()
            .unwrap_or_else(|| Role::default_lineup(room.players.len()));
        GameSetup {
            players: room.players.clone(),
            roles,
        }
    };

    let game = state.games.start_game(room_id, setup).await?;

    if let Some(room) = state.rooms.lock().await.get_mut(room_id) {
        room.status = RoomStatus::InProgress;
    }

    let games = state.games.clone();
    let rooms = state.rooms.clone();
    let room_id = room_id.to_string();
    tokio::spawn(async move {
        let Ok(ended) = games.wait_for_end(&room_id).await else {
            return;
        };
        if let Some(room) = rooms.lock().await.get_mut(&room_id) {
            room.status = match ended.result {
                GameResult::Aborted => RoomStatus::Closed,
                _ => RoomStatus::Open,
            };
            info!(room_id, status = ?room.status, "room released");
        }
    });
    Ok(game)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::action::PlayerAction;
    use crate::services::{room_service, store::InMemoryGameStore};
    use std::time::Duration;

    fn manager() -> GameManager {
        GameManager::new(
            Arc::new(InMemoryGameStore::new()),
            Arc::new(GameConfig::default()),
        )
    }

    fn setup(roles: &[Role]) -> GameSetup {
        GameSetup {
            players: (1..=roles.len()).map(|i| format!("p{}", i)).collect(),
            roles: roles.to_vec(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rejects_bad_setups() {
        let games = manager();
        let too_small = setup(&[Role::Werewolf, Role::Villager]);
        assert!(matches!(
            games.start_game("g", too_small).await,
            Err(GameError::InvalidSetup(_))
        ));

        let no_wolf = setup(&[Role::Seer, Role::Villager, Role::Villager]);
        assert!(matches!(
            games.start_game("g", no_wolf).await,
            Err(GameError::InvalidSetup(_))
        ));

        let mut duplicated = setup(&[Role::Werewolf, Role::Villager, Role::Villager]);
        duplicated.players[2] = "p1".into();
        assert!(matches!(
            games.start_game("g", duplicated).await,
            Err(GameError::InvalidSetup(_))
        ));

        let mut short = setup(&[Role::Werewolf, Role::Villager, Role::Villager]);
        short.roles.pop();
        assert!(matches!(
            games.start_game("g", short).await,
            Err(GameError::InvalidSetup(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_game_is_not_found() {
        let games = manager();
        assert!(matches!(games.snapshot("nope").await, Err(GameError::NotFound(_))));
        let request = ActionRequest::new("p1", PlayerAction::EndSpeech);
        assert!(matches!(
            games.submit_action("nope", request).await,
            Err(GameError::NotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn running_game_cannot_be_started_twice() {
        let games = manager();
        let roles = [Role::Werewolf, Role::Villager, Role::Villager];
        games.start_game("g", setup(&roles)).await.unwrap();
        assert!(matches!(
            games.start_game("g", setup(&roles)).await,
            Err(GameError::AlreadyExists(_))
        ));

        games.abort_game("g", "test over").await.unwrap();
        let ended = games.wait_for_end("g").await.unwrap();
        assert_eq!(ended.result, GameResult::Aborted);
        assert_eq!(games.current_window("g", None).await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn finished_games_leave_the_table() {
        let games = manager();
        let roles = [Role::Werewolf, Role::Villager, Role::Villager];
        games.start_game("g", setup(&roles)).await.unwrap();
        games.abort_game("g", "host left").await.unwrap();
        games.wait_for_end("g").await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        {
            let table = games.games.lock().await;
            assert!(table.running.is_empty());
            assert_eq!(table.finished.len(), 1);
        }
        // late readers still get the result
        assert_eq!(games.snapshot("g").await.unwrap().result, GameResult::Aborted);
        assert_eq!(games.wait_for_end("g").await.unwrap().result, GameResult::Aborted);
        assert_eq!(games.current_window("g", None).await.unwrap(), None);
        let late = ActionRequest::new("p2", PlayerAction::EndSpeech);
        assert!(matches!(
            games.submit_action("g", late).await,
            Err(GameError::Rejected(ActionRejection::StaleWindow))
        ));
        games.abort_game("g", "again").await.unwrap();
        assert!(matches!(games.pause_game("g").await, Err(GameError::Aborted(_))));
        assert!(matches!(games.subscribe("g").await, Err(GameError::NotFound(_))));

        games.start_game("g", setup(&roles)).await.unwrap();
        assert!(games.games.lock().await.finished.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn retained_results_are_bounded() {
        let games = manager();
        let roles = [Role::Werewolf, Role::Villager, Role::Villager];
        for i in 0..RETAINED_RESULTS + 3 {
            let id = format!("g{}", i);
            games.start_game(&id, setup(&roles)).await.unwrap();
            games.abort_game(&id, "next table").await.unwrap();
            games.wait_for_end(&id).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;

        let table = games.games.lock().await;
        assert!(table.running.is_empty());
        assert_eq!(table.finished.len(), RETAINED_RESULTS);
        assert!(table.finished("g0").is_none());
        assert!(table.finished(&format!("g{}", RETAINED_RESULTS + 2)).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn room_opens_again_after_the_game() {
        let state = AppState::new();
        let room_id = room_service::create_room(state.clone()).await.to_string();
        for player in ["p1", "p2", "p3"] {
            assert!(room_service::join_room(state.clone(), &room_id, player.to_string()).await);
        }
        if let Some(room) = state.rooms.lock().await.get_mut(&room_id) {
            room.roles = Some(vec![Role::Werewolf, Role::Villager, Role::Villager]);
        }

        start_room_game(&state, &room_id).await.unwrap();
        let mut window = state.games.watch_window(&room_id).await.unwrap();
        window.wait_for(|w| w.is_some()).await.unwrap();
        let kill = ActionRequest::new(
            "p1",
            PlayerAction::Kill {
                target: "p2".into(),
            },
        );
        state.games.submit_action(&room_id, kill).await.unwrap();

        let ended = state.games.wait_for_end(&room_id).await.unwrap();
        assert_eq!(ended.result, GameResult::WerewolfWin);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(
            state.rooms.lock().await.get(&room_id).unwrap().status,
            RoomStatus::Open
        );

        // the same table can play again
        start_room_game(&state, &room_id).await.unwrap();
        state.games.abort_game(&room_id, "host left").await.unwrap();
        state.games.wait_for_end(&room_id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(
            state.rooms.lock().await.get(&room_id).unwrap().status,
            RoomStatus::Closed
        );
    }
}
