//! One task per game. The driver owns the `GameState`, so every mutation is
//! serialized through it: player submissions arrive over `commands`, timer
//! expirations over a oneshot per window, and the phase loop walks night and
//! day until the win condition trips or the game is aborted.

use rand::{rngs::StdRng, SeedableRng};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::errors::{ActionRejection, GameError};
use crate::models::{
    action::{ActionAck, ActionRequest, PlayerAction},
    config::GameConfig,
    event::{Death, GameEvent},
    game::{GameResult, GameState, SpeakingOrder},
    player::{DeathReason, PlayerId},
    role::{night_acting_order, NightAction},
    window::{TargetOption, WindowInfo, WindowKind},
};
use crate::services::{
    ability_chain,
    day::{self, DuelOutcome, ExileResolution},
    death::{self, NightResolution},
    night,
    store::GameStore,
    timer::PhaseTimer,
    vote::{self, VoteOutcome, VoteTally},
    win_condition,
};

pub(crate) enum GameCommand {
    Submit {
        request: ActionRequest,
        reply: oneshot::Sender<Result<ActionAck, GameError>>,
    },
    Abort {
        reason: String,
    },
    /// Freezes the running window's countdown until resumed.
    Pause,
    Resume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WindowClose {
    Completed,
    Expired,
}

struct Handled {
    message: String,
    events: Vec<GameEvent>,
    completes: bool,
}

pub(crate) struct GameDriver {
    state: GameState,
    config: Arc<GameConfig>,
    store: Arc<dyn GameStore>,
    commands: mpsc::Receiver<GameCommand>,
    events: broadcast::Sender<GameEvent>,
    snapshot: watch::Sender<GameState>,
    window: watch::Sender<Option<WindowInfo>>,
    timer: PhaseTimer,
    next_window_id: u64,
    pending_duel: Option<DuelOutcome>,
    paused: bool,
    rng: StdRng,
}

impl GameDriver {
    pub(crate) fn new(
        state: GameState,
        config: Arc<GameConfig>,
        store: Arc<dyn GameStore>,
        commands: mpsc::Receiver<GameCommand>,
        events: broadcast::Sender<GameEvent>,
        snapshot: watch::Sender<GameState>,
        window: watch::Sender<Option<WindowInfo>>,
    ) -> Self {
        Self {
            state,
            config,
            store,
            commands,
            events,
            snapshot,
            window,
            timer: PhaseTimer::default(),
            next_window_id: 1,
            pending_duel: None,
            paused: false,
            rng: StdRng::from_entropy(),
        }
    }

    /// Plays the game to the end and hands back the final state. Any error
    /// aborts the game; either way the timer is cancelled and the stored
    /// state is deleted.
    pub(crate) async fn run(mut self) -> GameState {
        let outcome = self.play().await;
        self.timer.cancel();
        self.window.send_replace(None);

        if let Err(e) = outcome {
            warn!(game_id = %self.state.game_id, error = %e, "game aborted");
            self.state.finish(GameResult::Aborted);
            self.emit(GameEvent::GameAborted {
                reason: e.to_string(),
            });
        }

        self.snapshot.send_replace(self.state.clone());
        if let Err(e) = self.store.delete(&self.state.game_id).await {
            warn!(game_id = %self.state.game_id, error = %e, "failed to delete finished game");
        }

        self.commands.close();
        while let Ok(command) = self.commands.try_recv() {
            if let GameCommand::Submit { reply, .. } = command {
                let _ = reply.send(Err(ActionRejection::StaleWindow.into()));
            }
        }
        self.state
    }

    async fn play(&mut self) -> Result<(), GameError> {
        while !self.state.is_ended() {
            let resolution = self.run_night().await?;
            self.run_day(resolution).await?;
        }
        Ok(())
    }

    fn emit(&self, event: GameEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    async fn persist(&mut self) -> Result<(), GameError> {
        self.store.save(&self.state.game_id, &self.state).await?;
        self.snapshot.send_replace(self.state.clone());
        Ok(())
    }

    /// Records and announces the result if the game is over.
    async fn check_win(&mut self) -> Result<bool, GameError> {
        if self.state.is_ended() {
            return Ok(true);
        }
        let result = win_condition::evaluate(&self.state);
        if !result.is_terminal() {
            return Ok(false);
        }

        self.timer.cancel();
        self.state.finish(result);
        self.persist().await?;
        info!(game_id = %self.state.game_id, round = self.state.round, ?result, "game over");
        self.emit(GameEvent::GameEnded {
            result,
            roster: self.state.roster(),
        });
        Ok(true)
    }

    async fn run_night(&mut self) -> Result<NightResolution, GameError> {
        self.state.begin_night();
        self.persist().await?;
        info!(game_id = %self.state.game_id, round = self.state.round, "night started");
        self.emit(GameEvent::NightStarted {
            round: self.state.round,
        });

        for &action in night_acting_order() {
            let actors = night::window_actors(&self.state, action);
            if actors.is_empty() {
                debug!(?action, "no living holder, skipping");
                continue;
            }
            if action == NightAction::Support {
                for witch in &actors {
                    self.emit(GameEvent::KillTargetRevealed {
                        witch: witch.clone(),
                        target: self.state.night_actions.werewolf_kill.clone(),
                    });
                }
            }
            let targets = night::window_targets(&self.state, action);
            // never closes early: response time must not leak who acts
            self.open_window(
                WindowKind::Night { action },
                actors,
                targets,
                self.config.night_action_ticks,
            )
            .await?;
        }

        let resolution = death::resolve_night(&mut self.state, &mut self.rng);
        self.persist().await?;
        Ok(resolution)
    }

    async fn run_day(&mut self, resolution: NightResolution) -> Result<(), GameError> {
        self.state.begin_day();
        self.persist().await?;
        self.emit(GameEvent::DayStarted {
            round: self.state.round,
            deaths: resolution
                .deaths
                .iter()
                .map(|d| d.player_id.clone())
                .collect(),
            bear_growled: resolution.bear_growled,
        });

        self.run_ability_chain(&resolution.deaths).await?;
        if self.state.is_ended() {
            return Ok(());
        }

        if !self.run_discussion().await? {
            return Ok(());
        }

        let candidates = self.state.alive_in_seat_order();
        let tally = self
            .run_vote(WindowKind::Vote, candidates, self.config.vote_ticks)
            .await?;
        match tally.outcome {
            VoteOutcome::NoVotes => {
                self.emit(GameEvent::ExileResolved { target: None });
                Ok(())
            }
            VoteOutcome::Exile(target) => self.resolve_exile(target).await,
            VoteOutcome::Tie(tied) => self.run_pk(tied).await,
        }
    }

    /// Gives each eligible dead player a shot, one at a time, in death order.
    async fn run_ability_chain(&mut self, deaths: &[Death]) -> Result<(), GameError> {
        // a finished game pre-empts any shooting
        if self.check_win().await? {
            return Ok(());
        }
        let shooters = ability_chain::eligible_shooters(&self.state, deaths);
        if shooters.is_empty() {
            if self.state.pending_exile_shoot.take().is_some() {
                self.persist().await?;
            }
            return Ok(());
        }

        self.state.pending_shooters = shooters.clone();
        for (index, shooter) in shooters.iter().enumerate() {
            self.state.current_shooter_index = Some(index);
            self.persist().await?;

            let targets = ability_chain::shoot_targets(&self.state, shooter);
            let close = self
                .open_window(
                    WindowKind::Shoot,
                    vec![shooter.clone()],
                    targets,
                    self.config.shoot_ticks,
                )
                .await?;
            if close == WindowClose::Expired {
                self.emit(GameEvent::PlayerShot {
                    shooter: shooter.clone(),
                    target: None,
                });
            }
            if self.check_win().await? {
                break;
            }
        }

        self.state.clear_shooters();
        self.persist().await?;
        Ok(())
    }

    /// Speaking turns in order. Returns false when the day is cut short by
    /// a duel or by the end of the game.
    async fn run_discussion(&mut self) -> Result<bool, GameError> {
        let order = day::speaking_order(&self.state);
        self.state.speaking = SpeakingOrder {
            order: order.clone(),
            current: None,
        };

        for (index, speaker) in order.iter().enumerate() {
            if !self.state.is_alive(speaker) {
                continue;
            }
            self.state.speaking.current = Some(index);
            self.persist().await?;

            self.open_window(
                WindowKind::Speech {
                    speaker: speaker.clone(),
                },
                vec![speaker.clone()],
                Vec::new(),
                self.config.speech_ticks,
            )
            .await?;
            if let Some(player) = self.state.player_mut(speaker) {
                player.has_spoken = true;
            }

            if let Some(outcome) = self.pending_duel.take() {
                self.run_ability_chain(std::slice::from_ref(&outcome.death))
                    .await?;
                if self.state.is_ended() || outcome.unmasked_werewolf {
                    return Ok(false);
                }
            }
        }

        self.state.speaking.current = None;
        self.persist().await?;
        Ok(true)
    }

    async fn run_vote(
        &mut self,
        kind: WindowKind,
        candidates: Vec<PlayerId>,
        ticks: u32,
    ) -> Result<VoteTally, GameError> {
        self.state.day_votes.clear();
        self.persist().await?;

        let voters = vote::eligible_voters(&self.state);
        if !voters.is_empty() {
            let targets: Vec<TargetOption> = self
                .state
                .target_options(|p| candidates.contains(&p.id));
            self.open_window(kind, voters, targets, ticks).await?;
        }

        let tally = vote::resolve(&self.state.day_votes, &candidates);
        info!(
            game_id = %self.state.game_id,
            round = self.state.round,
            outcome = ?tally.outcome,
            "votes tallied"
        );
        self.emit(GameEvent::VoteTallied {
            counts: tally.counts.clone(),
            abstentions: tally.abstentions,
            tie: match &tally.outcome {
                VoteOutcome::Tie(tied) => tied.clone(),
                _ => Vec::new(),
            },
        });
        Ok(tally)
    }

    /// Runoff between tied players. A second tie means nobody leaves today.
    async fn run_pk(&mut self, tied: Vec<PlayerId>) -> Result<(), GameError> {
        self.state.pk_round = Some(1);
        self.state.pk_players = tied.clone();
        self.state.pk_speaking = SpeakingOrder {
            order: tied.clone(),
            current: None,
        };
        self.persist().await?;
        self.emit(GameEvent::PkStarted {
            players: tied.clone(),
        });

        for (index, speaker) in tied.iter().enumerate() {
            self.state.pk_speaking.current = Some(index);
            self.persist().await?;
            self.open_window(
                WindowKind::PkSpeech {
                    speaker: speaker.clone(),
                },
                vec![speaker.clone()],
                Vec::new(),
                self.config.pk_speech_ticks,
            )
            .await?;
        }

        let tally = self
            .run_vote(WindowKind::PkVote, tied, self.config.pk_vote_ticks)
            .await?;
        self.state.clear_pk();
        self.persist().await?;

        match tally.outcome {
            VoteOutcome::Exile(target) => self.resolve_exile(target).await,
            VoteOutcome::NoVotes | VoteOutcome::Tie(_) => {
                self.emit(GameEvent::ExileResolved { target: None });
                Ok(())
            }
        }
    }

    async fn resolve_exile(&mut self, target: PlayerId) -> Result<(), GameError> {
        match day::apply_exile(&mut self.state, &target) {
            ExileResolution::Revealed(player) => {
                self.persist().await?;
                self.emit(GameEvent::IdiotRevealed {
                    player: player.clone(),
                });
                self.emit(GameEvent::ExileResolved {
                    target: Some(player),
                });
                Ok(())
            }
            ExileResolution::Exiled(player) => {
                self.persist().await?;
                info!(game_id = %self.state.game_id, player = %player, "player exiled");
                self.emit(GameEvent::ExileResolved {
                    target: Some(player.clone()),
                });
                if self.check_win().await? {
                    return Ok(());
                }

                let death = Death {
                    player_id: player.clone(),
                    reason: DeathReason::Exiled,
                };
                let deaths = std::slice::from_ref(&death);
                // the shot waits for the last words
                if !ability_chain::eligible_shooters(&self.state, deaths).is_empty() {
                    self.state.pending_exile_shoot = Some(player.clone());
                    self.persist().await?;
                }

                self.open_window(
                    WindowKind::LastWords {
                        player: player.clone(),
                    },
                    vec![player],
                    Vec::new(),
                    self.config.last_words_ticks,
                )
                .await?;

                self.run_ability_chain(deaths).await
            }
        }
    }

    /// Opens a window, publishes it, and serves submissions until it
    /// completes or its timer runs out.
    async fn open_window(
        &mut self,
        kind: WindowKind,
        actors: Vec<PlayerId>,
        targets: Vec<TargetOption>,
        ticks: u32,
    ) -> Result<WindowClose, GameError> {
        let info = WindowInfo {
            id: self.next_window_id,
            round: self.state.round,
            kind,
            actors,
            targets,
            deadline_ticks: ticks,
        };
        self.next_window_id += 1;
        debug!(
            game_id = %self.state.game_id,
            window = info.id,
            kind = ?info.kind,
            "window opened"
        );
        self.window.send_replace(Some(info.clone()));
        self.emit(GameEvent::ActionWindowOpened {
            window: info.public_view(),
        });
        if info.kind.is_concealed() {
            for actor in &info.actors {
                self.emit(GameEvent::ActionPrompt {
                    player: actor.clone(),
                    window: info.clone(),
                });
            }
        }

        let (expired_tx, mut expired) = oneshot::channel::<()>();
        let on_tick = self.reminder(&info);
        self.timer.start(ticks, self.config.tick(), on_tick, move || {
            let _ = expired_tx.send(());
        });
        if self.paused {
            self.timer.pause();
        }

        let close = loop {
            tokio::select! {
                biased;
                _ = &mut expired => break WindowClose::Expired,
                command = self.commands.recv() => match command {
                    None => return Err(GameError::Aborted("all game handles dropped".into())),
                    Some(GameCommand::Abort { reason }) => return Err(GameError::Aborted(reason)),
                    Some(GameCommand::Pause) => self.set_paused(true),
                    Some(GameCommand::Resume) => self.set_paused(false),
                    Some(GameCommand::Submit { request, reply }) => {
                        match self.handle_submission(&info, &request) {
                            Ok(handled) => {
                                if let Err(e) = self.persist().await {
                                    let _ = reply.send(Err(e.clone()));
                                    return Err(e);
                                }
                                for event in handled.events {
                                    self.emit(event);
                                }
                                let _ = reply.send(Ok(ActionAck {
                                    window_id: info.id,
                                    message: handled.message,
                                }));
                                if handled.completes {
                                    break WindowClose::Completed;
                                }
                            }
                            Err(rejection) => {
                                debug!(
                                    actor = %request.actor_id,
                                    %rejection,
                                    "submission rejected"
                                );
                                let _ = reply.send(Err(rejection.into()));
                            }
                        }
                    }
                },
            }
        };

        self.timer.cancel();
        self.window.send_replace(None);

        // whatever queued up while the window was closing is late
        while let Ok(command) = self.commands.try_recv() {
            match command {
                GameCommand::Submit { reply, .. } => {
                    let _ = reply.send(Err(ActionRejection::StaleWindow.into()));
                }
                GameCommand::Abort { reason } => return Err(GameError::Aborted(reason)),
                GameCommand::Pause => self.paused = true,
                GameCommand::Resume => self.paused = false,
            }
        }
        Ok(close)
    }

    fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
        if paused {
            self.timer.pause();
        } else {
            self.timer.resume();
        }
        info!(game_id = %self.state.game_id, paused, "countdown toggled");
    }

    fn reminder(&self, info: &WindowInfo) -> impl FnMut(u32) + Send + 'static {
        let events = self.events.clone();
        let interval = self.config.reminder_interval;
        let speaker = match &info.kind {
            WindowKind::Speech { speaker }
            | WindowKind::PkSpeech { speaker }
            | WindowKind::LastWords { player: speaker } => Some(speaker.clone()),
            _ => None,
        };

        move |remaining| {
            let Some(player) = &speaker else {
                return;
            };
            if interval > 0 && remaining % interval == 0 {
                let _ = events.send(GameEvent::SpeakingReminder {
                    player: player.clone(),
                    remaining_ticks: remaining,
                });
            }
        }
    }

    fn handle_submission(
        &mut self,
        info: &WindowInfo,
        request: &ActionRequest,
    ) -> Result<Handled, ActionRejection> {
        if self.state.is_ended() {
            return Err(ActionRejection::StaleWindow);
        }
        if request.window_id.is_some_and(|id| id != info.id) {
            return Err(ActionRejection::StaleWindow);
        }
        let actor = request.actor_id.as_str();

        match (&info.kind, &request.action) {
            (WindowKind::Night { action }, submitted) => {
                let sub = night::submit(&mut self.state, *action, actor, submitted)?;
                Ok(Handled {
                    message: sub.message,
                    events: sub.event.into_iter().collect(),
                    completes: false,
                })
            }
            (WindowKind::Shoot, PlayerAction::Shoot { target }) => {
                if !info.allows_actor(actor) {
                    return Err(ActionRejection::actor("not your shot"));
                }
                let shot = ability_chain::shoot(&mut self.state, actor, target.as_deref())?;
                let target = shot.map(|d| d.player_id);
                Ok(Handled {
                    message: match &target {
                        Some(t) => format!("shot {}", t),
                        None => "held fire".to_string(),
                    },
                    events: vec![GameEvent::PlayerShot {
                        shooter: actor.to_string(),
                        target,
                    }],
                    completes: true,
                })
            }
            (WindowKind::Speech { .. }, PlayerAction::Duel { target }) => {
                let outcome = day::duel(&mut self.state, actor, target)?;
                let event = GameEvent::DuelResolved {
                    knight: outcome.knight.clone(),
                    target: outcome.target.clone(),
                    loser: outcome.death.player_id.clone(),
                };
                let message = format!("{} lost the duel", outcome.death.player_id);
                self.pending_duel = Some(outcome);
                Ok(Handled {
                    message,
                    events: vec![event],
                    completes: true,
                })
            }
            (
                WindowKind::Speech { speaker }
                | WindowKind::PkSpeech { speaker }
                | WindowKind::LastWords { player: speaker },
                PlayerAction::EndSpeech,
            ) => {
                if !info.allows_actor(actor) {
                    return Err(ActionRejection::actor(format!("it is {}'s turn", speaker)));
                }
                Ok(Handled {
                    message: "turn ended".to_string(),
                    events: Vec::new(),
                    completes: true,
                })
            }
            (WindowKind::Vote | WindowKind::PkVote, PlayerAction::Vote { choice }) => {
                let candidates: Vec<PlayerId> =
                    info.targets.iter().map(|t| t.player_id.clone()).collect();
                vote::cast(&mut self.state, actor, choice.clone(), &candidates)?;
                Ok(Handled {
                    message: "vote recorded".to_string(),
                    events: Vec::new(),
                    completes: vote::all_voted(&self.state),
                })
            }
            _ => Err(ActionRejection::StaleWindow),
        }
    }
}
