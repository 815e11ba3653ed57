use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Timing and setup knobs. Durations are counted in ticks; one tick lasts
/// `tick_millis`.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub tick_millis: u64,
    pub night_action_ticks: u32,
    pub shoot_ticks: u32,
    pub speech_ticks: u32,
    pub pk_speech_ticks: u32,
    pub vote_ticks: u32,
    pub pk_vote_ticks: u32,
    pub last_words_ticks: u32,
    // 発言中のリマインダー間隔
    pub reminder_interval: u32,
    // ランダムな役職を割り当てるかどうか
    pub random_role: bool,
    pub min_players: usize,
    pub bind_addr: SocketAddr,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_millis: 1000,
            night_action_ticks: 25,
            shoot_ticks: 30,
            speech_ticks: 120,
            pk_speech_ticks: 5,
            vote_ticks: 25,
            pk_vote_ticks: 25,
            last_words_ticks: 180,
            reminder_interval: 60,
            random_role: false,
            min_players: 3,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl GameConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            tick_millis: env_parse("WEREWOLF_TICK_MILLIS", defaults.tick_millis),
            night_action_ticks: env_parse(
                "WEREWOLF_NIGHT_ACTION_TICKS",
                defaults.night_action_ticks,
            ),
            shoot_ticks: env_parse("WEREWOLF_SHOOT_TICKS", defaults.shoot_ticks),
            speech_ticks: env_parse("WEREWOLF_SPEECH_TICKS", defaults.speech_ticks),
            pk_speech_ticks: env_parse("WEREWOLF_PK_SPEECH_TICKS", defaults.pk_speech_ticks),
            vote_ticks: env_parse("WEREWOLF_VOTE_TICKS", defaults.vote_ticks),
            pk_vote_ticks: env_parse("WEREWOLF_PK_VOTE_TICKS", defaults.pk_vote_ticks),
            last_words_ticks: env_parse("WEREWOLF_LAST_WORDS_TICKS", defaults.last_words_ticks),
            reminder_interval: env_parse(
                "WEREWOLF_REMINDER_INTERVAL",
                defaults.reminder_interval,
            ),
            random_role: env::var("WEREWOLF_RANDOM_ROLE")
                .map(|v| v == "true")
                .unwrap_or(defaults.random_role),
            min_players: env_parse("WEREWOLF_MIN_PLAYERS", defaults.min_players),
            bind_addr: env_parse("WEREWOLF_BIND_ADDR", defaults.bind_addr),
        }
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_millis)
    }
}
