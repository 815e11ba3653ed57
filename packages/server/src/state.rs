use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;

use crate::models::{config::GameConfig, room::Room};
use crate::services::{
    game_service::GameManager,
    store::{GameStore, InMemoryGameStore},
};

#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<Mutex<HashMap<String, Room>>>,
    pub games: GameManager,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_config(GameConfig::default())
    }

    pub fn with_config(config: GameConfig) -> Self {
        Self::with_store(config, Arc::new(InMemoryGameStore::new()))
    }

    pub fn with_store(config: GameConfig, store: Arc<dyn GameStore>) -> Self {
        AppState {
            rooms: Arc::new(Mutex::new(HashMap::new())),
            games: GameManager::new(store, Arc::new(config)),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
