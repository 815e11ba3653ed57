use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;

use crate::errors::StoreError;
use crate::models::game::GameState;

/// Persistent home of each game's state blob, keyed by game id.
#[async_trait]
pub trait GameStore: Send + Sync {
    async fn load(&self, game_id: &str) -> Result<Option<GameState>, StoreError>;
    async fn save(&self, game_id: &str, state: &GameState) -> Result<(), StoreError>;
    async fn delete(&self, game_id: &str) -> Result<(), StoreError>;
}

/// Keeps serialized JSON so that what comes back is exactly what a real
/// store would hand back.
#[derive(Clone, Default)]
pub struct InMemoryGameStore {
    blobs: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryGameStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.blobs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl GameStore for InMemoryGameStore {
    async fn load(&self, game_id: &str) -> Result<Option<GameState>, StoreError> {
        let blobs = self.blobs.lock().await;
        match blobs.get(game_id) {
            Some(blob) => Ok(Some(serde_json::from_str(blob)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, game_id: &str, state: &GameState) -> Result<(), StoreError> {
        let blob = serde_json::to_string(state)?;
        self.blobs.lock().await.insert(game_id.to_string(), blob);
        Ok(())
    }

    async fn delete(&self, game_id: &str) -> Result<(), StoreError> {
        self.blobs.lock().await.remove(game_id);
        Ok(())
    }
}
