//! Room registry. Creates rooms on demand and forgets them when their task
//! finishes.

use std::collections::HashMap;
use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::sync::{broadcast, mpsc, Mutex};

use billiards_shared::room_id::random_room_id;

use crate::config::ServerConfig;
use crate::room::{run_room, RoomBroadcast, RoomCommand};

/// The two channel ends a connection needs to take part in a room.
#[derive(Clone)]
pub struct RoomHandle {
    pub cmd_tx: mpsc::Sender<RoomCommand>,
    pub broadcast_tx: broadcast::Sender<RoomBroadcast>,
}

struct LobbyState {
    rooms: HashMap<String, RoomHandle>,
    rng: ChaCha8Rng,
}

#[derive(Clone)]
pub struct Lobby {
    config: ServerConfig,
    state: Arc<Mutex<LobbyState>>,
}

impl Lobby {
    pub fn new(config: ServerConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            config,
            state: Arc::new(Mutex::new(LobbyState { rooms: HashMap::new(), rng })),
        }
    }

    /// Open a fresh room and return its id. The room task runs until its
    /// lease expires or its last player leaves, then unregisters itself.
    pub async fn create_room(&self) -> String {
        let mut state = self.state.lock().await;
        let id = loop {
            let id = random_room_id(&mut state.rng);
            if !state.rooms.contains_key(&id) {
                break id;
            }
        };

        let (cmd_tx, cmd_rx) = mpsc::channel(256);
        let (broadcast_tx, _) = broadcast::channel(256);
        state.rooms.insert(
            id.clone(),
            RoomHandle { cmd_tx, broadcast_tx: broadcast_tx.clone() },
        );
        drop(state);

        let lobby = self.clone();
        let room_id = id.clone();
        let config = self.config.clone();
        tokio::spawn(async move {
            run_room(room_id.clone(), cmd_rx, broadcast_tx, config).await;
            lobby.state.lock().await.rooms.remove(&room_id);
        });
        id
    }

    /// Look up a normalized room id.
    pub async fn room(&self, id: &str) -> Option<RoomHandle> {
        self.state.lock().await.rooms.get(id).cloned()
    }

    pub async fn room_count(&self) -> usize {
        self.state.lock().await.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billiards_shared::room_id::is_valid_room_id;
    use std::time::Duration;

    fn test_config() -> ServerConfig {
        ServerConfig { rng_seed: Some(5), ..Default::default() }
    }

    #[tokio::test]
    async fn created_rooms_get_distinct_valid_ids() {
        let lobby = Lobby::new(test_config());
        let a = lobby.create_room().await;
        let b = lobby.create_room().await;
        assert!(is_valid_room_id(&a));
        assert!(is_valid_room_id(&b));
        assert_ne!(a, b);
        assert_eq!(lobby.room_count().await, 2);
        assert!(lobby.room(&a).await.is_some());
        assert!(lobby.room("ZZZ-ZZZ-ZZZ").await.is_none());
    }

    #[tokio::test]
    async fn expired_room_unregisters_itself() {
        let config = ServerConfig {
            room_lease: Duration::from_millis(50),
            ..test_config()
        };
        let lobby = Lobby::new(config);
        let id = lobby.create_room().await;
        assert!(lobby.room(&id).await.is_some());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(lobby.room(&id).await.is_none());
    }
}
