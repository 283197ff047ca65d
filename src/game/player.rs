//! Player module
//!
//! Manages player records and their state including:
//! - Position, speed and look direction reported by the client
//! - Health, hunger, oxygen and the survival timers
//! - The player's inventory
//! - The link to the player's active object and network peer

use std::sync::atomic::{AtomicI16, AtomicU16, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::info;

use crate::error::{ObjectError, Result};
use crate::game::inventory::Inventory;
use crate::game::math::V3f;
use crate::object::{ObjectId, PeerId};

/// Maximum (and initial) hit points
pub const PLAYER_MAX_HP: i16 = 20;

/// Maximum (and initial) hunger points
pub const PLAYER_MAX_HUNGER: i16 = 20;

/// Maximum (and initial) oxygen points
pub const PLAYER_MAX_OXYGEN: i16 = 11;

/// Default maximum number of connected players
pub const DEFAULT_MAX_PLAYERS: usize = 256;

/// Accumulators driving hunger and oxygen
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SurvivalTimers {
    /// Work done since the last hunger point was lost
    pub exhaustion: f32,
    /// Time since the last hunger point was lost
    pub hunger_timer: f32,
    /// Time since starvation damage or satiety healing was last applied
    pub hunger_hurt_heal_timer: f32,
    /// Time since the last oxygen point changed
    pub oxygen_timer: f32,
    /// Time since drowning damage was last applied
    pub oxygen_hurt_timer: f32,
}

/// A player record
pub struct Player {
    /// Player name
    pub name: String,
    /// Network peer, 0 while disconnected
    peer_id: AtomicU16,
    /// Active object id, 0 while the player has no object
    sao_id: AtomicU16,
    /// Position in world units
    pub position: RwLock<V3f>,
    pub speed: RwLock<V3f>,
    pub pitch: RwLock<f32>,
    pub yaw: RwLock<f32>,
    pub hp: AtomicI16,
    pub hunger: AtomicI16,
    pub oxygen: AtomicI16,
    pub timers: RwLock<SurvivalTimers>,
    pub inventory: RwLock<Inventory>,
}

impl Player {
    /// Create a new player at the origin
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            peer_id: AtomicU16::new(0),
            sao_id: AtomicU16::new(0),
            position: RwLock::new(V3f::ZERO),
            speed: RwLock::new(V3f::ZERO),
            pitch: RwLock::new(0.0),
            yaw: RwLock::new(0.0),
            hp: AtomicI16::new(PLAYER_MAX_HP),
            hunger: AtomicI16::new(PLAYER_MAX_HUNGER),
            oxygen: AtomicI16::new(PLAYER_MAX_OXYGEN),
            timers: RwLock::new(SurvivalTimers::default()),
            inventory: RwLock::new(Inventory::player()),
        }
    }

    /// Set the starting position
    pub fn with_position(self, pos: V3f) -> Self {
        *self.position.write() = pos;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn peer_id(&self) -> PeerId {
        self.peer_id.load(Ordering::SeqCst)
    }

    pub fn set_peer_id(&self, peer_id: PeerId) {
        self.peer_id.store(peer_id, Ordering::SeqCst);
    }

    /// Id of the player's active object, if it has one
    pub fn sao_id(&self) -> Option<ObjectId> {
        match self.sao_id.load(Ordering::SeqCst) {
            0 => None,
            id => Some(id),
        }
    }

    pub fn set_sao_id(&self, id: Option<ObjectId>) {
        self.sao_id.store(id.unwrap_or(0), Ordering::SeqCst);
    }

    /// Clear the object link only if it still points at `id`
    pub fn unlink_sao(&self, id: ObjectId) -> bool {
        self.sao_id
            .compare_exchange(id, 0, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn position(&self) -> V3f {
        *self.position.read()
    }

    pub fn set_position(&self, pos: V3f) {
        *self.position.write() = pos;
    }

    pub fn speed(&self) -> V3f {
        *self.speed.read()
    }

    pub fn set_speed(&self, speed: V3f) {
        *self.speed.write() = speed;
    }

    pub fn pitch(&self) -> f32 {
        *self.pitch.read()
    }

    pub fn set_pitch(&self, pitch: f32) {
        *self.pitch.write() = pitch;
    }

    pub fn yaw(&self) -> f32 {
        *self.yaw.read()
    }

    pub fn set_yaw(&self, yaw: f32) {
        *self.yaw.write() = yaw;
    }

    pub fn hp(&self) -> i16 {
        self.hp.load(Ordering::SeqCst)
    }

    pub fn set_hp(&self, hp: i16) {
        self.hp.store(hp, Ordering::SeqCst);
    }

    pub fn hunger(&self) -> i16 {
        self.hunger.load(Ordering::SeqCst)
    }

    pub fn set_hunger(&self, hunger: i16) {
        self.hunger.store(hunger, Ordering::SeqCst);
    }

    pub fn oxygen(&self) -> i16 {
        self.oxygen.load(Ordering::SeqCst)
    }

    pub fn set_oxygen(&self, oxygen: i16) {
        self.oxygen.store(oxygen, Ordering::SeqCst);
    }

    pub fn timers(&self) -> SurvivalTimers {
        *self.timers.read()
    }

    /// Modify the survival timers in place
    pub fn update_timers<F>(&self, f: F)
    where
        F: FnOnce(&mut SurvivalTimers),
    {
        f(&mut self.timers.write());
    }

    pub fn is_connected(&self) -> bool {
        self.peer_id() != 0
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("name", &self.name)
            .field("peer_id", &self.peer_id())
            .field("sao_id", &self.sao_id())
            .field("position", &self.position())
            .field("hp", &self.hp())
            .finish()
    }
}

/// Player manager - indexes connected players by name and peer id
pub struct PlayerManager {
    /// Map of player name to player
    players: DashMap<String, Arc<Player>>,
    /// Map of peer id to player name
    peer_to_name: DashMap<PeerId, String>,
    /// Maximum player count
    max_players: usize,
}

impl PlayerManager {
    /// Create a new player manager
    pub fn new(max_players: usize) -> Self {
        Self {
            players: DashMap::new(),
            peer_to_name: DashMap::new(),
            max_players,
        }
    }

    /// Register a player for a peer
    pub fn register(&self, player: Player, peer_id: PeerId) -> Result<Arc<Player>> {
        if peer_id == 0 {
            return Err(ObjectError::InvalidPeer.into());
        }
        if self.players.contains_key(&player.name) {
            return Err(ObjectError::PlayerAlreadyConnected(player.name).into());
        }
        if self.peer_to_name.contains_key(&peer_id) {
            return Err(ObjectError::PeerInUse(peer_id).into());
        }
        if self.is_full() {
            return Err(crate::error::VoxelError::Internal(format!(
                "player limit of {} reached",
                self.max_players
            )));
        }

        player.set_peer_id(peer_id);
        let player = Arc::new(player);
        self.players.insert(player.name.clone(), player.clone());
        self.peer_to_name.insert(peer_id, player.name.clone());

        info!(name = %player.name, peer_id = peer_id, "Player registered");

        Ok(player)
    }

    /// Unregister a player by name
    pub fn unregister(&self, name: &str) -> Option<Arc<Player>> {
        let (_, player) = self.players.remove(name)?;
        self.peer_to_name.remove(&player.peer_id());
        info!(name = %player.name, "Player unregistered");
        Some(player)
    }

    /// Get a player by name
    pub fn get_by_name(&self, name: &str) -> Option<Arc<Player>> {
        self.players.get(name).map(|r| r.clone())
    }

    /// Get a player by peer id
    pub fn get_by_peer(&self, peer_id: PeerId) -> Option<Arc<Player>> {
        self.peer_to_name
            .get(&peer_id)
            .and_then(|name| self.get_by_name(&name))
    }

    /// Get the player count
    pub fn count(&self) -> usize {
        self.players.len()
    }

    pub fn is_full(&self) -> bool {
        self.count() >= self.max_players
    }

    /// Names of all players, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.players.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Iterate over all players
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&Player),
    {
        for entry in self.players.iter() {
            f(&entry);
        }
    }
}

impl Default for PlayerManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PLAYERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_creation() {
        let player = Player::new("celeron55").with_position(V3f::new(0.0, 10.0, 0.0));
        assert_eq!(player.name(), "celeron55");
        assert_eq!(player.hp(), PLAYER_MAX_HP);
        assert_eq!(player.hunger(), PLAYER_MAX_HUNGER);
        assert_eq!(player.oxygen(), PLAYER_MAX_OXYGEN);
        assert_eq!(player.position(), V3f::new(0.0, 10.0, 0.0));
        assert!(!player.is_connected());
        assert!(player.inventory.read().list("main").is_some());
    }

    #[test]
    fn test_sao_link() {
        let player = Player::new("test");
        assert_eq!(player.sao_id(), None);

        player.set_sao_id(Some(5));
        assert!(!player.unlink_sao(6));
        assert_eq!(player.sao_id(), Some(5));
        assert!(player.unlink_sao(5));
        assert_eq!(player.sao_id(), None);
    }

    #[test]
    fn test_update_timers() {
        let player = Player::new("test");
        player.update_timers(|t| {
            t.exhaustion += 1.5;
            t.oxygen_timer = 0.25;
        });
        let timers = player.timers();
        assert_eq!(timers.exhaustion, 1.5);
        assert_eq!(timers.oxygen_timer, 0.25);
        assert_eq!(timers.hunger_timer, 0.0);
    }

    #[test]
    fn test_player_manager() {
        let manager = PlayerManager::new(100);
        assert_eq!(manager.count(), 0);

        let player = manager.register(Player::new("alice"), 7).unwrap();
        assert_eq!(player.peer_id(), 7);
        assert_eq!(manager.count(), 1);
        assert_eq!(manager.get_by_peer(7).unwrap().name(), "alice");
        assert!(manager.get_by_name("bob").is_none());

        manager.unregister("alice");
        assert_eq!(manager.count(), 0);
        assert!(manager.get_by_peer(7).is_none());
    }

    #[test]
    fn test_player_manager_rejects() {
        let manager = PlayerManager::new(1);
        assert!(manager.register(Player::new("alice"), 0).is_err());

        manager.register(Player::new("alice"), 1).unwrap();
        assert!(manager.register(Player::new("alice"), 2).is_err());
        assert!(manager.register(Player::new("bob"), 3).is_err());
    }

    #[test]
    fn test_player_manager_rejects_reused_peer() {
        let manager = PlayerManager::new(4);
        manager.register(Player::new("alice"), 5).unwrap();

        let err = manager.register(Player::new("bob"), 5).unwrap_err();
        assert!(matches!(
            err,
            crate::error::VoxelError::Object(ObjectError::PeerInUse(5))
        ));
        assert_eq!(manager.count(), 1);
        assert_eq!(manager.get_by_peer(5).unwrap().name(), "alice");
    }
}
