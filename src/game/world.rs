//! World module
//!
//! Manages the server environment including:
//! - Active object ids, registration and removal
//! - The environment step (object steps, send pacing, message collection)
//! - Punch and right-click routing between objects
//! - Player join and leave
//! - Deactivation of objects into the static store and reactivation
//! - The async tick loop

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

use crate::config::{HungerConfig, OxygenConfig, ServerConfig};
use crate::error::{ObjectError, Result};
use crate::game::item::ItemDefManager;
use crate::game::map::NodeMap;
use crate::game::math::{V3f, BS};
use crate::game::player::{Player, PlayerManager};
use crate::game::tool::ToolCapabilities;
use crate::object::{
    create_item_sao, ActiveObjectMessage, ActiveObjectType, LuaEntitySao, ObjectContext, ObjectId,
    PeerId, PlayerSao, ServerActiveObject,
};
use crate::script::ScriptHost;

/// Default environment step rate in milliseconds
pub const TICK_RATE_MS: u64 = 100;

/// Default interval between object position updates in seconds
pub const DEFAULT_SEND_INTERVAL: f32 = 0.1;

/// Largest initial speed of a dropped item on each axis
const ITEM_DROP_SCATTER: f32 = BS;

/// Rules the objects consult while they run
#[derive(Debug, Clone)]
pub struct WorldSettings {
    pub server_name: String,
    pub tick_rate_ms: u64,
    /// Seconds between position updates
    pub send_interval: f32,
    pub creative_mode: bool,
    pub enable_damage: bool,
    pub enable_pvp: bool,
    pub enable_hunger: bool,
    pub disable_anticheat: bool,
    pub unlimited_player_transfer_distance: bool,
    /// Seconds before a dropped item disappears
    pub item_entity_ttl: f32,
    pub hunger: HungerConfig,
    pub oxygen: OxygenConfig,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            server_name: "Voxel Server".to_string(),
            tick_rate_ms: TICK_RATE_MS,
            send_interval: DEFAULT_SEND_INTERVAL,
            creative_mode: false,
            enable_damage: true,
            enable_pvp: true,
            enable_hunger: true,
            disable_anticheat: false,
            unlimited_player_transfer_distance: true,
            item_entity_ttl: 900.0,
            hunger: HungerConfig::default(),
            oxygen: OxygenConfig::default(),
        }
    }
}

impl From<&ServerConfig> for WorldSettings {
    fn from(config: &ServerConfig) -> Self {
        Self {
            server_name: config.server_name.clone(),
            tick_rate_ms: config.tick_rate_ms,
            send_interval: config.send_interval_secs,
            creative_mode: config.creative_mode,
            enable_damage: config.enable_damage,
            enable_pvp: config.enable_pvp,
            enable_hunger: config.enable_hunger,
            disable_anticheat: config.disable_anticheat,
            unlimited_player_transfer_distance: config.unlimited_player_transfer_distance,
            item_entity_ttl: config.item_entity_ttl_secs,
            hunger: config.hunger.clone(),
            oxygen: config.oxygen.clone(),
        }
    }
}

/// World state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldState {
    /// World is initializing
    Initializing,
    /// World is stepping normally
    Running,
    /// World is storing its objects before stopping
    ShuttingDown,
    /// World has stopped
    Stopped,
}

impl WorldState {
    /// Check if the world is accepting new players
    pub fn accepting_connections(&self) -> bool {
        matches!(self, WorldState::Running)
    }
}

/// An object stored outside the active set
#[derive(Debug, Clone, PartialEq)]
pub struct StaticObject {
    pub object_type: ActiveObjectType,
    pub position: V3f,
    pub data: Vec<u8>,
}

/// Deactivated objects waiting to be brought back
#[derive(Debug, Default)]
pub struct StaticObjectStore {
    objects: Vec<StaticObject>,
}

impl StaticObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, object: StaticObject) {
        self.objects.push(object);
    }

    pub fn take_all(&mut self) -> Vec<StaticObject> {
        std::mem::take(&mut self.objects)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StaticObject> {
        self.objects.iter()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

fn as_object(obj: Option<&mut Box<dyn ServerActiveObject>>) -> Option<&mut dyn ServerActiveObject> {
    match obj {
        Some(obj) => Some(obj.as_mut()),
        None => None,
    }
}

/// Server environment - owns the active objects and steps them
pub struct ServerEnvironment {
    /// World settings
    settings: WorldSettings,
    /// Current world state
    state: WorldState,
    /// Active objects by id
    objects: BTreeMap<ObjectId, Box<dyn ServerActiveObject>>,
    /// Last id handed out
    last_id: ObjectId,
    scripts: Box<dyn ScriptHost>,
    map: Box<dyn NodeMap>,
    items: Arc<ItemDefManager>,
    /// Player manager
    pub players: PlayerManager,
    static_store: StaticObjectStore,
    /// Time since the last send round
    send_timer: f32,
    /// Messages collected from object steps
    messages: Vec<ActiveObjectMessage>,
    /// Current step number
    tick: u64,
}

impl ServerEnvironment {
    /// Create a new environment
    pub fn new(
        settings: WorldSettings,
        scripts: Box<dyn ScriptHost>,
        map: Box<dyn NodeMap>,
        items: Arc<ItemDefManager>,
        players: PlayerManager,
    ) -> Self {
        info!(
            name = %settings.server_name,
            tick_rate_ms = settings.tick_rate_ms,
            "Creating server environment"
        );

        Self {
            settings,
            state: WorldState::Initializing,
            objects: BTreeMap::new(),
            last_id: 0,
            scripts,
            map,
            items,
            players,
            static_store: StaticObjectStore::new(),
            send_timer: 0.0,
            messages: Vec::new(),
            tick: 0,
        }
    }

    pub fn settings(&self) -> &WorldSettings {
        &self.settings
    }

    pub fn items(&self) -> &ItemDefManager {
        &self.items
    }

    pub fn state(&self) -> WorldState {
        self.state
    }

    /// Set the world state
    pub fn set_state(&mut self, new_state: WorldState) {
        let old_state = self.state;
        self.state = new_state;
        info!(
            old_state = ?old_state,
            new_state = ?new_state,
            "World state changed"
        );
    }

    /// Get the current step number
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn object_ids(&self) -> Vec<ObjectId> {
        self.objects.keys().copied().collect()
    }

    pub fn get_object(&self, id: ObjectId) -> Option<&dyn ServerActiveObject> {
        self.objects.get(&id).map(|obj| obj.as_ref())
    }

    pub fn get_object_mut(&mut self, id: ObjectId) -> Option<&mut dyn ServerActiveObject> {
        as_object(self.objects.get_mut(&id))
    }

    pub fn static_store(&self) -> &StaticObjectStore {
        &self.static_store
    }

    /// Find a free id, continuing from the last one handed out
    fn free_id(&mut self) -> Result<ObjectId> {
        let mut id = self.last_id;
        for _ in 0..u16::MAX {
            id = id.wrapping_add(1);
            if id == 0 {
                id = 1;
            }
            if !self.objects.contains_key(&id) {
                self.last_id = id;
                return Ok(id);
            }
        }
        Err(ObjectError::IdsExhausted.into())
    }

    /// Add an object; objects with id 0 get a fresh id
    pub fn add_object(&mut self, mut obj: Box<dyn ServerActiveObject>) -> Result<ObjectId> {
        let id = match obj.id() {
            0 => self.free_id()?,
            id if self.objects.contains_key(&id) => {
                return Err(ObjectError::IdInUse(id).into());
            }
            id => id,
        };
        obj.base_mut().set_id(id);

        let mut ctx = ObjectContext::new(&mut *self.scripts, &*self.map, &self.items, &self.settings);
        obj.added_to_environment(&mut ctx);

        debug!(id = id, object = %obj.description(), "Object added to environment");
        self.objects.insert(id, obj);
        Ok(id)
    }

    /// Take an object out of the environment
    pub fn remove_object(&mut self, id: ObjectId) -> Option<Box<dyn ServerActiveObject>> {
        let mut obj = self.objects.remove(&id)?;
        let mut ctx = ObjectContext::new(&mut *self.scripts, &*self.map, &self.items, &self.settings);
        obj.removing_from_environment(&mut ctx);
        debug!(id = id, object = %obj.description(), "Object removed from environment");
        Some(obj)
    }

    /// Step every object and drop the removed ones no client knows anymore
    pub fn step(&mut self, dtime: f32) {
        self.tick += 1;

        self.send_timer += dtime;
        let send_recommended = self.send_timer >= self.settings.send_interval;
        if send_recommended {
            self.send_timer = 0.0;
        }

        let mut ctx = ObjectContext::new(&mut *self.scripts, &*self.map, &self.items, &self.settings);
        for obj in self.objects.values_mut() {
            if !obj.is_removed() {
                obj.step(dtime, send_recommended, &mut ctx);
            }
            let messages = obj.take_messages();
            if !messages.is_empty() {
                trace!(id = obj.id(), count = messages.len(), "Collected object messages");
                self.messages.extend(messages);
            }
        }

        let removed: Vec<ObjectId> = self
            .objects
            .iter()
            .filter(|(_, obj)| obj.is_removed() && obj.base().known_by_count() == 0)
            .map(|(id, _)| *id)
            .collect();
        for id in removed {
            self.remove_object(id);
        }
    }

    /// Messages collected since the last call
    pub fn take_messages(&mut self) -> Vec<ActiveObjectMessage> {
        std::mem::take(&mut self.messages)
    }

    /// Type and initialization data a client needs to show an object
    pub fn object_init_data(&self, id: ObjectId) -> Result<(ActiveObjectType, Vec<u8>)> {
        let obj = self.objects.get(&id).ok_or(ObjectError::NotFound(id))?;
        Ok((obj.send_type(), obj.client_initialization_data()?))
    }

    /// Punch `target` with a tool, optionally on behalf of `puncher`
    ///
    /// Returns the wear to add to the punching tool.
    pub fn punch_object(
        &mut self,
        target: ObjectId,
        puncher: Option<ObjectId>,
        dir: V3f,
        toolcap: Option<&ToolCapabilities>,
        time_from_last_punch: f32,
    ) -> Result<u16> {
        let mut obj = self.objects.remove(&target).ok_or(ObjectError::NotFound(target))?;

        let puncher = as_object(puncher.and_then(|id| self.objects.get_mut(&id)));
        let mut ctx = ObjectContext::new(&mut *self.scripts, &*self.map, &self.items, &self.settings);
        let wear = obj.punch(dir, toolcap, puncher, time_from_last_punch, &mut ctx);

        self.objects.insert(target, obj);
        Ok(wear)
    }

    /// Right-click `target`, optionally on behalf of `clicker`
    pub fn right_click_object(&mut self, target: ObjectId, clicker: Option<ObjectId>) -> Result<()> {
        let mut obj = self.objects.remove(&target).ok_or(ObjectError::NotFound(target))?;

        let clicker = as_object(clicker.and_then(|id| self.objects.get_mut(&id)));
        let mut ctx = ObjectContext::new(&mut *self.scripts, &*self.map, &self.items, &self.settings);
        obj.right_click(clicker, &mut ctx);

        self.objects.insert(target, obj);
        Ok(())
    }

    /// Object id of a connected player's avatar
    pub fn player_object_id(&self, peer_id: PeerId) -> Result<ObjectId> {
        self.players
            .get_by_peer(peer_id)
            .and_then(|player| player.sao_id())
            .ok_or_else(|| ObjectError::PeerNotFound(peer_id).into())
    }

    /// A connected player's avatar
    pub fn player_sao_mut(&mut self, peer_id: PeerId) -> Result<&mut PlayerSao> {
        let id = self.player_object_id(peer_id)?;
        self.objects
            .get_mut(&id)
            .and_then(|obj| obj.as_mut().downcast_mut::<PlayerSao>())
            .ok_or_else(|| ObjectError::NotAPlayer(id).into())
    }

    /// A player punches an object with their wielded item
    ///
    /// Wear is applied to the wielded tool outside creative mode.
    pub fn player_punch(&mut self, peer_id: PeerId, target: ObjectId, dir: V3f) -> Result<u16> {
        let puncher_id = self.player_object_id(peer_id)?;
        let items = Arc::clone(&self.items);

        let (toolcap, time_from_last_punch) = {
            let sao = self.player_sao_mut(peer_id)?;
            let wielded = sao.wielded_item();
            (
                items.tool_capabilities(&wielded).clone(),
                sao.reset_time_from_last_punch(),
            )
        };

        let wear = self.punch_object(
            target,
            Some(puncher_id),
            dir,
            Some(&toolcap),
            time_from_last_punch,
        )?;

        if wear > 0 && !self.settings.creative_mode {
            let sao = self.player_sao_mut(peer_id)?;
            let index = sao.wield_index();
            let worn = {
                let mut inv = sao.player().inventory.write();
                let list = inv.require_list_mut(sao.wield_list())?;
                match list.get(index).cloned() {
                    Some(mut tool) if !tool.is_empty() => {
                        if !tool.add_wear(wear) {
                            debug!(peer_id = peer_id, "Wielded tool broke");
                        }
                        list.set(index, tool)?;
                        true
                    }
                    _ => false,
                }
            };
            if worn {
                sao.set_inventory_modified();
            }
        }

        Ok(wear)
    }

    /// Register a player and create their avatar
    pub fn add_player(
        &mut self,
        player: Player,
        peer_id: PeerId,
        privs: HashSet<String>,
        is_singleplayer: bool,
    ) -> Result<ObjectId> {
        if matches!(self.state, WorldState::ShuttingDown | WorldState::Stopped) {
            return Err(crate::error::VoxelError::Internal(
                "world is not accepting players".to_string(),
            ));
        }

        let player = self.players.register(player, peer_id)?;
        let mut sao = match PlayerSao::new(Arc::clone(&player), peer_id, privs, is_singleplayer) {
            Ok(sao) => sao,
            Err(e) => {
                self.players.unregister(player.name());
                return Err(e);
            }
        };
        if self.settings.creative_mode {
            sao.create_creative_inventory(&self.items);
        }

        match self.add_object(Box::new(sao)) {
            Ok(id) => {
                info!(name = %player.name(), peer_id = peer_id, id = id, "Player joined");
                Ok(id)
            }
            Err(e) => {
                self.players.unregister(player.name());
                Err(e)
            }
        }
    }

    /// The peer went away; its avatar is removed with the next step
    pub fn remove_player(&mut self, peer_id: PeerId) -> Result<()> {
        let player = self
            .players
            .get_by_peer(peer_id)
            .ok_or(ObjectError::PeerNotFound(peer_id))?;
        self.players.unregister(player.name());

        if let Some(id) = player.sao_id() {
            if let Some(sao) = self
                .objects
                .get_mut(&id)
                .and_then(|obj| obj.as_mut().downcast_mut::<PlayerSao>())
            {
                sao.disconnected();
            }
        }

        info!(name = %player.name(), peer_id = peer_id, "Player left");
        Ok(())
    }

    /// Apply a client's reported position and look direction
    pub fn handle_player_move(
        &mut self,
        peer_id: PeerId,
        position: V3f,
        speed: V3f,
        pitch: f32,
        yaw: f32,
    ) -> Result<()> {
        let sao = self.player_sao_mut(peer_id)?;
        if sao.hp() == 0 {
            // Dead players don't move
            return Ok(());
        }

        let player = Arc::clone(sao.player());
        player.set_position(position);
        player.set_speed(speed);
        player.set_pitch(pitch);
        player.set_yaw(yaw);
        sao.set_base_position(position);

        trace!(peer_id = peer_id, x = position.x, y = position.y, z = position.z, "Player moved");
        Ok(())
    }

    /// Drop an item into the world
    pub fn spawn_item(&mut self, pos: V3f, itemstring: &str) -> Result<ObjectId> {
        self.add_object(Box::new(create_item_sao(pos, itemstring)))
    }

    /// Drop an item with a small random push
    pub fn drop_item(&mut self, pos: V3f, itemstring: &str) -> Result<ObjectId> {
        let mut rng = rand::thread_rng();
        let mut sao = create_item_sao(pos, itemstring);
        sao.set_velocity(V3f::new(
            rng.gen_range(-ITEM_DROP_SCATTER..=ITEM_DROP_SCATTER),
            ITEM_DROP_SCATTER,
            rng.gen_range(-ITEM_DROP_SCATTER..=ITEM_DROP_SCATTER),
        ));
        self.add_object(Box::new(sao))
    }

    /// Move an object into the static store
    ///
    /// Returns false when the object cannot be stored and stays active.
    pub fn deactivate_object(&mut self, id: ObjectId) -> Result<bool> {
        let obj = self.objects.get(&id).ok_or(ObjectError::NotFound(id))?;
        if !obj.is_static_allowed() || obj.is_removed() {
            return Ok(false);
        }

        let ctx = ObjectContext::new(&mut *self.scripts, &*self.map, &self.items, &self.settings);
        let data = obj.static_data(&ctx)?;
        let stored = StaticObject {
            object_type: obj.object_type(),
            position: obj.base_position(),
            data,
        };

        self.remove_object(id);
        self.static_store.push(stored);
        Ok(true)
    }

    /// Store every object that allows it
    pub fn deactivate_all(&mut self) -> usize {
        let mut count = 0;
        for id in self.object_ids() {
            match self.deactivate_object(id) {
                Ok(true) => count += 1,
                Ok(false) => {}
                Err(e) => warn!(id = id, error = %e, "Failed to deactivate object"),
            }
        }
        debug!(count = count, "Objects deactivated");
        count
    }

    /// Bring every stored object back
    pub fn activate_static_objects(&mut self) -> usize {
        let mut count = 0;
        for stored in self.static_store.take_all() {
            let obj: Box<dyn ServerActiveObject> = match stored.object_type {
                ActiveObjectType::LuaEntity => {
                    match LuaEntitySao::create(stored.position, &stored.data) {
                        Ok(entity) => Box::new(entity),
                        Err(e) => {
                            warn!(error = %e, "Invalid static entity data");
                            continue;
                        }
                    }
                }
                other => {
                    warn!(object_type = ?other, "Cannot activate stored object");
                    continue;
                }
            };
            match self.add_object(obj) {
                Ok(_) => count += 1,
                Err(e) => warn!(error = %e, "Failed to activate stored object"),
            }
        }
        count
    }

    /// Run the environment tick loop, sending collected messages to `outgoing`
    pub async fn run(
        &mut self,
        shutdown_rx: &mut broadcast::Receiver<()>,
        outgoing: mpsc::Sender<Vec<ActiveObjectMessage>>,
    ) {
        info!(
            tick_rate_ms = self.settings.tick_rate_ms,
            objects = self.objects.len(),
            "Starting server environment"
        );
        self.set_state(WorldState::Running);

        let mut tick_interval = interval(Duration::from_millis(self.settings.tick_rate_ms));
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_step = Instant::now();

        loop {
            tokio::select! {
                _ = tick_interval.tick() => {
                    let now = Instant::now();
                    let dtime = now.duration_since(last_step).as_secs_f32();
                    last_step = now;

                    self.step(dtime);

                    if self.tick % 1000 == 0 {
                        debug!(tick = self.tick, objects = self.objects.len(), players = self.players.count(), "Environment tick milestone");
                    }

                    let messages = self.take_messages();
                    if !messages.is_empty() && outgoing.send(messages).await.is_err() {
                        error!("Outgoing message channel closed");
                        break;
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        self.set_state(WorldState::ShuttingDown);
        let stored = self.deactivate_all();
        self.set_state(WorldState::Stopped);

        info!(
            total_ticks = self.tick,
            stored_objects = stored,
            "Server environment stopped"
        );
    }
}

impl std::fmt::Debug for ServerEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerEnvironment")
            .field("settings", &self.settings)
            .field("state", &self.state)
            .field("tick", &self.tick)
            .field("objects", &self.objects.len())
            .field("players", &self.players.count())
            .field("static_objects", &self.static_store.len())
            .finish()
    }
}
