//! Player avatar
//!
//! The server-side object of a connected player. Position and look come from
//! the client and are checked against the player's maximum speed; health,
//! hunger and oxygen live on the shared `Player` record.

use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use crate::error::{ObjectError, Result};
use crate::game::inventory::{Inventory, InventoryLocation};
use crate::game::item::{ItemDefManager, ItemStack};
use crate::game::map::NodeMap;
use crate::game::math::{Aabb3f, V2f, V3f, BS};
use crate::game::player::{Player, SurvivalTimers, PLAYER_MAX_HP, PLAYER_MAX_HUNGER, PLAYER_MAX_OXYGEN};
use crate::game::survival;
use crate::game::tool::{hit_params, ItemGroupList, ToolCapabilities};
use crate::game::world::{WorldSettings, DEFAULT_SEND_INTERVAL};
use crate::net::buffer::PacketBuffer;
use crate::object::commands::{self, PositionUpdate};
use crate::object::flags::PendingFlags;
use crate::object::properties::ObjectProperties;
use crate::object::{ActiveObjectType, ObjectBase, ObjectContext, PeerId, ServerActiveObject};

/// Walking speed limit in world units per second
const PLAYER_MAX_SPEED: f32 = 4.0 * BS;

/// Speed limit with the `fast` privilege
const PLAYER_MAX_SPEED_FAST: f32 = 20.0 * BS;

/// Allowed excess over the speed limit
const SPEED_TOLERANCE: f32 = 2.5;

/// Height of the eyes above the feet for water checks
const HEAD_HEIGHT: f32 = 1.5 * BS;

/// Inventory list the wield index points into
pub const WIELD_LIST: &str = "main";

fn player_properties() -> ObjectProperties {
    ObjectProperties {
        hp_max: PLAYER_MAX_HP,
        physical: false,
        weight: 75.0,
        collisionbox: Aabb3f::new(
            V3f::new(-1.0 / 3.0, -1.0, -1.0 / 3.0),
            V3f::new(1.0 / 3.0, 1.0, 1.0 / 3.0),
        ),
        visual: "upright_sprite".to_string(),
        visual_size: V2f::new(1.0, 2.0),
        textures: vec!["player.png".to_string(), "player_back.png".to_string()],
        makes_footstep_sound: true,
        ..Default::default()
    }
}

/// Server-side avatar of a connected player
#[derive(Debug)]
pub struct PlayerSao {
    base: ObjectBase,
    player: Arc<Player>,
    peer_id: PeerId,
    last_good_position: V3f,
    last_good_position_age: f32,
    time_from_last_punch: f32,
    wield_index: usize,
    position_not_sent: bool,
    armor_groups: ItemGroupList,
    armor_groups_sent: bool,
    properties_sent: bool,
    prop: ObjectProperties,
    privs: HashSet<String>,
    is_singleplayer: bool,
    texture_mod: String,
    texture_mod_sent: bool,
    update_interval: f32,
    pending: PendingFlags,
}

impl PlayerSao {
    /// Create the avatar of a connected player
    pub fn new(
        player: Arc<Player>,
        peer_id: PeerId,
        privs: HashSet<String>,
        is_singleplayer: bool,
    ) -> Result<Self> {
        if peer_id == 0 {
            return Err(ObjectError::InvalidPeer.into());
        }

        let mut armor_groups = ItemGroupList::new();
        armor_groups.insert("fleshy".to_string(), 3);
        armor_groups.insert("choppy".to_string(), 2);

        let pos = player.position();
        Ok(Self {
            base: ObjectBase::new(pos),
            player,
            peer_id,
            last_good_position: pos,
            last_good_position_age: 0.0,
            time_from_last_punch: 0.0,
            wield_index: 0,
            position_not_sent: false,
            armor_groups,
            armor_groups_sent: false,
            properties_sent: true,
            prop: player_properties(),
            privs,
            is_singleplayer,
            texture_mod: String::new(),
            texture_mod_sent: true,
            update_interval: DEFAULT_SEND_INTERVAL,
            pending: PendingFlags::default(),
        })
    }

    pub fn player(&self) -> &Arc<Player> {
        &self.player
    }

    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    pub fn last_good_position(&self) -> V3f {
        self.last_good_position
    }

    /// Time since the last punch, restarting the count
    pub fn reset_time_from_last_punch(&mut self) -> f32 {
        std::mem::take(&mut self.time_from_last_punch)
    }

    pub fn update_privileges(&mut self, privs: HashSet<String>, is_singleplayer: bool) {
        self.privs = privs;
        self.is_singleplayer = is_singleplayer;
    }

    pub fn has_privilege(&self, priv_name: &str) -> bool {
        self.privs.contains(priv_name)
    }

    pub fn armor_groups(&self) -> &ItemGroupList {
        &self.armor_groups
    }

    /// Flags the server still has to act on
    pub fn pending(&self) -> PendingFlags {
        self.pending
    }

    /// Clear a pending flag, returning whether it was set
    pub fn take_pending(&mut self, flag: PendingFlags) -> bool {
        self.pending.take(flag)
    }

    pub fn texture_mod(&self) -> &str {
        &self.texture_mod
    }

    pub fn set_texture_mod(&mut self, modifier: &str) {
        self.texture_mod = modifier.to_string();
        self.texture_mod_sent = false;
    }

    pub fn hunger(&self) -> i16 {
        self.player.hunger()
    }

    pub fn set_hunger(&mut self, hunger: i16) {
        self.player.set_hunger(hunger.clamp(0, PLAYER_MAX_HUNGER));
        self.pending.insert(PendingFlags::HUNGER);
    }

    pub fn oxygen(&self) -> i16 {
        self.player.oxygen()
    }

    pub fn set_oxygen(&mut self, oxygen: i16) {
        self.player.set_oxygen(oxygen.clamp(0, PLAYER_MAX_OXYGEN));
        self.pending.insert(PendingFlags::OXYGEN);
    }

    pub fn exhaustion(&self) -> f32 {
        self.player.timers().exhaustion
    }

    pub fn set_exhaustion(&mut self, exhaustion: f32) {
        self.player.update_timers(|t| t.exhaustion = exhaustion.max(0.0));
    }

    pub fn hunger_timer(&self) -> f32 {
        self.player.timers().hunger_timer
    }

    pub fn set_hunger_timer(&mut self, value: f32) {
        self.player.update_timers(|t| t.hunger_timer = value);
    }

    pub fn hunger_hurt_heal_timer(&self) -> f32 {
        self.player.timers().hunger_hurt_heal_timer
    }

    pub fn set_hunger_hurt_heal_timer(&mut self, value: f32) {
        self.player.update_timers(|t| t.hunger_hurt_heal_timer = value);
    }

    pub fn oxygen_timer(&self) -> f32 {
        self.player.timers().oxygen_timer
    }

    pub fn set_oxygen_timer(&mut self, value: f32) {
        self.player.update_timers(|t| t.oxygen_timer = value);
    }

    pub fn oxygen_hurt_timer(&self) -> f32 {
        self.player.timers().oxygen_hurt_timer
    }

    pub fn set_oxygen_hurt_timer(&mut self, value: f32) {
        self.player.update_timers(|t| t.oxygen_hurt_timer = value);
    }

    pub fn survival_timers(&self) -> SurvivalTimers {
        self.player.timers()
    }

    /// Whether the player's head is in a liquid node
    pub fn in_water(&self, map: &dyn NodeMap) -> bool {
        let head = self.player.position() + V3f::new(0.0, HEAD_HEIGHT, 0.0);
        map.is_liquid(head.to_node())
    }

    /// The client went away; the object is removed with the next step
    pub fn disconnected(&mut self) {
        self.peer_id = 0;
        self.base.mark_removed();
        if self.player.unlink_sao(self.id()) {
            self.player.set_peer_id(0);
        }
    }

    /// Refill the main list with a full stack of every creative item
    pub fn create_creative_inventory(&mut self, items: &ItemDefManager) {
        {
            let mut inv = self.player.inventory.write();
            let Some(list) = inv.list_mut(WIELD_LIST) else {
                warn!(name = %self.player.name(), "Player has no main list");
                return;
            };
            list.clear();
            for def in items.iter().filter(|d| d.in_creative_inventory()) {
                if list.free_slots() == 0 {
                    break;
                }
                list.add_item(ItemStack::new(&def.name, def.stack_max), items);
            }
        }
        self.set_inventory_modified();
    }

    fn property_packet(&self) -> Vec<u8> {
        let mut prop = self.prop.clone();
        prop.is_visible = self.hp() != 0;
        commands::set_properties(&prop)
    }

    fn check_movement(&mut self, dtime: f32, settings: &WorldSettings) {
        if self.is_singleplayer || settings.disable_anticheat {
            self.last_good_position = self.player.position();
            self.last_good_position_age = 0.0;
            return;
        }

        let max_speed = if self.has_privilege("fast") {
            PLAYER_MAX_SPEED_FAST
        } else {
            PLAYER_MAX_SPEED
        } * SPEED_TOLERANCE;

        self.last_good_position_age += dtime;
        if self.last_good_position_age < 1.0 {
            return;
        }

        let age = self.last_good_position_age;
        let pos = self.player.position();
        let diff = pos - self.last_good_position;
        let d_vert = diff.y;
        let d_horiz = diff.horizontal_length();
        if d_horiz > max_speed * age || d_vert > max_speed * age {
            info!(
                name = %self.player.name(),
                d_horiz = d_horiz,
                d_vert = d_vert,
                "Player moved too fast; resetting position"
            );
            let good = self.last_good_position;
            self.player.set_position(good);
            self.set_base_position(good);
            self.pending.insert(PendingFlags::TELEPORTED);
        } else {
            self.last_good_position = pos;
        }
        self.last_good_position_age = 0.0;
    }
}

impl ServerActiveObject for PlayerSao {
    fn base(&self) -> &ObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ObjectBase {
        &mut self.base
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn object_type(&self) -> ActiveObjectType {
        ActiveObjectType::Player
    }

    fn send_type(&self) -> ActiveObjectType {
        ActiveObjectType::Generic
    }

    fn set_base_position(&mut self, pos: V3f) {
        self.base.set_base_position(pos);
        self.position_not_sent = true;
    }

    fn added_to_environment(&mut self, ctx: &mut ObjectContext<'_>) {
        self.update_interval = ctx.settings.send_interval;

        let pos = self.player.position();
        self.set_base_position(pos);
        self.player.set_sao_id(Some(self.id()));
        self.player.set_peer_id(self.peer_id);
        self.last_good_position = pos;
        self.last_good_position_age = 0.0;

        debug!(id = self.id(), name = %self.player.name(), peer_id = self.peer_id, "Player object added");
    }

    fn removing_from_environment(&mut self, _ctx: &mut ObjectContext<'_>) {
        if self.player.unlink_sao(self.id()) {
            self.player.set_peer_id(0);
        }
    }

    fn is_static_allowed(&self) -> bool {
        false
    }

    fn unlimited_transfer_distance(&self, settings: &WorldSettings) -> bool {
        settings.unlimited_player_transfer_distance
    }

    fn step(&mut self, dtime: f32, send_recommended: bool, ctx: &mut ObjectContext<'_>) {
        if !self.properties_sent {
            self.properties_sent = true;
            let data = self.property_packet();
            self.base.push_message(true, data);
        }

        self.time_from_last_punch += dtime;
        self.check_movement(dtime, ctx.settings);
        survival::step(self, dtime, ctx.map, ctx.settings);

        if !send_recommended {
            return;
        }

        if self.position_not_sent {
            self.position_not_sent = false;
            let data = commands::update_position(&PositionUpdate {
                position: self.player.position() + V3f::new(0.0, BS, 0.0),
                velocity: V3f::ZERO,
                acceleration: V3f::ZERO,
                yaw: self.player.yaw(),
                do_interpolate: true,
                is_movement_end: false,
                update_interval: self.update_interval,
            });
            self.base.push_message(false, data);
        }

        if !self.armor_groups_sent {
            self.armor_groups_sent = true;
            let data = commands::update_armor_groups(&self.armor_groups);
            self.base.push_message(true, data);
        }

        if !self.texture_mod_sent {
            self.texture_mod_sent = true;
            match commands::set_texture_mod(&self.texture_mod) {
                Ok(data) => self.base.push_message(true, data),
                Err(e) => warn!(name = %self.player.name(), error = %e, "Texture modifier not sent"),
            }
        }
    }

    fn client_initialization_data(&self) -> Result<Vec<u8>> {
        let mut buf = PacketBuffer::new();
        buf.write_u8(0);
        buf.write_string(self.player.name())?;
        buf.write_bool(true);
        buf.write_v3f1000(self.player.position() + V3f::new(0.0, BS, 0.0));
        buf.write_f1000(self.player.yaw());
        buf.write_s16(self.hp());
        buf.write_u8(2);
        buf.write_long_string_bytes(&self.property_packet())?;
        buf.write_long_string_bytes(&commands::update_armor_groups(&self.armor_groups))?;
        Ok(buf.into_vec())
    }

    fn static_data(&self, _ctx: &ObjectContext<'_>) -> Result<Vec<u8>> {
        Err(ObjectError::StaticNotAllowed(ActiveObjectType::Player).into())
    }

    fn punch(
        &mut self,
        _dir: V3f,
        toolcap: Option<&ToolCapabilities>,
        puncher: Option<&mut dyn ServerActiveObject>,
        time_from_last_punch: f32,
        ctx: &mut ObjectContext<'_>,
    ) -> u16 {
        let Some(toolcap) = toolcap else {
            return 0;
        };

        let puncher_is_player = puncher
            .as_deref()
            .map(|p| p.object_type() == ActiveObjectType::Player)
            .unwrap_or(false);
        if !ctx.settings.enable_pvp && puncher_is_player {
            let data = commands::punched(0, self.hp());
            self.base.push_message(true, data);
            return 0;
        }

        let hit = hit_params(&self.armor_groups, toolcap, time_from_last_punch);
        let puncher_desc = puncher
            .as_deref()
            .map(|p| p.description())
            .unwrap_or_else(|| "nothing".to_string());
        info!(
            name = %self.player.name(),
            puncher = %puncher_desc,
            damage = hit.hp,
            "Player punched"
        );

        self.set_hp(self.hp().saturating_sub(hit.hp), ctx.settings);
        if hit.hp != 0 {
            let data = commands::punched(hit.hp, self.hp());
            self.base.push_message(true, data);
        }

        hit.wear
    }

    fn set_pos(&mut self, pos: V3f) {
        self.player.set_position(pos);
        self.set_base_position(pos);
        self.last_good_position = pos;
        self.last_good_position_age = 0.0;
        self.pending.insert(PendingFlags::TELEPORTED);
    }

    fn move_to(&mut self, pos: V3f, _continuous: bool) {
        self.set_pos(pos);
    }

    fn description(&self) -> String {
        format!("player {}", self.player.name())
    }

    fn hp(&self) -> i16 {
        self.player.hp()
    }

    fn set_hp(&mut self, hp: i16, settings: &WorldSettings) {
        let old_hp = self.player.hp();
        let hp = hp.clamp(0, PLAYER_MAX_HP);

        if hp < old_hp && !settings.enable_damage {
            // Correct the client's prediction
            self.pending.insert(PendingFlags::HP);
            return;
        }

        self.player.set_hp(hp);
        if hp != old_hp {
            self.pending.insert(PendingFlags::HP);
        }

        // Death or respawn
        if (hp == 0) != (old_hp == 0) {
            if hp == 0 {
                info!(name = %self.player.name(), "Player died");
            }
            self.properties_sent = false;
            let data = commands::punched(0, hp);
            self.base.push_message(true, data);
        }
    }

    fn set_armor_groups(&mut self, armor_groups: ItemGroupList) {
        self.armor_groups = armor_groups;
        self.armor_groups_sent = false;
    }

    fn properties(&self) -> Option<&ObjectProperties> {
        Some(&self.prop)
    }

    fn properties_mut(&mut self) -> Option<&mut ObjectProperties> {
        Some(&mut self.prop)
    }

    fn notify_object_properties_modified(&mut self) {
        self.properties_sent = false;
    }

    fn inventory(&self) -> Option<RwLockReadGuard<'_, Inventory>> {
        Some(self.player.inventory.read())
    }

    fn inventory_mut(&self) -> Option<RwLockWriteGuard<'_, Inventory>> {
        Some(self.player.inventory.write())
    }

    fn inventory_location(&self) -> InventoryLocation {
        InventoryLocation::Player(self.player.name().to_string())
    }

    fn set_inventory_modified(&mut self) {
        self.pending.insert(PendingFlags::INVENTORY);
    }

    fn wield_list(&self) -> &str {
        WIELD_LIST
    }

    fn wield_index(&self) -> usize {
        self.wield_index
    }

    fn set_wield_index(&mut self, index: usize) {
        if index != self.wield_index {
            self.wield_index = index;
            self.pending.insert(PendingFlags::WIELDED_ITEM);
        }
    }
}
