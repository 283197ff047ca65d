//! Scripted entity
//!
//! A `LuaEntitySao` is a non-player object whose behavior lives in the script
//! host under the entity's registered name. The object itself integrates
//! motion, keeps clients in sync and resolves punches against its armor
//! groups.

use std::any::Any;

use tracing::{debug, info};

use crate::error::{Result, SerializationError};
use crate::game::collision::collision_move;
use crate::game::math::{V2s16, V3f, BS};
use crate::game::tool::{punch_damage, ItemGroupList, ToolCapabilities};
use crate::game::world::{WorldSettings, DEFAULT_SEND_INTERVAL};
use crate::net::buffer::PacketBuffer;
use crate::object::commands::{self, PositionUpdate};
use crate::object::properties::ObjectProperties;
use crate::object::{ActiveObjectType, ObjectBase, ObjectContext, ServerActiveObject};
use crate::script::PunchInfo;

/// Version written by `static_data`
pub const STATIC_DATA_VERSION: u8 = 1;

/// Longest step a physical entity may take per collision iteration
const POS_MAX_D: f32 = 0.25 * BS;

/// Scripted entity
#[derive(Debug)]
pub struct LuaEntitySao {
    base: ObjectBase,
    init_name: String,
    init_state: String,
    registered: bool,
    prop: ObjectProperties,
    hp: i16,
    /// hp came from static data and survives activation
    hp_restored: bool,
    velocity: V3f,
    acceleration: V3f,
    pitch: f32,
    yaw: f32,
    armor_groups: ItemGroupList,
    properties_sent: bool,
    last_sent_yaw: f32,
    last_sent_position: V3f,
    last_sent_velocity: V3f,
    last_sent_position_timer: f32,
    last_sent_move_precision: f32,
    armor_groups_sent: bool,
    update_interval: f32,
}

impl LuaEntitySao {
    pub fn new(pos: V3f, name: &str, state: &str) -> Self {
        let mut armor_groups = ItemGroupList::new();
        armor_groups.insert("fleshy".to_string(), 3);

        Self {
            base: ObjectBase::new(pos),
            init_name: name.to_string(),
            init_state: state.to_string(),
            registered: false,
            prop: ObjectProperties::default(),
            hp: 1,
            hp_restored: false,
            velocity: V3f::ZERO,
            acceleration: V3f::ZERO,
            pitch: 0.0,
            yaw: 0.0,
            armor_groups,
            properties_sent: true,
            last_sent_yaw: 0.0,
            last_sent_position: V3f::ZERO,
            last_sent_velocity: V3f::ZERO,
            last_sent_position_timer: 0.0,
            last_sent_move_precision: 0.0,
            armor_groups_sent: false,
            update_interval: DEFAULT_SEND_INTERVAL,
        }
    }

    /// Rebuild an entity from its static data
    ///
    /// Version 0 holds the name and state; version 1 adds hp, velocity and
    /// yaw. Empty data gives an unnamed entity.
    pub fn create(pos: V3f, data: &[u8]) -> std::result::Result<Self, SerializationError> {
        if data.is_empty() {
            return Ok(Self::new(pos, "", ""));
        }

        let mut buf = PacketBuffer::from_bytes(data);
        let version = buf.read_u8()?;
        match version {
            0 => {
                let name = buf.read_string()?;
                let state = buf.read_long_string()?;
                Ok(Self::new(pos, &name, &state))
            }
            1 => {
                let name = buf.read_string()?;
                let state = buf.read_long_string()?;
                let mut sao = Self::new(pos, &name, &state);
                sao.hp = buf.read_s16()?;
                sao.velocity = buf.read_v3f1000()?;
                sao.yaw = buf.read_f1000()?;
                sao.hp_restored = true;
                Ok(sao)
            }
            other => Err(SerializationError::UnsupportedVersion(other)),
        }
    }

    pub fn name(&self) -> &str {
        &self.init_name
    }

    /// Whether the script host knows this entity's name
    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Remove the entity from the environment at the end of the step
    pub fn remove(&mut self) {
        self.base.mark_removed();
    }

    pub fn velocity(&self) -> V3f {
        self.velocity
    }

    pub fn set_velocity(&mut self, velocity: V3f) {
        self.velocity = velocity;
    }

    pub fn acceleration(&self) -> V3f {
        self.acceleration
    }

    pub fn set_acceleration(&mut self, acceleration: V3f) {
        self.acceleration = acceleration;
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch;
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn set_yaw(&mut self, yaw: f32) {
        self.yaw = yaw;
    }

    pub fn armor_groups(&self) -> &ItemGroupList {
        &self.armor_groups
    }

    pub fn set_texture_mod(&mut self, modifier: &str) -> Result<()> {
        let data = commands::set_texture_mod(modifier)?;
        self.base.push_message(true, data);
        Ok(())
    }

    pub fn set_sprite(
        &mut self,
        p: V2s16,
        num_frames: u16,
        framelength: f32,
        select_horiz_by_yawpitch: bool,
    ) {
        let data = commands::set_sprite(p, num_frames, framelength, select_horiz_by_yawpitch);
        self.base.push_message(true, data);
    }

    fn property_packet(&self) -> Vec<u8> {
        commands::set_properties(&self.prop)
    }

    fn send_position(&mut self, do_interpolate: bool, is_movement_end: bool) {
        let pos = self.base.base_position();
        self.last_sent_move_precision = pos.distance_to(self.last_sent_position);
        self.last_sent_position_timer = 0.0;
        self.last_sent_yaw = self.yaw;
        self.last_sent_position = pos;
        self.last_sent_velocity = self.velocity;

        let data = commands::update_position(&PositionUpdate {
            position: pos,
            velocity: self.velocity,
            acceleration: self.acceleration,
            yaw: self.yaw,
            do_interpolate,
            is_movement_end,
            update_interval: self.update_interval,
        });
        self.base.push_message(false, data);
    }

    fn integrate(&mut self, dtime: f32, ctx: &ObjectContext<'_>) {
        if self.prop.physical {
            let collisionbox = self.prop.collisionbox.scaled(BS);
            let mut pos = self.base.base_position();
            let mut vel = self.velocity;
            collision_move(ctx.map, POS_MAX_D, &collisionbox, dtime, &mut pos, &mut vel);
            self.base.set_base_position(pos);
            self.velocity = vel + self.acceleration * dtime;
        } else {
            let pos = self.base.base_position()
                + self.velocity * dtime
                + self.acceleration * (0.5 * dtime * dtime);
            self.base.set_base_position(pos);
            self.velocity += self.acceleration * dtime;
        }
    }
}

impl ServerActiveObject for LuaEntitySao {
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
        ActiveObjectType::LuaEntity
    }

    fn send_type(&self) -> ActiveObjectType {
        ActiveObjectType::Generic
    }

    fn added_to_environment(&mut self, ctx: &mut ObjectContext<'_>) {
        self.update_interval = ctx.settings.send_interval;

        let id = self.id();
        self.registered = ctx.scripts.entity_add(id, &self.init_name);
        if !self.registered {
            debug!(id = id, name = %self.init_name, "Unknown entity added");
            return;
        }

        ctx.scripts.entity_properties(id, &mut self.prop);
        if !self.hp_restored {
            self.hp = self.prop.hp_max;
        }

        let state = self.init_state.clone();
        let (scripts, env) = ctx.split();
        scripts.entity_activate(self, &state, &env);
    }

    fn removing_from_environment(&mut self, ctx: &mut ObjectContext<'_>) {
        if self.registered {
            ctx.scripts.entity_remove(self.id());
        }
    }

    fn step(&mut self, dtime: f32, send_recommended: bool, ctx: &mut ObjectContext<'_>) {
        if !self.properties_sent {
            self.properties_sent = true;
            let data = self.property_packet();
            self.base.push_message(true, data);
        }

        self.last_sent_position_timer += dtime;
        self.integrate(dtime, ctx);

        if self.registered {
            let (scripts, env) = ctx.split();
            scripts.entity_step(self, dtime, &env);
        }

        if !send_recommended {
            return;
        }

        let minchange = if self.last_sent_position_timer > 1.0 {
            0.01 * BS
        } else if self.last_sent_position_timer > 0.2 {
            0.05 * BS
        } else {
            0.2 * BS
        };
        let move_d = self.base.base_position().distance_to(self.last_sent_position)
            + self.last_sent_move_precision;
        let vel_d = self.velocity.distance_to(self.last_sent_velocity);
        if move_d > minchange || vel_d > minchange || (self.yaw - self.last_sent_yaw).abs() > 1.0 {
            self.send_position(true, false);
        }

        if !self.armor_groups_sent {
            self.armor_groups_sent = true;
            let data = commands::update_armor_groups(&self.armor_groups);
            self.base.push_message(true, data);
        }
    }

    fn client_initialization_data(&self) -> Result<Vec<u8>> {
        let mut buf = PacketBuffer::new();
        buf.write_u8(0);
        buf.write_string("")?;
        buf.write_bool(false);
        buf.write_v3f1000(self.base.base_position());
        buf.write_f1000(self.yaw);
        buf.write_s16(self.hp);
        buf.write_u8(2);
        buf.write_long_string_bytes(&self.property_packet())?;
        buf.write_long_string_bytes(&commands::update_armor_groups(&self.armor_groups))?;
        Ok(buf.into_vec())
    }

    fn static_data(&self, ctx: &ObjectContext<'_>) -> Result<Vec<u8>> {
        let state = if self.registered {
            ctx.scripts
                .entity_static_data(self.id())
                .unwrap_or_else(|| self.init_state.clone())
        } else {
            self.init_state.clone()
        };

        let mut buf = PacketBuffer::new();
        buf.write_u8(STATIC_DATA_VERSION);
        buf.write_string(&self.init_name)?;
        buf.write_long_string(&state)?;
        buf.write_s16(self.hp);
        buf.write_v3f1000(self.velocity);
        buf.write_f1000(self.yaw);
        Ok(buf.into_vec())
    }

    fn punch(
        &mut self,
        dir: V3f,
        toolcap: Option<&ToolCapabilities>,
        puncher: Option<&mut dyn ServerActiveObject>,
        time_from_last_punch: f32,
        ctx: &mut ObjectContext<'_>,
    ) -> u16 {
        if !self.registered {
            // Unknown entities are deleted when punched
            self.base.mark_removed();
            return 0;
        }

        let result = punch_damage(&self.armor_groups, toolcap, time_from_last_punch);
        if result.did_punch {
            self.set_hp(self.hp.saturating_sub(result.damage), ctx.settings);

            let puncher_desc = puncher
                .as_deref()
                .map(|p| p.description())
                .unwrap_or_else(|| "nothing".to_string());
            info!(
                id = self.id(),
                puncher = %puncher_desc,
                damage = result.damage,
                hp = self.hp,
                "{} punched",
                self.description()
            );

            let data = commands::punched(result.damage, self.hp);
            self.base.push_message(true, data);
            if self.hp == 0 {
                self.base.mark_removed();
            }
        }

        let punch = PunchInfo {
            dir,
            toolcap,
            time_from_last_punch,
        };
        let (scripts, env) = ctx.split();
        scripts.entity_punch(self, puncher, &punch, &env);

        result.wear
    }

    fn right_click(
        &mut self,
        clicker: Option<&mut dyn ServerActiveObject>,
        ctx: &mut ObjectContext<'_>,
    ) {
        if !self.registered {
            return;
        }
        let (scripts, env) = ctx.split();
        scripts.entity_right_click(self, clicker, &env);
    }

    fn set_pos(&mut self, pos: V3f) {
        self.base.set_base_position(pos);
        self.send_position(false, true);
    }

    fn move_to(&mut self, pos: V3f, continuous: bool) {
        self.base.set_base_position(pos);
        if !continuous {
            self.send_position(true, true);
        }
    }

    fn minimum_saved_movement(&self) -> f32 {
        0.1 * BS
    }

    fn description(&self) -> String {
        format!(
            "LuaEntitySAO \"{}\" at {}",
            self.init_name,
            self.base.base_position() / BS
        )
    }

    fn hp(&self) -> i16 {
        self.hp
    }

    fn set_hp(&mut self, hp: i16, _settings: &WorldSettings) {
        self.hp = hp.max(0);
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
}
