//! Server active objects
//!
//! This module defines the interface shared by every dynamic object the server
//! simulates:
//! - `ServerActiveObject`: lifecycle hooks, stepping, punching, encodings
//! - `ObjectBase`: id, position and the outgoing message queue
//! - `ObjectContext`: the environment pieces an object may touch while it runs
//!
//! The concrete kinds are the scripted entity (`LuaEntitySao`) and the
//! connected player's avatar (`PlayerSao`).

pub mod commands;
pub mod flags;
pub mod item;
pub mod lua_entity;
pub mod player_sao;
pub mod properties;

use std::any::Any;
use std::collections::VecDeque;

use bytes::Bytes;
use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::error::Result;
use crate::game::inventory::{Inventory, InventoryLocation};
use crate::game::item::{ItemDefManager, ItemStack};
use crate::game::map::NodeMap;
use crate::game::math::{V3f, BS};
use crate::game::tool::{ItemGroupList, ToolCapabilities};
use crate::game::world::WorldSettings;
use crate::object::properties::ObjectProperties;
use crate::script::{EntityCallContext, ScriptHost};

pub use item::create_item_sao;
pub use lua_entity::LuaEntitySao;
pub use player_sao::PlayerSao;

/// Active object id; 0 is never assigned
pub type ObjectId = u16;

/// Network peer id; 0 means "not connected"
pub type PeerId = u16;

/// Wire type ids of active objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ActiveObjectType {
    Invalid = 0,
    Item = 2,
    LuaEntity = 7,
    Player = 100,
    Generic = 101,
}

impl ActiveObjectType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            2 => Self::Item,
            7 => Self::LuaEntity,
            100 => Self::Player,
            101 => Self::Generic,
            _ => Self::Invalid,
        }
    }
}

/// A message from an object to the clients that know it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveObjectMessage {
    pub id: ObjectId,
    pub reliable: bool,
    pub data: Bytes,
}

impl ActiveObjectMessage {
    pub fn new(id: ObjectId, reliable: bool, data: impl Into<Bytes>) -> Self {
        Self {
            id,
            reliable,
            data: data.into(),
        }
    }
}

/// State shared by every active object
#[derive(Debug, Default)]
pub struct ObjectBase {
    id: ObjectId,
    base_position: V3f,
    removed: bool,
    pending_deactivation: bool,
    known_by_count: u16,
    messages_out: VecDeque<ActiveObjectMessage>,
}

impl ObjectBase {
    pub fn new(pos: V3f) -> Self {
        Self {
            base_position: pos,
            ..Default::default()
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Assigned by the environment when the object is added
    pub fn set_id(&mut self, id: ObjectId) {
        self.id = id;
    }

    pub fn base_position(&self) -> V3f {
        self.base_position
    }

    pub fn set_base_position(&mut self, pos: V3f) {
        self.base_position = pos;
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    pub fn mark_removed(&mut self) {
        self.removed = true;
    }

    pub fn is_pending_deactivation(&self) -> bool {
        self.pending_deactivation
    }

    pub fn set_pending_deactivation(&mut self, pending: bool) {
        self.pending_deactivation = pending;
    }

    /// Number of clients that have this object in view
    pub fn known_by_count(&self) -> u16 {
        self.known_by_count
    }

    pub fn add_known_by(&mut self) {
        self.known_by_count = self.known_by_count.saturating_add(1);
    }

    pub fn remove_known_by(&mut self) {
        self.known_by_count = self.known_by_count.saturating_sub(1);
    }

    /// Queue a message for clients
    pub fn push_message(&mut self, reliable: bool, data: impl Into<Bytes>) {
        let msg = ActiveObjectMessage::new(self.id, reliable, data);
        self.messages_out.push_back(msg);
    }

    pub fn has_messages(&self) -> bool {
        !self.messages_out.is_empty()
    }

    pub fn take_messages(&mut self) -> Vec<ActiveObjectMessage> {
        self.messages_out.drain(..).collect()
    }
}

/// Environment access handed to objects while they run
pub struct ObjectContext<'a> {
    pub scripts: &'a mut dyn ScriptHost,
    pub map: &'a dyn NodeMap,
    pub items: &'a ItemDefManager,
    pub settings: &'a WorldSettings,
}

impl<'a> ObjectContext<'a> {
    pub fn new(
        scripts: &'a mut dyn ScriptHost,
        map: &'a dyn NodeMap,
        items: &'a ItemDefManager,
        settings: &'a WorldSettings,
    ) -> Self {
        Self {
            scripts,
            map,
            items,
            settings,
        }
    }

    /// Split into the script host and the read-only part scripts receive
    pub fn split(&mut self) -> (&mut dyn ScriptHost, EntityCallContext<'_>) {
        let env = EntityCallContext {
            map: self.map,
            items: self.items,
            settings: self.settings,
        };
        (&mut *self.scripts, env)
    }
}

/// Interface of every server active object
pub trait ServerActiveObject: Any + Send + Sync {
    fn base(&self) -> &ObjectBase;
    fn base_mut(&mut self) -> &mut ObjectBase;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn object_type(&self) -> ActiveObjectType;

    /// Type announced to clients
    fn send_type(&self) -> ActiveObjectType {
        self.object_type()
    }

    fn id(&self) -> ObjectId {
        self.base().id()
    }

    fn base_position(&self) -> V3f {
        self.base().base_position()
    }

    fn set_base_position(&mut self, pos: V3f) {
        self.base_mut().set_base_position(pos);
    }

    fn is_removed(&self) -> bool {
        self.base().is_removed()
    }

    fn added_to_environment(&mut self, _ctx: &mut ObjectContext<'_>) {}

    fn removing_from_environment(&mut self, _ctx: &mut ObjectContext<'_>) {}

    /// Whether the object may be stored as static data when deactivated
    fn is_static_allowed(&self) -> bool {
        true
    }

    fn unlimited_transfer_distance(&self, _settings: &WorldSettings) -> bool {
        false
    }

    fn step(&mut self, dtime: f32, send_recommended: bool, ctx: &mut ObjectContext<'_>);

    /// Payload sent when a client first learns about the object
    fn client_initialization_data(&self) -> Result<Vec<u8>>;

    /// Payload stored when the object is deactivated
    fn static_data(&self, ctx: &ObjectContext<'_>) -> Result<Vec<u8>>;

    /// Returns the wear to add to the punching tool
    fn punch(
        &mut self,
        _dir: V3f,
        _toolcap: Option<&ToolCapabilities>,
        _puncher: Option<&mut dyn ServerActiveObject>,
        _time_from_last_punch: f32,
        _ctx: &mut ObjectContext<'_>,
    ) -> u16 {
        0
    }

    fn right_click(
        &mut self,
        _clicker: Option<&mut dyn ServerActiveObject>,
        _ctx: &mut ObjectContext<'_>,
    ) {
    }

    fn set_pos(&mut self, pos: V3f) {
        self.set_base_position(pos);
    }

    fn move_to(&mut self, pos: V3f, _continuous: bool) {
        self.set_base_position(pos);
    }

    /// Distance the object must move before its static copy is rewritten
    fn minimum_saved_movement(&self) -> f32 {
        2.0 * BS
    }

    fn description(&self) -> String {
        "SAO".to_string()
    }

    fn hp(&self) -> i16 {
        0
    }

    fn set_hp(&mut self, _hp: i16, _settings: &WorldSettings) {}

    fn set_armor_groups(&mut self, _armor_groups: ItemGroupList) {}

    fn properties(&self) -> Option<&ObjectProperties> {
        None
    }

    fn properties_mut(&mut self) -> Option<&mut ObjectProperties> {
        None
    }

    fn notify_object_properties_modified(&mut self) {}

    fn inventory(&self) -> Option<RwLockReadGuard<'_, Inventory>> {
        None
    }

    fn inventory_mut(&self) -> Option<RwLockWriteGuard<'_, Inventory>> {
        None
    }

    fn inventory_location(&self) -> InventoryLocation {
        InventoryLocation::Undefined
    }

    fn set_inventory_modified(&mut self) {}

    fn wield_list(&self) -> &str {
        ""
    }

    fn wield_index(&self) -> usize {
        0
    }

    fn set_wield_index(&mut self, _index: usize) {}

    /// Item currently held, read from the wield list
    fn wielded_item(&self) -> ItemStack {
        let Some(inv) = self.inventory() else {
            return ItemStack::empty();
        };
        inv.list(self.wield_list())
            .and_then(|list| list.get(self.wield_index()))
            .cloned()
            .unwrap_or_else(ItemStack::empty)
    }

    fn take_messages(&mut self) -> Vec<ActiveObjectMessage> {
        self.base_mut().take_messages()
    }
}

impl dyn ServerActiveObject {
    pub fn downcast_ref<T: ServerActiveObject>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: ServerActiveObject>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_object_type_ids() {
        assert_eq!(ActiveObjectType::Player.as_u8(), 100);
        assert_eq!(ActiveObjectType::Generic.as_u8(), 101);
        assert_eq!(ActiveObjectType::LuaEntity.as_u8(), 7);
        assert_eq!(ActiveObjectType::from_u8(2), ActiveObjectType::Item);
        assert_eq!(ActiveObjectType::from_u8(42), ActiveObjectType::Invalid);
    }

    #[test]
    fn test_message_queue() {
        let mut base = ObjectBase::new(V3f::new(1.0, 2.0, 3.0));
        base.set_id(9);
        assert!(!base.has_messages());

        base.push_message(true, vec![4u8, 0, 1]);
        base.push_message(false, vec![1u8]);
        let messages = base.take_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, 9);
        assert!(messages[0].reliable);
        assert!(!messages[1].reliable);
        assert!(!base.has_messages());
    }

    #[test]
    fn test_known_by_saturates() {
        let mut base = ObjectBase::new(V3f::ZERO);
        base.remove_known_by();
        assert_eq!(base.known_by_count(), 0);
        base.add_known_by();
        base.add_known_by();
        assert_eq!(base.known_by_count(), 2);
    }
}
