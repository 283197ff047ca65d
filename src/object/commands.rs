//! Generic active object commands
//!
//! Message payloads queued by objects for clients. Every command starts with
//! its command byte.

use crate::error::SerializationError;
use crate::game::math::{V2s16, V3f};
use crate::game::tool::ItemGroupList;
use crate::net::buffer::PacketBuffer;
use crate::object::properties::ObjectProperties;

/// Generic command identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GenericCommand {
    SetProperties = 0,
    UpdatePosition = 1,
    SetTextureMod = 2,
    SetSprite = 3,
    Punched = 4,
    UpdateArmorGroups = 5,
}

impl GenericCommand {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::SetProperties),
            1 => Some(Self::UpdatePosition),
            2 => Some(Self::SetTextureMod),
            3 => Some(Self::SetSprite),
            4 => Some(Self::Punched),
            5 => Some(Self::UpdateArmorGroups),
            _ => None,
        }
    }
}

/// Position update parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionUpdate {
    pub position: V3f,
    pub velocity: V3f,
    pub acceleration: V3f,
    pub yaw: f32,
    pub do_interpolate: bool,
    pub is_movement_end: bool,
    pub update_interval: f32,
}

pub fn set_properties(prop: &ObjectProperties) -> Vec<u8> {
    let mut buf = PacketBuffer::new();
    buf.write_u8(GenericCommand::SetProperties.as_u8());
    prop.serialize(&mut buf);
    buf.into_vec()
}

pub fn update_position(update: &PositionUpdate) -> Vec<u8> {
    let mut buf = PacketBuffer::with_capacity(48);
    buf.write_u8(GenericCommand::UpdatePosition.as_u8());
    buf.write_v3f1000(update.position);
    buf.write_v3f1000(update.velocity);
    buf.write_v3f1000(update.acceleration);
    buf.write_f1000(update.yaw);
    buf.write_bool(update.do_interpolate);
    buf.write_bool(update.is_movement_end);
    buf.write_f1000(update.update_interval);
    buf.into_vec()
}

pub fn set_texture_mod(modifier: &str) -> Result<Vec<u8>, SerializationError> {
    let mut buf = PacketBuffer::new();
    buf.write_u8(GenericCommand::SetTextureMod.as_u8());
    buf.write_string(modifier)?;
    Ok(buf.into_vec())
}

pub fn set_sprite(p: V2s16, num_frames: u16, framelength: f32, select_horiz_by_yawpitch: bool) -> Vec<u8> {
    let mut buf = PacketBuffer::new();
    buf.write_u8(GenericCommand::SetSprite.as_u8());
    buf.write_v2s16(p);
    buf.write_u16(num_frames);
    buf.write_f1000(framelength);
    buf.write_bool(select_horiz_by_yawpitch);
    buf.into_vec()
}

pub fn punched(damage: i16, result_hp: i16) -> Vec<u8> {
    let mut buf = PacketBuffer::with_capacity(5);
    buf.write_u8(GenericCommand::Punched.as_u8());
    buf.write_s16(damage);
    buf.write_s16(result_hp);
    buf.into_vec()
}

pub fn update_armor_groups(armor_groups: &ItemGroupList) -> Vec<u8> {
    let mut buf = PacketBuffer::new();
    buf.write_u8(GenericCommand::UpdateArmorGroups.as_u8());
    buf.write_u16(armor_groups.len().min(u16::MAX as usize) as u16);
    for (name, rating) in armor_groups.iter().take(u16::MAX as usize) {
        buf.write_string_truncated(name);
        buf.write_s16((*rating).clamp(i16::MIN as i32, i16::MAX as i32) as i16);
    }
    buf.into_vec()
}
