//! Object properties
//!
//! Visual and physical description of an active object, sent to clients in
//! the `SET_PROPERTIES` generic command.

use serde::{Deserialize, Serialize};

use crate::error::SerializationError;
use crate::game::math::{Aabb3f, V2f, V2s16, V3f};
use crate::net::buffer::{PacketBuffer, ReadResult};

/// Encoding version of the properties block
pub const PROPERTIES_VERSION: u8 = 0;

/// Properties of an active object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectProperties {
    pub hp_max: i16,
    pub physical: bool,
    pub weight: f32,
    pub collisionbox: Aabb3f,
    pub visual: String,
    pub visual_size: V2f,
    pub textures: Vec<String>,
    pub spritediv: V2s16,
    pub initial_sprite_basepos: V2s16,
    pub is_visible: bool,
    pub makes_footstep_sound: bool,
    pub automatic_rotate: f32,
}

impl Default for ObjectProperties {
    fn default() -> Self {
        Self {
            hp_max: 1,
            physical: false,
            weight: 5.0,
            collisionbox: Aabb3f::new(V3f::new(-0.5, -0.5, -0.5), V3f::new(0.5, 0.5, 0.5)),
            visual: "sprite".to_string(),
            visual_size: V2f::new(1.0, 1.0),
            textures: vec!["unknown_object.png".to_string()],
            spritediv: V2s16::new(1, 1),
            initial_sprite_basepos: V2s16::new(0, 0),
            is_visible: true,
            makes_footstep_sound: false,
            automatic_rotate: 0.0,
        }
    }
}

impl ObjectProperties {
    /// Encode into a buffer
    pub fn serialize(&self, buf: &mut PacketBuffer) {
        buf.write_u8(PROPERTIES_VERSION);
        buf.write_s16(self.hp_max);
        buf.write_bool(self.physical);
        buf.write_f1000(self.weight);
        buf.write_v3f1000(self.collisionbox.min);
        buf.write_v3f1000(self.collisionbox.max);
        buf.write_string_truncated(&self.visual);
        buf.write_v2f1000(self.visual_size);
        buf.write_u16(self.textures.len().min(u16::MAX as usize) as u16);
        for texture in self.textures.iter().take(u16::MAX as usize) {
            buf.write_string_truncated(texture);
        }
        buf.write_v2s16(self.spritediv);
        buf.write_v2s16(self.initial_sprite_basepos);
        buf.write_bool(self.is_visible);
        buf.write_bool(self.makes_footstep_sound);
        buf.write_f1000(self.automatic_rotate);
    }

    /// Decode from a buffer
    pub fn deserialize(buf: &mut PacketBuffer) -> ReadResult<Self> {
        let version = buf.read_u8()?;
        if version != PROPERTIES_VERSION {
            return Err(SerializationError::UnsupportedVersion(version));
        }
        let hp_max = buf.read_s16()?;
        let physical = buf.read_bool()?;
        let weight = buf.read_f1000()?;
        let min = buf.read_v3f1000()?;
        let max = buf.read_v3f1000()?;
        let visual = buf.read_string()?;
        let visual_size = buf.read_v2f1000()?;
        let count = buf.read_u16()? as usize;
        let mut textures = Vec::with_capacity(count);
        for _ in 0..count {
            textures.push(buf.read_string()?);
        }
        Ok(Self {
            hp_max,
            physical,
            weight,
            collisionbox: Aabb3f::new(min, max),
            visual,
            visual_size,
            textures,
            spritediv: buf.read_v2s16()?,
            initial_sprite_basepos: buf.read_v2s16()?,
            is_visible: buf.read_bool()?,
            makes_footstep_sound: buf.read_bool()?,
            automatic_rotate: buf.read_f1000()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let prop = ObjectProperties::default();
        assert_eq!(prop.hp_max, 1);
        assert_eq!(prop.visual, "sprite");
        assert_eq!(prop.textures, vec!["unknown_object.png".to_string()]);
        assert!(prop.is_visible);
    }

    #[test]
    fn test_serialize_layout() {
        let prop = ObjectProperties::default();
        let mut buf = PacketBuffer::new();
        prop.serialize(&mut buf);

        let bytes = buf.as_bytes();
        assert_eq!(bytes[0], PROPERTIES_VERSION);
        assert_eq!(&bytes[1..3], &[0, 1]); // hp_max
        assert_eq!(bytes[3], 0); // physical
        assert_eq!(&bytes[4..8], &5000i32.to_be_bytes()); // weight

        let decoded = ObjectProperties::deserialize(&mut PacketBuffer::from_bytes(bytes)).unwrap();
        assert_eq!(decoded, prop);
    }

    #[test]
    fn test_oversized_texture_still_decodes() {
        let mut prop = ObjectProperties::default();
        prop.textures = vec![format!("{}é", "a".repeat(u16::MAX as usize - 1))];
        let mut buf = PacketBuffer::new();
        prop.serialize(&mut buf);

        let decoded = ObjectProperties::deserialize(&mut PacketBuffer::from_bytes(buf.as_bytes())).unwrap();
        assert_eq!(decoded.textures[0], "a".repeat(u16::MAX as usize - 1));
    }

    #[test]
    fn test_unsupported_version() {
        let mut buf = PacketBuffer::from_bytes(&[3]);
        assert_eq!(
            ObjectProperties::deserialize(&mut buf),
            Err(SerializationError::UnsupportedVersion(3))
        );
    }
}
