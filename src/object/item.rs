//! Dropped items
//!
//! An item lying in the world is a scripted entity named `__builtin:item`
//! whose state is the item string. `BuiltinItem` is its native behavior.

use tracing::debug;

use crate::game::item::ItemStack;
use crate::game::math::{Aabb3f, V2f, V3f, BS};
use crate::game::tool::ItemGroupList;
use crate::object::lua_entity::LuaEntitySao;
use crate::object::properties::ObjectProperties;
use crate::object::ServerActiveObject;
use crate::script::{EntityBehavior, EntityCallContext, EntityInstance, PunchInfo};

/// Entity name of dropped items
pub const BUILTIN_ITEM_NAME: &str = "__builtin:item";

/// Downward acceleration of dropped items
const ITEM_GRAVITY: f32 = 10.0 * BS;

/// Create a dropped item entity holding `itemstring`
pub fn create_item_sao(pos: V3f, itemstring: &str) -> LuaEntitySao {
    LuaEntitySao::new(pos, BUILTIN_ITEM_NAME, itemstring)
}

/// Behavior of `__builtin:item`
pub struct BuiltinItem;

impl EntityBehavior for BuiltinItem {
    fn properties(&self, prop: &mut ObjectProperties) {
        prop.hp_max = 1;
        prop.physical = true;
        prop.collisionbox = Aabb3f::new(V3f::new(-0.17, -0.17, -0.17), V3f::new(0.17, 0.17, 0.17));
        prop.visual = "sprite".to_string();
        prop.visual_size = V2f::new(0.5, 0.5);
        prop.textures = Vec::new();
    }

    fn instantiate(&self) -> Box<dyn EntityInstance> {
        Box::new(DroppedItem::default())
    }
}

#[derive(Debug, Default)]
struct DroppedItem {
    itemstring: String,
    age: f32,
}

impl DroppedItem {
    fn set_item(&mut self, entity: &mut LuaEntitySao, itemstring: String, env: &EntityCallContext<'_>) {
        let image = ItemStack::parse(&itemstring)
            .map(|stack| env.items.inventory_image(&stack.name).to_string())
            .unwrap_or_else(|_| "unknown_item.png".to_string());
        self.itemstring = itemstring;

        if let Some(prop) = entity.properties_mut() {
            prop.textures = vec![image];
        }
        entity.notify_object_properties_modified();
    }
}

impl EntityInstance for DroppedItem {
    fn on_activate(&mut self, entity: &mut LuaEntitySao, staticdata: &str, env: &EntityCallContext<'_>) {
        self.set_item(entity, staticdata.to_string(), env);

        let mut armor_groups = ItemGroupList::new();
        armor_groups.insert("immortal".to_string(), 1);
        entity.set_armor_groups(armor_groups);
        entity.set_acceleration(V3f::new(0.0, -ITEM_GRAVITY, 0.0));
    }

    fn get_staticdata(&self) -> String {
        self.itemstring.clone()
    }

    fn on_step(&mut self, entity: &mut LuaEntitySao, dtime: f32, env: &EntityCallContext<'_>) {
        self.age += dtime;
        if self.itemstring.is_empty() || self.age > env.settings.item_entity_ttl {
            debug!(id = entity.id(), item = %self.itemstring, "Dropped item expired");
            entity.remove();
        }
    }

    fn on_punch(
        &mut self,
        entity: &mut LuaEntitySao,
        puncher: Option<&mut dyn ServerActiveObject>,
        _punch: &PunchInfo<'_>,
        env: &EntityCallContext<'_>,
    ) {
        let Some(puncher) = puncher else {
            return;
        };
        let Ok(stack) = ItemStack::parse(&self.itemstring) else {
            entity.remove();
            return;
        };

        let leftover = {
            let Some(mut inv) = puncher.inventory_mut() else {
                return;
            };
            match inv.add_item(puncher.wield_list(), stack, env.items) {
                Ok(leftover) => leftover,
                Err(_) => return,
            }
        };
        puncher.set_inventory_modified();

        if leftover.is_empty() {
            debug!(id = entity.id(), item = %self.itemstring, "Dropped item picked up");
            self.itemstring.clear();
            entity.remove();
        } else {
            self.set_item(entity, leftover.to_string(), env);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::item::ItemDefManager;
    use crate::game::map::{NodeKind, VoxelMap};
    use crate::game::math::V3s16;
    use crate::game::world::WorldSettings;
    use crate::object::ObjectContext;
    use crate::script::{EntityRegistry, ScriptHost};

    struct TestEnv {
        scripts: EntityRegistry,
        map: VoxelMap,
        items: ItemDefManager,
        settings: WorldSettings,
    }

    impl TestEnv {
        fn new() -> Self {
            Self {
                scripts: EntityRegistry::with_builtin(),
                map: VoxelMap::new(),
                items: ItemDefManager::with_basic_items(),
                settings: WorldSettings::default(),
            }
        }

        fn ctx(&mut self) -> ObjectContext<'_> {
            ObjectContext::new(&mut self.scripts, &self.map, &self.items, &self.settings)
        }
    }

    fn spawn(env: &mut TestEnv, itemstring: &str) -> LuaEntitySao {
        let mut sao = create_item_sao(V3f::ZERO, itemstring);
        sao.base_mut().set_id(3);
        sao.added_to_environment(&mut env.ctx());
        sao
    }

    #[test]
    fn test_item_entity_setup() {
        let mut env = TestEnv::new();
        let sao = spawn(&mut env, "default:dirt 5");
        assert_eq!(sao.name(), BUILTIN_ITEM_NAME);
        assert!(sao.is_registered());

        let prop = sao.properties().unwrap();
        assert!(prop.physical);
        assert_eq!(prop.textures, vec!["default_dirt.png".to_string()]);
        assert_eq!(sao.acceleration(), V3f::new(0.0, -ITEM_GRAVITY, 0.0));
        assert_eq!(
            env.scripts.entity_static_data(3),
            Some("default:dirt 5".to_string())
        );
    }

    #[test]
    fn test_item_falls_and_rests() {
        let mut env = TestEnv::new();
        env.map.fill(V3s16::new(-1, -1, -1), V3s16::new(1, -1, 1), NodeKind::Solid);
        let mut sao = spawn(&mut env, "default:stone");

        for _ in 0..30 {
            sao.step(0.1, false, &mut env.ctx());
        }
        // Floor top at -5, box half height 1.7; rests within one fall step of it
        let y = sao.base_position().y;
        assert!(y > -3.3 - 1e-3 && y < -2.3 + 1e-3, "y = {}", y);
        assert!(!sao.is_removed());
    }

    #[test]
    fn test_item_expires() {
        let mut env = TestEnv::new();
        env.settings.item_entity_ttl = 1.0;
        let mut sao = spawn(&mut env, "default:stone");
        sao.step(0.6, false, &mut env.ctx());
        assert!(!sao.is_removed());
        sao.step(0.6, false, &mut env.ctx());
        assert!(sao.is_removed());
    }

    #[test]
    fn test_empty_item_is_removed() {
        let mut env = TestEnv::new();
        let mut sao = spawn(&mut env, "");
        sao.step(0.1, false, &mut env.ctx());
        assert!(sao.is_removed());
    }
}
