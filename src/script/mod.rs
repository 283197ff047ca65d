//! Scripting layer
//!
//! Scripted entities delegate their behavior to a `ScriptHost`. The host
//! keeps one instance per active entity id, created from a registered
//! definition by name. `EntityRegistry` is the native host: definitions are
//! Rust `EntityBehavior` values and instances are `EntityInstance` trait
//! objects.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::error::ScriptError;
use crate::game::item::{is_valid_item_name, ItemDefManager};
use crate::game::map::NodeMap;
use crate::game::math::V3f;
use crate::game::tool::ToolCapabilities;
use crate::game::world::WorldSettings;
use crate::object::properties::ObjectProperties;
use crate::object::{LuaEntitySao, ObjectId, ServerActiveObject};

/// Read-only environment handed to script callbacks
#[derive(Clone, Copy)]
pub struct EntityCallContext<'a> {
    pub map: &'a dyn NodeMap,
    pub items: &'a ItemDefManager,
    pub settings: &'a WorldSettings,
}

/// Details of a punch passed to the script
#[derive(Debug, Clone, Copy)]
pub struct PunchInfo<'a> {
    pub dir: V3f,
    pub toolcap: Option<&'a ToolCapabilities>,
    pub time_from_last_punch: f32,
}

/// Seam between scripted entities and the scripting runtime
pub trait ScriptHost: Send {
    /// Create a script instance for `id`; false when `name` is not registered
    fn entity_add(&mut self, id: ObjectId, name: &str) -> bool;

    fn entity_remove(&mut self, id: ObjectId);

    /// Fill properties from the entity definition
    fn entity_properties(&self, id: ObjectId, prop: &mut ObjectProperties);

    fn entity_activate(
        &mut self,
        entity: &mut LuaEntitySao,
        staticdata: &str,
        env: &EntityCallContext<'_>,
    );

    /// Serialized state to store with the entity
    fn entity_static_data(&self, id: ObjectId) -> Option<String>;

    fn entity_step(&mut self, entity: &mut LuaEntitySao, dtime: f32, env: &EntityCallContext<'_>);

    fn entity_punch(
        &mut self,
        entity: &mut LuaEntitySao,
        puncher: Option<&mut dyn ServerActiveObject>,
        punch: &PunchInfo<'_>,
        env: &EntityCallContext<'_>,
    );

    fn entity_right_click(
        &mut self,
        entity: &mut LuaEntitySao,
        clicker: Option<&mut dyn ServerActiveObject>,
        env: &EntityCallContext<'_>,
    );
}

/// A registered entity definition
pub trait EntityBehavior: Send + Sync {
    /// Initial properties of entities of this kind
    fn properties(&self, _prop: &mut ObjectProperties) {}

    /// Create the per-entity state
    fn instantiate(&self) -> Box<dyn EntityInstance>;
}

/// Per-entity script state and callbacks
pub trait EntityInstance: Send {
    fn on_activate(&mut self, _entity: &mut LuaEntitySao, _staticdata: &str, _env: &EntityCallContext<'_>) {}

    fn get_staticdata(&self) -> String {
        String::new()
    }

    fn on_step(&mut self, _entity: &mut LuaEntitySao, _dtime: f32, _env: &EntityCallContext<'_>) {}

    fn on_punch(
        &mut self,
        _entity: &mut LuaEntitySao,
        _puncher: Option<&mut dyn ServerActiveObject>,
        _punch: &PunchInfo<'_>,
        _env: &EntityCallContext<'_>,
    ) {
    }

    fn on_rightclick(
        &mut self,
        _entity: &mut LuaEntitySao,
        _clicker: Option<&mut dyn ServerActiveObject>,
        _env: &EntityCallContext<'_>,
    ) {
    }
}

/// Native script host
#[derive(Default)]
pub struct EntityRegistry {
    definitions: HashMap<String, Arc<dyn EntityBehavior>>,
    instances: HashMap<ObjectId, (Arc<dyn EntityBehavior>, Box<dyn EntityInstance>)>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the engine's builtin entities
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.definitions.insert(
            crate::object::item::BUILTIN_ITEM_NAME.to_string(),
            Arc::new(crate::object::item::BuiltinItem),
        );
        registry
    }

    /// Register an entity definition under `modname:name`
    pub fn register(
        &mut self,
        name: &str,
        behavior: impl EntityBehavior + 'static,
    ) -> Result<(), ScriptError> {
        let name = name.strip_prefix(':').unwrap_or(name);
        if !is_valid_item_name(name) || !name.contains(':') {
            return Err(ScriptError::InvalidEntityName(name.to_string()));
        }
        if self.definitions.contains_key(name) {
            return Err(ScriptError::AlreadyRegistered(name.to_string()));
        }
        debug!(name = %name, "Registered entity");
        self.definitions.insert(name.to_string(), Arc::new(behavior));
        Ok(())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// Number of live entity instances
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    fn instance_mut(&mut self, id: ObjectId) -> Option<&mut Box<dyn EntityInstance>> {
        self.instances.get_mut(&id).map(|(_, instance)| instance)
    }
}

impl ScriptHost for EntityRegistry {
    fn entity_add(&mut self, id: ObjectId, name: &str) -> bool {
        let Some(behavior) = self.definitions.get(name).cloned() else {
            warn!(id = id, name = %name, "Entity definition not found");
            return false;
        };
        let instance = behavior.instantiate();
        self.instances.insert(id, (behavior, instance));
        trace!(id = id, name = %name, "Entity instance created");
        true
    }

    fn entity_remove(&mut self, id: ObjectId) {
        if self.instances.remove(&id).is_some() {
            trace!(id = id, "Entity instance removed");
        }
    }

    fn entity_properties(&self, id: ObjectId, prop: &mut ObjectProperties) {
        if let Some((behavior, _)) = self.instances.get(&id) {
            behavior.properties(prop);
        }
    }

    fn entity_activate(
        &mut self,
        entity: &mut LuaEntitySao,
        staticdata: &str,
        env: &EntityCallContext<'_>,
    ) {
        if let Some(instance) = self.instance_mut(entity.id()) {
            instance.on_activate(entity, staticdata, env);
        }
    }

    fn entity_static_data(&self, id: ObjectId) -> Option<String> {
        self.instances.get(&id).map(|(_, instance)| instance.get_staticdata())
    }

    fn entity_step(&mut self, entity: &mut LuaEntitySao, dtime: f32, env: &EntityCallContext<'_>) {
        if let Some(instance) = self.instance_mut(entity.id()) {
            instance.on_step(entity, dtime, env);
        }
    }

    fn entity_punch(
        &mut self,
        entity: &mut LuaEntitySao,
        puncher: Option<&mut dyn ServerActiveObject>,
        punch: &PunchInfo<'_>,
        env: &EntityCallContext<'_>,
    ) {
        if let Some(instance) = self.instance_mut(entity.id()) {
            instance.on_punch(entity, puncher, punch, env);
        }
    }

    fn entity_right_click(
        &mut self,
        entity: &mut LuaEntitySao,
        clicker: Option<&mut dyn ServerActiveObject>,
        env: &EntityCallContext<'_>,
    ) {
        if let Some(instance) = self.instance_mut(entity.id()) {
            instance.on_rightclick(entity, clicker, env);
        }
    }
}

impl std::fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.definitions.keys().collect();
        names.sort();
        f.debug_struct("EntityRegistry")
            .field("definitions", &names)
            .field("instances", &self.instances.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Rat;

    impl EntityBehavior for Rat {
        fn properties(&self, prop: &mut ObjectProperties) {
            prop.hp_max = 3;
            prop.textures = vec!["rat.png".to_string()];
        }

        fn instantiate(&self) -> Box<dyn EntityInstance> {
            Box::new(RatState(String::from("sleeping")))
        }
    }

    struct RatState(String);

    impl EntityInstance for RatState {
        fn get_staticdata(&self) -> String {
            self.0.clone()
        }
    }

    #[test]
    fn test_register_validates_name() {
        let mut registry = EntityRegistry::new();
        assert!(registry.register("mobs:rat", Rat).is_ok());
        assert!(registry.register(":mobs:mouse", Rat).is_ok());
        assert!(registry.is_registered("mobs:mouse"));
        assert_eq!(
            registry.register("mobs:rat", Rat),
            Err(ScriptError::AlreadyRegistered("mobs:rat".to_string()))
        );
        assert_eq!(
            registry.register("rat", Rat),
            Err(ScriptError::InvalidEntityName("rat".to_string()))
        );
    }

    #[test]
    fn test_instances() {
        let mut registry = EntityRegistry::new();
        registry.register("mobs:rat", Rat).unwrap();

        assert!(!registry.entity_add(1, "mobs:unknown"));
        assert!(registry.entity_add(2, "mobs:rat"));
        assert_eq!(registry.instance_count(), 1);

        let mut prop = ObjectProperties::default();
        registry.entity_properties(2, &mut prop);
        assert_eq!(prop.hp_max, 3);
        assert_eq!(registry.entity_static_data(2), Some("sleeping".to_string()));
        assert_eq!(registry.entity_static_data(1), None);

        registry.entity_remove(2);
        assert_eq!(registry.instance_count(), 0);
    }

    #[test]
    fn test_builtin_item_registered() {
        let registry = EntityRegistry::with_builtin();
        assert!(registry.is_registered("__builtin:item"));
    }
}
