//! Integration tests for the server environment
//!
//! These tests verify the end-to-end behavior of:
//! - Players joining, moving and leaving
//! - Scripted entities registered through the public registry
//! - Dropped items being picked up
//! - Object encodings seen by clients
//! - The async tick loop and shutdown

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::sync::{broadcast, mpsc};

use voxel_server::game::item::ItemDefManager;
use voxel_server::game::map::{NodeKind, VoxelMap};
use voxel_server::game::math::{V3f, V3s16, BS};
use voxel_server::game::player::{Player, PlayerManager};
use voxel_server::game::world::WorldState;
use voxel_server::net::buffer::PacketBuffer;
use voxel_server::object::commands::GenericCommand;
use voxel_server::object::properties::ObjectProperties;
use voxel_server::object::{ActiveObjectType, LuaEntitySao, PlayerSao};
use voxel_server::script::{EntityBehavior, EntityCallContext, EntityInstance, EntityRegistry};
use voxel_server::{ServerActiveObject, ServerEnvironment, WorldSettings};

static STEPS: AtomicUsize = AtomicUsize::new(0);

struct Walker;

impl EntityBehavior for Walker {
    fn properties(&self, prop: &mut ObjectProperties) {
        prop.hp_max = 5;
        prop.physical = false;
        prop.textures = vec!["walker.png".to_string()];
    }

    fn instantiate(&self) -> Box<dyn EntityInstance> {
        Box::new(WalkerState::default())
    }
}

#[derive(Default)]
struct WalkerState {
    steps: u32,
}

impl EntityInstance for WalkerState {
    fn on_activate(&mut self, entity: &mut LuaEntitySao, staticdata: &str, _env: &EntityCallContext<'_>) {
        self.steps = staticdata.parse().unwrap_or(0);
        entity.set_velocity(V3f::new(BS, 0.0, 0.0));
    }

    fn get_staticdata(&self) -> String {
        self.steps.to_string()
    }

    fn on_step(&mut self, _entity: &mut LuaEntitySao, _dtime: f32, _env: &EntityCallContext<'_>) {
        self.steps += 1;
        STEPS.fetch_add(1, Ordering::SeqCst);
    }
}

fn environment(settings: WorldSettings) -> ServerEnvironment {
    let mut registry = EntityRegistry::with_builtin();
    registry.register("test:walker", Walker).unwrap();

    let mut map = VoxelMap::new();
    map.fill(V3s16::new(-4, -1, -4), V3s16::new(4, -1, 4), NodeKind::Solid);

    ServerEnvironment::new(
        settings,
        Box::new(registry),
        Box::new(map),
        Arc::new(ItemDefManager::with_basic_items()),
        PlayerManager::new(8),
    )
}

#[test]
fn test_scripted_entity_lifecycle() {
    let mut env = environment(WorldSettings::default());
    let id = env
        .add_object(Box::new(LuaEntitySao::new(V3f::ZERO, "test:walker", "3")))
        .unwrap();

    let entity = env
        .get_object(id)
        .and_then(|obj| obj.downcast_ref::<LuaEntitySao>())
        .unwrap();
    assert!(entity.is_registered());
    assert_eq!(entity.hp(), 5);

    for _ in 0..10 {
        env.step(0.1);
    }
    let pos = env.get_object(id).unwrap().base_position();
    assert!((pos.x - BS).abs() < 1e-3, "x = {}", pos.x);
    assert!(STEPS.load(Ordering::SeqCst) >= 10);

    // State survives deactivation
    assert!(env.deactivate_object(id).unwrap());
    assert_eq!(env.activate_static_objects(), 1);
    let id = env.object_ids()[0];
    let (send_type, init) = env.object_init_data(id).unwrap();
    assert_eq!(send_type, ActiveObjectType::Generic);
    let mut buf = PacketBuffer::from_bytes(&init);
    assert_eq!(buf.read_u8().unwrap(), 0);
    assert_eq!(buf.read_string().unwrap(), "");
    assert!(!buf.read_bool().unwrap());
}

#[test]
fn test_unknown_entity_removed_on_punch() {
    let mut env = environment(WorldSettings::default());
    let id = env
        .add_object(Box::new(LuaEntitySao::new(V3f::ZERO, "test:ghost", "")))
        .unwrap();

    assert_eq!(env.punch_object(id, None, V3f::ZERO, None, 1.0).unwrap(), 0);
    env.step(0.1);
    assert!(env.get_object(id).is_none());
}

#[test]
fn test_player_session() {
    let mut env = environment(WorldSettings::default());
    let id = env
        .add_player(Player::new("alice"), 1, HashSet::new(), false)
        .unwrap();

    // Initial send: position and armor groups
    env.step(0.1);
    let commands: Vec<u8> = env
        .take_messages()
        .iter()
        .filter(|m| m.id == id)
        .map(|m| m.data[0])
        .collect();
    assert_eq!(
        commands,
        vec![
            GenericCommand::UpdatePosition.as_u8(),
            GenericCommand::UpdateArmorGroups.as_u8(),
        ]
    );

    // A plausible move is accepted
    env.handle_player_move(1, V3f::new(20.0, 0.0, 0.0), V3f::ZERO, 0.0, 0.0)
        .unwrap();
    env.step(1.0);
    let sao = env.player_sao_mut(1).unwrap();
    assert_eq!(sao.last_good_position(), V3f::new(20.0, 0.0, 0.0));

    // A jump across the map is not
    env.handle_player_move(1, V3f::new(5000.0, 0.0, 0.0), V3f::ZERO, 0.0, 0.0)
        .unwrap();
    env.step(1.0);
    let sao: &mut PlayerSao = env.player_sao_mut(1).unwrap();
    assert_eq!(sao.player().position(), V3f::new(20.0, 0.0, 0.0));

    env.remove_player(1).unwrap();
    env.step(0.1);
    assert_eq!(env.object_count(), 0);
    assert_eq!(env.players.count(), 0);
}

#[test]
fn test_dropped_item_pickup() {
    let mut env = environment(WorldSettings::default());
    env.add_player(Player::new("bob"), 2, HashSet::new(), true)
        .unwrap();
    let item = env.spawn_item(V3f::new(0.0, 5.0, 0.0), "default:apple 3").unwrap();

    env.player_punch(2, item, V3f::ZERO).unwrap();
    env.step(0.1);
    assert!(env.get_object(item).is_none());

    let sao = env.player_sao_mut(2).unwrap();
    let inv = sao.player().inventory.read();
    assert_eq!(inv.list("main").unwrap().count_item("default:apple"), 3);
}

#[tokio::test]
async fn test_tick_loop_and_shutdown() {
    let settings = WorldSettings {
        tick_rate_ms: 10,
        ..Default::default()
    };
    let mut env = environment(settings);
    env.spawn_item(V3f::new(0.0, 5.0, 0.0), "default:dirt").unwrap();
    env.add_player(Player::new("carol"), 3, HashSet::new(), true)
        .unwrap();

    let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);
    let (outgoing_tx, mut outgoing_rx) = mpsc::channel(16);

    let handle = tokio::spawn(async move {
        env.run(&mut shutdown_rx, outgoing_tx).await;
        env
    });

    let first = tokio::time::timeout(Duration::from_secs(5), outgoing_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(!first.is_empty());
    let drain = tokio::spawn(async move { while outgoing_rx.recv().await.is_some() {} });

    shutdown_tx.send(()).unwrap();
    let env = handle.await.unwrap();
    drain.await.unwrap();

    assert_eq!(env.state(), WorldState::Stopped);
    assert!(env.tick() >= 1);
    // The item is stored, the player is not
    assert_eq!(env.static_store().len(), 1);
    assert_eq!(env.object_count(), 1);
}
