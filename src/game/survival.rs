//! Hunger and breath
//!
//! Run once per player step. Hunger drains over time and with exhaustion,
//! starvation hurts and a full stomach slowly heals. Breath drains while the
//! head is under liquid and drowning hurts once it runs out.

use crate::config::{HungerConfig, OxygenConfig};
use crate::game::map::NodeMap;
use crate::game::player::{PLAYER_MAX_HP, PLAYER_MAX_OXYGEN};
use crate::game::world::WorldSettings;
use crate::object::{PlayerSao, ServerActiveObject};

/// Advance the survival timers of a player
pub fn step(sao: &mut PlayerSao, dtime: f32, map: &dyn NodeMap, settings: &WorldSettings) {
    // Dead players neither starve nor drown
    if sao.hp() == 0 || !settings.enable_damage {
        return;
    }

    if settings.enable_hunger {
        hunger_step(sao, dtime, &settings.hunger, settings);
    }
    oxygen_step(sao, dtime, map, &settings.oxygen, settings);
}

fn hunger_step(sao: &mut PlayerSao, dtime: f32, cfg: &HungerConfig, settings: &WorldSettings) {
    let mut hunger = sao.hunger();

    let mut timer = sao.hunger_timer() + dtime;
    if timer >= cfg.interval_secs {
        timer -= cfg.interval_secs;
        hunger -= 1;
    }
    sao.set_hunger_timer(timer);

    let mut exhaustion = sao.exhaustion();
    if cfg.exhaustion_per_point > 0.0 {
        while exhaustion >= cfg.exhaustion_per_point {
            exhaustion -= cfg.exhaustion_per_point;
            hunger -= 1;
        }
        sao.set_exhaustion(exhaustion);
    }

    if hunger != sao.hunger() {
        sao.set_hunger(hunger);
    }

    let timer = sao.hunger_hurt_heal_timer() + dtime;
    if timer < cfg.hurt_heal_interval_secs {
        sao.set_hunger_hurt_heal_timer(timer);
        return;
    }
    sao.set_hunger_hurt_heal_timer(0.0);

    let hp = sao.hp();
    if sao.hunger() == 0 {
        sao.set_hp(hp - 1, settings);
    } else if sao.hunger() >= cfg.heal_threshold && hp < PLAYER_MAX_HP {
        sao.set_hp(hp + 1, settings);
    }
}

fn oxygen_step(
    sao: &mut PlayerSao,
    dtime: f32,
    map: &dyn NodeMap,
    cfg: &OxygenConfig,
    settings: &WorldSettings,
) {
    if !sao.in_water(map) {
        sao.set_oxygen_hurt_timer(0.0);
        if sao.oxygen() >= PLAYER_MAX_OXYGEN {
            sao.set_oxygen_timer(0.0);
            return;
        }
        let timer = sao.oxygen_timer() + dtime;
        if timer >= cfg.interval_secs {
            sao.set_oxygen_timer(0.0);
            sao.set_oxygen(sao.oxygen() + 1);
        } else {
            sao.set_oxygen_timer(timer);
        }
        return;
    }

    let timer = sao.oxygen_timer() + dtime;
    if timer >= cfg.interval_secs {
        sao.set_oxygen_timer(0.0);
        if sao.oxygen() > 0 {
            sao.set_oxygen(sao.oxygen() - 1);
        }
    } else {
        sao.set_oxygen_timer(timer);
    }

    if sao.oxygen() > 0 {
        return;
    }
    let timer = sao.oxygen_hurt_timer() + dtime;
    if timer >= cfg.hurt_interval_secs {
        sao.set_oxygen_hurt_timer(0.0);
        sao.set_hp(sao.hp() - cfg.damage, settings);
    } else {
        sao.set_oxygen_hurt_timer(timer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    use crate::game::map::{NodeKind, VoxelMap};
    use crate::game::math::{V3f, V3s16};
    use crate::game::player::{Player, PLAYER_MAX_HUNGER};
    use crate::object::flags::PendingFlags;

    fn sao() -> PlayerSao {
        let player = Arc::new(Player::new("diver").with_position(V3f::ZERO));
        PlayerSao::new(player, 1, HashSet::new(), true).unwrap()
    }

    fn settings() -> WorldSettings {
        WorldSettings {
            enable_hunger: true,
            ..Default::default()
        }
    }

    fn run(sao: &mut PlayerSao, map: &VoxelMap, settings: &WorldSettings, seconds: u32) {
        for _ in 0..seconds * 10 {
            step(sao, 0.1, map, settings);
        }
    }

    #[test]
    fn test_hunger_drains_over_time() {
        let mut sao = sao();
        let map = VoxelMap::new();
        let settings = settings();

        run(&mut sao, &map, &settings, 61);
        assert_eq!(sao.hunger(), PLAYER_MAX_HUNGER - 1);
        assert!(sao.take_pending(PendingFlags::HUNGER));
    }

    #[test]
    fn test_exhaustion_costs_hunger() {
        let mut sao = sao();
        let map = VoxelMap::new();
        let settings = settings();

        sao.set_exhaustion(settings.hunger.exhaustion_per_point * 2.5);
        step(&mut sao, 0.1, &map, &settings);
        assert_eq!(sao.hunger(), PLAYER_MAX_HUNGER - 2);
        assert!((sao.exhaustion() - settings.hunger.exhaustion_per_point * 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_starvation_and_healing() {
        let mut sao = sao();
        let map = VoxelMap::new();
        let settings = settings();

        sao.set_hunger(0);
        run(&mut sao, &map, &settings, 5);
        assert_eq!(sao.hp(), PLAYER_MAX_HP - 1);

        sao.set_hunger(PLAYER_MAX_HUNGER);
        run(&mut sao, &map, &settings, 5);
        assert_eq!(sao.hp(), PLAYER_MAX_HP);
    }

    #[test]
    fn test_hunger_disabled() {
        let mut sao = sao();
        let map = VoxelMap::new();
        let settings = WorldSettings {
            enable_hunger: false,
            ..Default::default()
        };

        sao.set_hunger(0);
        run(&mut sao, &map, &settings, 10);
        assert_eq!(sao.hp(), PLAYER_MAX_HP);
    }

    #[test]
    fn test_drowning() {
        let mut sao = sao();
        let mut map = VoxelMap::new();
        let settings = settings();
        // Head at y = 15 is in node y = 2
        map.set_node(V3s16::new(0, 2, 0), NodeKind::Liquid);

        let per_point = settings.oxygen.interval_secs;
        run(&mut sao, &map, &settings, (per_point * PLAYER_MAX_OXYGEN as f32) as u32 + 2);
        assert_eq!(sao.oxygen(), 0);
        assert!(sao.take_pending(PendingFlags::OXYGEN));

        let hp = sao.hp();
        run(&mut sao, &map, &settings, 3);
        assert!(sao.hp() < hp);
    }

    #[test]
    fn test_breath_restores_out_of_water() {
        let mut sao = sao();
        let map = VoxelMap::new();
        let settings = settings();

        sao.set_oxygen(5);
        run(&mut sao, &map, &settings, 60);
        assert_eq!(sao.oxygen(), PLAYER_MAX_OXYGEN);
        assert_eq!(sao.hp(), PLAYER_MAX_HP);
    }

    #[test]
    fn test_dead_player_is_skipped() {
        let mut sao = sao();
        let map = VoxelMap::new();
        let settings = settings();

        sao.set_hp(0, &settings);
        sao.set_hunger(0);
        run(&mut sao, &map, &settings, 10);
        assert_eq!(sao.hp(), 0);
    }
}
